//! Query descriptor and the filter dimensions it is built from.
//!
//! A [`QueryDescriptor`] is an immutable snapshot of every search, filter,
//! sort and layout input for one view. It is rebuilt on every state change and
//! compared structurally, so two descriptors that are `==` must never cause a
//! second request.

use serde::{Deserialize, Serialize};

/// Event category filter.
///
/// Each category carries a stable id used in shareable links (`cat=`) and as
/// the key into the [`SportCatalog`](super::SportCatalog) base-query table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    All,
    Running,
    Cycling,
    Swimming,
    Tennis,
    Basketball,
    Soccer,
    Fitness,
    Outdoor,
    Esports,
}

impl Category {
    /// Every category in display order.
    pub const ALL: [Self; 10] = [
        Self::All,
        Self::Running,
        Self::Cycling,
        Self::Swimming,
        Self::Tennis,
        Self::Basketball,
        Self::Soccer,
        Self::Fitness,
        Self::Outdoor,
        Self::Esports,
    ];

    /// Stable identifier used in links and catalog lookups.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Running => "running",
            Self::Cycling => "cycling",
            Self::Swimming => "swimming",
            Self::Tennis => "tennis",
            Self::Basketball => "basketball",
            Self::Soccer => "soccer",
            Self::Fitness => "fitness",
            Self::Outdoor => "outdoor",
            Self::Esports => "esports",
        }
    }

    /// Looks up a category by id. Unknown ids yield `None`.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }
}

/// Where events should be searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    #[default]
    All,
    /// Rank around the device location, when it could be resolved.
    Nearby,
    City,
    /// Only events held online.
    Virtual,
}

impl LocationMode {
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Nearby => "nearby",
            Self::City => "city",
            Self::Virtual => "virtual",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "all" => Some(Self::All),
            "nearby" => Some(Self::Nearby),
            "city" => Some(Self::City),
            "virtual" => Some(Self::Virtual),
            _ => None,
        }
    }
}

/// Ordering applied to the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Ascending start time, undated events last.
    #[default]
    Date,
    /// Descending participant count.
    Popularity,
    /// Free events first.
    Price,
}

/// Card layout of the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Map viewport bounds in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Whether a point falls inside the box (edges inclusive).
    #[must_use]
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Immutable snapshot of all inputs that define what a view shows.
///
/// Invariants, upheld by [`QueryStore`](crate::app::QueryStore):
/// - `coordinates` is `Some` only while `location_mode == Nearby` and the
///   device location resolved accurately.
/// - `bounding_box` is `Some` only for the map view.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub search_text: String,
    pub category: Category,
    pub location_mode: LocationMode,
    pub sort_key: SortKey,
    pub view_mode: ViewMode,
    pub coordinates: Option<Coordinates>,
    pub bounding_box: Option<BoundingBox>,
}

impl QueryDescriptor {
    /// Fields that change what the aggregation service returns.
    ///
    /// Sort key, layout and location mode (other than through `coordinates`)
    /// are applied client-side and are deliberately absent here.
    #[must_use]
    pub fn fetch_key(&self) -> FetchKey {
        FetchKey {
            search_text: self.search_text.clone(),
            category: self.category,
            coordinates: self.coordinates,
            bounding_box: self.bounding_box,
        }
    }

    /// Whether the user-entered query differs, ignoring environment inputs
    /// (device coordinates, map bounds) and presentation-only fields.
    #[must_use]
    pub fn is_distinct_query(&self, other: &Self) -> bool {
        self.search_text != other.search_text
            || self.category != other.category
            || self.location_mode != other.location_mode
    }
}

/// Server-facing projection of a [`QueryDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchKey {
    pub search_text: String,
    pub category: Category,
    pub coordinates: Option<Coordinates>,
    pub bounding_box: Option<BoundingBox>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_ids_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_id(category.id()), Some(category));
        }
        assert_eq!(Category::from_id("curling"), None);
    }

    #[test]
    fn sort_and_layout_do_not_change_fetch_key() {
        let a = QueryDescriptor::default();
        let b = QueryDescriptor {
            sort_key: SortKey::Price,
            view_mode: ViewMode::List,
            ..QueryDescriptor::default()
        };
        assert_ne!(a, b);
        assert_eq!(a.fetch_key(), b.fetch_key());
    }

    #[test]
    fn bounding_box_contains_edges() {
        let bbox = BoundingBox::new(40.70, 40.80, -74.02, -73.95);
        assert!(bbox.contains(Coordinates::new(40.70, -74.02)));
        assert!(!bbox.contains(Coordinates::new(40.81, -74.0)));
    }
}
