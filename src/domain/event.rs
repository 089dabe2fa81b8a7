//! Canonical display record for an event.
//!
//! Every upstream payload shape is folded into [`NormalizedEvent`] by the
//! normalizer. The presentation layer reads these records but never mutates
//! them; favorites and selection live beside them, keyed by `id`.

use super::query::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when no title alternative is present.
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// Placeholder used when no venue or place alternative is present.
pub const LOCATION_TBA: &str = "Location TBA";

/// Price label for events that are explicitly free.
pub const FREE: &str = "Free";

/// Price label when the upstream record carries no usable price.
pub const SEE_SITE: &str = "See site";

/// Difficulty label when none is given.
pub const ALL_LEVELS: &str = "All Levels";

/// Organizer label when none is given.
pub const DEFAULT_ORGANIZER: &str = "Organizer";

/// Normalized event as displayed in the list and on the map.
///
/// `title` and `location` are never empty. `start`, when present, is a valid
/// instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub start: Option<DateTime<Utc>>,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub price: String,
    pub participants: u32,
    pub max_participants: Option<u32>,
    pub rating: f64,
    pub difficulty: String,
    pub organizer: String,
    pub source_tag: String,
    pub icon: String,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub featured: bool,
}

impl NormalizedEvent {
    /// Map position, when both coordinates are known.
    #[must_use]
    pub fn position(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.price == FREE
    }

    /// Whether the event is at capacity and further sign-ups go to a waitlist.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.max_participants
            .is_some_and(|max| self.participants >= max)
    }

    /// Whether the event takes place online.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        let location = self.location.to_lowercase();
        location.contains("virtual") || location.contains("online")
    }

    /// `"12/40"` when a capacity is known, otherwise just the participant count.
    #[must_use]
    pub fn attendance_label(&self) -> String {
        self.max_participants.map_or_else(
            || self.participants.to_string(),
            |max| format!("{}/{max}", self.participants),
        )
    }
}
