//! Client-side ordering, filtering and map markers over normalized events.
//!
//! Nothing here mutates a [`NormalizedEvent`]. Sorting and filtering return
//! borrowed views, and favorites live in a separate [`FavoriteSet`] keyed by
//! event id, so toggling one never touches the query or triggers a fetch.

use crate::domain::{Coordinates, LocationMode, NormalizedEvent, QueryDescriptor, SortKey};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Orders events by `key`. Every policy is stable.
///
/// - `Date`: ascending start, undated events last
/// - `Popularity`: descending participant count
/// - `Price`: free events first
#[must_use]
pub fn sort_events<'a, I>(events: I, key: SortKey) -> Vec<&'a NormalizedEvent>
where
    I: IntoIterator<Item = &'a NormalizedEvent>,
{
    let mut sorted: Vec<&NormalizedEvent> = events.into_iter().collect();
    match key {
        SortKey::Date => sorted.sort_by(|a, b| match (a.start, b.start) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortKey::Popularity => sorted.sort_by(|a, b| b.participants.cmp(&a.participants)),
        SortKey::Price => sorted.sort_by_key(|e| !e.is_free()),
    }
    sorted
}

/// The list a view shows for `descriptor`: filtered by location mode, then
/// sorted by its sort key.
///
/// Only `Virtual` filters client-side, keeping events held online. Every
/// other mode is resolved by the service.
#[must_use]
pub fn visible_events<'a>(
    events: &'a [NormalizedEvent],
    descriptor: &QueryDescriptor,
) -> Vec<&'a NormalizedEvent> {
    let virtual_only = descriptor.location_mode == LocationMode::Virtual;
    let filtered = events.iter().filter(|e| !virtual_only || e.is_virtual());
    sort_events(filtered, descriptor.sort_key)
}

/// A georeferenced event on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub position: Coordinates,
    pub is_favorite: bool,
    pub is_selected: bool,
}

/// Markers for every event that carries both coordinates, in input order.
#[must_use]
pub fn markers<'a, I>(events: I, favorites: &FavoriteSet, selected: Option<&str>) -> Vec<Marker>
where
    I: IntoIterator<Item = &'a NormalizedEvent>,
{
    events
        .into_iter()
        .filter_map(|event| {
            let position = event.position()?;
            Some(Marker {
                id: event.id.clone(),
                title: event.title.clone(),
                icon: event.icon.clone(),
                position,
                is_favorite: favorites.contains(&event.id),
                is_selected: selected == Some(event.id.as_str()),
            })
        })
        .collect()
}

/// Event ids the user marked as favorite. Session-scoped, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: HashSet<String>,
}

impl FavoriteSet {
    /// Flips `id` in or out of the set. Returns whether it is now a favorite.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_string());
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SportCatalog;
    use crate::normalize::{normalize, RawEventRecord};
    use serde_json::{json, Value};

    fn event(value: Value, index: usize) -> NormalizedEvent {
        normalize(&RawEventRecord::from_value(value), index, &SportCatalog::default())
            .expect("object record")
    }

    fn ids<'a>(events: &[&'a NormalizedEvent]) -> Vec<&'a str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn date_sort_is_stable_with_undated_last() {
        let events = vec![
            event(json!({ "id": "undated" }), 0),
            event(json!({ "id": "late", "start_time": "2025-06-02T09:00:00Z" }), 1),
            event(json!({ "id": "tie-a", "start_time": "2025-06-01T09:00:00Z" }), 2),
            event(json!({ "id": "tie-b", "start_time": "2025-06-01T09:00:00Z" }), 3),
        ];
        let sorted = sort_events(&events, SortKey::Date);
        assert_eq!(ids(&sorted), vec!["tie-a", "tie-b", "late", "undated"]);
    }

    #[test]
    fn popularity_sorts_descending() {
        let events = vec![
            event(json!({ "id": "a", "participants": 3 }), 0),
            event(json!({ "id": "b", "participants": 40 }), 1),
            event(json!({ "id": "c", "participants": 3 }), 2),
        ];
        assert_eq!(ids(&sort_events(&events, SortKey::Popularity)), vec!["b", "a", "c"]);
    }

    #[test]
    fn price_puts_free_first_and_keeps_order_otherwise() {
        let events = vec![
            event(json!({ "id": "paid-1", "price": "$10" }), 0),
            event(json!({ "id": "free-1", "is_free": true }), 1),
            event(json!({ "id": "unknown" }), 2),
            event(json!({ "id": "free-2", "price": 0 }), 3),
        ];
        assert_eq!(
            ids(&sort_events(&events, SortKey::Price)),
            vec!["free-1", "free-2", "paid-1", "unknown"]
        );
    }

    #[test]
    fn virtual_mode_keeps_online_events() {
        let events = vec![
            event(json!({ "id": "park", "location": "Prospect Park" }), 0),
            event(json!({ "id": "zoom", "location": "Online (Zoom)" }), 1),
            event(json!({ "id": "vr", "location": "Virtual Arena" }), 2),
        ];
        let descriptor = QueryDescriptor {
            location_mode: LocationMode::Virtual,
            ..QueryDescriptor::default()
        };
        assert_eq!(ids(&visible_events(&events, &descriptor)), vec!["zoom", "vr"]);
        assert_eq!(visible_events(&events, &QueryDescriptor::default()).len(), 3);
    }

    #[test]
    fn markers_require_both_coordinates() {
        let events = vec![
            event(json!({ "id": "pinned", "latitude": 40.75, "longitude": -73.98 }), 0),
            event(json!({ "id": "half", "latitude": 40.75 }), 1),
        ];
        let mut favorites = FavoriteSet::default();
        favorites.toggle("pinned");

        let pins = markers(&events, &favorites, Some("pinned"));
        assert_eq!(pins.len(), 1);
        assert!(pins[0].is_favorite && pins[0].is_selected);
    }

    #[test]
    fn favorite_toggle_flips() {
        let mut favorites = FavoriteSet::default();
        assert!(favorites.toggle("a"));
        assert!(!favorites.toggle("a"));
        assert!(favorites.is_empty());
    }
}
