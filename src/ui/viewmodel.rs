//! View model types representing renderable view state.
//!
//! View models are computed on demand by
//! [`AppState::compute_viewmodel`](crate::app::AppState::compute_viewmodel)
//! and carry display-ready data only: formatted labels, highlight ranges,
//! favorite and selection flags, and the notices to show.

use super::presentation::Marker;
use crate::app::modes::ViewKind;
use crate::domain::{Coordinates, NormalizedEvent};
use chrono::{DateTime, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Label shown for events without a start time.
pub const DATE_TBA: &str = "Date TBA";

/// Everything needed to render one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    pub view: ViewKind,
    pub header: HeaderInfo,
    pub search_bar: SearchBarInfo,
    /// List entries in display order.
    pub items: Vec<EventItem>,
    pub markers: Vec<Marker>,
    /// Whether an authoritative request is in flight.
    pub loading: bool,
    /// Failure of the last authoritative request, if any.
    pub error: Option<ErrorNotice>,
    pub empty_state: Option<EmptyState>,
    /// Present for the map view only.
    pub map_center: Option<MapCenter>,
}

/// One list card.
#[derive(Debug, Clone, PartialEq)]
pub struct EventItem {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub when: String,
    pub location: String,
    pub price: String,
    /// `"12/40"` or `"12"`.
    pub attendance: String,
    /// At capacity; new sign-ups join a waitlist.
    pub waitlist: bool,
    pub rating: f64,
    pub difficulty: String,
    pub organizer: String,
    pub source_tag: String,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub featured: bool,
    pub is_favorite: bool,
    pub is_selected: bool,
    /// Matched title ranges for the committed search text, as
    /// `(start, end)` character indices with exclusive end.
    pub highlight_ranges: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchBarInfo {
    pub query: String,
}

/// Message shown beside (not instead of) whatever results are still visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub message: String,
    pub retryable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyState {
    pub message: String,
    pub subtitle: String,
}

/// Where the map is centered and whether that position is approximate.
#[derive(Debug, Clone, PartialEq)]
pub struct MapCenter {
    pub coordinates: Coordinates,
    pub approximate: bool,
    /// Informational note shown when the center is the fallback coordinate.
    pub notice: Option<String>,
}

/// Formats a start instant for a card, e.g. `"Sat, Oct 4 · 8:00 AM"`.
#[must_use]
pub fn format_when(start: Option<DateTime<Utc>>) -> String {
    start.map_or_else(
        || DATE_TBA.to_string(),
        |s| s.format("%a, %b %-d · %-I:%M %p").to_string(),
    )
}

/// Builds a card from an event and its presentation flags.
#[must_use]
pub fn event_item(
    event: &NormalizedEvent,
    is_favorite: bool,
    is_selected: bool,
    matcher: Option<(&SkimMatcherV2, &str)>,
) -> EventItem {
    let highlight_ranges = matcher.map_or_else(Vec::new, |(m, query)| highlight_ranges(m, &event.title, query));

    EventItem {
        id: event.id.clone(),
        title: event.title.clone(),
        icon: event.icon.clone(),
        when: format_when(event.start),
        location: event.location.clone(),
        price: event.price.clone(),
        attendance: event.attendance_label(),
        waitlist: event.is_full(),
        rating: event.rating,
        difficulty: event.difficulty.clone(),
        organizer: event.organizer.clone(),
        source_tag: event.source_tag.clone(),
        tags: event.tags.clone(),
        url: event.url.clone(),
        featured: event.featured,
        is_favorite,
        is_selected,
        highlight_ranges,
    }
}

/// Coalesces fuzzy-match indices of `query` in `text` into contiguous ranges.
#[must_use]
pub fn highlight_ranges(matcher: &SkimMatcherV2, text: &str, query: &str) -> Vec<(usize, usize)> {
    let Some((_, indices)) = matcher.fuzzy_indices(text, query.trim()) else {
        return vec![];
    };

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for idx in indices {
        match ranges.last_mut() {
            Some((_, end)) if *end == idx => *end = idx + 1,
            _ => ranges.push((idx, idx + 1)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn consecutive_matches_merge_into_one_range() {
        let matcher = SkimMatcherV2::default();
        assert_eq!(highlight_ranges(&matcher, "City Marathon", "mara"), vec![(5, 9)]);
        assert!(highlight_ranges(&matcher, "Swim Meet", "zzz").is_empty());
    }

    #[test]
    fn start_times_are_formatted() {
        let start = Utc.with_ymd_and_hms(2025, 10, 4, 8, 0, 0).single();
        assert_eq!(format_when(start), "Sat, Oct 4 · 8:00 AM");
        assert_eq!(format_when(None), DATE_TBA);
    }
}
