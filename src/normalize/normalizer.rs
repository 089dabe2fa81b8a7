//! Folding of [`RawEventRecord`]s into [`NormalizedEvent`]s.
//!
//! Each display field is resolved from an ordered list of upstream
//! alternatives and falls back to a documented default. The functions here are
//! pure: the same record, index and catalog always produce the same event.

use super::raw::{NumberField, RawEventFields, RawEventRecord, TextField, TimeField, VenueField};
use crate::domain::event::{
    ALL_LEVELS, DEFAULT_ORGANIZER, FREE, LOCATION_TBA, SEE_SITE, UNTITLED_EVENT,
};
use crate::domain::{Coordinates, NormalizedEvent, SportCatalog};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;

/// Maximum number of tags carried onto a display record.
const MAX_TAGS: usize = 3;

/// Number of leading records in a batch marked as featured.
const FEATURED_COUNT: usize = 3;

/// Naive datetime layouts accepted in addition to RFC 3339.
const NAIVE_LAYOUTS: [&str; 5] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Result of normalizing one response payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    /// Usable events in upstream order.
    pub events: Vec<NormalizedEvent>,
    /// Records skipped because no identifier could be derived.
    pub dropped: usize,
    /// Records skipped because an earlier record had the same id.
    pub duplicates: usize,
}

/// Normalizes a single record at position `index` of its batch.
///
/// Returns `None` only when the record cannot yield an identifier at all,
/// which is the case for any payload that is not a JSON object. An empty
/// object still produces an event with placeholder fields and an id derived
/// from its position.
///
/// ```
/// use event_compass::domain::SportCatalog;
/// use event_compass::normalize::{normalize, RawEventRecord};
///
/// let raw = RawEventRecord::from_value(serde_json::json!({}));
/// let event = normalize(&raw, 0, &SportCatalog::default()).unwrap();
/// assert_eq!(event.title, "Untitled Event");
/// assert_eq!(event.location, "Location TBA");
/// assert_eq!(event.id, "0-Untitled Event");
/// ```
#[must_use]
pub fn normalize(
    raw: &RawEventRecord,
    index: usize,
    catalog: &SportCatalog,
) -> Option<NormalizedEvent> {
    match raw {
        RawEventRecord::Record(fields) => Some(normalize_fields(fields, index, catalog)),
        RawEventRecord::Malformed(_) => None,
    }
}

/// Normalizes a whole response, dropping unusable and duplicate records.
///
/// Dropped records are reported as a warning; they never fail the batch.
#[must_use]
pub fn normalize_batch(records: &[RawEventRecord], catalog: &SportCatalog) -> NormalizedBatch {
    let _span = tracing::debug_span!("normalize_batch", records = records.len()).entered();

    let mut batch = NormalizedBatch::default();
    let mut seen = HashSet::new();

    for (index, raw) in records.iter().enumerate() {
        let Some(event) = normalize(raw, index, catalog) else {
            batch.dropped += 1;
            continue;
        };
        if !seen.insert(event.id.clone()) {
            tracing::debug!(id = %event.id, index, "skipping duplicate event id");
            batch.duplicates += 1;
            continue;
        }
        batch.events.push(event);
    }

    if batch.dropped > 0 {
        tracing::warn!(
            dropped = batch.dropped,
            kept = batch.events.len(),
            "dropped malformed event records"
        );
    }

    batch
}

fn normalize_fields(f: &RawEventFields, index: usize, catalog: &SportCatalog) -> NormalizedEvent {
    let title = first_text([f.title.as_ref(), f.name.as_ref()])
        .unwrap_or_else(|| UNTITLED_EVENT.to_string());

    let id = f
        .id
        .as_ref()
        .and_then(|id| id.as_text())
        .or_else(|| f.event_id.as_ref().and_then(|id| id.as_text()))
        .unwrap_or_else(|| format!("{index}-{title}"));

    let position = resolve_position(f);

    let tags: Vec<String> = f
        .tags
        .iter()
        .flatten()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .take(MAX_TAGS)
        .map(String::from)
        .collect();

    let hints = f
        .category
        .iter()
        .chain(f.subcategory.iter())
        .map(String::as_str)
        .chain(tags.iter().map(String::as_str));
    let icon = catalog.icon_for_event(hints, &title);

    NormalizedEvent {
        description: first_text([f.description.as_ref()]).unwrap_or_default(),
        start: resolve_start(f),
        location: resolve_location(f),
        latitude: position.map(|p| p.lat),
        longitude: position.map(|p| p.lon),
        price: resolve_price(f),
        participants: [f.participants, f.attending_count, f.yes_rsvp_count]
            .into_iter()
            .flatten()
            .find(|&n| n > 0)
            .unwrap_or(0),
        max_participants: [f.capacity, f.max_participants, f.max_participants_camel]
            .into_iter()
            .flatten()
            .find(|&n| n > 0),
        rating: resolve_rating(f.rating, index),
        difficulty: non_blank(f.difficulty.as_deref()).unwrap_or_else(|| ALL_LEVELS.to_string()),
        organizer: first_text([f.organizer.as_ref()])
            .or_else(|| f.organization_id.as_ref().and_then(|id| id.as_text()))
            .unwrap_or_else(|| DEFAULT_ORGANIZER.to_string()),
        source_tag: non_blank(f.source.as_deref()).unwrap_or_else(|| "unknown".to_string()),
        icon,
        tags,
        url: non_blank(f.url.as_deref()),
        featured: index < FEATURED_COUNT,
        id,
        title,
    }
}

fn first_text<const N: usize>(candidates: [Option<&TextField>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find_map(TextField::text)
        .map(String::from)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn resolve_start(f: &RawEventFields) -> Option<DateTime<Utc>> {
    f.start
        .iter()
        .flat_map(TimeField::candidates)
        .chain(f.start_time.as_deref())
        .chain(f.date.as_deref())
        .find_map(parse_instant)
}

/// Parses an upstream timestamp.
///
/// Offset-bearing RFC 3339 values keep their instant. Naive datetimes and bare
/// dates carry no zone and are read as UTC.
#[must_use]
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn resolve_location(f: &RawEventFields) -> String {
    let (venue_name, venue_plain, address) = match f.venue.as_ref() {
        Some(VenueField::Detailed(v)) => (v.name.as_deref(), None, v.address.as_ref()),
        Some(VenueField::Name(name)) => (None, Some(name.as_str()), None),
        None => (None, None, None),
    };

    let named = [
        venue_name,
        f.location.as_deref(),
        venue_plain,
        address.and_then(|a| a.localized_address_display.as_deref()),
    ]
    .into_iter()
    .find_map(non_blank);
    if let Some(name) = named {
        return name;
    }

    let city = non_blank(f.city.as_deref()).or_else(|| non_blank(address.and_then(|a| a.city.as_deref())));
    let country =
        non_blank(f.country.as_deref()).or_else(|| non_blank(address.and_then(|a| a.country.as_deref())));
    let place: Vec<String> = city.into_iter().chain(country).collect();
    if place.is_empty() {
        LOCATION_TBA.to_string()
    } else {
        place.join(", ")
    }
}

fn resolve_position(f: &RawEventFields) -> Option<Coordinates> {
    let from_pair = |lat: Option<NumberField>, lon: Option<NumberField>| {
        lat.zip(lon)
            .map(|(lat, lon)| Coordinates::new(lat.value(), lon.value()))
            .filter(Coordinates::is_valid)
    };

    from_pair(f.latitude, f.longitude).or_else(|| match f.venue.as_ref() {
        Some(VenueField::Detailed(v)) => from_pair(v.latitude, v.longitude),
        _ => None,
    })
}

fn resolve_price(f: &RawEventFields) -> String {
    if f.is_free == Some(true) {
        return FREE.to_string();
    }
    let label = [f.price.as_ref(), f.ticket_price.as_ref()]
        .into_iter()
        .flatten()
        .find_map(|p| p.label());
    match label {
        Some(label) if label.eq_ignore_ascii_case(FREE) => FREE.to_string(),
        Some(label) => label,
        None => SEE_SITE.to_string(),
    }
}

/// Upstream rating, or a deterministic stand-in in `[4.0, 4.9]` derived from
/// the record's position. Always rounded to one decimal.
fn resolve_rating(rating: Option<f64>, index: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let derived = 4.0 + (index % 10) as f64 / 10.0;
    let value = rating.filter(|r| r.is_finite() && *r > 0.0).unwrap_or(derived);
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn norm(value: Value, index: usize) -> NormalizedEvent {
        normalize(&RawEventRecord::from_value(value), index, &SportCatalog::default())
            .expect("object records always normalize")
    }

    #[test]
    fn eventbrite_shape() {
        let event = norm(
            json!({
                "id": 9001,
                "name": { "text": "Harbor 10K" },
                "start": { "local": "2025-10-04T08:00:00" },
                "venue": { "name": "Pier 17", "latitude": "40.7058", "longitude": "-74.0019" },
                "is_free": true,
                "capacity": 300
            }),
            5,
        );
        assert_eq!(event.id, "9001");
        assert_eq!(event.title, "Harbor 10K");
        assert_eq!(event.location, "Pier 17");
        assert_eq!(event.price, "Free");
        assert_eq!(event.max_participants, Some(300));
        assert_eq!(event.position(), Some(Coordinates::new(40.7058, -74.0019)));
        assert_eq!(event.start.map(|s| s.to_rfc3339()), Some("2025-10-04T08:00:00+00:00".into()));
        assert!(!event.featured);
    }

    #[test]
    fn aggregated_shape_uses_city_and_country() {
        let event = norm(
            json!({
                "id": "agg-1",
                "source": "google",
                "name": "Night Ride",
                "start": "2025-11-01T19:30:00-04:00",
                "city": "Brooklyn",
                "country": "US",
                "latitude": 40.68,
                "longitude": -73.94,
                "price": "$15"
            }),
            0,
        );
        assert_eq!(event.location, "Brooklyn, US");
        assert_eq!(event.source_tag, "google");
        assert_eq!(event.price, "$15");
        assert_eq!(event.start.map(|s| s.to_rfc3339()), Some("2025-11-01T23:30:00+00:00".into()));
        assert!(event.featured);
    }

    #[test]
    fn empty_record_gets_placeholders() {
        let event = norm(json!({}), 7);
        assert_eq!(event.id, "7-Untitled Event");
        assert_eq!(event.title, UNTITLED_EVENT);
        assert_eq!(event.location, LOCATION_TBA);
        assert_eq!(event.price, SEE_SITE);
        assert_eq!(event.difficulty, ALL_LEVELS);
        assert_eq!(event.organizer, DEFAULT_ORGANIZER);
        assert_eq!(event.rating, 4.7);
        assert_eq!(event.participants, 0);
        assert!(event.start.is_none());
    }

    #[test]
    fn unparseable_start_and_out_of_range_coordinates_are_absent() {
        let event = norm(
            json!({ "title": "X", "start_time": "next tuesday", "latitude": 123.0, "longitude": 10.0 }),
            0,
        );
        assert!(event.start.is_none());
        assert!(event.position().is_none());
    }

    #[test]
    fn zero_counts_fall_through_to_later_alternatives() {
        let event = norm(json!({ "participants": 0, "attending_count": 12 }), 0);
        assert_eq!(event.participants, 12);
    }

    #[test]
    fn batch_drops_malformed_and_duplicate_records() {
        let records: Vec<RawEventRecord> = [
            json!({ "id": "a", "title": "One" }),
            json!("not an event"),
            json!({ "id": "a", "title": "One again" }),
            json!({ "event_id": "b" }),
        ]
        .into_iter()
        .map(RawEventRecord::from_value)
        .collect();

        let batch = normalize_batch(&records, &SportCatalog::default());
        assert_eq!(batch.dropped, 1);
        assert_eq!(batch.duplicates, 1);
        let ids: Vec<&str> = batch.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(batch.events[1].rating, 4.3);
    }

    #[test]
    fn record_with_both_capacity_spellings_is_kept() {
        let records = [RawEventRecord::from_value(json!({
            "id": "keep-me",
            "title": "Harbor 10K",
            "max_participants": 100,
            "maxParticipants": 100
        }))];

        let batch = normalize_batch(&records, &SportCatalog::default());
        assert_eq!(batch.dropped, 0);
        assert_eq!(batch.events.len(), 1);
        assert_eq!(batch.events[0].id, "keep-me");
        assert_eq!(batch.events[0].max_participants, Some(100));
    }

    #[test]
    fn camel_case_capacity_is_used_when_alone() {
        let event = norm(json!({ "id": "c", "maxParticipants": 40 }), 0);
        assert_eq!(event.max_participants, Some(40));
    }

    #[test]
    fn upstream_rating_is_rounded() {
        assert_eq!(resolve_rating(Some(4.26), 0), 4.3);
        assert_eq!(resolve_rating(Some(f64::NAN), 2), 4.2);
    }
}
