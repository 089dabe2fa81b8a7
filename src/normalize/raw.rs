//! Upstream event payload model.
//!
//! The aggregation service merges several providers, so one logical field can
//! arrive under different names and shapes (`name.text` vs `title`,
//! `start.local` vs `start_time`, `venue.name` vs `location`). Each such field
//! is modeled as an untagged enum, and every field is decoded leniently: a
//! value of an unexpected type reads as absent instead of failing the whole
//! record.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// One element of a service response's `events` array.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEventRecord {
    /// A JSON object, decoded field by field.
    Record(Box<RawEventFields>),
    /// Anything that is not a JSON object. Cannot be normalized.
    Malformed(Value),
}

impl RawEventRecord {
    /// Decodes a record from an already-parsed JSON value.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => match serde_json::from_value::<RawEventFields>(Value::Object(map.clone())) {
                Ok(fields) => Self::Record(Box::new(fields)),
                Err(e) => {
                    tracing::debug!(error = %e, "record object failed to decode, keeping identity fields");
                    Self::Record(Box::new(RawEventFields::identity_only(&map)))
                }
            },
            other => Self::Malformed(other),
        }
    }
}

impl RawEventFields {
    /// The identifier and title fields of `map`, everything else absent.
    fn identity_only(map: &Map<String, Value>) -> Self {
        Self {
            id: field(map, "id"),
            event_id: field(map, "event_id"),
            title: field(map, "title"),
            name: field(map, "name"),
            ..Self::default()
        }
    }
}

fn field<T: DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    map.get(key).cloned().and_then(|value| serde_json::from_value(value).ok())
}

impl<'de> Deserialize<'de> for RawEventRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

impl From<Value> for RawEventRecord {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

/// String or number identifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum IdField {
    Text(String),
    Number(serde_json::Number),
}

impl IdField {
    /// The identifier as text, `None` when blank.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) if s.trim().is_empty() => None,
            Self::Text(s) => Some(s.trim().to_string()),
            Self::Number(n) => Some(n.to_string()),
        }
    }
}

/// Plain text, or Eventbrite-style `{ "text": ..., "html": ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Plain(String),
    Rich {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl TextField {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        let raw = match self {
            Self::Plain(s) => Some(s.as_str()),
            Self::Rich { text, name } => text.as_deref().or(name.as_deref()),
        };
        raw.map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Start time as a bare string or as `{ "local": ..., "utc": ... }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TimeField {
    Plain(String),
    Zoned {
        #[serde(default)]
        local: Option<String>,
        #[serde(default)]
        utc: Option<String>,
    },
}

impl TimeField {
    /// Candidate timestamps, most preferred first.
    #[must_use]
    pub fn candidates(&self) -> Vec<&str> {
        match self {
            Self::Plain(s) => vec![s.as_str()],
            Self::Zoned { local, utc } => local
                .as_deref()
                .into_iter()
                .chain(utc.as_deref())
                .collect(),
        }
    }
}

/// Venue as a display string or as a nested object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VenueField {
    Name(String),
    Detailed(Box<VenueDetails>),
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct VenueDetails {
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub longitude: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub address: Option<AddressDetails>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AddressDetails {
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub localized_address_display: Option<String>,
}

/// A number that some providers send as a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumberField {
    Number(f64),
    #[serde(deserialize_with = "parse_numeric_string")]
    Text(f64),
}

impl NumberField {
    #[must_use]
    pub const fn value(self) -> f64 {
        match self {
            Self::Number(n) | Self::Text(n) => n,
        }
    }
}

/// Price as a label (`"$25"`, `"Free"`) or as a bare amount.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceField {
    Label(String),
    Amount(f64),
}

impl PriceField {
    #[must_use]
    pub fn label(&self) -> Option<String> {
        match self {
            Self::Label(s) if s.trim().is_empty() => None,
            Self::Label(s) => Some(s.trim().to_string()),
            Self::Amount(n) if *n <= 0.0 => Some(crate::domain::event::FREE.to_string()),
            Self::Amount(n) => Some(format!("${n:.2}").replace(".00", "")),
        }
    }
}

/// Every field name the known providers use, each optional.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct RawEventFields {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<IdField>,
    #[serde(default, deserialize_with = "lenient")]
    pub event_id: Option<IdField>,

    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<TextField>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<TextField>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<TextField>,

    #[serde(default, deserialize_with = "lenient")]
    pub start: Option<TimeField>,
    #[serde(default, deserialize_with = "lenient")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub date: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub venue: Option<VenueField>,
    #[serde(default, deserialize_with = "lenient")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<NumberField>,
    #[serde(default, deserialize_with = "lenient")]
    pub longitude: Option<NumberField>,

    #[serde(default, deserialize_with = "lenient")]
    pub is_free: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub price: Option<PriceField>,
    #[serde(default, deserialize_with = "lenient")]
    pub ticket_price: Option<PriceField>,

    #[serde(default, deserialize_with = "lenient")]
    pub participants: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub attending_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub yes_rsvp_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub capacity: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub max_participants: Option<u32>,
    #[serde(default, rename = "maxParticipants", deserialize_with = "lenient")]
    pub max_participants_camel: Option<u32>,

    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub organizer: Option<TextField>,
    #[serde(default, deserialize_with = "lenient")]
    pub organization_id: Option<IdField>,

    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Decodes a field as `T`, treating `null` or a mismatched type as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn parse_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.trim().parse::<f64>().map_err(serde::de::Error::custom)
}
