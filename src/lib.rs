//! Event Compass: the client-side engine behind a sports event discovery UI.
//!
//! It owns everything between user intent and rendered results:
//! - per-view query state with no-op suppression
//! - the shareable URL query string of the list view
//! - debounced map viewport fetching
//! - generation-gated requests, so stale responses never reach the screen
//! - best-effort device location with a fixed fallback
//! - normalization of heterogeneous upstream records
//! - client-side sorting, filtering, favorites and selection

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Host (UI shell, address bar, map surface)          │
//! └─────────────────────────────────────────────────────┘
//!                        │ Event / AddressBar / PositionSource
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │
//! │  - QueryStore per view                              │
//! │  - handle_event → Vec<Action>                       │
//! │  - Session runtime, view model computation          │
//! └─────────────────────────────────────────────────────┘
//!     │               │                │             │
//! ┌──────────┐  ┌────────────┐  ┌─────────────┐  ┌──────────┐
//! │ fetch/   │  │ viewport/  │  │ location/   │  │ navigation/
//! │ orchestr.│  │ debounce   │  │ resolver    │  │ URL codec│
//! └──────────┘  └────────────┘  └─────────────┘  └──────────┘
//!     │
//! ┌─────────────────────────────────────────────────────┐
//! │  normalize/ → domain/ (events, queries, catalog)    │
//! │  ui/ (sorting, markers, view models)                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use event_compass::app::{Event, Session, ViewKind};
//! use event_compass::fetch::HttpEventService;
//! use event_compass::location::UnavailablePositionSource;
//! use event_compass::navigation::InMemoryAddressBar;
//! use event_compass::Config;
//!
//! # async fn demo() -> event_compass::Result<()> {
//! let config = Config::from_file("event-compass.toml")?;
//! event_compass::observability::init_tracing(&config);
//!
//! let service = Arc::new(HttpEventService::new(&config.api_base_url)?);
//! let mut session = Session::new(
//!     &config,
//!     service,
//!     Arc::new(UnavailablePositionSource),
//!     Box::new(InMemoryAddressBar::new("?q=marathon&cat=running")),
//! );
//! session.start()?;
//! session.step_until(|state| !state.list.loading).await?;
//!
//! session.send(Event::SetSearchText { view: ViewKind::ListSearch, text: "trail".into() })?;
//! session.send(Event::SubmitSearch { view: ViewKind::ListSearch })?;
//! let view = session.viewmodel(ViewKind::ListSearch);
//! println!("{}", view.header.title);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod domain;
pub mod fetch;
pub mod location;
pub mod navigation;
pub mod normalize;
pub mod ui;
pub mod viewport;

pub mod observability;

pub use app::{handle_event, Action, AppState, Event, Session, ViewKind};
pub use domain::{DiscoveryError, NormalizedEvent, QueryDescriptor, Result, SportCatalog};
pub use ui::ViewModel;

use domain::Coordinates;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Engine configuration.
///
/// Loaded from a TOML file, from a host-provided key/value map, or left at
/// its defaults. Missing keys take their default value.
///
/// ```toml
/// api_base_url = "https://events.example.com/api/v1"
/// request_timeout_ms = 15000
/// location_timeout_ms = 8000
/// viewport_debounce_ms = 150
/// fallback_lat = 40.7128
/// fallback_lon = -74.0060
/// trace_level = "debug"
/// trace_file = "/var/log/event-compass/traces.jsonl"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the aggregation service.
    pub api_base_url: String,

    /// Per-request timeout. Default: 15000
    pub request_timeout_ms: u64,

    /// Upper bound on the device location lookup. Default: 8000
    pub location_timeout_ms: u64,

    /// Quiet period before a map movement counts as settled. Default: 150
    pub viewport_debounce_ms: u64,

    /// Map center used while the device location is unknown.
    pub fallback_lat: f64,
    pub fallback_lon: f64,

    /// Filter directive for the subscriber, e.g. `info` or
    /// `event_compass=debug`. `RUST_LOG` takes precedence.
    pub trace_level: Option<String>,

    /// When set, spans are also exported to this file as OTLP JSON lines.
    pub trace_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout_ms: 15_000,
            location_timeout_ms: 8_000,
            viewport_debounce_ms: 150,
            fallback_lat: location::FALLBACK_COORDINATES.lat,
            fallback_lon: location::FALLBACK_COORDINATES.lon,
            trace_level: None,
            trace_file: None,
        }
    }
}

impl Config {
    /// Parses configuration from a host-provided key/value map.
    ///
    /// Values that fail to parse fall back to their defaults.
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use event_compass::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("request_timeout_ms".to_string(), "5000".to_string());
    /// map.insert("viewport_debounce_ms".to_string(), "soon".to_string());
    ///
    /// let config = Config::from_settings(&map);
    /// assert_eq!(config.request_timeout_ms, 5000);
    /// assert_eq!(config.viewport_debounce_ms, 150);
    /// ```
    #[must_use]
    pub fn from_settings(settings: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str, default: u64| {
            settings
                .get(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };
        let degrees = |key: &str, default: f64| {
            settings
                .get(key)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite())
                .unwrap_or(default)
        };
        let text = |key: &str| {
            settings
                .get(key)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        let mut config = Self {
            api_base_url: text("api_base_url").unwrap_or(defaults.api_base_url),
            request_timeout_ms: number("request_timeout_ms", defaults.request_timeout_ms),
            location_timeout_ms: number("location_timeout_ms", defaults.location_timeout_ms),
            viewport_debounce_ms: number("viewport_debounce_ms", defaults.viewport_debounce_ms),
            fallback_lat: degrees("fallback_lat", defaults.fallback_lat),
            fallback_lon: degrees("fallback_lon", defaults.fallback_lon),
            trace_level: text("trace_level"),
            trace_file: text("trace_file").map(PathBuf::from),
        };
        if !config.fallback_coordinates().is_valid() {
            tracing::debug!(
                lat = config.fallback_lat,
                lon = config.fallback_lon,
                "fallback coordinates out of range, using default"
            );
            config.fallback_lat = defaults.fallback_lat;
            config.fallback_lon = defaults.fallback_lon;
        }
        config
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Config`] for malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Io`] if the file cannot be read, or
    /// [`DiscoveryError::Config`] if its contents are invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Self::from_toml_str(&source)
    }

    /// Checks the values a session cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Config`] naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_base_url)?;
        for (key, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("location_timeout_ms", self.location_timeout_ms),
            ("viewport_debounce_ms", self.viewport_debounce_ms),
        ] {
            if value == 0 {
                return Err(DiscoveryError::Config(format!("{key} must be greater than zero")));
            }
        }
        if !self.fallback_coordinates().is_valid() {
            return Err(DiscoveryError::Config(format!(
                "fallback coordinates ({}, {}) are out of range",
                self.fallback_lat, self.fallback_lon
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub const fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    #[must_use]
    pub const fn viewport_debounce(&self) -> Duration {
        Duration::from_millis(self.viewport_debounce_ms)
    }

    #[must_use]
    pub const fn fallback_coordinates(&self) -> Coordinates {
        Coordinates::new(self.fallback_lat, self.fallback_lon)
    }
}

/// Builds the initial application state for `config`.
///
/// Both views start empty with default descriptors. The list view is
/// hydrated from the address bar by [`Event::UrlLoaded`].
#[must_use]
pub fn initialize(config: &Config) -> AppState {
    tracing::debug!(api_base_url = %config.api_base_url, "initializing discovery state");
    AppState::new(Arc::new(SportCatalog::default()), config.fallback_coordinates())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_fills_missing_keys_with_defaults() {
        let config = Config::from_toml_str("request_timeout_ms = 2000\ntrace_level = \"debug\"\n")
            .expect("valid config");
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
        assert_eq!(config.viewport_debounce(), Duration::from_millis(150));
        assert_eq!(config.trace_level.as_deref(), Some("debug"));
        assert_eq!(config.fallback_coordinates(), location::FALLBACK_COORDINATES);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_toml_str("viewport_debounce_ms = 0"),
            Err(DiscoveryError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("fallback_lat = 123.0"),
            Err(DiscoveryError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("api_base_url = \"not a url\""),
            Err(DiscoveryError::Config(_))
        ));
        assert!(matches!(Config::from_toml_str("request_timeout_ms = \"fast\""), Err(DiscoveryError::Config(_))));
    }

    #[test]
    fn settings_map_is_lenient() {
        let settings = BTreeMap::from([
            ("fallback_lat".to_string(), "95".to_string()),
            ("trace_file".to_string(), "/tmp/traces.jsonl".to_string()),
            ("trace_level".to_string(), "  ".to_string()),
        ]);
        let config = Config::from_settings(&settings);
        assert_eq!(config.fallback_coordinates(), location::FALLBACK_COORDINATES);
        assert_eq!(config.trace_file, Some(PathBuf::from("/tmp/traces.jsonl")));
        assert_eq!(config.trace_level, None);
    }
}
