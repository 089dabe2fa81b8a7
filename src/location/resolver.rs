//! One-shot location resolution with timeout and fallback.

use crate::domain::error::{DiscoveryError, Result};
use crate::domain::Coordinates;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::Instrument;

/// Default upper bound on a position request.
pub const DEFAULT_LOCATION_TIMEOUT: Duration = Duration::from_secs(8);

/// Coordinate used when the device location is unavailable (New York City).
pub const FALLBACK_COORDINATES: Coordinates = Coordinates::new(40.7128, -74.0060);

/// Platform positioning, such as a browser geolocation API or a GPS daemon.
#[async_trait]
pub trait PositionSource: Send + Sync {
    /// Requests the current device position.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Location`] when permission is denied or no
    /// position can be obtained.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Position source for hosts that offer no positioning at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailablePositionSource;

#[async_trait]
impl PositionSource for UnavailablePositionSource {
    async fn current_position(&self) -> Result<Coordinates> {
        Err(DiscoveryError::Location("positioning is unavailable".to_string()))
    }
}

/// Outcome of a location resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// `false` when `coordinates` is the fallback rather than a device fix.
    pub accurate: bool,
}

impl LocationFix {
    #[must_use]
    pub const fn accurate(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            accurate: true,
        }
    }

    #[must_use]
    pub const fn fallback(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            accurate: false,
        }
    }
}

/// Resolves the device location at most once per resolver lifetime.
///
/// Concurrent callers share a single underlying request; every caller after
/// the first receives the memoized fix, including a fallback one. There is no
/// automatic retry.
pub struct LocationResolver {
    source: Arc<dyn PositionSource>,
    timeout: Duration,
    fallback: Coordinates,
    resolved: OnceCell<LocationFix>,
}

impl LocationResolver {
    #[must_use]
    pub fn new(source: Arc<dyn PositionSource>, timeout: Duration, fallback: Coordinates) -> Self {
        Self {
            source,
            timeout,
            fallback,
            resolved: OnceCell::new(),
        }
    }

    /// Returns the device fix, or the fallback coordinate flagged inaccurate.
    pub async fn resolve(&self) -> LocationFix {
        *self.resolved.get_or_init(|| self.request()).await
    }

    /// The memoized fix, if resolution already completed.
    #[must_use]
    pub fn resolved(&self) -> Option<LocationFix> {
        self.resolved.get().copied()
    }

    async fn request(&self) -> LocationFix {
        let span = tracing::debug_span!("resolve_location", timeout_ms = self.timeout.as_millis());

        let attempt = tokio::time::timeout(self.timeout, self.source.current_position());
        match attempt.instrument(span.clone()).await {
            Ok(Ok(coordinates)) if coordinates.is_valid() => {
                tracing::debug!(parent: &span, lat = coordinates.lat, lon = coordinates.lon, "device location resolved");
                LocationFix::accurate(coordinates)
            }
            Ok(Ok(coordinates)) => {
                tracing::debug!(parent: &span, lat = coordinates.lat, lon = coordinates.lon, "device reported out-of-range position");
                LocationFix::fallback(self.fallback)
            }
            Ok(Err(e)) => {
                tracing::debug!(parent: &span, error = %e, "device location unavailable, using fallback");
                LocationFix::fallback(self.fallback)
            }
            Err(_) => {
                tracing::debug!(parent: &span, "device location timed out, using fallback");
                LocationFix::fallback(self.fallback)
            }
        }
    }
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("timeout", &self.timeout)
            .field("fallback", &self.fallback)
            .field("resolved", &self.resolved.get())
            .finish_non_exhaustive()
    }
}
