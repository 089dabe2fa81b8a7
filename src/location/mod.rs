//! Best-effort device location.
//!
//! Location is advisory: it ranks "nearby" searches and centers the map. The
//! resolver therefore never fails. Denial, errors and timeouts all degrade to
//! a fixed fallback coordinate flagged as inaccurate.

pub mod resolver;

pub use resolver::{
    LocationFix, LocationResolver, PositionSource, UnavailablePositionSource,
    DEFAULT_LOCATION_TIMEOUT, FALLBACK_COORDINATES,
};
