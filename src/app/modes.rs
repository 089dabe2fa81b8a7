//! View and dispatch-reason types shared by the handler and the orchestrator.
//!
//! The engine drives two independent views. Each holds its own query, result
//! set and request generation, so a slow map response can never land in the
//! list and vice versa.

use std::fmt;

/// Which logical view a query, request or result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// Free-text and filter search, mirrored into the shareable link.
    ListSearch,
    /// Bounding-box search driven by the map viewport.
    MapViewport,
}

impl ViewKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ListSearch => "list",
            Self::MapViewport => "map",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a request was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Seeded from the link on load.
    Initial,
    /// Explicit search submission. Never debounced.
    Submit,
    /// Category or location mode changed.
    FilterChange,
    /// The map viewport settled.
    Viewport,
    /// A device location arrived for a nearby search.
    Location,
    /// User asked to retry after a failure. Re-sends the query even when it
    /// matches the one on screen.
    Retry,
}

impl Trigger {
    #[must_use]
    pub const fn refetches_displayed(self) -> bool {
        matches!(self, Self::Retry)
    }
}
