//! Request and outcome types exchanged with the fetch orchestrator.

use super::client::EventPage;
use crate::app::modes::{Trigger, ViewKind};
use crate::domain::error::DiscoveryError;
use crate::domain::{BoundingBox, Coordinates, QueryDescriptor, SportCatalog};
use std::fmt;

/// Monotonic request token, minted per view on every dispatch.
///
/// A response is committed only while its generation is still the latest
/// minted for its view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which service operation a request calls, with its resolved arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    Search {
        query: String,
        near: Option<Coordinates>,
    },
    Viewport {
        query: String,
        bbox: Option<BoundingBox>,
    },
}

/// A request to (re)load one view for a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub view: ViewKind,
    pub descriptor: QueryDescriptor,
    pub target: FetchTarget,
    pub trigger: Trigger,
}

impl FetchRequest {
    /// Builds the request a view issues for `descriptor`.
    ///
    /// The list view composes the category's base query with the search text
    /// and ranks around `coordinates`. The map view sends the bare search text
    /// and its bounding box.
    #[must_use]
    pub fn for_view(
        view: ViewKind,
        descriptor: QueryDescriptor,
        trigger: Trigger,
        catalog: &SportCatalog,
    ) -> Self {
        let target = match view {
            ViewKind::ListSearch => FetchTarget::Search {
                query: catalog.compose_query(descriptor.category, &descriptor.search_text),
                near: descriptor.coordinates,
            },
            ViewKind::MapViewport => FetchTarget::Viewport {
                query: descriptor.search_text.trim().to_string(),
                bbox: descriptor.bounding_box,
            },
        };
        Self {
            view,
            descriptor,
            target,
            trigger,
        }
    }
}

/// What a spawned request task reports back, stale or not.
#[derive(Debug)]
pub struct FetchOutcome {
    pub view: ViewKind,
    pub generation: Generation,
    pub descriptor: QueryDescriptor,
    pub result: Result<EventPage, DiscoveryError>,
}

/// Presentation-facing summary of a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub message: String,
    pub retryable: bool,
}

impl From<&DiscoveryError> for FetchFailure {
    fn from(error: &DiscoveryError) -> Self {
        Self {
            message: error.user_message(),
            retryable: error.is_retryable(),
        }
    }
}

/// An authoritative outcome, cleared for the view's state.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub view: ViewKind,
    pub generation: Generation,
    pub descriptor: QueryDescriptor,
    pub result: Result<EventPage, FetchFailure>,
}
