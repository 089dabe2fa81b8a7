//! Domain layer: query model, event model, sport catalog and errors.
//!
//! These types carry no I/O and no async machinery. Everything above this
//! layer (state store, orchestrator, presentation) is expressed in terms of
//! them.
//!
//! # Organization
//!
//! - [`error`]: Error type and result alias
//! - [`query`]: `QueryDescriptor` and its filter dimensions
//! - [`event`]: `NormalizedEvent` display record
//! - [`catalog`]: Immutable sport/category lookup tables

pub mod catalog;
pub mod error;
pub mod event;
pub mod query;

pub use catalog::SportCatalog;
pub use error::{DiscoveryError, Result};
pub use event::NormalizedEvent;
pub use query::{
    BoundingBox, Category, Coordinates, FetchKey, LocationMode, QueryDescriptor, SortKey,
    ViewMode,
};
