//! Presentation layer: the list/map sync logic and the view models it feeds.
//!
//! ```text
//! AppState ──compute_viewmodel(view)──▶ ViewModel { items, markers, notices }
//!               │
//!               └── presentation::{visible_events, markers}
//! ```
//!
//! # Modules
//!
//! - [`presentation`]: Sorting, client-side filtering, markers, favorites
//! - [`viewmodel`]: Display-ready view model types and formatting

pub mod presentation;
pub mod viewmodel;

pub use presentation::{markers, sort_events, visible_events, FavoriteSet, Marker};
pub use viewmodel::{
    EmptyState, ErrorNotice, EventItem, HeaderInfo, MapCenter, SearchBarInfo, ViewModel,
};
