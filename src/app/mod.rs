//! Application layer coordinating state, events and actions.
//!
//! ```text
//! User intent → Event → handle_event → state mutation → Vec<Action> → Session
//!                  ↑                                                     │
//!                  └──── fetch outcomes, location fixes, settled bounds ─┘
//! ```
//!
//! - [`actions`]: side effects emitted by the handler
//! - [`handler`]: the state machine
//! - [`modes`]: view and dispatch-reason types
//! - [`session`]: runtime that executes actions and owns the background tasks
//! - [`state`]: per-view query stores, results and view model computation
//!
//! ```rust
//! use std::sync::Arc;
//! use event_compass::app::{handle_event, AppState, Event};
//! use event_compass::domain::{Coordinates, SportCatalog};
//!
//! let mut state = AppState::new(Arc::new(SportCatalog::default()), Coordinates::new(40.7128, -74.0060));
//! let (render, actions) = handle_event(&mut state, &Event::UrlLoaded { query: "q=yoga".into() })?;
//! assert!(render);
//! assert!(!actions.is_empty());
//! # Ok::<(), event_compass::DiscoveryError>(())
//! ```

pub mod actions;
pub mod handler;
pub mod modes;
pub mod session;
pub mod state;

pub use actions::Action;
pub use handler::{handle_event, Event};
pub use modes::{Trigger, ViewKind};
pub use session::Session;
pub use state::{AppState, QueryStore, ViewState};
