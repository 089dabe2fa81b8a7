//! Map viewport tracking.
//!
//! Raw bounding-box changes from the map surface are fed into a
//! [`ViewportHandle`]; the tracker task collapses each burst into a single
//! "settled" bounding box once the debounce window passes quietly.

pub mod tracker;

pub use tracker::{ViewportHandle, ViewportTracker, DEFAULT_DEBOUNCE_WINDOW};
