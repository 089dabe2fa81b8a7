//! Side effects requested by the event handler.
//!
//! The handler never performs I/O. It returns `Vec<Action>` and the
//! [`Session`](super::Session) executes the actions in order.

use crate::fetch::FetchRequest;

/// Commands executed by the session runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Hands a request to the fetch orchestrator, which may suppress it.
    Fetch(FetchRequest),

    /// Replaces the address bar query without adding a history entry.
    ReplaceUrl(String),

    /// Starts the one-shot device location lookup.
    ResolveLocation,
}
