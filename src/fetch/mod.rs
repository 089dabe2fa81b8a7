//! Event fetching: service boundary, request messages and orchestration.
//!
//! # Architecture
//!
//! ```text
//! handler ──Action::Fetch──▶ FetchOrchestrator::dispatch ──spawn──▶ EventService
//!    ▲                                                                  │
//!    └──Event::FetchCommitted── reconcile (generation check) ◀─FetchOutcome
//! ```
//!
//! # Modules
//!
//! - [`client`]: `EventService` trait and the `reqwest` implementation
//! - [`messages`]: Generations, requests, outcomes and commits
//! - [`orchestrator`]: No-op suppression, timeouts and stale-response discard

pub mod client;
pub mod messages;
pub mod orchestrator;

pub use client::{Anonymous, CredentialProvider, EventPage, EventService, HttpEventService};
pub use messages::{Commit, FetchFailure, FetchOutcome, FetchRequest, FetchTarget, Generation};
pub use orchestrator::{FetchOrchestrator, DEFAULT_REQUEST_TIMEOUT};
