//! Runtime shim that owns the asynchronous collaborators and feeds their
//! results back into [`handle_event`].
//!
//! ```text
//! host input ─▶ Session::send ─▶ handle_event ─▶ Vec<Action> ─▶ execute
//!                    ▲                                            │
//!                    └── Session::step ◀── outcomes / fixes / settled bounds
//! ```
//!
//! Side effects never run inside the handler. Fetches go through the
//! [`FetchOrchestrator`], the location lookup runs on a spawned task, and the
//! viewport tracker debounces map movement on its own task. Every task stops
//! when the session's cancellation token fires.

use super::handler::{handle_event, Event};
use super::modes::ViewKind;
use super::{Action, AppState};
use crate::domain::error::Result;
use crate::domain::BoundingBox;
use crate::fetch::{EventService, FetchOrchestrator, FetchOutcome};
use crate::location::{LocationFix, LocationResolver, PositionSource};
use crate::navigation::AddressBar;
use crate::ui::ViewModel;
use crate::viewport::{ViewportHandle, ViewportTracker};
use crate::Config;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

enum Wake {
    Outcome(FetchOutcome),
    Location(LocationFix),
    Viewport(BoundingBox),
    Stopped,
}

/// One discovery session: state plus the tasks that serve it.
///
/// Must be created inside a Tokio runtime.
pub struct Session {
    state: AppState,
    orchestrator: FetchOrchestrator,
    outcomes: mpsc::UnboundedReceiver<FetchOutcome>,
    address_bar: Box<dyn AddressBar>,
    resolver: Arc<LocationResolver>,
    fixes_tx: mpsc::UnboundedSender<LocationFix>,
    fixes: mpsc::UnboundedReceiver<LocationFix>,
    viewport: ViewportHandle,
    settled: mpsc::UnboundedReceiver<BoundingBox>,
    cancel: CancellationToken,
}

impl Session {
    #[must_use]
    pub fn new(
        config: &Config,
        service: Arc<dyn EventService>,
        positions: Arc<dyn PositionSource>,
        address_bar: Box<dyn AddressBar>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (orchestrator, outcomes) = FetchOrchestrator::new(service, config.request_timeout());
        let resolver = Arc::new(LocationResolver::new(
            positions,
            config.location_timeout(),
            config.fallback_coordinates(),
        ));
        let (fixes_tx, fixes) = mpsc::unbounded_channel();
        let (viewport, settled) = ViewportTracker::spawn(config.viewport_debounce(), cancel.child_token());

        Self {
            state: crate::initialize(config),
            orchestrator,
            outcomes,
            address_bar,
            resolver,
            fixes_tx,
            fixes,
            viewport,
            settled,
            cancel,
        }
    }

    /// Hydrates the list view from the address bar and issues the first
    /// requests.
    ///
    /// # Errors
    ///
    /// Propagates handler errors.
    pub fn start(&mut self) -> Result<bool> {
        let query = self.address_bar.current_query();
        self.send(Event::UrlLoaded { query })
    }

    /// Runs `event` and every follow-up event its actions produce.
    /// Returns whether any of them requires re-rendering.
    ///
    /// # Errors
    ///
    /// Propagates handler errors.
    pub fn send(&mut self, event: Event) -> Result<bool> {
        let mut queue = VecDeque::from([event]);
        let mut render = false;

        while let Some(event) = queue.pop_front() {
            let (changed, actions) = handle_event(&mut self.state, &event)?;
            render |= changed;
            for action in actions {
                if let Some(follow_up) = self.execute(action) {
                    queue.push_back(follow_up);
                }
            }
        }
        Ok(render)
    }

    fn execute(&mut self, action: Action) -> Option<Event> {
        match action {
            Action::ReplaceUrl(query) => {
                self.address_bar.replace_query(&query);
                None
            }
            Action::Fetch(request) => {
                let view = request.view;
                self.orchestrator.dispatch(request);
                Some(Event::LoadingChanged {
                    view,
                    loading: self.orchestrator.is_loading(view),
                })
            }
            Action::ResolveLocation => {
                let resolver = Arc::clone(&self.resolver);
                let fixes = self.fixes_tx.clone();
                let cancel = self.cancel.clone();
                tokio::spawn(
                    async move {
                        tokio::select! {
                            () = cancel.cancelled() => {}
                            fix = resolver.resolve() => {
                                let _ = fixes.send(fix);
                            }
                        }
                    }
                    .instrument(tracing::debug_span!("location_lookup")),
                );
                None
            }
        }
    }

    /// Reports a raw map movement. Settled bounds arrive through [`step`](Self::step).
    pub fn move_viewport(&self, bbox: BoundingBox) -> bool {
        self.viewport.notify(bbox)
    }

    /// Waits for the next asynchronous notification and handles it.
    /// Returns whether the views need re-rendering.
    ///
    /// Stale fetch outcomes are discarded here and never reach the state.
    ///
    /// # Errors
    ///
    /// Propagates handler errors.
    pub async fn step(&mut self) -> Result<bool> {
        let wake = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Wake::Stopped,
            Some(outcome) = self.outcomes.recv() => Wake::Outcome(outcome),
            Some(fix) = self.fixes.recv() => Wake::Location(fix),
            Some(bbox) = self.settled.recv() => Wake::Viewport(bbox),
        };

        match wake {
            Wake::Stopped => Ok(false),
            Wake::Outcome(outcome) => {
                let view = outcome.view;
                match self.orchestrator.reconcile(outcome) {
                    Some(commit) => self.send(Event::FetchCommitted(commit)),
                    None => self.send(Event::LoadingChanged {
                        view,
                        loading: self.orchestrator.is_loading(view),
                    }),
                }
            }
            Wake::Location(fix) => self.send(Event::LocationResolved(fix)),
            Wake::Viewport(bbox) => self.send(Event::ViewportSettled(bbox)),
        }
    }

    /// Steps until `done` holds or the session is cancelled.
    ///
    /// # Errors
    ///
    /// Propagates handler errors.
    pub async fn step_until<F>(&mut self, mut done: F) -> Result<()>
    where
        F: FnMut(&AppState) -> bool,
    {
        while !done(&self.state) && !self.cancel.is_cancelled() {
            self.step().await?;
        }
        Ok(())
    }

    /// Steps until the session is cancelled.
    ///
    /// # Errors
    ///
    /// Propagates handler errors.
    pub async fn run(&mut self) -> Result<()> {
        while !self.cancel.is_cancelled() {
            self.step().await?;
        }
        Ok(())
    }

    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    #[must_use]
    pub fn viewmodel(&self, view: ViewKind) -> ViewModel {
        self.state.compute_viewmodel(view)
    }

    #[must_use]
    pub fn address_bar(&self) -> &dyn AddressBar {
        self.address_bar.as_ref()
    }

    #[must_use]
    pub const fn orchestrator(&self) -> &FetchOrchestrator {
        &self.orchestrator
    }

    /// Token that stops every task of this session when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn shutdown(&self) {
        tracing::debug!("session shutting down");
        self.cancel.cancel();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
