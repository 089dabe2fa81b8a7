//! Generation-gated request orchestration.
//!
//! The orchestrator owns every in-flight request. Dispatching mints a new
//! generation for the view, which makes any older request for that view
//! non-authoritative. Older requests are not aborted; their outcomes still
//! arrive and are dropped by [`FetchOrchestrator::reconcile`].

use super::client::EventService;
use super::messages::{Commit, FetchFailure, FetchOutcome, FetchRequest, FetchTarget, Generation};
use crate::app::modes::ViewKind;
use crate::domain::error::DiscoveryError;
use crate::domain::{FetchKey, QueryDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Default)]
struct ViewSlot {
    latest: Generation,
    /// Descriptor of the authoritative in-flight request.
    pending: Option<QueryDescriptor>,
    /// Descriptor that produced the result set currently on screen.
    displayed: Option<QueryDescriptor>,
}

impl ViewSlot {
    fn mint(&mut self) -> Generation {
        self.latest = self.latest.next();
        self.latest
    }

    fn matches_pending(&self, key: &FetchKey) -> bool {
        self.pending.as_ref().is_some_and(|d| &d.fetch_key() == key)
    }

    fn matches_displayed(&self, key: &FetchKey) -> bool {
        self.displayed.as_ref().is_some_and(|d| &d.fetch_key() == key)
    }
}

/// Issues requests and decides which outcomes reach view state.
///
/// Outcomes of spawned requests are delivered on the receiver returned by
/// [`FetchOrchestrator::new`] and must be passed back through
/// [`FetchOrchestrator::reconcile`].
pub struct FetchOrchestrator {
    service: Arc<dyn EventService>,
    timeout: Duration,
    outcomes: mpsc::UnboundedSender<FetchOutcome>,
    list: ViewSlot,
    map: ViewSlot,
}

impl FetchOrchestrator {
    #[must_use]
    pub fn new(
        service: Arc<dyn EventService>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<FetchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            service,
            timeout,
            outcomes: tx,
            list: ViewSlot::default(),
            map: ViewSlot::default(),
        };
        (orchestrator, rx)
    }

    const fn slot(&self, view: ViewKind) -> &ViewSlot {
        match view {
            ViewKind::ListSearch => &self.list,
            ViewKind::MapViewport => &self.map,
        }
    }

    fn slot_mut(&mut self, view: ViewKind) -> &mut ViewSlot {
        match view {
            ViewKind::ListSearch => &mut self.list,
            ViewKind::MapViewport => &mut self.map,
        }
    }

    /// Dispatches `request` unless it would be a no-op.
    ///
    /// A request is suppressed when its server-facing key equals the one in
    /// flight, or, with nothing in flight, the one on screen. When the key
    /// returns to what is on screen while another request is in flight, that
    /// request is superseded without a replacement. [`Trigger::Retry`]
    /// re-sends the on-screen query but never duplicates one in flight.
    ///
    /// Returns the minted generation, or `None` when nothing was sent.
    ///
    /// [`Trigger::Retry`]: crate::app::modes::Trigger::Retry
    ///
    /// # Panics
    ///
    /// Spawns onto the current Tokio runtime and panics outside one.
    pub fn dispatch(&mut self, request: FetchRequest) -> Option<Generation> {
        let FetchRequest {
            view,
            descriptor,
            target,
            trigger,
        } = request;
        let key = descriptor.fetch_key();
        let slot = self.slot_mut(view);

        if slot.matches_pending(&key) {
            tracing::debug!(%view, ?trigger, "same query already in flight, not dispatching");
            return None;
        }
        if !trigger.refetches_displayed() && slot.matches_displayed(&key) {
            if slot.pending.take().is_some() {
                let superseded = slot.mint();
                tracing::debug!(%view, generation = %superseded, "query reverted to displayed results, superseding in-flight request");
            } else {
                tracing::debug!(%view, ?trigger, "query unchanged since last result, not dispatching");
            }
            return None;
        }

        let generation = slot.mint();
        slot.pending = Some(descriptor.clone());
        tracing::debug!(%view, %generation, ?trigger, "dispatching request");

        let service = Arc::clone(&self.service);
        let outcomes = self.outcomes.clone();
        let timeout = self.timeout;
        let span = tracing::debug_span!("fetch", %view, generation = generation.value());

        tokio::spawn(
            async move {
                let call = async {
                    match &target {
                        FetchTarget::Search { query, near } => service.search_events(query, *near).await,
                        FetchTarget::Viewport { query, bbox } => {
                            service.search_events_in_viewport(query, *bbox).await
                        }
                    }
                };
                let result = tokio::time::timeout(timeout, call)
                    .await
                    .unwrap_or(Err(DiscoveryError::Timeout(timeout)));

                let outcome = FetchOutcome {
                    view,
                    generation,
                    descriptor,
                    result,
                };
                if outcomes.send(outcome).is_err() {
                    tracing::debug!("orchestrator dropped before request finished");
                }
            }
            .instrument(span),
        );

        Some(generation)
    }

    /// Applies the generation check to a finished request.
    ///
    /// Stale outcomes are discarded and yield `None`. An authoritative success
    /// becomes the displayed descriptor. An authoritative failure is reported
    /// and keeps the displayed descriptor, unless the failed query is distinct
    /// from it.
    pub fn reconcile(&mut self, outcome: FetchOutcome) -> Option<Commit> {
        let FetchOutcome {
            view,
            generation,
            descriptor,
            result,
        } = outcome;
        let slot = self.slot_mut(view);

        if generation != slot.latest {
            tracing::debug!(%view, %generation, latest = %slot.latest, "discarding stale response");
            return None;
        }
        slot.pending = None;

        let result = match result {
            Ok(page) => {
                slot.displayed = Some(descriptor.clone());
                Ok(page)
            }
            Err(e) => {
                tracing::warn!(%view, %generation, error = %e, retryable = e.is_retryable(), "event request failed");
                // A distinct query's failure clears the screen, so nothing is displayed anymore.
                if slot.displayed.as_ref().is_some_and(|d| d.is_distinct_query(&descriptor)) {
                    slot.displayed = None;
                }
                Err(FetchFailure::from(&e))
            }
        };

        Some(Commit {
            view,
            generation,
            descriptor,
            result,
        })
    }

    /// Whether an authoritative request is in flight for `view`.
    #[must_use]
    pub const fn is_loading(&self, view: ViewKind) -> bool {
        self.slot(view).pending.is_some()
    }

    #[must_use]
    pub const fn latest_generation(&self, view: ViewKind) -> Generation {
        self.slot(view).latest
    }

    /// Descriptor behind the results currently on screen for `view`.
    #[must_use]
    pub const fn displayed(&self, view: ViewKind) -> Option<&QueryDescriptor> {
        self.slot(view).displayed.as_ref()
    }
}

impl std::fmt::Debug for FetchOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("timeout", &self.timeout)
            .field("list", &self.list)
            .field("map", &self.map)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::modes::Trigger;
    use crate::domain::error::Result;
    use crate::domain::{BoundingBox, Category, Coordinates, SortKey, SportCatalog};
    use crate::fetch::client::EventPage;
    use crate::normalize::RawEventRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers with one record titled after the query, after a delay that
    /// depends on the query text. Searches near a position always fail.
    struct ScriptedService {
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn delay_for(query: &str) -> Duration {
            if query.contains("slow") {
                Duration::from_millis(900)
            } else if query.contains("hang") {
                Duration::from_secs(60)
            } else {
                Duration::from_millis(50)
            }
        }

        async fn answer(&self, query: &str, fail: bool) -> Result<EventPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Self::delay_for(query)).await;
            if fail || query.contains("broken") {
                return Err(DiscoveryError::Network("connection reset".into()));
            }
            Ok(EventPage {
                events: vec![RawEventRecord::from_value(json!({ "id": query, "title": query }))],
                total: Some(1),
            })
        }
    }

    #[async_trait]
    impl EventService for ScriptedService {
        async fn search_events(&self, query: &str, near: Option<Coordinates>) -> Result<EventPage> {
            self.answer(query, near.is_some()).await
        }

        async fn search_events_in_viewport(&self, query: &str, _bbox: Option<BoundingBox>) -> Result<EventPage> {
            self.answer(query, false).await
        }
    }

    fn setup() -> (Arc<ScriptedService>, FetchOrchestrator, mpsc::UnboundedReceiver<FetchOutcome>) {
        let service = Arc::new(ScriptedService {
            calls: AtomicUsize::new(0),
        });
        let (orchestrator, rx) = FetchOrchestrator::new(service.clone(), DEFAULT_REQUEST_TIMEOUT);
        (service, orchestrator, rx)
    }

    fn list_request(text: &str, trigger: Trigger) -> FetchRequest {
        let descriptor = QueryDescriptor {
            search_text: text.into(),
            ..QueryDescriptor::default()
        };
        FetchRequest::for_view(ViewKind::ListSearch, descriptor, trigger, &SportCatalog::default())
    }

    fn committed_title(commit: &Commit) -> String {
        let page = commit.result.as_ref().expect("successful commit");
        match &page.events[0] {
            RawEventRecord::Record(fields) => fields
                .title
                .as_ref()
                .and_then(|t| t.text())
                .unwrap_or_default()
                .to_string(),
            RawEventRecord::Malformed(v) => panic!("unexpected record {v}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_response_is_discarded() {
        let (_, mut orchestrator, mut rx) = setup();
        let first = orchestrator.dispatch(list_request("slow", Trigger::Submit)).expect("dispatched");
        let second = orchestrator.dispatch(list_request("fast", Trigger::Submit)).expect("dispatched");
        assert!(second > first);

        let fast = rx.recv().await.expect("fast outcome");
        let commit = orchestrator.reconcile(fast).expect("authoritative");
        assert_eq!(committed_title(&commit), "sports fast");
        assert!(!orchestrator.is_loading(ViewKind::ListSearch));

        let slow = rx.recv().await.expect("slow outcome");
        assert_eq!(slow.generation, first);
        assert!(orchestrator.reconcile(slow).is_none());
        assert_eq!(
            orchestrator.displayed(ViewKind::ListSearch).map(|d| d.search_text.as_str()),
            Some("fast")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn identical_queries_are_suppressed() {
        let (service, mut orchestrator, mut rx) = setup();
        assert!(orchestrator.dispatch(list_request("yoga", Trigger::Submit)).is_some());
        assert!(orchestrator.dispatch(list_request("yoga", Trigger::Submit)).is_none());

        let outcome = rx.recv().await.expect("outcome");
        assert!(orchestrator.reconcile(outcome).is_some());
        assert!(orchestrator.dispatch(list_request("yoga", Trigger::FilterChange)).is_none());

        let resorted = QueryDescriptor {
            search_text: "yoga".into(),
            sort_key: SortKey::Price,
            ..QueryDescriptor::default()
        };
        let request = FetchRequest::for_view(ViewKind::ListSearch, resorted, Trigger::FilterChange, &SportCatalog::default());
        assert!(orchestrator.dispatch(request).is_none());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_refetches_the_displayed_query() {
        let (service, mut orchestrator, mut rx) = setup();
        orchestrator.dispatch(list_request("yoga", Trigger::Submit));
        let outcome = rx.recv().await.expect("outcome");
        orchestrator.reconcile(outcome);

        assert!(orchestrator.dispatch(list_request("yoga", Trigger::Retry)).is_some());
        let _ = rx.recv().await.expect("retried outcome");
        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_never_duplicates_an_in_flight_request() {
        let (service, mut orchestrator, mut rx) = setup();
        let first = orchestrator
            .dispatch(list_request("slow yoga", Trigger::Submit))
            .expect("dispatched");

        assert!(orchestrator.dispatch(list_request("slow yoga", Trigger::Retry)).is_none());
        assert_eq!(orchestrator.latest_generation(ViewKind::ListSearch), first);
        assert!(orchestrator.is_loading(ViewKind::ListSearch));

        let outcome = rx.recv().await.expect("outcome");
        assert!(orchestrator.reconcile(outcome).is_some());
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reverting_to_displayed_query_supersedes_in_flight() {
        let (_, mut orchestrator, mut rx) = setup();
        orchestrator.dispatch(list_request("yoga", Trigger::Submit));
        let outcome = rx.recv().await.expect("outcome");
        orchestrator.reconcile(outcome);

        orchestrator.dispatch(list_request("slow climbing", Trigger::Submit));
        assert!(orchestrator.is_loading(ViewKind::ListSearch));
        assert!(orchestrator.dispatch(list_request("yoga", Trigger::Submit)).is_none());
        assert!(!orchestrator.is_loading(ViewKind::ListSearch));

        let late = rx.recv().await.expect("late outcome");
        assert!(orchestrator.reconcile(late).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_of_the_same_query_keeps_displayed_descriptor() {
        let (_, mut orchestrator, mut rx) = setup();
        orchestrator.dispatch(list_request("yoga", Trigger::Submit));
        let outcome = rx.recv().await.expect("outcome");
        orchestrator.reconcile(outcome);

        let mut nearby = list_request("yoga", Trigger::Location);
        nearby.descriptor.coordinates = Some(Coordinates::new(40.0, -73.0));
        nearby.target = FetchTarget::Search {
            query: "yoga".into(),
            near: nearby.descriptor.coordinates,
        };
        orchestrator.dispatch(nearby);
        let failed = rx.recv().await.expect("failure outcome");
        let failure = orchestrator
            .reconcile(failed)
            .expect("authoritative")
            .result
            .expect_err("failure commit");
        assert!(failure.retryable);
        assert_eq!(
            orchestrator.displayed(ViewKind::ListSearch).map(|d| d.search_text.as_str()),
            Some("yoga")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_of_a_distinct_query_clears_displayed_descriptor() {
        let (_, mut orchestrator, mut rx) = setup();
        orchestrator.dispatch(list_request("yoga", Trigger::Submit));
        let outcome = rx.recv().await.expect("outcome");
        orchestrator.reconcile(outcome);

        orchestrator.dispatch(list_request("hang", Trigger::Submit));
        let timed_out = rx.recv().await.expect("timeout outcome");
        assert!(matches!(timed_out.result, Err(DiscoveryError::Timeout(_))));
        assert!(orchestrator.reconcile(timed_out).is_some_and(|c| c.result.is_err()));
        assert!(orchestrator.displayed(ViewKind::ListSearch).is_none());

        // Going back to the earlier query fetches again.
        assert!(orchestrator.dispatch(list_request("yoga", Trigger::Submit)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn views_have_independent_generations() {
        let (_, mut orchestrator, mut rx) = setup();
        let descriptor = QueryDescriptor {
            category: Category::Cycling,
            bounding_box: Some(BoundingBox::new(40.70, 40.80, -74.02, -73.95)),
            ..QueryDescriptor::default()
        };
        let map = FetchRequest::for_view(ViewKind::MapViewport, descriptor, Trigger::Viewport, &SportCatalog::default());
        orchestrator.dispatch(map);
        orchestrator.dispatch(list_request("yoga", Trigger::Submit));

        for _ in 0..2 {
            let outcome = rx.recv().await.expect("outcome");
            assert!(orchestrator.reconcile(outcome).is_some());
        }
        assert_eq!(orchestrator.latest_generation(ViewKind::ListSearch).value(), 1);
        assert_eq!(orchestrator.latest_generation(ViewKind::MapViewport).value(), 1);
    }
}
