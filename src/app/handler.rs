//! Event handling and state transitions.
//!
//! [`handle_event`] is the only place state changes. It returns whether the
//! views need re-rendering and the [`Action`]s to execute. Changes that leave
//! a store untouched return no actions, so repeated identical input never
//! produces a URL write or a fetch.
//!
//! Fetch policy per change:
//! - search text: stored (and mirrored to the URL for the list) but fetched
//!   only on [`Event::SubmitSearch`]
//! - category, location mode: fetched immediately
//! - sort key, view mode: re-ordered client-side, never fetched
//! - viewport: fetched once the tracker reports settled bounds

use super::modes::{Trigger, ViewKind};
use super::{Action, AppState};
use crate::domain::error::Result;
use crate::domain::{BoundingBox, Category, LocationMode, SortKey, ViewMode};
use crate::fetch::{Commit, FetchRequest};
use crate::location::LocationFix;
use crate::navigation::{parse_query_string, to_query_string};

/// Inputs to the state machine: user intents and runtime notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The page loaded with `query` in the address bar.
    UrlLoaded { query: String },
    /// The search box of `view` changed. Does not fetch.
    SetSearchText { view: ViewKind, text: String },
    /// The user submitted the search box of `view`.
    SubmitSearch { view: ViewKind },
    SetCategory(Category),
    SetLocationMode(LocationMode),
    SetSortKey(SortKey),
    SetViewMode(ViewMode),
    ToggleFavorite { id: String },
    /// Selection from either the list or a marker. `None` clears it.
    SelectEvent { id: Option<String> },
    LocationResolved(LocationFix),
    /// The map settled on new bounds after debouncing.
    ViewportSettled(BoundingBox),
    LoadingChanged { view: ViewKind, loading: bool },
    /// An authoritative outcome cleared by the orchestrator.
    FetchCommitted(Commit),
    /// Re-issues the current query of `view` after a failure.
    Retry { view: ViewKind },
}

/// Processes one event. Returns `(render, actions)`.
///
/// # Errors
///
/// Currently infallible; the `Result` keeps the signature stable for
/// handlers that need to reject input.
pub fn handle_event(state: &mut AppState, event: &Event) -> Result<(bool, Vec<Action>)> {
    let _span = tracing::debug_span!("handle_event", event_type = ?event).entered();

    match event {
        Event::UrlLoaded { query } => {
            let descriptor = parse_query_string(query);
            state.list.query.replace(descriptor);

            let mut actions = vec![];
            let canonical = to_query_string(state.list.query.descriptor());
            if canonical != query.trim_start_matches('?') {
                tracing::debug!(%canonical, "normalizing address bar query");
                actions.push(Action::ReplaceUrl(canonical));
            }
            if !state.location_requested {
                state.location_requested = true;
                actions.push(Action::ResolveLocation);
            }
            actions.push(fetch(state, ViewKind::ListSearch, Trigger::Initial));
            Ok((true, actions))
        }
        Event::SetSearchText { view, text } => {
            if !state.view_mut(*view).query.set_search_text(text) {
                return Ok((false, vec![]));
            }
            Ok((true, sync_url(state, *view)))
        }
        Event::SubmitSearch { view } => {
            tracing::debug!(%view, query = %state.view(*view).query.descriptor().search_text, "search submitted");
            Ok((false, vec![fetch(state, *view, Trigger::Submit)]))
        }
        Event::SetCategory(category) => {
            if !state.list.query.set_category(*category) {
                return Ok((false, vec![]));
            }
            let mut actions = sync_url(state, ViewKind::ListSearch);
            actions.push(fetch(state, ViewKind::ListSearch, Trigger::FilterChange));
            Ok((true, actions))
        }
        Event::SetLocationMode(mode) => {
            if !state.list.query.set_location_mode(*mode) {
                return Ok((false, vec![]));
            }

            let mut actions = sync_url(state, ViewKind::ListSearch);
            if *mode == LocationMode::Nearby {
                match state.location {
                    Some(fix) if fix.accurate => {
                        state.list.query.set_coordinates(fix.coordinates);
                    }
                    Some(_) => tracing::debug!("no accurate position, searching nearby without coordinates"),
                    None if !state.location_requested => {
                        state.location_requested = true;
                        actions.push(Action::ResolveLocation);
                    }
                    None => {}
                }
            }
            actions.push(fetch(state, ViewKind::ListSearch, Trigger::FilterChange));
            Ok((true, actions))
        }
        Event::SetSortKey(sort_key) => {
            if !state.list.query.set_sort_key(*sort_key) {
                return Ok((false, vec![]));
            }
            Ok((true, sync_url(state, ViewKind::ListSearch)))
        }
        Event::SetViewMode(view_mode) => {
            if !state.list.query.set_view_mode(*view_mode) {
                return Ok((false, vec![]));
            }
            Ok((true, sync_url(state, ViewKind::ListSearch)))
        }
        Event::ToggleFavorite { id } => {
            let favorite = state.favorites.toggle(id);
            tracing::debug!(%id, favorite, "favorite toggled");
            Ok((true, vec![]))
        }
        Event::SelectEvent { id } => Ok((state.select(id.as_deref()), vec![])),
        Event::LocationResolved(fix) => {
            tracing::debug!(
                lat = fix.coordinates.lat,
                lon = fix.coordinates.lon,
                accurate = fix.accurate,
                "location resolved"
            );
            state.location = Some(*fix);

            let mut actions = vec![];
            if fix.accurate && state.list.query.set_coordinates(fix.coordinates) {
                actions.push(fetch(state, ViewKind::ListSearch, Trigger::Location));
            }
            Ok((true, actions))
        }
        Event::ViewportSettled(bbox) => {
            if !state.map.query.set_bounding_box(*bbox) {
                return Ok((false, vec![]));
            }
            Ok((false, vec![fetch(state, ViewKind::MapViewport, Trigger::Viewport)]))
        }
        Event::LoadingChanged { view, loading } => {
            let slot = &mut state.view_mut(*view).loading;
            if *slot == *loading {
                return Ok((false, vec![]));
            }
            *slot = *loading;
            Ok((true, vec![]))
        }
        Event::FetchCommitted(commit) => {
            state.apply_commit(commit.clone());
            Ok((true, vec![]))
        }
        Event::Retry { view } => {
            if state.view(*view).failure.is_none() {
                tracing::debug!(%view, "nothing to retry");
                return Ok((false, vec![]));
            }
            Ok((false, vec![fetch(state, *view, Trigger::Retry)]))
        }
    }
}

fn fetch(state: &AppState, view: ViewKind, trigger: Trigger) -> Action {
    let descriptor = state.view(view).query.descriptor().clone();
    Action::Fetch(FetchRequest::for_view(view, descriptor, trigger, &state.catalog))
}

/// The address bar mirrors the list view only.
fn sync_url(state: &AppState, view: ViewKind) -> Vec<Action> {
    match view {
        ViewKind::ListSearch => vec![Action::ReplaceUrl(to_query_string(state.list.query.descriptor()))],
        ViewKind::MapViewport => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinates, SportCatalog};
    use crate::fetch::FetchTarget;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(SportCatalog::default()), Coordinates::new(40.7128, -74.0060))
    }

    fn fetches(actions: &[Action]) -> Vec<&FetchRequest> {
        actions
            .iter()
            .filter_map(|a| match a {
                Action::Fetch(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn url_load_hydrates_list_and_fetches() {
        let mut state = state();
        let (render, actions) =
            handle_event(&mut state, &Event::UrlLoaded { query: "?q=marathon&cat=running".into() })
                .expect("handled");

        assert!(render);
        assert_eq!(state.list.query.descriptor().category, Category::Running);
        assert_eq!(actions[0], Action::ResolveLocation);
        let requests = fetches(&actions);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].trigger, Trigger::Initial);
        assert!(!actions.iter().any(|a| matches!(a, Action::ReplaceUrl(_))));
    }

    #[test]
    fn url_load_canonicalizes_unknown_values() {
        let mut state = state();
        let (_, actions) =
            handle_event(&mut state, &Event::UrlLoaded { query: "cat=curling&sort=popular".into() })
                .expect("handled");
        assert_eq!(actions[0], Action::ReplaceUrl("sort=popular".into()));
    }

    #[test]
    fn typing_updates_url_without_fetching() {
        let mut state = state();
        let event = Event::SetSearchText { view: ViewKind::ListSearch, text: "yoga".into() };
        let (render, actions) = handle_event(&mut state, &event).expect("handled");
        assert!(render);
        assert_eq!(actions, vec![Action::ReplaceUrl("q=yoga".into())]);

        let (render, actions) = handle_event(&mut state, &event).expect("handled");
        assert!(!render && actions.is_empty());
    }

    #[test]
    fn map_search_text_never_touches_the_url() {
        let mut state = state();
        let event = Event::SetSearchText { view: ViewKind::MapViewport, text: "yoga".into() };
        let (_, actions) = handle_event(&mut state, &event).expect("handled");
        assert!(actions.is_empty());
    }

    #[test]
    fn sort_changes_reorder_without_fetching() {
        let mut state = state();
        let (render, actions) = handle_event(&mut state, &Event::SetSortKey(SortKey::Price)).expect("handled");
        assert!(render);
        assert_eq!(actions, vec![Action::ReplaceUrl("sort=price".into())]);
    }

    #[test]
    fn unchanged_category_is_a_no_op() {
        let mut state = state();
        let (render, actions) = handle_event(&mut state, &Event::SetCategory(Category::All)).expect("handled");
        assert!(!render && actions.is_empty());
    }

    #[test]
    fn nearby_uses_known_accurate_position() {
        let mut state = state();
        state.location_requested = true;
        state.location = Some(LocationFix::accurate(Coordinates::new(37.77, -122.42)));

        let (_, actions) =
            handle_event(&mut state, &Event::SetLocationMode(LocationMode::Nearby)).expect("handled");
        let requests = fetches(&actions);
        assert!(matches!(
            &requests[0].target,
            FetchTarget::Search { near: Some(c), .. } if *c == Coordinates::new(37.77, -122.42)
        ));
    }

    #[test]
    fn late_accurate_fix_refetches_nearby() {
        let mut state = state();
        state.location_requested = true;
        handle_event(&mut state, &Event::SetLocationMode(LocationMode::Nearby)).expect("handled");

        let fix = LocationFix::accurate(Coordinates::new(51.5, -0.12));
        let (_, actions) = handle_event(&mut state, &Event::LocationResolved(fix)).expect("handled");
        assert_eq!(fetches(&actions)[0].trigger, Trigger::Location);

        let fallback = LocationFix::fallback(state.fallback);
        let (_, actions) = handle_event(&mut state, &Event::LocationResolved(fallback)).expect("handled");
        assert!(actions.is_empty());
    }

    #[test]
    fn identical_viewport_is_ignored() {
        let mut state = state();
        let bbox = BoundingBox::new(40.70, 40.80, -74.02, -73.95);
        let (_, actions) = handle_event(&mut state, &Event::ViewportSettled(bbox)).expect("handled");
        assert_eq!(fetches(&actions).len(), 1);
        let (_, actions) = handle_event(&mut state, &Event::ViewportSettled(bbox)).expect("handled");
        assert!(actions.is_empty());
    }

    #[test]
    fn retry_requires_a_failure() {
        let mut state = state();
        let (_, actions) = handle_event(&mut state, &Event::Retry { view: ViewKind::ListSearch }).expect("handled");
        assert!(actions.is_empty());
    }

    #[test]
    fn selection_is_shared_and_change_only() {
        let mut state = state();
        let select = Event::SelectEvent { id: Some("e1".into()) };
        assert!(handle_event(&mut state, &select).expect("handled").0);
        assert!(!handle_event(&mut state, &select).expect("handled").0);
        assert_eq!(state.selected.as_deref(), Some("e1"));
    }
}
