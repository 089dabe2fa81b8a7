//! Application state: per-view query stores, result sets and presentation
//! decorations.
//!
//! [`QueryStore`] is the single writer of a view's [`QueryDescriptor`]. Every
//! setter reports whether anything changed, and an unchanged value never
//! produces downstream work. Favorites and selection sit beside the stores in
//! [`AppState`], so they can change without touching any descriptor.

use super::modes::ViewKind;
use crate::domain::{
    BoundingBox, Category, Coordinates, LocationMode, NormalizedEvent, QueryDescriptor, SortKey,
    SportCatalog, ViewMode,
};
use crate::fetch::{Commit, FetchFailure};
use crate::location::LocationFix;
use crate::normalize::normalize_batch;
use crate::ui::presentation::{markers, visible_events, FavoriteSet};
use crate::ui::viewmodel::{
    event_item, EmptyState, ErrorNotice, HeaderInfo, MapCenter, SearchBarInfo, ViewModel,
};
use fuzzy_matcher::skim::SkimMatcherV2;
use std::sync::Arc;

fn update<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

/// Owner of one view's query descriptor.
///
/// Upholds the descriptor invariants: `coordinates` only while the location
/// mode is `Nearby`, `bounding_box` only in the map view's store.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStore {
    view: ViewKind,
    descriptor: QueryDescriptor,
}

impl QueryStore {
    #[must_use]
    pub fn new(view: ViewKind) -> Self {
        Self {
            view,
            descriptor: QueryDescriptor::default(),
        }
    }

    #[must_use]
    pub const fn view(&self) -> ViewKind {
        self.view
    }

    #[must_use]
    pub const fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Replaces the whole descriptor, dropping fields the invariants forbid.
    pub fn replace(&mut self, mut descriptor: QueryDescriptor) -> bool {
        if descriptor.location_mode != LocationMode::Nearby {
            descriptor.coordinates = None;
        }
        if self.view != ViewKind::MapViewport {
            descriptor.bounding_box = None;
        }
        update(&mut self.descriptor, descriptor)
    }

    pub fn set_search_text(&mut self, text: &str) -> bool {
        if self.descriptor.search_text == text {
            return false;
        }
        self.descriptor.search_text = text.to_string();
        true
    }

    pub fn set_category(&mut self, category: Category) -> bool {
        update(&mut self.descriptor.category, category)
    }

    /// Leaving `Nearby` also clears any coordinates.
    pub fn set_location_mode(&mut self, mode: LocationMode) -> bool {
        if !update(&mut self.descriptor.location_mode, mode) {
            return false;
        }
        if mode != LocationMode::Nearby {
            self.descriptor.coordinates = None;
        }
        true
    }

    pub fn set_sort_key(&mut self, sort_key: SortKey) -> bool {
        update(&mut self.descriptor.sort_key, sort_key)
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) -> bool {
        update(&mut self.descriptor.view_mode, view_mode)
    }

    /// Records a device position. Ignored unless the mode is `Nearby` and the
    /// position is in range.
    pub fn set_coordinates(&mut self, coordinates: Coordinates) -> bool {
        if self.descriptor.location_mode != LocationMode::Nearby || !coordinates.is_valid() {
            return false;
        }
        update(&mut self.descriptor.coordinates, Some(coordinates))
    }

    pub fn clear_coordinates(&mut self) -> bool {
        self.descriptor.coordinates.take().is_some()
    }

    /// Records the settled map bounds. Ignored outside the map view.
    pub fn set_bounding_box(&mut self, bbox: BoundingBox) -> bool {
        if self.view != ViewKind::MapViewport {
            return false;
        }
        update(&mut self.descriptor.bounding_box, Some(bbox))
    }
}

/// Query, results and request status of one view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub query: QueryStore,
    /// Normalized results of the last successful authoritative request.
    pub events: Vec<NormalizedEvent>,
    pub total: Option<u64>,
    pub loading: bool,
    pub failure: Option<FetchFailure>,
    /// Descriptor that produced `events`.
    pub committed: Option<QueryDescriptor>,
    /// Records dropped from the last batch.
    pub dropped: usize,
}

impl ViewState {
    #[must_use]
    pub fn new(view: ViewKind) -> Self {
        Self {
            query: QueryStore::new(view),
            events: Vec::new(),
            total: None,
            loading: false,
            failure: None,
            committed: None,
            dropped: 0,
        }
    }
}

/// Central application state, mutated only by the event handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub list: ViewState,
    pub map: ViewState,
    pub favorites: FavoriteSet,
    /// Event highlighted in both views. Never feeds back into a query.
    pub selected: Option<String>,
    /// Resolved device location, once known.
    pub location: Option<LocationFix>,
    pub location_requested: bool,
    /// Map center while the device location is unknown or inaccurate.
    pub fallback: Coordinates,
    pub catalog: Arc<SportCatalog>,
}

impl AppState {
    #[must_use]
    pub fn new(catalog: Arc<SportCatalog>, fallback: Coordinates) -> Self {
        Self {
            list: ViewState::new(ViewKind::ListSearch),
            map: ViewState::new(ViewKind::MapViewport),
            favorites: FavoriteSet::default(),
            selected: None,
            location: None,
            location_requested: false,
            fallback,
            catalog,
        }
    }

    #[must_use]
    pub const fn view(&self, view: ViewKind) -> &ViewState {
        match view {
            ViewKind::ListSearch => &self.list,
            ViewKind::MapViewport => &self.map,
        }
    }

    pub fn view_mut(&mut self, view: ViewKind) -> &mut ViewState {
        match view {
            ViewKind::ListSearch => &mut self.list,
            ViewKind::MapViewport => &mut self.map,
        }
    }

    /// Points the shared selection at `id`. Returns whether it moved.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        update(&mut self.selected, id.map(String::from))
    }

    /// The selected event as present in `view`'s results.
    #[must_use]
    pub fn selected_event(&self, view: ViewKind) -> Option<&NormalizedEvent> {
        let id = self.selected.as_deref()?;
        self.view(view).events.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn map_center(&self) -> MapCenter {
        match self.location {
            Some(fix) if fix.accurate => MapCenter {
                coordinates: fix.coordinates,
                approximate: false,
                notice: None,
            },
            Some(fix) => MapCenter {
                coordinates: fix.coordinates,
                approximate: true,
                notice: Some("Location unavailable, showing an approximate area".to_string()),
            },
            None => MapCenter {
                coordinates: self.fallback,
                approximate: true,
                notice: None,
            },
        }
    }

    /// Applies an authoritative outcome to its view.
    ///
    /// On success the results are replaced. On failure they stay visible,
    /// unless the failed query is a distinct one from the query behind them.
    pub fn apply_commit(&mut self, commit: Commit) {
        let catalog = Arc::clone(&self.catalog);
        let state = self.view_mut(commit.view);
        state.loading = false;

        match commit.result {
            Ok(page) => {
                let batch = normalize_batch(&page.events, &catalog);
                tracing::debug!(
                    view = %commit.view,
                    generation = %commit.generation,
                    events = batch.events.len(),
                    dropped = batch.dropped,
                    "committing results"
                );
                state.events = batch.events;
                state.dropped = batch.dropped;
                state.total = page.total;
                state.failure = None;
                state.committed = Some(commit.descriptor);
            }
            Err(failure) => {
                let distinct = state
                    .committed
                    .as_ref()
                    .map_or(true, |shown| shown.is_distinct_query(&commit.descriptor));
                if distinct {
                    state.events.clear();
                    state.total = None;
                    state.committed = None;
                }
                state.failure = Some(failure);
            }
        }
    }

    /// Computes the renderable model for `view`.
    #[must_use]
    pub fn compute_viewmodel(&self, view: ViewKind) -> ViewModel {
        let state = self.view(view);
        let descriptor = state.query.descriptor();
        let visible = visible_events(&state.events, descriptor);

        let committed_text = state
            .committed
            .as_ref()
            .map(|d| d.search_text.trim())
            .filter(|t| !t.is_empty());
        let matcher = committed_text.map(|text| (SkimMatcherV2::default(), text));
        let selected = self.selected.as_deref();

        let items = visible
            .iter()
            .map(|event| {
                event_item(
                    event,
                    self.favorites.contains(&event.id),
                    selected == Some(event.id.as_str()),
                    matcher.as_ref().map(|(m, text)| (m, *text)),
                )
            })
            .collect::<Vec<_>>();

        ViewModel {
            view,
            header: self.compute_header(view, items.len()),
            search_bar: SearchBarInfo {
                query: descriptor.search_text.clone(),
            },
            markers: markers(visible.iter().copied(), &self.favorites, selected),
            loading: state.loading,
            error: state.failure.as_ref().map(|f| ErrorNotice {
                message: f.message.clone(),
                retryable: f.retryable,
            }),
            empty_state: self.compute_empty_state(view, items.is_empty()),
            map_center: (view == ViewKind::MapViewport).then(|| self.map_center()),
            items,
        }
    }

    fn compute_header(&self, view: ViewKind, count: usize) -> HeaderInfo {
        let descriptor = self.view(view).query.descriptor();
        let title = match view {
            ViewKind::MapViewport => format!("Events in view ({count})"),
            ViewKind::ListSearch if descriptor.location_mode == LocationMode::Nearby => {
                format!("{} near you ({count})", self.catalog.category_name(descriptor.category))
            }
            ViewKind::ListSearch => {
                format!("{} ({count})", self.catalog.category_name(descriptor.category))
            }
        };
        HeaderInfo { title }
    }

    fn compute_empty_state(&self, view: ViewKind, no_items: bool) -> Option<EmptyState> {
        let state = self.view(view);
        if !no_items || state.loading || state.committed.is_none() {
            return None;
        }

        let virtual_only = state.query.descriptor().location_mode == LocationMode::Virtual;
        let (message, subtitle) = match view {
            ViewKind::ListSearch if virtual_only && !state.events.is_empty() => (
                "No virtual events found",
                "Switch the location filter to see in-person events",
            ),
            ViewKind::ListSearch => ("No events found", "Try a different search or category"),
            ViewKind::MapViewport => ("No events in this area", "Pan or zoom the map to explore nearby"),
        };
        Some(EmptyState {
            message: message.to_string(),
            subtitle: subtitle.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{EventPage, Generation};
    use crate::normalize::RawEventRecord;
    use serde_json::json;

    fn state() -> AppState {
        AppState::new(Arc::new(SportCatalog::default()), Coordinates::new(40.7128, -74.0060))
    }

    fn page(ids: &[&str]) -> EventPage {
        EventPage {
            events: ids
                .iter()
                .map(|id| RawEventRecord::from_value(json!({ "id": id, "title": format!("{id} Marathon") })))
                .collect(),
            total: None,
        }
    }

    fn commit(descriptor: QueryDescriptor, result: Result<EventPage, FetchFailure>) -> Commit {
        Commit {
            view: ViewKind::ListSearch,
            generation: Generation::default().next(),
            descriptor,
            result,
        }
    }

    fn failure() -> FetchFailure {
        FetchFailure {
            message: "The event service took too long to respond.".into(),
            retryable: true,
        }
    }

    #[test]
    fn setters_suppress_unchanged_values() {
        let mut store = QueryStore::new(ViewKind::ListSearch);
        assert!(!store.set_category(Category::All));
        assert!(store.set_category(Category::Tennis));
        assert!(!store.set_category(Category::Tennis));
        assert!(!store.set_search_text(""));
        assert!(!store.set_sort_key(SortKey::Date));
        assert!(!store.set_view_mode(ViewMode::Grid));
    }

    #[test]
    fn coordinates_only_while_nearby() {
        let mut store = QueryStore::new(ViewKind::ListSearch);
        let here = Coordinates::new(40.0, -73.0);
        assert!(!store.set_coordinates(here));

        assert!(store.set_location_mode(LocationMode::Nearby));
        assert!(store.set_coordinates(here));
        assert!(!store.set_coordinates(here));

        assert!(store.set_location_mode(LocationMode::City));
        assert_eq!(store.descriptor().coordinates, None);
    }

    #[test]
    fn bounding_box_only_in_map_store() {
        let bbox = BoundingBox::new(40.70, 40.80, -74.02, -73.95);
        assert!(!QueryStore::new(ViewKind::ListSearch).set_bounding_box(bbox));
        let mut map = QueryStore::new(ViewKind::MapViewport);
        assert!(map.set_bounding_box(bbox));
        assert!(!map.set_bounding_box(bbox));
    }

    #[test]
    fn failure_keeps_results_for_the_same_query() {
        let mut state = state();
        let descriptor = QueryDescriptor {
            search_text: "marathon".into(),
            ..QueryDescriptor::default()
        };
        state.apply_commit(commit(descriptor.clone(), Ok(page(&["a", "b"]))));

        let mut nearby = descriptor.clone();
        nearby.coordinates = Some(Coordinates::new(40.0, -73.0));
        state.apply_commit(commit(nearby, Err(failure())));

        assert_eq!(state.list.events.len(), 2);
        assert!(state.list.failure.as_ref().is_some_and(|f| f.retryable));
        assert_eq!(state.list.committed, Some(descriptor));
    }

    #[test]
    fn failure_of_a_distinct_query_clears_results() {
        let mut state = state();
        state.apply_commit(commit(QueryDescriptor::default(), Ok(page(&["a"]))));
        let other = QueryDescriptor {
            category: Category::Swimming,
            ..QueryDescriptor::default()
        };
        state.apply_commit(commit(other, Err(failure())));
        assert!(state.list.events.is_empty());
    }

    #[test]
    fn viewmodel_highlights_committed_search_text() {
        let mut state = state();
        let descriptor = QueryDescriptor {
            search_text: "mara".into(),
            ..QueryDescriptor::default()
        };
        state.list.query.replace(descriptor.clone());
        state.apply_commit(commit(descriptor, Ok(page(&["x"]))));
        state.favorites.toggle("x");
        state.select(Some("x"));

        let vm = state.compute_viewmodel(ViewKind::ListSearch);
        assert_eq!(vm.header.title, "All Events (1)");
        let item = &vm.items[0];
        assert!(item.is_favorite && item.is_selected);
        assert_eq!(item.highlight_ranges, vec![(2, 6)]);
        assert!(vm.map_center.is_none());
        assert!(vm.empty_state.is_none());
    }

    #[test]
    fn map_center_falls_back_with_notice() {
        let mut state = state();
        assert!(state.map_center().approximate);

        state.location = Some(LocationFix::fallback(state.fallback));
        let center = state.compute_viewmodel(ViewKind::MapViewport).map_center.expect("map center");
        assert_eq!(center.coordinates, Coordinates::new(40.7128, -74.0060));
        assert!(center.notice.is_some());
    }
}
