//! In-memory view state and the only code path allowed to mutate it.
//!
//! `ViewState` is a product of independent fields: an error banner can sit over a
//! still-valid list and recommendations can load while the detail view is shown.
//! `EntityStore` owns it together with the request tracker; every transition
//! below is synchronous and free of I/O.

use crate::generation::{FetchKind, Generation, RequestTracker};
use crate::model::KnowledgeEntity;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewState {
    pub items: Vec<KnowledgeEntity>,
    pub selected: Option<KnowledgeEntity>,
    pub recommendations: Vec<KnowledgeEntity>,
    pub search_term: String,
    pub is_loading: bool,
    pub is_loading_recommendations: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Listing,
    Viewing,
}

impl ViewState {
    pub fn view(&self) -> View {
        if self.selected.is_some() {
            View::Viewing
        } else {
            View::Listing
        }
    }

    /// Whether the list view should show its "no results" placeholder.
    pub fn shows_empty_placeholder(&self) -> bool {
        self.items.is_empty() && !self.is_loading
    }

}

#[derive(Debug, Default)]
pub struct EntityStore {
    state: ViewState,
    tracker: RequestTracker,
    /// Id the shown detail was requested under. The backend may return the
    /// entity with its id in another form, so this is what recommendations match.
    selected_request_id: Option<String>,
}

impl EntityStore {
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn any_in_flight(&self) -> bool {
        self.tracker.any_in_flight()
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.state.search_term = term.to_string();
    }

    /// Leave the detail view. In-flight detail and recommendation requests are
    /// superseded so a late response cannot reopen it.
    pub fn back(&mut self) {
        self.state.selected = None;
        self.selected_request_id = None;
        self.state.recommendations.clear();
        self.tracker.invalidate(FetchKind::Detail);
        self.tracker.invalidate(FetchKind::Recommendations);
        self.refresh_flags();
    }

    /// Start a list, detail or ingest request: clears the banner and raises `is_loading`.
    pub fn begin(&mut self, kind: FetchKind) -> Generation {
        debug_assert!(kind != FetchKind::Recommendations);
        let generation = self.tracker.issue(kind);
        self.state.error = None;
        self.refresh_flags();
        generation
    }

    /// Start a recommendation request. Does not touch the banner.
    pub fn begin_recommendations(&mut self) -> Generation {
        let generation = self.tracker.issue(FetchKind::Recommendations);
        self.refresh_flags();
        generation
    }

    pub fn list_loaded(&mut self, generation: Generation, items: Vec<KnowledgeEntity>) -> bool {
        if !self.settle(FetchKind::List, generation) {
            return false;
        }
        self.state.items = items;
        true
    }

    pub fn detail_loaded(
        &mut self,
        generation: Generation,
        requested_id: &str,
        entity: KnowledgeEntity,
    ) -> bool {
        if !self.settle(FetchKind::Detail, generation) {
            return false;
        }
        self.selected_request_id = Some(requested_id.to_string());
        self.state.selected = Some(entity);
        self.state.recommendations.clear();
        true
    }

    /// Recommendations apply only while `id` is still the id the shown detail was
    /// requested under.
    pub fn recommendations_loaded(
        &mut self,
        generation: Generation,
        id: &str,
        items: Vec<KnowledgeEntity>,
    ) -> bool {
        if !self.settle(FetchKind::Recommendations, generation) {
            return false;
        }
        if self.selected_request_id.as_deref() != Some(id) {
            return false;
        }
        self.state.recommendations = items;
        true
    }

    pub fn recommendations_failed(&mut self, generation: Generation, id: &str) -> bool {
        if !self.settle(FetchKind::Recommendations, generation) {
            return false;
        }
        if self.selected_request_id.as_deref() != Some(id) {
            return false;
        }
        self.state.recommendations.clear();
        true
    }

    pub fn ingest_succeeded(&mut self, generation: Generation) -> bool {
        if !self.settle(FetchKind::Ingest, generation) {
            return false;
        }
        self.state.search_term.clear();
        true
    }

    /// Settle a failed list, detail or ingest request and raise the banner.
    /// Items and selection stay as they were.
    pub fn failed(&mut self, kind: FetchKind, generation: Generation, message: String) -> bool {
        if !self.settle(kind, generation) {
            return false;
        }
        self.state.error = Some(message);
        true
    }

    fn settle(&mut self, kind: FetchKind, generation: Generation) -> bool {
        let current = self.tracker.settle(kind, generation);
        self.refresh_flags();
        current
    }

    fn refresh_flags(&mut self) {
        self.state.is_loading = self.tracker.in_flight(FetchKind::List)
            || self.tracker.in_flight(FetchKind::Detail)
            || self.tracker.in_flight(FetchKind::Ingest);
        self.state.is_loading_recommendations =
            self.tracker.in_flight(FetchKind::Recommendations);
    }
}
