//! Application-level orchestration.
//!
//! Each fetcher owns one kind of backend request: it starts the request against the
//! store, runs it on a spawned task and reports a generation-tagged [`Outcome`] back
//! through a single channel. `ViewStateManager` is the only consumer of that channel,
//! so every state mutation happens on one task. UI/CLI layers talk to the manager,
//! never to the fetchers.

mod catalog;
#[cfg(feature = "tui")]
mod controller;
mod detail;
mod ingestion;
mod manager;
mod recommendations;

use crate::api::{ApiError, IngestResponse};
use crate::generation::Generation;
use crate::model::KnowledgeEntity;

pub(crate) use catalog::CatalogFetcher;
#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use detail::DetailFetcher;
pub(crate) use ingestion::IngestionController;
pub(crate) use manager::ViewStateManager;
pub(crate) use recommendations::RecommendationFetcher;

#[cfg(test)]
pub(crate) use catalog::LIST_ERROR;
#[cfg(test)]
pub(crate) use manager::Applied;
#[cfg(test)]
pub(crate) use detail::DETAIL_ERROR;
#[cfg(test)]
pub(crate) use ingestion::INGEST_ERROR;

/// A settled request, tagged with the generation it was issued under.
#[derive(Debug)]
pub(crate) enum Outcome {
    List {
        generation: Generation,
        result: Result<Vec<KnowledgeEntity>, ApiError>,
    },
    Detail {
        generation: Generation,
        id: String,
        result: Result<KnowledgeEntity, ApiError>,
    },
    Recommendations {
        generation: Generation,
        id: String,
        result: Result<Vec<KnowledgeEntity>, ApiError>,
    },
    Ingest {
        generation: Generation,
        url: String,
        result: Result<IngestResponse, ApiError>,
    },
}
