use super::Outcome;
use crate::api::{ApiError, IngestResponse, KnowledgeClient};
use crate::generation::{FetchKind, Generation};
use crate::store::EntityStore;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) const INGEST_ERROR: &str = "An unknown error occurred.";

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Turn a failed ingestion body into the banner text: the `error` field of a JSON
/// body, else the raw text, else the generic message.
pub(crate) fn ingest_error_message(body: &str) -> String {
    if let Ok(ErrorBody { error: Some(msg) }) = serde_json::from_str::<ErrorBody>(body) {
        if !msg.is_empty() {
            return msg;
        }
    }
    if body.is_empty() {
        INGEST_ERROR.to_string()
    } else {
        body.to_string()
    }
}

/// Submits new entities by URL.
pub(crate) struct IngestionController {
    client: KnowledgeClient,
    outcome_tx: UnboundedSender<Outcome>,
}

impl IngestionController {
    pub fn new(client: KnowledgeClient, outcome_tx: UnboundedSender<Outcome>) -> Self {
        Self { client, outcome_tx }
    }

    /// Only emptiness is checked here; URL format is the backend's call.
    pub fn create_from_url(&self, store: &mut EntityStore, url: &str) -> Option<Generation> {
        if url.trim().is_empty() {
            return None;
        }
        let generation = store.begin(FetchKind::Ingest);
        tracing::info!(%generation, url, "submitting document");

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let result = client.create(&url).await;
            let _ = tx.send(Outcome::Ingest {
                generation,
                url,
                result,
            });
        });
        Some(generation)
    }

    pub fn apply(
        &self,
        store: &mut EntityStore,
        generation: Generation,
        url: &str,
        result: Result<IngestResponse, ApiError>,
    ) -> bool {
        let applied = match result {
            Ok(resp) if resp.status.is_success() => {
                tracing::info!(url, status = %resp.status, "document added");
                store.ingest_succeeded(generation)
            }
            Ok(resp) => {
                let message = ingest_error_message(&resp.body);
                tracing::error!(
                    url,
                    status = %resp.status,
                    message = %message,
                    "ingestion rejected"
                );
                store.failed(FetchKind::Ingest, generation, message)
            }
            Err(e) => {
                tracing::error!(url, error = %e, "ingestion request failed");
                store.failed(FetchKind::Ingest, generation, INGEST_ERROR.into())
            }
        };
        if !applied {
            tracing::debug!(%generation, url, "dropping stale ingestion response");
        }
        applied
    }
}
