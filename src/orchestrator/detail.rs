use super::Outcome;
use crate::api::{ApiError, KnowledgeClient};
use crate::generation::{FetchKind, Generation};
use crate::model::KnowledgeEntity;
use crate::store::EntityStore;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) const DETAIL_ERROR: &str = "Failed to fetch document details.";

/// Issues single-entity requests and owns `selected`.
pub(crate) struct DetailFetcher {
    client: KnowledgeClient,
    outcome_tx: UnboundedSender<Outcome>,
}

impl DetailFetcher {
    pub fn new(client: KnowledgeClient, outcome_tx: UnboundedSender<Outcome>) -> Self {
        Self { client, outcome_tx }
    }

    pub fn fetch_detail(&self, store: &mut EntityStore, id: &str) -> Generation {
        let generation = store.begin(FetchKind::Detail);
        tracing::debug!(%generation, id, "fetching detail");

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let result = client.detail(&id).await;
            let _ = tx.send(Outcome::Detail {
                generation,
                id,
                result,
            });
        });
        generation
    }

    /// A successful current response replaces `selected`; the caller then starts the
    /// recommendation fetch as a separate request, so `is_loading` is already clear
    /// by the time it begins.
    pub fn apply(
        &self,
        store: &mut EntityStore,
        generation: Generation,
        id: &str,
        result: Result<KnowledgeEntity, ApiError>,
    ) -> bool {
        let applied = match result {
            Ok(entity) => store.detail_loaded(generation, id, entity),
            Err(e) => {
                let applied = store.failed(FetchKind::Detail, generation, DETAIL_ERROR.into());
                if applied {
                    tracing::error!(id, error = %e, "detail request failed");
                }
                applied
            }
        };
        if !applied {
            tracing::debug!(%generation, id, "dropping stale detail response");
        }
        applied
    }
}
