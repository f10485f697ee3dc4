use super::Outcome;
use crate::api::{ApiError, KnowledgeClient};
use crate::generation::Generation;
use crate::model::KnowledgeEntity;
use crate::store::EntityStore;
use tokio::sync::mpsc::UnboundedSender;

/// Issues recommendation requests. Failures degrade silently: the list is emptied and
/// a diagnostic is logged, but the banner, selection and `is_loading` are left alone.
pub(crate) struct RecommendationFetcher {
    client: KnowledgeClient,
    outcome_tx: UnboundedSender<Outcome>,
}

impl RecommendationFetcher {
    pub fn new(client: KnowledgeClient, outcome_tx: UnboundedSender<Outcome>) -> Self {
        Self { client, outcome_tx }
    }

    pub fn fetch_recommendations(&self, store: &mut EntityStore, id: &str) -> Generation {
        let generation = store.begin_recommendations();
        tracing::debug!(%generation, id, "fetching recommendations");

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        let id = id.to_string();
        tokio::spawn(async move {
            let result = client.recommendations(&id).await;
            let _ = tx.send(Outcome::Recommendations {
                generation,
                id,
                result,
            });
        });
        generation
    }

    pub fn apply(
        &self,
        store: &mut EntityStore,
        generation: Generation,
        id: &str,
        result: Result<Vec<KnowledgeEntity>, ApiError>,
    ) -> bool {
        let applied = match result {
            Ok(items) => store.recommendations_loaded(generation, id, items),
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to load recommendations");
                store.recommendations_failed(generation, id)
            }
        };
        if !applied {
            tracing::debug!(%generation, id, "dropping stale recommendations response");
        }
        applied
    }
}
