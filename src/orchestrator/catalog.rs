use super::Outcome;
use crate::api::{ApiError, KnowledgeClient};
use crate::generation::{FetchKind, Generation};
use crate::model::KnowledgeEntity;
use crate::store::EntityStore;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) const LIST_ERROR: &str = "Failed to fetch data from the server.";

/// Issues list and search requests and owns the `items` half of the store.
pub(crate) struct CatalogFetcher {
    client: KnowledgeClient,
    outcome_tx: UnboundedSender<Outcome>,
}

impl CatalogFetcher {
    pub fn new(client: KnowledgeClient, outcome_tx: UnboundedSender<Outcome>) -> Self {
        Self { client, outcome_tx }
    }

    /// Fetch the unfiltered catalog for an empty `query`, a server-side search otherwise.
    pub fn fetch_list(&self, store: &mut EntityStore, query: &str) -> Generation {
        let generation = store.begin(FetchKind::List);
        tracing::debug!(%generation, query, "fetching list");

        let client = self.client.clone();
        let tx = self.outcome_tx.clone();
        let query = query.to_string();
        tokio::spawn(async move {
            let result = if query.is_empty() {
                client.list().await
            } else {
                client.search(&query).await
            };
            let _ = tx.send(Outcome::List { generation, result });
        });
        generation
    }

    /// Items are replaced verbatim: no filtering, sorting or deduplication.
    pub fn apply(
        &self,
        store: &mut EntityStore,
        generation: Generation,
        result: Result<Vec<KnowledgeEntity>, ApiError>,
    ) -> bool {
        let applied = match result {
            Ok(items) => store.list_loaded(generation, items),
            Err(e) => {
                let applied = store.failed(FetchKind::List, generation, LIST_ERROR.into());
                if applied {
                    tracing::error!(error = %e, "list request failed");
                }
                applied
            }
        };
        if !applied {
            tracing::debug!(%generation, "dropping stale list response");
        }
        applied
    }
}
