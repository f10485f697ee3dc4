use super::{
    CatalogFetcher, DetailFetcher, IngestionController, Outcome, RecommendationFetcher,
};
use crate::api::KnowledgeClient;
use crate::store::{EntityStore, ViewState};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// What applying one outcome changed, for presentation layers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Applied {
    pub changed: bool,
    /// Set when an ingestion request for this URL succeeded.
    pub created: Option<String>,
}

/// Translates user actions into fetcher calls and applies their outcomes.
///
/// Owns the store and the receiving end of the outcome channel, so all mutations
/// funnel through `&mut self` on a single task.
pub(crate) struct ViewStateManager {
    store: EntityStore,
    catalog: CatalogFetcher,
    detail: DetailFetcher,
    recommendations: RecommendationFetcher,
    ingestion: IngestionController,
    outcome_rx: UnboundedReceiver<Outcome>,
}

impl ViewStateManager {
    pub fn new(client: KnowledgeClient) -> Self {
        let (tx, outcome_rx) = mpsc::unbounded_channel::<Outcome>();
        Self {
            store: EntityStore::default(),
            catalog: CatalogFetcher::new(client.clone(), tx.clone()),
            detail: DetailFetcher::new(client.clone(), tx.clone()),
            recommendations: RecommendationFetcher::new(client.clone(), tx.clone()),
            ingestion: IngestionController::new(client, tx),
            outcome_rx,
        }
    }

    pub fn state(&self) -> &ViewState {
        self.store.state()
    }

    /// Initial load: the unfiltered catalog, once.
    pub fn start(&mut self) {
        self.catalog.fetch_list(&mut self.store, "");
    }

    /// Open the detail view for `id`. Also used from inside the detail view when a
    /// recommendation is chosen.
    pub fn select(&mut self, id: &str) {
        self.detail.fetch_detail(&mut self.store, id);
    }

    pub fn back(&mut self) {
        self.store.back();
    }

    pub fn search(&mut self, term: &str) {
        self.store.set_search_term(term);
        self.catalog.fetch_list(&mut self.store, term);
    }

    /// Returns false when `url` is empty and nothing was submitted.
    pub fn create_from_url(&mut self, url: &str) -> bool {
        self.ingestion
            .create_from_url(&mut self.store, url)
            .is_some()
    }

    /// Wait for the next settled request and apply it.
    pub async fn next(&mut self) -> Option<Applied> {
        let outcome = self.outcome_rx.recv().await?;
        Some(self.apply(outcome))
    }

    /// Apply outcomes until no current request of any kind is in flight.
    pub async fn settle(&mut self) {
        while self.store.any_in_flight() {
            if self.next().await.is_none() {
                break;
            }
        }
    }

    pub fn apply(&mut self, outcome: Outcome) -> Applied {
        match outcome {
            Outcome::List { generation, result } => Applied {
                changed: self.catalog.apply(&mut self.store, generation, result),
                created: None,
            },
            Outcome::Detail {
                generation,
                id,
                result,
            } => {
                let loaded = result.is_ok();
                let changed = self.detail.apply(&mut self.store, generation, &id, result);
                if changed && loaded {
                    self.recommendations
                        .fetch_recommendations(&mut self.store, &id);
                }
                Applied {
                    changed,
                    created: None,
                }
            }
            Outcome::Recommendations {
                generation,
                id,
                result,
            } => Applied {
                changed: self
                    .recommendations
                    .apply(&mut self.store, generation, &id, result),
                created: None,
            },
            Outcome::Ingest {
                generation,
                url,
                result,
            } => {
                let accepted = matches!(&result, Ok(resp) if resp.status.is_success());
                let changed = self
                    .ingestion
                    .apply(&mut self.store, generation, &url, result);
                let created = if changed && accepted {
                    self.catalog.fetch_list(&mut self.store, "");
                    Some(url)
                } else {
                    None
                };
                Applied { changed, created }
            }
        }
    }
}
