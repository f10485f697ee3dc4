use crate::store::ViewState;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One catalog record as returned by the backend. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntity {
    pub id: String,
    #[serde(default)]
    pub authors: Vec<String>,
    // Opaque to the client: the backend decides whether this is a year or an epoch.
    #[serde(default)]
    pub creation_date: Option<i64>,
    #[serde(default)]
    pub issuer_id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl KnowledgeEntity {
    /// Authors joined for single-line display.
    pub fn authors_line(&self) -> String {
        self.authors.join(", ")
    }

    pub fn creation_date_label(&self) -> String {
        self.creation_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into())
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Forwarded as `?limit=` on recommendation requests when set.
    pub recommendation_limit: Option<u32>,
}

/// Events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum CatalogEvent {
    // Box to keep the enum small; the snapshot carries whole entity lists.
    Snapshot(Box<ViewState>),
    /// An ingestion request succeeded; the add-by-URL form should be reset.
    Created { url: String },
    Info(String),
}
