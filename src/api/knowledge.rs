use super::ApiError;
use crate::model::{ClientConfig, KnowledgeEntity};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

const API_PREFIX: [&str; 3] = ["api", "v1", "knowledge"];

#[derive(Serialize)]
struct CreateRequest<'a> {
    url: &'a str,
}

/// Raw outcome of an ingestion POST. The body is kept as text regardless of status
/// because backends report failures either as `{"error": ...}` JSON or as plain text.
#[derive(Debug, Clone)]
pub struct IngestResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct KnowledgeClient {
    http: reqwest::Client,
    base: Url,
    recommendation_limit: Option<u32>,
}

impl KnowledgeClient {
    pub fn new(cfg: &ClientConfig) -> Result<Self, ApiError> {
        let base = Url::parse(&cfg.base_url)
            .map_err(|_| ApiError::InvalidBaseUrl(cfg.base_url.clone()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(cfg.base_url.clone()));
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base,
            recommendation_limit: cfg.recommendation_limit,
        })
    }

    /// `/api/v1/knowledge[/<segment>...]` under the configured base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(API_PREFIX).extend(segments);
        }
        url
    }

    /// `GET /api/v1/knowledge`
    pub async fn list(&self) -> Result<Vec<KnowledgeEntity>, ApiError> {
        self.get_json(self.endpoint(&[])).await
    }

    /// `GET /api/v1/knowledge?search=<term>`
    pub async fn search(&self, term: &str) -> Result<Vec<KnowledgeEntity>, ApiError> {
        self.get_json(self.search_url(term)).await
    }

    /// Spaces go out as `%20`, not form-style `+`.
    fn search_url(&self, term: &str) -> Url {
        let mut url = self.endpoint(&[]);
        url.set_query(Some(&format!("search={}", urlencoding::encode(term))));
        url
    }

    /// `GET /api/v1/knowledge/<id>`
    pub async fn detail(&self, id: &str) -> Result<KnowledgeEntity, ApiError> {
        self.get_json(self.endpoint(&[id])).await
    }

    /// `GET /api/v1/knowledge/<id>/recommendations`
    pub async fn recommendations(&self, id: &str) -> Result<Vec<KnowledgeEntity>, ApiError> {
        let mut url = self.endpoint(&[id, "recommendations"]);
        if let Some(limit) = self.recommendation_limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        self.get_json(url).await
    }

    /// `POST /api/v1/knowledge` with `{"url": ...}`. Non-success statuses are not
    /// errors here; the caller interprets status and body together.
    pub async fn create(&self, source_url: &str) -> Result<IngestResponse, ApiError> {
        let response = self
            .http
            .post(self.endpoint(&[]))
            .json(&CreateRequest { url: source_url })
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(IngestResponse { status, body })
    }

    /// Direct link to the stored file. Never fetched by the client itself.
    pub fn download_url(&self, id: &str) -> String {
        self.endpoint(&[id, "download"]).to_string()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
