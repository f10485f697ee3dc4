//! Client for the knowledge repository REST surface under `/api/v1/knowledge`.

mod error;
mod knowledge;

pub use error::ApiError;
pub use knowledge::{IngestResponse, KnowledgeClient};
