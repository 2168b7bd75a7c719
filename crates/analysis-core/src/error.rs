use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The provider answered but had nothing for the request (e.g. an empty series).
    #[error("{0}")]
    NotFound(String),

    /// Any failure talking to an external provider (market data, LLM).
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl AnalysisError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalysisError::NotFound(_))
    }
}
