use async_trait::async_trait;
use crate::{AnalysisError, Bar, NewsItem, Period};

/// Source of price history, headlines and company metadata.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Daily bars for `period`, ascending by date. May be empty.
    async fn daily_bars(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, AnalysisError>;

    /// Most recent headlines first.
    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, AnalysisError>;

    /// Display name of the listed company.
    async fn company_name(&self, symbol: &str) -> Result<String, AnalysisError>;
}

/// Parameters of a single chat-completion round trip.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Large-language-model backend used to write the analysis text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalysisError>;

    fn backend_name(&self) -> &'static str;
}
