use std::sync::Arc;

use analysis_core::{AnalysisError, EnrichedBar, MarketDataProvider, NewsItem, Period};

/// Headlines kept per symbol.
pub const MAX_NEWS_ITEMS: usize = 5;

/// Fetches price history and news, enriching bars with indicators.
#[derive(Clone)]
pub struct MarketDataService {
    provider: Arc<dyn MarketDataProvider>,
}

impl MarketDataService {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Ascending bars for `period` with their indicator snapshots.
    ///
    /// An empty series is `NotFound`; provider failures pass through as `Upstream`.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        period: Period,
    ) -> Result<Vec<EnrichedBar>, AnalysisError> {
        let bars = self.provider.daily_bars(symbol, period).await.map_err(|e| {
            tracing::error!("Error getting stock data for {}: {}", symbol, e);
            match e {
                AnalysisError::NotFound(_) | AnalysisError::Upstream(_) => e,
                other => AnalysisError::Upstream(other.to_string()),
            }
        })?;

        if bars.is_empty() {
            return Err(AnalysisError::NotFound(format!(
                "No data found for symbol {}",
                symbol
            )));
        }

        tracing::debug!("Fetched {} bars for {} ({})", bars.len(), symbol, period);
        Ok(technical_analysis::enrich(bars))
    }

    /// Up to [`MAX_NEWS_ITEMS`] headlines. Never fails: news is optional context.
    pub async fn fetch_news(&self, symbol: &str) -> Vec<NewsItem> {
        match self.provider.news(symbol, MAX_NEWS_ITEMS).await {
            Ok(mut items) => {
                items.truncate(MAX_NEWS_ITEMS);
                items
            }
            Err(e) => {
                // continue without news
                tracing::warn!("Error getting news for {}: {}", symbol, e);
                Vec::new()
            }
        }
    }

    /// Company display name, falling back to the ticker itself.
    pub async fn company_name(&self, symbol: &str) -> String {
        match self.provider.company_name(symbol).await {
            Ok(name) if !name.trim().is_empty() => name,
            Ok(_) => symbol.to_string(),
            Err(e) => {
                tracing::debug!("No company name for {}: {}", symbol, e);
                symbol.to_string()
            }
        }
    }
}
