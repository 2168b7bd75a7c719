use std::sync::Arc;

use analysis_core::{
    AgentAnalysis, AnalysisError, Bar, CompletionProvider, CompletionRequest, MarketDataProvider,
    Period, TrendingEntry,
};
use futures_util::future::join_all;

pub mod market_data;
pub mod prompt;
pub mod rules;

pub use market_data::{MarketDataService, MAX_NEWS_ITEMS};
pub use prompt::{build_prompt, summarize};
pub use rules::{derive_recommendations, derive_risk_level, CONFIDENCE_SCORE};

/// Wires market data, the indicator engine and the LLM into one analysis.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    market: MarketDataService,
    llm: Arc<dyn CompletionProvider>,
}

impl AnalysisOrchestrator {
    pub fn new(provider: Arc<dyn MarketDataProvider>, llm: Arc<dyn CompletionProvider>) -> Self {
        Self {
            market: MarketDataService::new(provider),
            llm,
        }
    }

    pub fn market(&self) -> &MarketDataService {
        &self.market
    }

    /// Send `prompt` to the LLM with the fixed analyst role. No retry.
    pub async fn request_completion(&self, prompt: String) -> Result<String, AnalysisError> {
        let request = CompletionRequest {
            system: prompt::SYSTEM_ROLE.to_string(),
            prompt,
            temperature: prompt::TEMPERATURE,
            max_tokens: prompt::MAX_TOKENS,
        };

        self.llm.complete(request).await.map_err(|e| {
            tracing::error!("Error in {} analysis: {}", self.llm.backend_name(), e);
            match e {
                AnalysisError::Upstream(_) => e,
                other => AnalysisError::Upstream(format!("Analysis error: {}", other)),
            }
        })
    }

    /// Full pipeline: history, news, prompt, completion, rule tables.
    pub async fn analyze(
        &self,
        symbol: &str,
        period: Period,
        query: &str,
    ) -> Result<AgentAnalysis, AnalysisError> {
        tracing::info!("Starting analysis for {} (period: {})", symbol, period);

        let history = self.market.fetch_history(symbol, period).await?;
        let news = self.market.fetch_news(symbol).await;

        let summary = summarize(&history)?;
        let prompt = build_prompt(symbol, &summary, &news, query);
        let analysis = self.request_completion(prompt).await?;

        let recommendations = derive_recommendations(&summary);
        let risk_level = derive_risk_level(summary.rsi);

        tracing::info!(
            "Analysis for {} complete: risk {}, {} recommendation(s)",
            symbol,
            risk_level.to_label(),
            recommendations.len()
        );

        Ok(AgentAnalysis {
            analysis,
            recommendations,
            risk_level,
            confidence_score: CONFIDENCE_SCORE,
            technical_indicators: summary,
        })
    }

    /// Most recent daily session for `symbol`.
    pub async fn latest_session(&self, symbol: &str) -> Result<Bar, AnalysisError> {
        let history = self.market.fetch_history(symbol, Period::OneDay).await?;
        history
            .into_iter()
            .last()
            .map(|e| e.bar)
            .ok_or_else(|| AnalysisError::NotFound(format!("No data found for symbol {}", symbol)))
    }

    /// Session move for each symbol, in input order. Symbols that fail are skipped.
    pub async fn trending(&self, symbols: &[String]) -> Vec<TrendingEntry> {
        let lookups = symbols.iter().map(|symbol| async move {
            let bar = self.latest_session(symbol).await?;
            let name = self.market.company_name(symbol).await;
            Ok::<_, AnalysisError>(TrendingEntry::from_session(symbol, name, &bar))
        });

        join_all(lookups)
            .await
            .into_iter()
            .zip(symbols)
            .filter_map(|(result, symbol)| match result {
                Ok(entry) => Some(entry),
                Err(e) => {
                    // one bad symbol must not fail the batch
                    tracing::error!("Error getting data for {}: {}", symbol, e);
                    None
                }
            })
            .collect()
    }
}
