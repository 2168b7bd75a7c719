use analysis_core::{AnalysisError, Bar, MarketDataProvider, NewsItem, Period};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const BASE_URL: &str = "https://api.polygon.io";

/// Key used when no market-data key is configured; only good for sandbox tickers.
pub const DEMO_API_KEY: &str = "demo";

#[derive(Clone)]
pub struct PolygonClient {
    api_key: String,
    base_url: String,
    client: Client,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            api_key,
            base_url: BASE_URL.to_string(),
            client,
        }
    }

    /// Point the client at another host, e.g. a recording proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, AnalysisError> {
        tracing::debug!("Polygon GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(query)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(AnalysisError::Upstream(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response.json().await.map_err(transport_error)
    }

    /// Get aggregates (bars) for a symbol, ascending by time
    pub async fn get_aggregates(
        &self,
        symbol: &str,
        multiplier: u32,
        timespan: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>, AnalysisError> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.base_url,
            symbol,
            multiplier,
            timespan,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d")
        );

        let agg_response: AggregateResponse = self
            .get_json(
                &url,
                &[
                    ("adjusted", "true".to_string()),
                    ("sort", "asc".to_string()),
                    ("limit", "50000".to_string()),
                ],
            )
            .await?;

        Ok(agg_response.into_bars())
    }

    /// Get the latest news articles for a ticker
    pub async fn get_news(&self, symbol: &str, limit: u32) -> Result<Vec<NewsItem>, AnalysisError> {
        let url = format!("{}/v2/reference/news", self.base_url);

        let news_response: NewsResponse = self
            .get_json(
                &url,
                &[
                    ("ticker", symbol.to_string()),
                    ("limit", limit.to_string()),
                    ("order", "desc".to_string()),
                    ("sort", "published_utc".to_string()),
                ],
            )
            .await?;

        Ok(news_response.into_items())
    }

    /// Get ticker details
    pub async fn get_ticker_details(&self, symbol: &str) -> Result<TickerDetails, AnalysisError> {
        let url = format!("{}/v3/reference/tickers/{}", self.base_url, symbol);

        let details_response: TickerDetailsResponse = self.get_json(&url, &[]).await?;

        Ok(details_response.results)
    }
}

#[async_trait]
impl MarketDataProvider for PolygonClient {
    async fn daily_bars(&self, symbol: &str, period: Period) -> Result<Vec<Bar>, AnalysisError> {
        let (from, to) = period.date_range(Utc::now());
        let mut bars = self.get_aggregates(symbol, 1, "day", from, to).await?;

        if let Some(limit) = period.bar_limit() {
            let skip = bars.len().saturating_sub(limit);
            bars.drain(..skip);
        }
        Ok(bars)
    }

    async fn news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsItem>, AnalysisError> {
        let limit = u32::try_from(limit).unwrap_or(u32::MAX);
        self.get_news(symbol, limit).await
    }

    async fn company_name(&self, symbol: &str) -> Result<String, AnalysisError> {
        let details = self.get_ticker_details(symbol).await?;
        if details.name.trim().is_empty() {
            Ok(details.ticker)
        } else {
            Ok(details.name)
        }
    }
}

// request urls carry query parameters; keep them out of error text
fn transport_error(e: reqwest::Error) -> AnalysisError {
    AnalysisError::Upstream(e.without_url().to_string())
}

// Response types
#[derive(Debug, Deserialize)]
struct AggregateResponse {
    #[serde(default)]
    results: Vec<AggregateResult>,
}

#[derive(Debug, Deserialize)]
struct AggregateResult {
    t: i64, // timestamp
    o: f64, // open
    h: f64, // high
    l: f64, // low
    c: f64, // close
    v: f64, // volume
}

impl AggregateResponse {
    fn into_bars(self) -> Vec<Bar> {
        let mut bars: Vec<Bar> = self
            .results
            .into_iter()
            .filter_map(|r| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp_millis(r.t)?,
                    open: r.o,
                    high: r.h,
                    low: r.l,
                    close: r.c,
                    volume: r.v,
                })
            })
            .collect();
        bars.sort_by_key(|b| b.timestamp);
        bars
    }
}

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    results: Vec<NewsResult>,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    title: String,
    article_url: String,
    description: Option<String>,
}

impl NewsResponse {
    fn into_items(self) -> Vec<NewsItem> {
        self.results
            .into_iter()
            .map(|r| NewsItem {
                title: r.title,
                summary: r.description.unwrap_or_default(),
                link: r.article_url,
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct TickerDetailsResponse {
    results: TickerDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: String,
}
