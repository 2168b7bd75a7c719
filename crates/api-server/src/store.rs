//! Document store for completed analyses.
//!
//! Each row keeps the request metadata in plain columns and the full
//! [`AgentAnalysis`] as a JSON document. Writes happen once per request and
//! rows are never updated.

use analysis_core::AgentAnalysis;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{any::AnyPoolOptions, AnyPool, Row};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Analyze,
    Chat,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisKind::Analyze => "analyze",
            AnalysisKind::Chat => "chat",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "analyze" => Ok(AnalysisKind::Analyze),
            "chat" => Ok(AnalysisKind::Chat),
            other => anyhow::bail!("unknown analysis kind '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: Uuid,
    pub kind: AnalysisKind,
    pub symbol: String,
    pub timeframe: String,
    pub query: String,
    pub created_at: DateTime<Utc>,
    pub analysis: AgentAnalysis,
}

impl StoredAnalysis {
    pub fn new(
        kind: AnalysisKind,
        symbol: &str,
        timeframe: &str,
        query: &str,
        analysis: AgentAnalysis,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            query: query.to_string(),
            created_at: Utc::now(),
            analysis,
        }
    }
}

#[derive(Clone)]
pub struct AnalysisStore {
    pool: AnyPool,
}

impl AnalysisStore {
    /// Connect to `{url}/{db_name}`. SQLite files are created when missing.
    pub async fn connect(url: &str, db_name: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let full_url = database_url(url, db_name);
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(&full_url)
            .await
            .with_context(|| format!("Failed to connect to database '{}'", db_name))?;
        Ok(Self::new(pool))
    }

    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS stock_analyses (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                symbol TEXT NOT NULL,
                timeframe TEXT NOT NULL,
                query TEXT NOT NULL,
                created_at TEXT NOT NULL,
                analysis TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_stock_analyses_symbol
             ON stock_analyses (symbol, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert(&self, record: &StoredAnalysis) -> Result<()> {
        let document = serde_json::to_string(&record.analysis)?;

        sqlx::query(
            "INSERT INTO stock_analyses (id, kind, symbol, timeframe, query, created_at, analysis)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id.to_string())
        .bind(record.kind.as_str())
        .bind(&record.symbol)
        .bind(&record.timeframe)
        .bind(&record.query)
        .bind(timestamp_text(&record.created_at))
        .bind(document)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store analysis for {}", record.symbol))?;

        Ok(())
    }

    /// Newest first.
    pub async fn recent_for_symbol(&self, symbol: &str, limit: i64) -> Result<Vec<StoredAnalysis>> {
        let rows = sqlx::query(
            "SELECT id, kind, symbol, timeframe, query, created_at, analysis
             FROM stock_analyses
             WHERE symbol = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(symbol)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<StoredAnalysis> {
                let id: String = row.try_get("id")?;
                let kind: String = row.try_get("kind")?;
                let created_at: String = row.try_get("created_at")?;
                let document: String = row.try_get("analysis")?;

                Ok(StoredAnalysis {
                    id: Uuid::parse_str(&id)?,
                    kind: AnalysisKind::parse(&kind)?,
                    symbol: row.try_get("symbol")?,
                    timeframe: row.try_get("timeframe")?,
                    query: row.try_get("query")?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
                    analysis: serde_json::from_str(&document)?,
                })
            })
            .collect()
    }
}

fn database_url(url: &str, db_name: &str) -> String {
    let (base, params) = match url.split_once('?') {
        Some((base, params)) => (base, Some(params)),
        None => (url, None),
    };
    let mut full = format!("{}/{}", base.trim_end_matches('/'), db_name.trim_start_matches('/'));

    let mut params: Vec<&str> = params
        .into_iter()
        .flat_map(|p| p.split('&'))
        .filter(|p| !p.is_empty())
        .collect();
    if base.starts_with("sqlite:") && !params.iter().any(|p| p.starts_with("mode=")) {
        params.push("mode=rwc");
    }
    if !params.is_empty() {
        full.push('?');
        full.push_str(&params.join("&"));
    }
    full
}

// fixed width so text ordering matches time ordering
fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{RiskLevel, TechnicalSummary};
    use chrono::Duration;

    async fn memory_store() -> AnalysisStore {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory SQLite");
        let store = AnalysisStore::new(pool);
        store.init_tables().await.unwrap();
        store
    }

    fn analysis(text: &str) -> AgentAnalysis {
        AgentAnalysis {
            analysis: text.to_string(),
            recommendations: vec!["Bullish signal - 20-day SMA above 50-day SMA".to_string()],
            risk_level: RiskLevel::Low,
            confidence_score: 85.0,
            technical_indicators: TechnicalSummary {
                current_price: 190.25,
                sma_20: Some(185.0),
                sma_50: Some(180.0),
                rsi: Some(52.0),
                macd: None,
                volume: 1_000,
                price_change_pct: 1.5,
            },
        }
    }

    #[test]
    fn test_database_url_joins_name() {
        assert_eq!(
            database_url("postgres://user:pw@localhost:5432/", "stock_agent"),
            "postgres://user:pw@localhost:5432/stock_agent"
        );
        assert_eq!(
            database_url("postgres://localhost/?sslmode=disable", "stock_agent"),
            "postgres://localhost/stock_agent?sslmode=disable"
        );
    }

    #[test]
    fn test_database_url_sqlite_creates_missing_file() {
        assert_eq!(
            database_url("sqlite://data", "agent.db"),
            "sqlite://data/agent.db?mode=rwc"
        );
        assert_eq!(
            database_url("sqlite://data/?mode=ro", "agent.db"),
            "sqlite://data/agent.db?mode=ro"
        );
    }

    #[tokio::test]
    async fn test_connect_creates_new_sqlite_file() {
        let dir = std::env::temp_dir().join(format!("stock_agent_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let url = format!("sqlite://{}", dir.display());

        let store = AnalysisStore::connect(&url, "stock_agent.db").await.unwrap();
        store.init_tables().await.unwrap();
        let record = StoredAnalysis::new(AnalysisKind::Analyze, "NVDA", "1y", "q", analysis("fresh"));
        store.insert(&record).await.unwrap();

        assert!(dir.join("stock_agent.db").exists());
        assert_eq!(store.recent_for_symbol("NVDA", 5).await.unwrap().len(), 1);

        drop(store);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_recent_for_symbol_newest_first() {
        let store = memory_store().await;
        let base = Utc::now();

        let mut older = StoredAnalysis::new(AnalysisKind::Analyze, "AAPL", "1y", "first", analysis("older"));
        older.created_at = base - Duration::minutes(5);
        let newer = StoredAnalysis::new(AnalysisKind::Chat, "AAPL", "1y", "second", analysis("newer"));
        let other = StoredAnalysis::new(AnalysisKind::Analyze, "MSFT", "6mo", "third", analysis("msft"));

        store.insert(&older).await.unwrap();
        store.insert(&newer).await.unwrap();
        store.insert(&other).await.unwrap();

        let rows = store.recent_for_symbol("AAPL", 10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, newer.id);
        assert_eq!(rows[0].kind, AnalysisKind::Chat);
        assert_eq!(rows[0].analysis, newer.analysis);
        assert_eq!(rows[1].query, "first");

        let limited = store.recent_for_symbol("AAPL", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].analysis.analysis, "newer");

        assert!(store.recent_for_symbol("TSLA", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_init_tables_is_idempotent() {
        let store = memory_store().await;
        store.init_tables().await.unwrap();
    }
}
