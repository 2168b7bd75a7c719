//! Market Data API Routes
//!
//! Price history with indicators, stored analyses and the trending board.

use analysis_core::{Period, TrendingEntry};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::store::StoredAnalysis;
use crate::{AppError, AppState};

pub const DEFAULT_HISTORY_LIMIT: i64 = 10;
pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    #[serde(default)]
    pub period: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StockDataPoint {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StockDataResponse {
    pub symbol: String,
    pub data: Vec<StockDataPoint>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisHistoryResponse {
    pub symbol: String,
    pub analyses: Vec<StoredAnalysis>,
}

#[derive(Debug, Serialize)]
pub struct TrendingResponse {
    pub trending_stocks: Vec<TrendingEntry>,
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stock/:symbol/data", get(get_stock_data))
        .route("/api/stock/:symbol/analyses", get(get_stock_analyses))
        .route("/api/market/trending", get(get_trending_stocks))
}

async fn get_stock_data(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<StockDataResponse>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    let period = match query.period.as_deref() {
        Some(raw) => raw.parse()?,
        None => Period::default(),
    };

    let history = state.orchestrator.market().fetch_history(&symbol, period).await?;

    let data = history
        .into_iter()
        .map(|enriched| StockDataPoint {
            date: enriched.bar.date(),
            open: enriched.bar.open,
            high: enriched.bar.high,
            low: enriched.bar.low,
            close: enriched.bar.close,
            volume: enriched.bar.volume.max(0.0).round() as u64,
            sma_20: enriched.indicators.sma_20,
            sma_50: enriched.indicators.sma_50,
            rsi: enriched.indicators.rsi_14,
        })
        .collect();

    Ok(Json(StockDataResponse { symbol, data }))
}

async fn get_stock_analyses(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<AnalysisHistoryResponse>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let analyses = state.store.recent_for_symbol(&symbol, limit).await?;

    Ok(Json(AnalysisHistoryResponse { symbol, analyses }))
}

async fn get_trending_stocks(State(state): State<AppState>) -> Json<TrendingResponse> {
    let trending_stocks = state.orchestrator.trending(&state.trending_symbols).await;
    Json(TrendingResponse { trending_stocks })
}
