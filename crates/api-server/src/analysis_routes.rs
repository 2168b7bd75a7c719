//! Analysis API Routes
//!
//! LLM-backed analysis and free-form chat about a symbol.

use analysis_core::{AgentAnalysis, MarketAlert, Period};
use axum::{extract::State, routing::{get, post}, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::store::{AnalysisKind, StoredAnalysis};
use crate::ws_routes::ServerMessage;
use crate::{AppError, AppState};

pub const ROOT_MESSAGE: &str = "AI Stock Market Agent API is running";

#[derive(Debug, Deserialize)]
pub struct StockRequest {
    pub symbol: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub symbol: String,
    pub query: String,
}

fn default_timeframe() -> String {
    Period::default().as_str().to_string()
}

pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/analyze", post(analyze_stock))
        .route("/api/chat", post(chat_with_agent))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": ROOT_MESSAGE }))
}

async fn analyze_stock(
    State(state): State<AppState>,
    Json(request): Json<StockRequest>,
) -> Result<Json<AgentAnalysis>, AppError> {
    let symbol = request.symbol.trim().to_uppercase();
    let period: Period = request.timeframe.parse()?;
    let query = format!("Provide comprehensive analysis for {}", symbol);

    let analysis = state.orchestrator.analyze(&symbol, period, &query).await?;

    persist(
        &state,
        StoredAnalysis::new(AnalysisKind::Analyze, &symbol, period.as_str(), &query, analysis.clone()),
    );

    let alert = MarketAlert {
        symbol: symbol.clone(),
        alert_type: "analysis_complete".to_string(),
        message: format!(
            "New analysis for {}: {} risk, {} recommendation(s)",
            symbol,
            analysis.risk_level.to_label(),
            analysis.recommendations.len()
        ),
        timestamp: Utc::now(),
    };
    let delivered = state.connections.broadcast(&ServerMessage::MarketAlert(alert));
    tracing::debug!("Market alert for {} delivered to {} client(s)", symbol, delivered);

    Ok(Json(analysis))
}

async fn chat_with_agent(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<AgentAnalysis>, AppError> {
    let symbol = request.symbol.trim().to_uppercase();
    let period = Period::default();

    let analysis = state
        .orchestrator
        .analyze(&symbol, period, &request.query)
        .await?;

    persist(
        &state,
        StoredAnalysis::new(AnalysisKind::Chat, &symbol, period.as_str(), &request.query, analysis.clone()),
    );

    Ok(Json(analysis))
}

/// Store in the background; a failed write never reaches the caller.
fn persist(state: &AppState, record: StoredAnalysis) {
    let store = state.store.clone();
    tokio::spawn(async move {
        if let Err(e) = store.insert(&record).await {
            tracing::error!("Failed to persist {} analysis for {}: {:#}", record.kind.as_str(), record.symbol, e);
        }
    });
}
