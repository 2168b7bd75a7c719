use std::sync::Arc;

use analysis_core::AnalysisError;
use analysis_orchestrator::AnalysisOrchestrator;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use llm_client::{ChatClient, LlmConfig};
use polygon_client::PolygonClient;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod analysis_routes;
pub mod config;
pub mod market_routes;
pub mod store;
pub mod ws_routes;


use analysis_routes::analysis_routes;
use config::AppConfig;
use market_routes::market_routes;
use store::AnalysisStore;
use ws_routes::{ws_routes, ConnectionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<AnalysisOrchestrator>,
    pub store: AnalysisStore,
    pub connections: ConnectionRegistry,
    pub trending_symbols: Arc<Vec<String>>,
}

/// Error returned by every handler, rendered as `{"detail": ...}`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::with_status(status, err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        }
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(analysis_routes())
        .merge(market_routes())
        .merge(ws_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `RUST_LOG` filter (default `info`); `RUST_LOG_FORMAT=json` for JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let polygon = PolygonClient::new(config.polygon_api_key.clone());
    let llm = ChatClient::new(
        LlmConfig::new(config.groq_api_key.clone())
            .with_base_url(config.llm_base_url.clone())
            .with_model(config.llm_model.clone()),
    )?;
    tracing::info!("LLM backend: {} ({})", config.llm_base_url, llm.model());

    let store = AnalysisStore::connect(&config.database_url, &config.db_name).await?;
    store.init_tables().await?;
    tracing::info!("Analysis store ready ({})", config.db_name);

    let state = AppState {
        orchestrator: Arc::new(AnalysisOrchestrator::new(Arc::new(polygon), Arc::new(llm))),
        store,
        connections: ConnectionRegistry::new(),
        trending_symbols: Arc::new(config.trending_symbols.clone()),
    };

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Stock agent API listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
