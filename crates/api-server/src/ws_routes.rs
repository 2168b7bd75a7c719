use std::sync::Arc;

use analysis_core::MarketAlert;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;

pub type ConnectionId = Uuid;

// ---------------------------------------------------------------------------
// Wire messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    StockSubscribe { symbol: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    StockUpdate {
        symbol: String,
        price: f64,
        volume: u64,
        timestamp: DateTime<Utc>,
    },
    MarketAlert(MarketAlert),
}

// ---------------------------------------------------------------------------
// Connection registry
// ---------------------------------------------------------------------------

struct Connection {
    client_id: String,
    outbound: mpsc::UnboundedSender<String>,
}

/// Open WebSocket sessions, keyed by a per-session id.
///
/// Each entry holds the sending half of a channel drained by that session's
/// writer task, so delivery never blocks on a socket.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<ConnectionId, Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, client_id: &str, outbound: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            Connection {
                client_id: client_id.to_string(),
                outbound,
            },
        );
        id
    }

    pub fn remove(&self, id: &ConnectionId) {
        self.connections.remove(id);
    }

    /// Returns whether the message was handed to the session's writer.
    pub fn send_to(&self, id: &ConnectionId, message: &ServerMessage) -> bool {
        let Some(text) = encode(message) else {
            return false;
        };
        match self.connections.get(id) {
            Some(conn) => conn.outbound.send(text).is_ok(),
            None => false,
        }
    }

    /// Deliver to every open session; returns how many accepted it.
    pub fn broadcast(&self, message: &ServerMessage) -> usize {
        let Some(text) = encode(message) else {
            return 0;
        };

        let mut delivered = 0;
        for entry in self.connections.iter() {
            if entry.outbound.send(text.clone()).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!("Skipping closed connection for client {}", entry.client_id);
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    serde_json::to_string(message)
        .map_err(|e| tracing::error!("Failed to encode websocket message: {}", e))
        .ok()
}

// ---------------------------------------------------------------------------
// WebSocket handler: /ws/:client_id
// ---------------------------------------------------------------------------

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, client_id, state))
}

async fn handle_socket(socket: WebSocket, client_id: String, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<String>();

    let connection_id = state.connections.add(&client_id, outbound);
    tracing::info!(
        "Client {} connected ({} open connections)",
        client_id,
        state.connections.len()
    );

    let mut send_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => handle_client_text(&recv_state, &connection_id, &text).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.connections.remove(&connection_id);
    tracing::info!("Client {} disconnected", client_id);
}

async fn handle_client_text(state: &AppState, connection_id: &ConnectionId, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Ignoring websocket frame: {}", e);
            return;
        }
    };

    match message {
        ClientMessage::StockSubscribe { symbol } => {
            let symbol = symbol.trim().to_uppercase();
            match state.orchestrator.latest_session(&symbol).await {
                Ok(bar) => {
                    let update = ServerMessage::StockUpdate {
                        symbol,
                        price: bar.close,
                        volume: bar.volume.max(0.0).round() as u64,
                        timestamp: Utc::now(),
                    };
                    state.connections.send_to(connection_id, &update);
                }
                // the session stays open without a reply
                Err(e) => tracing::error!("Error getting stock update for {}: {}", symbol, e),
            }
        }
    }
}

pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws/:client_id", get(ws_handler))
}
