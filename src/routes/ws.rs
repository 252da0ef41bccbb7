//! WebSocket stream of execution events for operators

use axum::extract::ws::{Message, WebSocket};
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::OperatorEvent;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct StreamFilter {
    /// Only forward events about this system
    pub system_id: Option<Uuid>,
}

impl StreamFilter {
    fn accepts(&self, event: &OperatorEvent) -> bool {
        let Some(wanted) = self.system_id else {
            return true;
        };
        match event {
            OperatorEvent::Execution(entry) => entry.system_id == wanted,
            OperatorEvent::LogDropped { system_id, .. } => *system_id == wanted,
            OperatorEvent::LogFlushFailed { .. } => true,
        }
    }
}

/// GET /api/v1/executions/ws?system_id=
///
/// Upgrades connection to WebSocket and streams every recorded execution,
/// plus log drop and flush failure notices.
pub async fn ws_handler(
    State(state): State<AppState>,
    Query(filter): Query<StreamFilter>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, filter))
}

async fn handle_socket(socket: WebSocket, state: AppState, filter: StreamFilter) {
    info!(system_id = ?filter.system_id, "WebSocket client connected");
    state.metrics.inc_ws_connections();

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.logger.subscribe();

    let send_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !filter.accepts(&event) {
                        continue;
                    }
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize operator event");
                            continue;
                        }
                    };

                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(lagged = count, "Operator stream lagged, some events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    });

    // Drain client frames until close (pongs are answered by axum)
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.metrics.dec_ws_connections();
    info!("WebSocket client disconnected");
}
