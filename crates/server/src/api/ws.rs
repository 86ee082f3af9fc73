//! WebSocket search sessions.
//!
//! A client sends `{"action": "search", ...}` and receives every
//! orchestrator event of that query as it happens. A new search from the
//! same socket cancels the previous one; so does `{"action": "cancel"}` or
//! closing the socket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use indexhub_core::OrchestratorEvent;

use super::search::SearchRequest;
use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_MESSAGES_SENT};
use crate::state::AppState;

/// Message received from clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientMessage {
    Search(SearchRequest),
    Cancel,
}

fn event_type(event: &OrchestratorEvent) -> &'static str {
    match event {
        OrchestratorEvent::SourceResult { .. } => "source_result",
        OrchestratorEvent::QueryFinished { .. } => "query_finished",
        OrchestratorEvent::SourcesInitialized { .. } => "sources_initialized",
        OrchestratorEvent::SourceInitProcessed(_) => "source_init_processed",
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = unbounded_channel::<OrchestratorEvent>();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();
    info!("WebSocket client connected");

    // Forward orchestrator events to this client
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            WS_MESSAGES_SENT
                .with_label_values(&[event_type(&event)])
                .inc();
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => error!("Failed to serialize event: {}", e),
            }
        }
    });

    let mut current: Option<CancellationToken> = None;

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Search(request)) => {
                    if let Some(previous) = current.take() {
                        previous.cancel();
                    }
                    let cancel = CancellationToken::new();
                    current = Some(cancel.clone());

                    let orchestrator = Arc::clone(state.orchestrator());
                    let events = tx.clone();
                    let query = request.into_query();
                    debug!(query_id = %query.id, term = %query.term, "WebSocket search");
                    tokio::spawn(async move {
                        if let Err(e) = orchestrator.execute(query, cancel, events).await {
                            warn!("WebSocket search failed: {}", e);
                        }
                    });
                }
                Ok(ClientMessage::Cancel) => {
                    if let Some(token) = current.take() {
                        token.cancel();
                    }
                }
                Err(e) => warn!("Ignoring malformed WebSocket message: {}", e),
            },
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(_) => {
                // Ping/pong is handled by axum
            }
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    if let Some(token) = current {
        token.cancel();
    }
    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parse_client_messages() {
        let message: ClientMessage =
            serde_json::from_str(r#"{"action": "search", "query": "ubuntu", "limit": 5}"#).unwrap();
        match message {
            ClientMessage::Search(request) => {
                assert_eq!(request.term, "ubuntu");
                assert_eq!(request.limit, Some(5));
            }
            other => panic!("unexpected message {:?}", other),
        }

        let message: ClientMessage = serde_json::from_str(r#"{"action": "cancel"}"#).unwrap();
        assert!(matches!(message, ClientMessage::Cancel));

        assert!(serde_json::from_str::<ClientMessage>(r#"{"action": "dance"}"#).is_err());
    }

    #[test]
    fn test_event_type_labels() {
        assert_eq!(
            event_type(&OrchestratorEvent::QueryFinished {
                query_id: Uuid::nil()
            }),
            "query_finished"
        );
        assert_eq!(
            event_type(&OrchestratorEvent::SourcesInitialized { count: 3 }),
            "sources_initialized"
        );
    }
}
