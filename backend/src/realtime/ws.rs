//! WebSocket transport for realtime sessions.
//!
//! Each socket gets a bounded outbound queue. A writer task drains it into
//! the socket while the read loop dispatches control messages to the
//! connection's `Session`.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use common::{ClientMessage, ServerEvent};
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::registry::{ConnectionRegistry, EventSink};
use super::session::{DisconnectReason, Session};
use crate::web_server::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let registry = Arc::clone(state.gateway.registry());
    let buffer = state.outbound_buffer;
    ws.on_upgrade(move |socket| handle_socket(socket, registry, buffer))
}

async fn handle_socket(socket: WebSocket, registry: Arc<ConnectionRegistry>, buffer: usize) {
    let id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<Arc<ServerEvent>>(buffer.max(1));

    let mut session = match Session::connect(registry, id.clone(), Arc::new(tx.clone())) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Rejecting socket: {}", e);
            return;
        }
    };
    tracing::info!(connection = %id, "Socket connected");

    let hello = ServerEvent::new("connected", json!({ "id": id }));
    let _ = tx.deliver(Arc::new(hello));

    let (ws_sink, ws_stream) = socket.split();
    let writer = tokio::spawn(forward_outgoing(ws_sink, rx));

    let reason = process_incoming(ws_stream, &mut session, &tx).await;
    writer.abort();

    if let Err(e) = session.disconnect(&reason) {
        tracing::debug!(connection = %id, "Disconnect after unregister: {}", e);
    }
    tracing::info!(connection = %id, %reason, "Socket disconnected");
}

async fn forward_outgoing(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outgoing_rx: mpsc::Receiver<Arc<ServerEvent>>,
) {
    while let Some(event) = outgoing_rx.recv().await {
        match serde_json::to_string(event.as_ref()) {
            Ok(text) => {
                if ws_sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => tracing::error!("Failed to serialize event {}: {}", event.event, e),
        }
    }
}

async fn process_incoming(
    mut ws_stream: SplitStream<WebSocket>,
    session: &mut Session,
    replies: &mpsc::Sender<Arc<ServerEvent>>,
) -> DisconnectReason {
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => dispatch(session, text.as_str(), replies),
            Ok(Message::Close(_)) => return DisconnectReason::ClientClosed,
            // Pings are answered by axum; binary frames carry nothing we understand.
            Ok(_) => {}
            Err(e) => return DisconnectReason::TransportError(e.to_string()),
        }
    }
    DisconnectReason::ClientClosed
}

fn dispatch(session: &mut Session, text: &str, replies: &mpsc::Sender<Arc<ServerEvent>>) {
    let outcome = serde_json::from_str::<ClientMessage>(text)
        .map_err(|e| format!("Invalid message: {e}"))
        .and_then(|message| session.handle(message).map_err(|e| e.to_string()));

    if let Err(message) = outcome {
        tracing::warn!(connection = %session.id(), "{}", message);
        let error = ServerEvent::new("error", json!({ "message": message }));
        let _ = replies.deliver(Arc::new(error));
    }
}
