use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::handlers::{ApiState, RoomContext};
use crate::room::RoomId;
use crate::sync::CommittedBatch;

/// GET /api/subscribe - Live feed of a room's committed batches
///
/// Subscribes before upgrading so no batch committed after the handshake is
/// missed. 404 when fan-out is disabled.
pub async fn subscribe_handler(
    State(state): State<ApiState>,
    RoomContext(room): RoomContext,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(rx) = state.sync.subscribe(&room) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    ws.on_upgrade(move |socket| handle_subscriber(socket, room, rx))
}

async fn handle_subscriber(
    socket: WebSocket,
    room: RoomId,
    mut rx: broadcast::Receiver<Arc<CommittedBatch>>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    info!("Subscriber joined room {}", room);

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("Subscriber socket error in room {}: {}", room, e);
                        break;
                    }
                }
            }

            result = rx.recv() => {
                match result {
                    Ok(batch) => match serde_json::to_string(batch.as_ref()) {
                        Ok(json) => {
                            if let Err(e) = ws_tx.send(Message::Text(json.into())).await {
                                debug!("Failed to push batch to room {}: {}", room, e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to serialize batch: {}", e),
                    },
                    // Skipped batches are recovered through catch-up.
                    Err(RecvError::Lagged(n)) => {
                        warn!("Subscriber in room {} lagged {} batches", room, n);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    info!("Subscriber left room {}", room);
}
