use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::services::feed::ChangeFeed;

/// Upgrade to a WebSocket carrying change events as JSON text frames.
pub async fn realtime_ws(
    ws: WebSocketUpgrade,
    Extension(feed): Extension<Arc<ChangeFeed>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_changes(socket, feed))
}

async fn stream_changes(mut socket: WebSocket, feed: Arc<ChangeFeed>) {
    let mut rx = feed.subscribe();
    debug!("Realtime subscriber connected");

    loop {
        match rx.recv().await {
            Ok(event) => {
                let payload = match serde_json::to_string(&event) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("Failed to serialize change event: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    debug!("Realtime subscriber disconnected");
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                // Client will re-derive its view on the next event anyway
                warn!("Realtime subscriber lagged, skipped {} events", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
