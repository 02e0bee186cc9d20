//! WebSocket handler for real-time event streaming

use axum::{
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::api::{error::ApiResult, state::ApiState, types::StreamQuery};
use crate::events::MonitorEvent;

/// WebSocket upgrade handler
///
/// GET /api/v1/stream?device=<id>
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
    Query(query): Query<StreamQuery>,
) -> ApiResult<Response> {
    if let Some(device) = &query.device {
        state.monitor(device)?;
    }
    Ok(ws.on_upgrade(move |socket| handle_websocket(socket, state, query.device)))
}

/// `true` when `event` passes the optional device filter
pub fn matches_filter(event: &MonitorEvent, device: Option<&str>) -> bool {
    device.is_none_or(|id| event.device_id() == id)
}

async fn handle_websocket(socket: WebSocket, state: ApiState, device: Option<String>) {
    info!(device = ?device, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events = state.gateway.subscribe();

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {skipped} events");
                    continue;
                }
                Err(RecvError::Closed) => {
                    debug!("Event channel closed");
                    break;
                }
            };

            if !matches_filter(&event, device.as_deref()) {
                continue;
            }

            match serde_json::to_string(&event) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(e) => warn!("failed to serialize {} event: {e}", event.kind()),
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}
