// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket transport for the real-time event protocol.
//!
//! Each socket gets a [`ConnectionHandle`]. A writer task drains the
//! handle's channel onto the wire as JSON text frames, so every event for a
//! connection is written in emit order. The read loop feeds text frames to
//! the [`Hub`](crate::Hub) until the peer goes away or the session is
//! replaced by a newer connection for the same user.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt, stream::SplitSink};
use quad_core::{ConnectionHandle, EventReceiver, ServerEvent};
use tracing::{debug, warn};

use crate::server::GatewayState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (handle, rx) = ConnectionHandle::channel();
    let connection_id = handle.id().clone();
    let mut session = state.hub.open(handle);

    let mut writer = tokio::spawn(write_events(ws_sender, rx));

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let text_str: &str = &text;
                    state.hub.handle_frame(&mut session, text_str).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // Binary and pings are not part of the protocol.
                Some(Err(e)) => {
                    debug!(connection_id = %connection_id, error = %e, "websocket read failed");
                    break;
                }
            },
            _ = &mut writer => {
                debug!(connection_id = %connection_id, "writer finished, closing read side");
                break;
            }
        }
    }

    state.hub.close(session);
    writer.abort();
}

/// Serializes queued events onto the socket.
///
/// A `session:replaced` notice is the last frame a connection receives
/// before the server closes it.
async fn write_events(mut sink: SplitSink<WebSocket, Message>, mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        let replaced = matches!(event, ServerEvent::SessionReplaced {});
        let text = match serde_json::to_string(&event) {
            Ok(t) => t,
            Err(e) => {
                warn!(event = event.name(), error = %e, "failed to encode event");
                continue;
            }
        };
        if sink.send(Message::Text(text.into())).await.is_err() {
            break;
        }
        if replaced {
            let _ = sink.send(Message::Close(None)).await;
            break;
        }
    }
}
