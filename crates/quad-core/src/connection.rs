// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport-agnostic handle to one live client connection.
//!
//! The transport (WebSocket, test harness) owns the receiving half and writes
//! events to the wire in the order they were emitted. Components only ever
//! see the handle.

use tokio::sync::mpsc;

use crate::error::QuadError;
use crate::events::ServerEvent;
use crate::types::ConnectionId;

/// Receiving half held by the transport writer task.
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

/// Cheap, cloneable handle used to emit events to one connection.
///
/// The channel is unbounded so an emit never blocks the event path and
/// per-connection ordering is preserved.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Creates a handle with a fresh connection id and its receiving half.
    pub fn channel() -> (Self, EventReceiver) {
        Self::with_id(ConnectionId::generate())
    }

    /// Creates a handle with a caller-chosen id.
    pub fn with_id(id: ConnectionId) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { id, tx }, rx)
    }

    /// The connection id.
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Queues an event for this connection.
    ///
    /// Fails with [`QuadError::Transport`] when the transport side is gone.
    pub fn emit(&self, event: ServerEvent) -> Result<(), QuadError> {
        self.tx.send(event).map_err(|e| {
            QuadError::Transport(format!(
                "connection {} closed, dropped {}",
                self.id,
                e.0.name()
            ))
        })
    }

    /// Whether the transport side has dropped its receiver.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Whether two handles refer to the same live connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.id == other.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_preserves_order() {
        let (handle, mut rx) = ConnectionHandle::channel();
        handle.emit(ServerEvent::UserOnline("a".into())).unwrap();
        handle.emit(ServerEvent::UserOffline("a".into())).unwrap();
        assert_eq!(rx.recv().await, Some(ServerEvent::UserOnline("a".into())));
        assert_eq!(rx.recv().await, Some(ServerEvent::UserOffline("a".into())));
    }

    #[test]
    fn emit_after_receiver_dropped_is_transport_error() {
        let (handle, rx) = ConnectionHandle::channel();
        drop(rx);
        assert!(handle.is_closed());
        let err = handle.emit(ServerEvent::SessionReplaced {}).unwrap_err();
        assert!(matches!(err, QuadError::Transport(_)));
    }

    #[test]
    fn clones_share_identity() {
        let (a, _rx) = ConnectionHandle::channel();
        let b = a.clone();
        let (c, _rx2) = ConnectionHandle::channel();
        assert!(a.same_connection(&b));
        assert!(!a.same_connection(&c));
    }
}
