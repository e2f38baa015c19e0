// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process client connection that records the events it receives.

use std::time::Duration;

use quad_core::{ConnectionHandle, EventReceiver, ServerEvent, UserId};

/// How long [`TestClient::next_event`] waits before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// One fake client connection: a handle for the core and its receiving side.
pub struct TestClient {
    pub user_id: UserId,
    handle: ConnectionHandle,
    rx: EventReceiver,
}

impl TestClient {
    /// Create a disconnected client for `user`.
    pub fn new(user: &str) -> Self {
        let (handle, rx) = ConnectionHandle::channel();
        Self {
            user_id: user.into(),
            handle,
            rx,
        }
    }

    /// The handle the core emits to.
    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Wait for the next event, or `None` after a short timeout.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        tokio::time::timeout(RECV_TIMEOUT, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Every event already queued, without waiting.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Queued events with the given wire name.
    pub fn drain_named(&mut self, name: &str) -> Vec<ServerEvent> {
        self.drain().into_iter().filter(|e| e.name() == name).collect()
    }
}
