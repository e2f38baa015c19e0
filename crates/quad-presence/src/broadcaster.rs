// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Derives online/offline events from registry mutations.

use std::sync::Arc;

use quad_core::{ConnectionHandle, ServerEvent, UserId};
use tracing::{debug, warn};

use crate::registry::{ConnectionEntry, ConnectionRegistry, Registration};

/// Registry front door that announces presence changes.
///
/// `user:online` is sent only when a user goes from offline to online; a
/// reconnect that supersedes a live session is not a presence change.
#[derive(Clone)]
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Registers the connection and announces the user to everyone else.
    pub fn connect(&self, user_id: UserId, connection: ConnectionHandle) -> Registration {
        let registration = self.registry.register(user_id.clone(), connection);
        if registration.came_online() {
            self.announce(&user_id, ServerEvent::UserOnline(user_id.clone()));
        }
        registration
    }

    /// Unregisters the connection and, if it was still live, announces the
    /// user as offline.
    pub fn disconnect(&self, connection: &ConnectionHandle) -> Option<ConnectionEntry> {
        let removed = self.registry.unregister(connection)?;
        self.announce(
            &removed.user_id,
            ServerEvent::UserOffline(removed.user_id.clone()),
        );
        Some(removed)
    }

    fn announce(&self, subject: &UserId, event: ServerEvent) {
        let mut delivered = 0usize;
        for entry in self.registry.entries() {
            if &entry.user_id == subject {
                continue;
            }
            match entry.connection.emit(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(user_id = %entry.user_id, error = %e, "presence emit failed (non-fatal)")
                }
            }
        }
        debug!(user_id = %subject, event = event.name(), delivered, "presence broadcast");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quad_core::{EventReceiver, SystemClock};

    fn presence() -> PresenceBroadcaster {
        PresenceBroadcaster::new(Arc::new(ConnectionRegistry::new(Arc::new(SystemClock))))
    }

    fn drain(rx: &mut EventReceiver) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn online_goes_to_others_only() {
        let p = presence();
        let (alice, mut alice_rx) = ConnectionHandle::channel();
        let (bob, mut bob_rx) = ConnectionHandle::channel();

        p.connect("alice".into(), alice);
        p.connect("bob".into(), bob);

        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::UserOnline("bob".into())]
        );
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[test]
    fn reconnect_is_not_announced() {
        let p = presence();
        let (alice, _alice_rx) = ConnectionHandle::channel();
        let (bob, mut bob_rx) = ConnectionHandle::channel();
        let (bob_again, _bob_again_rx) = ConnectionHandle::channel();

        p.connect("alice".into(), alice);
        p.connect("bob".into(), bob);
        let (alice2, _alice2_rx) = ConnectionHandle::channel();
        p.connect("alice".into(), alice2);
        p.connect("bob".into(), bob_again);

        assert_eq!(drain(&mut bob_rx), vec![ServerEvent::SessionReplaced {}]);
    }

    #[test]
    fn offline_only_for_live_connection() {
        let p = presence();
        let (alice, mut alice_rx) = ConnectionHandle::channel();
        let (bob_old, _old_rx) = ConnectionHandle::channel();
        let (bob_new, _new_rx) = ConnectionHandle::channel();

        p.connect("alice".into(), alice);
        p.connect("bob".into(), bob_old.clone());
        p.connect("bob".into(), bob_new.clone());
        drain(&mut alice_rx);

        assert!(p.disconnect(&bob_old).is_none());
        assert!(drain(&mut alice_rx).is_empty());

        assert!(p.disconnect(&bob_new).is_some());
        assert_eq!(
            drain(&mut alice_rx),
            vec![ServerEvent::UserOffline("bob".into())]
        );
    }
}
