// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authoritative mapping from user identity to at most one live connection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use quad_core::{Clock, ConnectionHandle, ConnectionId, ServerEvent, UserId};
use tracing::{debug, info, warn};

/// One live connection owned by a user.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub user_id: UserId,
    pub connection: ConnectionHandle,
    pub connected_at: DateTime<Utc>,
}

/// Result of registering a connection.
#[derive(Debug)]
pub struct Registration {
    /// The entry that was superseded, if the user was already connected.
    pub replaced: Option<ConnectionEntry>,
}

impl Registration {
    /// True when the user had no live connection before this registration.
    pub fn came_online(&self) -> bool {
        self.replaced.is_none()
    }
}

/// Process-local connection registry.
///
/// State is not persisted; after a restart every user is offline until they
/// reconnect.
pub struct ConnectionRegistry {
    by_user: DashMap<UserId, ConnectionEntry>,
    by_connection: DashMap<ConnectionId, UserId>,
    clock: Arc<dyn Clock>,
}

impl ConnectionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            by_user: DashMap::new(),
            by_connection: DashMap::new(),
            clock,
        }
    }

    /// Registers `connection` as the live connection for `user_id`.
    ///
    /// Last writer wins: an existing connection for the same user is sent
    /// `session:replaced` once and then dropped from the registry.
    pub fn register(&self, user_id: UserId, connection: ConnectionHandle) -> Registration {
        let entry = ConnectionEntry {
            user_id: user_id.clone(),
            connection: connection.clone(),
            connected_at: self.clock.now(),
        };
        self.by_connection
            .insert(connection.id().clone(), user_id.clone());
        let previous = self.by_user.insert(user_id.clone(), entry);

        let replaced = match previous {
            Some(old) if old.connection.same_connection(&connection) => {
                debug!(user_id = %user_id, "connection re-registered");
                None
            }
            Some(old) => {
                self.by_connection
                    .remove_if(old.connection.id(), |_, owner| owner == &user_id);
                if let Err(e) = old.connection.emit(ServerEvent::SessionReplaced {}) {
                    warn!(user_id = %user_id, error = %e, "superseded connection already gone");
                }
                info!(
                    user_id = %user_id,
                    old_connection = %old.connection.id(),
                    new_connection = %connection.id(),
                    "session replaced"
                );
                Some(old)
            }
            None => {
                info!(user_id = %user_id, connection_id = %connection.id(), "user connected");
                None
            }
        };

        quad_prometheus::set_connections_online(self.count());
        Registration { replaced }
    }

    /// Removes the entry owned by `connection`.
    ///
    /// Does nothing if the user has since registered a newer connection.
    /// Returns the removed entry.
    pub fn unregister(&self, connection: &ConnectionHandle) -> Option<ConnectionEntry> {
        let (_, user_id) = self.by_connection.remove(connection.id())?;
        let removed = self
            .by_user
            .remove_if(&user_id, |_, entry| entry.connection.same_connection(connection))
            .map(|(_, entry)| entry);

        match &removed {
            Some(_) => {
                info!(user_id = %user_id, connection_id = %connection.id(), "user disconnected");
                quad_prometheus::set_connections_online(self.count());
            }
            None => {
                debug!(
                    user_id = %user_id,
                    connection_id = %connection.id(),
                    "stale disconnect ignored"
                );
            }
        }
        removed
    }

    /// The live connection for `user_id`, if any.
    pub fn resolve(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.connection.clone())
    }

    /// The user owning a connection id.
    pub fn user_for(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.by_connection
            .get(connection_id)
            .map(|user| user.value().clone())
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.by_user.contains_key(user_id)
    }

    /// Number of online users.
    pub fn count(&self) -> usize {
        self.by_user.len()
    }

    /// Ids of all online users, sorted.
    pub fn list_online(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.by_user.iter().map(|e| e.key().clone()).collect();
        users.sort();
        users
    }

    /// Snapshot of every live entry, sorted by user id.
    pub fn entries(&self) -> Vec<ConnectionEntry> {
        let mut entries: Vec<ConnectionEntry> =
            self.by_user.iter().map(|e| e.value().clone()).collect();
        entries.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        entries
    }
}
