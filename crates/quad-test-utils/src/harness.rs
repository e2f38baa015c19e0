// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end tests of the real-time core.
//!
//! `TestHarness` assembles presence, delivery, calls, and escalation over a
//! [`MemoryStore`] and a [`ManualClock`], fronted by the same [`Hub`] the
//! WebSocket transport uses. Clients are driven by handing the hub decoded
//! events, so tests exercise every path except the socket itself.

use std::sync::Arc;
use std::time::Duration;

use quad_calls::CallCoordinator;
use quad_core::{ClientEvent, Role, ServerEvent, UserId};
use quad_escalation::{EscalationPolicy, EscalationScheduler};
use quad_gateway::{ClientSession, Hub};
use quad_messaging::DeliveryPipeline;
use quad_presence::{ConnectionRegistry, PresenceBroadcaster};

use crate::client::TestClient;
use crate::clock::ManualClock;
use crate::memory_store::MemoryStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    ring_timeout: Duration,
    policy: EscalationPolicy,
    users: Vec<(String, Role, Option<String>)>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            ring_timeout: Duration::from_secs(30),
            policy: EscalationPolicy::default(),
            users: Vec::new(),
        }
    }

    /// Set how long an unanswered call rings.
    pub fn with_ring_timeout(mut self, timeout: Duration) -> Self {
        self.ring_timeout = timeout;
        self
    }

    /// Set escalation thresholds and department.
    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add a directory entry visible when escalation targets are resolved.
    pub fn with_user(mut self, id: &str, role: Role, department: Option<&str>) -> Self {
        self.users
            .push((id.to_string(), role, department.map(str::to_string)));
        self
    }

    /// Build the harness and resolve escalation targets.
    pub async fn build(self) -> TestHarness {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new());
        for (id, role, department) in &self.users {
            store.add_user(id, *role, department.as_deref()).await;
        }

        let registry = Arc::new(ConnectionRegistry::new(clock.clone()));
        let pipeline = Arc::new(DeliveryPipeline::new(
            store.clone(),
            registry.clone(),
            clock.clone(),
        ));
        let calls = CallCoordinator::new(registry.clone(), clock.clone(), self.ring_timeout);
        let scheduler = Arc::new(
            EscalationScheduler::start(
                store.clone(),
                store.clone(),
                store.clone(),
                pipeline.clone(),
                clock.clone(),
                self.policy,
            )
            .await,
        );
        let hub = Arc::new(Hub::new(
            PresenceBroadcaster::new(registry),
            pipeline,
            calls,
        ));

        TestHarness {
            clock,
            store,
            scheduler,
            hub,
        }
    }
}

/// A fully wired core with in-memory collaborators.
pub struct TestHarness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub scheduler: Arc<EscalationScheduler>,
    pub hub: Arc<Hub>,
}

impl TestHarness {
    /// Create a builder with a 30 second ring timeout and default policy.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Open a connection for `user` and send `join`.
    ///
    /// The `join:success` reply is consumed; anything else stays queued.
    pub async fn join(&self, user: &str) -> Peer {
        let mut peer = self.open(user);
        self.send(&mut peer, ClientEvent::Join(user.into())).await;
        let mut rest = Vec::new();
        for event in peer.client.drain() {
            if !matches!(event, ServerEvent::JoinSuccess { .. }) {
                rest.push(event);
            }
        }
        peer.backlog = rest;
        peer
    }

    /// Open a connection without joining.
    pub fn open(&self, user: &str) -> Peer {
        let client = TestClient::new(user);
        let session = self.hub.open(client.handle());
        Peer {
            client,
            session: Some(session),
            backlog: Vec::new(),
        }
    }

    /// Deliver one client event from `peer` to the hub.
    pub async fn send(&self, peer: &mut Peer, event: ClientEvent) {
        if let Some(session) = peer.session.as_mut() {
            self.hub.handle(session, event).await;
        }
    }

    /// Deliver one raw text frame from `peer` to the hub.
    pub async fn send_frame(&self, peer: &mut Peer, frame: &str) {
        if let Some(session) = peer.session.as_mut() {
            self.hub.handle_frame(session, frame).await;
        }
    }

    /// Close `peer`'s connection as the transport would.
    pub fn disconnect(&self, peer: &mut Peer) {
        if let Some(session) = peer.session.take() {
            self.hub.close(session);
        }
    }

    /// Whether `user` currently has a live connection.
    pub fn is_online(&self, user: &str) -> bool {
        self.hub.registry().is_online(&UserId::from(user))
    }
}

/// One client connection driven through the hub.
pub struct Peer {
    client: TestClient,
    session: Option<ClientSession>,
    backlog: Vec<ServerEvent>,
}

impl Peer {
    pub fn user_id(&self) -> &UserId {
        &self.client.user_id
    }

    /// Every event received so far, without waiting.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = std::mem::take(&mut self.backlog);
        events.extend(self.client.drain());
        events
    }

    /// Received events with the given wire name.
    pub fn drain_named(&mut self, name: &str) -> Vec<ServerEvent> {
        self.drain().into_iter().filter(|e| e.name() == name).collect()
    }

    /// Wait briefly for the next event.
    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        if !self.backlog.is_empty() {
            return Some(self.backlog.remove(0));
        }
        self.client.next_event().await
    }
}
