// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Quad integration tests.
//!
//! Provides in-memory collaborators and harness infrastructure for fast,
//! deterministic tests without a database or sockets.
//!
//! # Components
//!
//! - [`MemoryStore`] - Message, issue, and directory store with failure injection
//! - [`ManualClock`] - Clock that only moves when told to
//! - [`TestClient`] - A connection handle paired with its event receiver
//! - [`TestHarness`] - Every module wired around a [`quad_gateway::Hub`]

pub mod client;
pub mod clock;
pub mod harness;
pub mod memory_store;

pub use client::TestClient;
pub use clock::ManualClock;
pub use harness::{Peer, TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryStore;
