// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport gateway for the Quad real-time core.
//!
//! The [`Hub`] turns decoded client events into calls on the presence,
//! messaging, and call modules and maps every failure back onto an event
//! for the originating connection. The axum server carries those events
//! over WebSocket and exposes health, metrics, and presence over HTTP.

pub mod auth;
pub mod handlers;
pub mod hub;
pub mod server;
pub mod ws;

pub use hub::{ClientSession, Hub};
pub use server::{build_router, serve, start_server, GatewayState, HealthState, ServerConfig};
