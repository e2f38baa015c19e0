// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message delivery pipeline.
//!
//! Owns the per-message status machine (`sending -> sent -> delivered ->
//! read`, or `sending -> failed`) and routes status and payload events to
//! the sender and receiver through the connection registry.

pub mod pipeline;

pub use pipeline::DeliveryPipeline;
