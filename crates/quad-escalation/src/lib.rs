// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation of unresolved issues through the assignee hierarchy.
//!
//! The [`EscalationScheduler`] runs one sweep at a time: issues that have sat
//! at a level past its threshold have their original report forwarded to the
//! next rung's holder and are advanced. The [`EscalationRunner`] repeats the
//! sweep on an interval until cancelled.

pub mod runner;
pub mod scheduler;

pub use runner::EscalationRunner;
pub use scheduler::{EscalationPolicy, EscalationScheduler, EscalationTargets, SweepReport};
