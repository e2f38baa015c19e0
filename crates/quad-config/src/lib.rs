// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `quad.toml` model, loading, and diagnostics.
//!
//! ```no_run
//! let config = quad_config::load_and_validate(None).expect("config errors");
//! println!("gateway on {}:{}", config.gateway.host, config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{
    load_and_validate, load_and_validate_str, load_config_from_path, load_config_from_str,
};
pub use model::QuadConfig;
