// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading of `quad.toml` through figment, followed by validation.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::diagnostic::{self, ConfigError};
use crate::model::QuadConfig;
use crate::validation;

const SYSTEM_CONFIG: &str = "/etc/quad/quad.toml";
const LOCAL_CONFIG: &str = "quad.toml";

/// Loads and validates the effective configuration.
///
/// With `path`, that file alone is layered over the defaults and must exist.
/// Without it, `/etc/quad/quad.toml`, then `~/.config/quad/quad.toml`, then
/// `./quad.toml` are merged in that order, each optional. `QUAD_*` variables
/// win in both cases.
pub fn load_and_validate(path: Option<&Path>) -> Result<QuadConfig, Vec<ConfigError>> {
    let figment = match path {
        Some(path) if !path.is_file() => {
            return Err(vec![ConfigError::Other(format!(
                "config file {} does not exist",
                path.display()
            ))]);
        }
        Some(path) => file_figment(path),
        None => standard_figment(),
    };
    validated(figment.extract())
}

/// Loads and validates an inline TOML document, without env overrides.
pub fn load_and_validate_str(toml_content: &str) -> Result<QuadConfig, Vec<ConfigError>> {
    validated(load_config_from_str(toml_content))
}

/// Deserializes an inline TOML document over the defaults, unvalidated.
pub fn load_config_from_str(toml_content: &str) -> Result<QuadConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

/// Deserializes one file plus env overrides over the defaults, unvalidated.
pub fn load_config_from_path(path: &Path) -> Result<QuadConfig, figment::Error> {
    file_figment(path).extract()
}

fn validated(loaded: Result<QuadConfig, figment::Error>) -> Result<QuadConfig, Vec<ConfigError>> {
    let config = loaded.map_err(diagnostic::from_figment)?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(QuadConfig::default()))
}

fn file_figment(path: &Path) -> Figment {
    defaults().merge(Toml::file(path)).merge(env_provider())
}

fn standard_figment() -> Figment {
    let user_config = dirs::config_dir()
        .map(|d| d.join("quad").join(LOCAL_CONFIG))
        .unwrap_or_default();
    defaults()
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps a lowercased, prefix-stripped env var name to a dotted key.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `gateway_bearer_token` maps to `gateway.bearer_token`.
pub fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 6] = [
        "server",
        "gateway",
        "storage",
        "calls",
        "escalation",
        "prometheus",
    ];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("QUAD_").map(|key| map_env_key(key.as_str()).into())
}
