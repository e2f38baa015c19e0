// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment reports one error per bad key. Each becomes a [`ConfigError`]
//! addressed by its dotted path (`gateway.port`), with a "did you mean"
//! hint for misspelled keys.

#![allow(unused_assignments)] // emitted by the miette Diagnostic derive

use figment::error::Kind;
use miette::Diagnostic;
use thiserror::Error;

/// Jaro-Winkler score a valid key must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{path}`")]
    #[diagnostic(
        code(quad::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        /// Dotted location, e.g. `calls.ring_timout_secs`.
        path: String,
        /// The offending key alone.
        key: String,
        suggestion: Option<String>,
        valid_keys: Vec<String>,
    },

    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(quad::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(code(quad::config::missing_key), help("set `{key}` in quad.toml"))]
    MissingKey { key: String },

    /// A value that parsed but makes no sense for the server.
    #[error("{message}")]
    #[diagnostic(code(quad::config::validation))]
    Validation { message: String },

    #[error("{0}")]
    #[diagnostic(code(quad::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &[String]) -> String {
    let valid = valid_keys.join(", ");
    match suggestion {
        Some(s) => format!("did you mean `{s}`? expected one of: {valid}"),
        None => format!("expected one of: {valid}"),
    }
}

/// Splits a figment failure into one diagnostic per underlying error.
pub fn from_figment(err: figment::Error) -> Vec<ConfigError> {
    err.into_iter().map(classify).collect()
}

fn classify(error: figment::Error) -> ConfigError {
    let section: Vec<&str> = error.path.iter().map(String::as_str).collect();
    match &error.kind {
        Kind::UnknownField(key, expected) => ConfigError::UnknownKey {
            path: dotted(&section, key),
            key: key.clone(),
            suggestion: suggest_key(key, expected),
            valid_keys: expected.iter().map(|k| k.to_string()).collect(),
        },
        Kind::MissingField(key) => ConfigError::MissingKey {
            key: dotted(&section, key),
        },
        Kind::InvalidType(found, expected) => ConfigError::InvalidType {
            key: section.join("."),
            found: found.to_string(),
            expected: expected.clone(),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted(section: &[&str], leaf: &str) -> String {
    if section.is_empty() {
        leaf.to_string()
    } else {
        format!("{}.{leaf}", section.join("."))
    }
}

/// Closest valid key by Jaro-Winkler similarity, if any clears the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints each diagnostic to stderr through miette's report renderer.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("config error: {error}"),
        }
    }
    eprintln!("quad: {} configuration problem(s), not starting", errors.len());
}
