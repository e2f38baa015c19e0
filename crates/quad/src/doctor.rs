// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `quad doctor` command implementation.
//!
//! Runs diagnostic checks against the configured database, listener
//! address, and escalation directory.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use quad_config::QuadConfig;
use quad_core::{Directory, QuadError, Role};
use quad_storage::SqliteStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `quad doctor` command.
///
/// Fails when any check fails; warnings are reported but do not fail.
pub async fn run_doctor(config: &QuadConfig, plain: bool) -> Result<(), QuadError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = run_checks(config).await;

    println!();
    println!("  quad doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Fail => fail_count += 1,
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Pass => {}
        }
        println!("{}", format_line(result, use_color));
    }
    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    if fail_count > 0 {
        return Err(QuadError::Internal(format!("{fail_count} check(s) failed")));
    }
    Ok(())
}

fn format_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!(
            "    {symbol} {:<20} {message} ({duration_ms}ms)",
            result.name
        )
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {tag} {:<20} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Runs every check in order.
pub async fn run_checks(config: &QuadConfig) -> Vec<CheckResult> {
    let mut results = vec![CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        "valid",
        Instant::now(),
    )];

    let start = Instant::now();
    let store = match SqliteStore::open(&config.storage).await {
        Ok(store) => {
            results.push(CheckResult::new(
                "Database",
                CheckStatus::Pass,
                format!("ready at {}", config.storage.database_path),
                start,
            ));
            Some(store)
        }
        Err(e) => {
            results.push(CheckResult::new(
                "Database",
                CheckStatus::Fail,
                format!("open failed: {e}"),
                start,
            ));
            None
        }
    };

    results.push(check_listener(&config.gateway.host, config.gateway.port).await);

    if config.escalation.enabled {
        match &store {
            Some(store) => {
                let department = config.escalation.department.as_deref();
                results.push(check_role(store, Role::Director, department).await);
                results.push(check_role(store, Role::Owner, department).await);
            }
            None => results.push(CheckResult::new(
                "Escalation",
                CheckStatus::Fail,
                "skipped, database unavailable",
                Instant::now(),
            )),
        }
    }

    if let Some(store) = store {
        let _ = store.close().await;
    }
    results
}

/// Check the gateway address can be bound.
async fn check_listener(host: &str, port: u16) -> CheckResult {
    let start = Instant::now();
    let addr = format!("{host}:{port}");
    match tokio::net::TcpListener::bind(&addr).await {
        Ok(_listener) => CheckResult::new("Gateway", CheckStatus::Pass, format!("{addr} free"), start),
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => CheckResult::new(
            "Gateway",
            CheckStatus::Warn,
            format!("{addr} in use (server already running?)"),
            start,
        ),
        Err(e) => CheckResult::new(
            "Gateway",
            CheckStatus::Fail,
            format!("cannot bind {addr}: {e}"),
            start,
        ),
    }
}

/// Check the directory has someone to escalate to.
async fn check_role(store: &SqliteStore, role: Role, department: Option<&str>) -> CheckResult {
    let start = Instant::now();
    let name = match role {
        Role::Director => "Escalation director",
        Role::Owner => "Escalation owner",
        Role::Member => "Escalation member",
    };
    match store.find_user_by_role(role, department).await {
        Ok(Some(user)) => CheckResult::new(name, CheckStatus::Pass, user.to_string(), start),
        Ok(None) => CheckResult::new(
            name,
            CheckStatus::Warn,
            format!("no {role} in directory, tier disabled"),
            start,
        ),
        Err(e) => CheckResult::new(name, CheckStatus::Fail, format!("lookup failed: {e}"), start),
    }
}
