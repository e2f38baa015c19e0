// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quad - real-time presence, messaging, call signaling, and escalation.
//!
//! This is the binary entry point for the Quad server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod doctor;
mod serve;
mod shutdown;
mod sweep;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quad_config::QuadConfig;

/// Quad - real-time presence, messaging, call signaling, and escalation.
#[derive(Parser, Debug)]
#[command(name = "quad", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the WebSocket gateway and escalation runner.
    Serve,
    /// Run one escalation sweep and print the report.
    Sweep,
    /// Check configuration and database health.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn load(path: Option<&std::path::Path>) -> QuadConfig {
    match quad_config::load_and_validate(path) {
        Ok(config) => config,
        Err(errors) => {
            quad_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quad={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}

/// Renders the configuration with secrets masked.
fn render_config(config: &QuadConfig) -> Result<String, toml::ser::Error> {
    let mut shown = config.clone();
    if shown.gateway.bearer_token.is_some() {
        shown.gateway.bearer_token = Some("[redacted]".to_string());
    }
    toml::to_string_pretty(&shown)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load(cli.config.as_deref());

    let outcome = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Sweep) => sweep::run_sweep(config).await.map(|report| {
            println!("quad sweep: {report}");
        }),
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        Some(Commands::Config) => match render_config(&config) {
            Ok(text) => {
                print!("{text}");
                Ok(())
            }
            Err(e) => Err(quad_core::QuadError::Config(e.to_string())),
        },
        None => {
            println!("quad: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_doctor_with_global_config() {
        let cli = Cli::try_parse_from(["quad", "doctor", "--plain", "--config", "q.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Doctor { plain: true })));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("q.toml")));
    }

    #[test]
    fn rendered_config_masks_bearer_token() {
        let config = quad_config::load_and_validate_str(
            "[gateway]\nbearer_token = \"s3cret\"\n",
        )
        .unwrap();
        let text = render_config(&config).unwrap();
        assert!(!text.contains("s3cret"));
        assert!(text.contains("[redacted]"));
        assert!(text.contains("ring_timeout_secs"));
    }
}
