// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Helm Broker CLI
//!
//! The `helm-broker` binary serves the Open Service Broker v2 API and maps
//! instance lifecycle requests onto Helm releases.
//!
//! ## Commands
//!
//! - `helm-broker serve` - Run the broker HTTP API
//! - `helm-broker config show|validate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use helm_broker::commands::{self, ConfigCommand};
use helm_broker_core::domain::config::Config;

/// Helm Broker - Open Service Broker backed by Helm releases
#[derive(Parser)]
#[command(name = "helm-broker")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        long,
        global = true,
        env = "HELM_BROKER_CONFIG_PATH",
        value_name = "FILE"
    )]
    config_file: Option<PathBuf>,

    /// Log level (DEBUG, INFO, WARN, ERROR, FATAL); defaults to the config file's log_level
    #[arg(long, global = true, env = "HELM_BROKER_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the broker API
    #[command(name = "serve")]
    Serve {
        /// Address the HTTP API listens on
        #[arg(long, env = "HELM_BROKER_LISTEN_ADDRESS", default_value = "0.0.0.0:3000")]
        listen_address: String,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = resolve_log_level(cli.log_level.as_deref(), cli.config_file.as_ref());
    init_logging(&level)?;

    match cli.command {
        Some(Commands::Serve { listen_address }) => {
            commands::serve::execute(cli.config_file, &listen_address).await
        }
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config_file).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Flag value first, then the configuration file's `log_level`, then INFO
fn resolve_log_level(flag: Option<&str>, config_file: Option<&PathBuf>) -> String {
    if let Some(level) = flag {
        return level.to_string();
    }

    config_file
        .cloned()
        .or_else(Config::discover_config)
        .and_then(|path| Config::from_file(path).ok())
        .map(|config| config.log_level)
        .unwrap_or_else(|| "INFO".to_string())
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let directive = helm_broker::log_filter_directive(level)?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(directive))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
