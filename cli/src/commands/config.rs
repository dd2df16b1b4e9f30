// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use helm_broker_core::domain::config::Config;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (password redacted)
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config-file flag: {}", path.display());
        } else {
            println!("  1. --config-file flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. HELM_BROKER_CONFIG_PATH: {}",
            std::env::var("HELM_BROKER_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./helm-broker.json");
        println!("  4. /etc/helm-broker/config.json");
        println!();
    }

    let config = Config::load(config_override).context("Failed to load configuration")?;

    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Log level: {}", config.log_level);
    println!();

    println!("{}", "Broker:".bold());
    println!("  Username: {}", config.broker.username);
    println!("  Password: {}", "(redacted)".dimmed());
    if config.broker.tls_enabled() {
        println!("  TLS: {} / {}", config.broker.tls_cert_file, config.broker.tls_key_file);
    } else {
        println!("  TLS: {}", "disabled".dimmed());
    }
    println!("  Caller parameters:");
    println!("    provision: {}", config.broker.allow_user_provision_parameters);
    println!("    update: {}", config.broker.allow_user_update_parameters);
    println!("    bind: {}", config.broker.allow_user_bind_parameters);
    println!();

    println!("{}", "Helm:".bold());
    println!("  Binary: {}", config.helm.binary_location);
    println!("  Release name prefix: {}", config.helm.release_name_prefix);
    println!("  Namespace: {}", config.helm.default_namespace);
    if !config.helm.tiller_host.is_empty() {
        println!("  Tiller host: {}", config.helm.tiller_host);
    }
    if !config.helm.tiller_namespace.is_empty() {
        println!("  Tiller namespace: {}", config.helm.tiller_namespace);
    }
    if !config.helm.kube_context.is_empty() {
        println!("  Kube context: {}", config.helm.kube_context);
    }
    println!();

    println!("{}", "Catalog:".bold());
    for service in &config.broker.catalog.services {
        println!("  {} ({})", service.name.bold(), service.id);
        for plan in &service.plans {
            let chart = plan
                .deployment()
                .map(|d| d.chart.as_str())
                .unwrap_or("(none)");
            println!("    - {} ({}) → {}", plan.name, plan.id, chart);
        }
    }
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = Config::load(config_path).context("Configuration validation failed")?;

    let plans: usize = config
        .broker
        .catalog
        .services
        .iter()
        .map(|s| s.plans.len())
        .sum();
    println!(
        "{}",
        format!(
            "✓ Configuration is valid ({} services, {} plans)",
            config.broker.catalog.services.len(),
            plans
        )
        .green()
    );

    Ok(())
}
