// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Helm Broker CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command handlers and log level mapping for the `helm-broker` binary

pub mod commands;

/// Map a configured log level onto a `tracing` filter directive.
///
/// Accepts DEBUG, INFO, WARN, ERROR and FATAL in any case. `tracing` has no
/// fatal level, so FATAL logs errors only.
pub fn log_filter_directive(level: &str) -> anyhow::Result<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "DEBUG" => Ok("debug"),
        "INFO" => Ok("info"),
        "WARN" => Ok("warn"),
        "ERROR" | "FATAL" => Ok("error"),
        other => anyhow::bail!("Unknown log level `{}`", other),
    }
}
