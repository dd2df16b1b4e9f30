// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Command Executor
//!
//! Single chokepoint for out-of-process calls. The release adapter builds an
//! argument list and hands it here; success is judged solely by exit status.
//!
//! Tests substitute their own [`CommandExecutor`] so no real process is
//! spawned.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Captured result of one process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandOutput {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            output: output.into(),
        }
    }

    pub fn failed(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            output: output.into(),
        }
    }
}

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` to completion.
    ///
    /// Returns `Err` only when the process could not be started; a non-zero
    /// exit is reported through [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput>;
}

/// Spawns real processes via `tokio::process`
#[derive(Debug, Default, Clone)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(command = ?cmd, "Spawning process");

        let output = cmd.output().await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            output: combined,
        })
    }
}
