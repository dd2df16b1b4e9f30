// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod command;
pub mod helm;

pub use command::{CommandExecutor, CommandOutput, ProcessExecutor};
pub use helm::HelmClient;
