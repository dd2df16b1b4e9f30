// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Release Domain
//!
//! A service instance has no stored record: it exists only as a Helm release
//! whose name is derived from the instance id. Its operation state is read
//! back from `helm status` text on every poll.
//!
//! ## Status Text Grammar
//!
//! `helm status` prints a loosely structured report. Two line rules are
//! recognised, everything else is ignored:
//!
//! ```text
//! LAST DEPLOYED: Mon Jan  2 15:04:05 2017     -> description (optional)
//! STATUS: DEPLOYED                            -> state
//! ```
//!
//! Tokens are matched case-insensitively with `-` and spaces treated as `_`,
//! so Helm 3's `deployed` / `pending-install` read the same as Helm 2's
//! `DEPLOYED` / `PENDING_INSTALL`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest release name helm accepts
pub const MAX_RELEASE_NAME_LEN: usize = 53;

/// Longest prefix that still fits a hyphen and a dashless UUID
pub const MAX_RELEASE_NAME_PREFIX_LEN: usize = MAX_RELEASE_NAME_LEN - 1 - 32;

const STATUS_MARKER: &str = "STATUS:";
const LAST_DEPLOYED_MARKER: &str = "LAST DEPLOYED:";

/// Engine-side name of the release backing a service instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseName(String);

impl ReleaseName {
    /// Derive the release name for an instance.
    ///
    /// The instance id is lower-cased and stripped of every character outside
    /// `[a-z0-9]`; for UUID-shaped ids this only drops the hyphens, whose
    /// positions are fixed, so distinct UUIDs keep distinct names.
    ///
    /// An id with nothing left after sanitizing is rejected: the bare
    /// `<prefix>-` is not a valid label and would be shared by every such id.
    pub fn derive(prefix: &str, instance_id: &str) -> Result<Self, InvalidInstanceId> {
        let sanitized: String = instance_id
            .chars()
            .map(|c| c.to_ascii_lowercase())
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
            .collect();

        if sanitized.is_empty() {
            return Err(InvalidInstanceId {
                instance_id: instance_id.to_string(),
            });
        }
        Ok(Self(format!("{prefix}-{sanitized}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Instance id `{instance_id}` contains no letters or digits to derive a release name from")]
pub struct InvalidInstanceId {
    pub instance_id: String,
}

/// State of the last lifecycle operation on an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleOperationState {
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "succeeded")]
    Succeeded,
    #[serde(rename = "failed")]
    Failed,
}

impl LifecycleOperationState {
    /// Map a Helm release status token onto an operation state
    pub fn from_token(token: &str) -> Self {
        let normalized: String = token
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "PENDING_INSTALL" | "PENDING_UPGRADE" | "PENDING_ROLLBACK" | "DELETING"
            | "UNINSTALLING" => Self::InProgress,
            "DEPLOYED" | "DELETED" | "UNINSTALLED" => Self::Succeeded,
            _ => Self::Failed,
        }
    }
}

impl fmt::Display for LifecycleOperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => f.write_str("in progress"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// Parsed `helm status` report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseStatus {
    pub state: LifecycleOperationState,
    pub description: Option<String>,
}

/// Parse `helm status` output.
///
/// A missing or unknown `STATUS:` token degrades to `Failed`; a missing
/// `LAST DEPLOYED:` line only leaves the description empty.
pub fn parse_status(output: &str) -> ReleaseStatus {
    let mut state = None;
    let mut description = None;

    for line in output.lines().map(str::trim) {
        if state.is_none() {
            if let Some(token) = strip_marker(line, STATUS_MARKER) {
                state = Some(LifecycleOperationState::from_token(token));
                continue;
            }
        }
        if description.is_none() {
            if let Some(timestamp) = strip_marker(line, LAST_DEPLOYED_MARKER) {
                if !timestamp.is_empty() {
                    description = Some(format!("Last deployed: {timestamp}"));
                }
            }
        }
    }

    ReleaseStatus {
        state: state.unwrap_or(LifecycleOperationState::Failed),
        description,
    }
}

fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let head = line.get(..marker.len())?;
    if head.eq_ignore_ascii_case(marker) {
        Some(line[marker.len()..].trim())
    } else {
        None
    }
}
