// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Release Engine Port
//!
//! The deployment engine is an out-of-process CLI with no structured response
//! channel. The broker only sees it through this narrow interface so lifecycle
//! logic never depends on argument construction.
//!
//! Implemented by `crate::infrastructure::helm::HelmClient`.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::domain::catalog::DeploymentConfig;
use crate::domain::parameters::Parameters;
use crate::domain::release::{InvalidInstanceId, ReleaseName, ReleaseStatus};

/// Lifecycle verb sent to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    Install,
    Upgrade,
    Delete,
    Status,
}

impl fmt::Display for ReleaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Upgrade => f.write_str("upgrade"),
            Self::Delete => f.write_str("delete"),
            Self::Status => f.write_str("status"),
        }
    }
}

/// Engine invocation failure.
///
/// Carries the release name, never the raw engine output: that output is
/// logged by the executor and kept away from broker clients.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Helm {action} failed for release `{release}`")]
    CommandFailed {
        action: ReleaseAction,
        release: ReleaseName,
    },

    #[error("Helm {action} could not be run for release `{release}`: {source}")]
    Unreachable {
        action: ReleaseAction,
        release: ReleaseName,
        #[source]
        source: std::io::Error,
    },

    /// No release name can be derived, so the engine was never invoked
    #[error(transparent)]
    InvalidInstanceId(#[from] InvalidInstanceId),
}

impl EngineError {
    pub fn release(&self) -> Option<&ReleaseName> {
        match self {
            Self::CommandFailed { release, .. } | Self::Unreachable { release, .. } => Some(release),
            Self::InvalidInstanceId(_) => None,
        }
    }
}

#[async_trait]
pub trait ReleaseEngine: Send + Sync {
    /// Name under which the engine tracks the instance's release
    fn release_name(&self, instance_id: &str) -> Result<ReleaseName, EngineError>;

    async fn install(
        &self,
        instance_id: &str,
        deployment: &DeploymentConfig,
        parameters: &Parameters,
    ) -> Result<(), EngineError>;

    async fn upgrade(
        &self,
        instance_id: &str,
        deployment: &DeploymentConfig,
        parameters: &Parameters,
    ) -> Result<(), EngineError>;

    async fn delete(&self, instance_id: &str) -> Result<(), EngineError>;

    async fn status(&self, instance_id: &str) -> Result<ReleaseStatus, EngineError>;
}
