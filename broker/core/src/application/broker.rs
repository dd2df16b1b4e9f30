// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Service Broker (Instance Lifecycle Orchestrator)
//!
//! Maps Open Service Broker lifecycle requests onto Helm release operations.
//!
//! ## Instance State Machine
//!
//! Nothing is persisted; state is rebuilt from the engine on every poll.
//!
//! ```text
//! unprovisioned --provision--> in progress --> succeeded | failed
//! succeeded --deprovision--> in progress --> succeeded (removed) | failed
//! ```
//!
//! Provision, update and deprovision only complete asynchronously: a request
//! without `accepts_incomplete` is rejected with [`BrokerError::AsyncRequired`]
//! before anything else is looked at. Completion is observed through
//! [`ServiceBroker::last_operation`], keyed by instance id alone.
//!
//! Update, bind and unbind are contract-shaped placeholders: they apply the
//! async and parameter-decode gates and then return success without touching
//! the engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::application::offering::{offerings_from_catalog, Offering};
use crate::domain::catalog::LookupError;
use crate::domain::config::BrokerConfig;
use crate::domain::engine::{EngineError, ReleaseEngine};
use crate::domain::parameters::{decode_if_allowed, effective_parameters, ParameterError};
use crate::domain::release::LifecycleOperationState;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("This service plan requires client support for asynchronous service operations.")]
    AsyncRequired,

    #[error("Plan `{plan_id}` for Service `{service_id}` not found in Catalog")]
    PlanNotFound { service_id: String, plan_id: String },

    #[error(transparent)]
    ParameterDecode(#[from] ParameterError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvisionDetails {
    pub service_id: String,
    pub plan_id: String,
    #[serde(default)]
    pub organization_guid: String,
    #[serde(default)]
    pub space_guid: String,
    #[serde(rename = "parameters", default, skip_serializing_if = "Option::is_none")]
    pub raw_parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateDetails {
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
    #[serde(rename = "parameters", default, skip_serializing_if = "Option::is_none")]
    pub raw_parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_values: Option<PreviousValues>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviousValues {
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub organization_id: String,
    #[serde(default)]
    pub space_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeprovisionDetails {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindDetails {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_resource: Option<Value>,
    #[serde(rename = "parameters", default, skip_serializing_if = "Option::is_none")]
    pub raw_parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnbindDetails {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub plan_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProvisionedServiceSpec {
    pub is_async: bool,
    pub dashboard_url: Option<String>,
    pub operation_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateServiceSpec {
    pub is_async: bool,
    pub operation_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeprovisionServiceSpec {
    pub is_async: bool,
    pub operation_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Binding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastOperation {
    pub state: LifecycleOperationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

pub struct ServiceBroker {
    config: Arc<BrokerConfig>,
    engine: Arc<dyn ReleaseEngine>,
}

impl ServiceBroker {
    pub fn new(config: Arc<BrokerConfig>, engine: Arc<dyn ReleaseEngine>) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Offerings advertised on the catalog endpoint.
    ///
    /// Never fails: an encoding fault is logged and yields an empty list.
    pub fn services(&self) -> Vec<Offering> {
        debug!("services");

        match offerings_from_catalog(&self.config.catalog) {
            Ok(offerings) => offerings,
            Err(e) => {
                error!(error = %e, "Failed to re-encode catalog");
                Vec::new()
            }
        }
    }

    pub async fn provision(
        &self,
        instance_id: &str,
        details: ProvisionDetails,
        async_allowed: bool,
    ) -> Result<ProvisionedServiceSpec, BrokerError> {
        debug!(instance_id, ?details, async_allowed, "provision");

        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }

        let plan = self
            .config
            .catalog
            .find_service_plan(&details.service_id, &details.plan_id)
            .map_err(|e| {
                if let LookupError::ServiceNotFound(_) = e {
                    warn!(service_id = %details.service_id, "Unknown service in provision request");
                }
                BrokerError::PlanNotFound {
                    service_id: details.service_id.clone(),
                    plan_id: details.plan_id.clone(),
                }
            })?;

        let caller = decode_if_allowed(
            "provision",
            self.config.allow_user_provision_parameters,
            details.raw_parameters.as_ref(),
        )?;

        // Validated catalogs always carry a deployment block
        let deployment = plan.deployment().ok_or_else(|| BrokerError::PlanNotFound {
            service_id: details.service_id.clone(),
            plan_id: details.plan_id.clone(),
        })?;
        let parameters = effective_parameters(&deployment.parameters, caller);

        self.engine
            .install(instance_id, deployment, &parameters)
            .await?;

        let spec = ProvisionedServiceSpec {
            is_async: true,
            ..Default::default()
        };
        debug!(instance_id, ?spec, "provision");
        Ok(spec)
    }

    pub async fn update(
        &self,
        instance_id: &str,
        details: UpdateDetails,
        async_allowed: bool,
    ) -> Result<UpdateServiceSpec, BrokerError> {
        debug!(instance_id, ?details, async_allowed, "update");

        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }

        let _caller = decode_if_allowed(
            "update",
            self.config.allow_user_update_parameters,
            details.raw_parameters.as_ref(),
        )?;

        // TODO: resolve the target plan and call ReleaseEngine::upgrade once plan changes are supported

        Ok(UpdateServiceSpec {
            is_async: true,
            ..Default::default()
        })
    }

    pub async fn deprovision(
        &self,
        instance_id: &str,
        details: DeprovisionDetails,
        async_allowed: bool,
    ) -> Result<DeprovisionServiceSpec, BrokerError> {
        debug!(instance_id, ?details, async_allowed, "deprovision");

        if !async_allowed {
            return Err(BrokerError::AsyncRequired);
        }

        self.engine.delete(instance_id).await?;

        let spec = DeprovisionServiceSpec {
            is_async: true,
            ..Default::default()
        };
        debug!(instance_id, ?spec, "deprovision");
        Ok(spec)
    }

    pub async fn bind(
        &self,
        instance_id: &str,
        binding_id: &str,
        details: BindDetails,
    ) -> Result<Binding, BrokerError> {
        debug!(instance_id, binding_id, ?details, "bind");

        let _caller = decode_if_allowed(
            "bind",
            self.config.allow_user_bind_parameters,
            details.raw_parameters.as_ref(),
        )?;

        Ok(Binding::default())
    }

    pub async fn unbind(
        &self,
        instance_id: &str,
        binding_id: &str,
        details: UnbindDetails,
    ) -> Result<(), BrokerError> {
        debug!(instance_id, binding_id, ?details, "unbind");
        Ok(())
    }

    /// State of the last operation on an instance.
    ///
    /// `operation_data` is not used: the engine is queried by release name.
    /// An engine failure reads as a failed operation, not as an error.
    pub async fn last_operation(&self, instance_id: &str, operation_data: Option<&str>) -> LastOperation {
        debug!(instance_id, ?operation_data, "last-operation");

        match self.engine.status(instance_id).await {
            Ok(status) => LastOperation {
                state: status.state,
                description: status.description,
            },
            Err(e) => {
                warn!(instance_id, error = %e, "Release status query failed");
                LastOperation {
                    state: LifecycleOperationState::Failed,
                    description: Some(e.to_string()),
                }
            }
        }
    }
}
