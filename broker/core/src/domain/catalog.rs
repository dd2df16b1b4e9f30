// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Service Catalog Domain
//!
//! Static description of the service/plan combinations this broker offers.
//! Every plan carries a [`DeploymentConfig`] naming the chart that realises it.
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | `Catalog` | Ordered list of services, loaded once at start-up |
//! | `Service` | Offerable service with at least one plan |
//! | `ServicePlan` | Plan inside a service, pointing at a chart |
//! | `DeploymentConfig` | Chart reference + optional repository/version pin + default parameters |
//!
//! The catalog is immutable for the process lifetime. Lookups are linear:
//! catalogs hold a handful of services, so no index is maintained.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

use crate::domain::parameters::Parameters;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    #[serde(default)]
    pub bindable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ServiceMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_client: Option<DashboardClient>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub plan_updateable: bool,

    #[serde(default)]
    pub plans: Vec<ServicePlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(rename = "displayName", default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(rename = "imageUrl", default, skip_serializing_if = "String::is_empty")]
    pub image_url: String,

    #[serde(rename = "longDescription", default, skip_serializing_if = "String::is_empty")]
    pub long_description: String,

    #[serde(rename = "providerDisplayName", default, skip_serializing_if = "String::is_empty")]
    pub provider_display_name: String,

    #[serde(rename = "documentationUrl", default, skip_serializing_if = "String::is_empty")]
    pub documentation_url: String,

    #[serde(rename = "supportUrl", default, skip_serializing_if = "String::is_empty")]
    pub support_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardClient {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlan {
    pub id: String,
    pub name: String,
    pub description: String,

    /// Required: a plan without deployment metadata cannot be provisioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ServicePlanMetadata>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub free: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bindable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlanMetadata {
    #[serde(rename = "displayName", default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<ServicePlanCost>,

    #[serde(alias = "helm", default)]
    pub deployment: DeploymentConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePlanCost {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub amount: HashMap<String, f64>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
}

/// Chart reference a plan deploys, with optional source pin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(default)]
    pub chart: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Plan-declared defaults handed to the chart
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: Parameters,
}

/// First invariant violation found while validating the catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Must provide a non-empty {0}")]
    MissingField(&'static str),

    #[error("Must contain at least one plan")]
    NoPlans,

    #[error("Must provide a deployment configuration")]
    MissingDeployment,

    #[error("Duplicate service id `{0}`")]
    DuplicateService(String),

    #[error("Duplicate plan id `{0}`")]
    DuplicatePlan(String),

    #[error("Validating Plans configuration for Service `{service}`: {source}")]
    InService {
        service: String,
        source: Box<ValidationError>,
    },

    #[error("Validating Deployment configuration for Service Plan `{plan}`: {source}")]
    InPlan {
        plan: String,
        source: Box<ValidationError>,
    },
}

/// Outcome of a failed plan lookup
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Service `{0}` not found in Catalog")]
    ServiceNotFound(String),

    #[error("Plan `{plan_id}` for Service `{service_id}` not found in Catalog")]
    PlanNotFound { service_id: String, plan_id: String },
}

impl Catalog {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for service in &self.services {
            service.validate()?;
            if !seen.insert(service.id.as_str()) {
                return Err(ValidationError::DuplicateService(service.id.clone()));
            }
        }
        Ok(())
    }

    pub fn find_service(&self, service_id: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    /// Resolve a plan, reporting whether the service or the plan was missing
    pub fn find_service_plan(
        &self,
        service_id: &str,
        plan_id: &str,
    ) -> Result<&ServicePlan, LookupError> {
        let service = self
            .find_service(service_id)
            .ok_or_else(|| LookupError::ServiceNotFound(service_id.to_string()))?;

        service
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .ok_or_else(|| LookupError::PlanNotFound {
                service_id: service_id.to_string(),
                plan_id: plan_id.to_string(),
            })
    }
}

impl Service {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("ID"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("Name"));
        }
        if self.description.is_empty() {
            return Err(ValidationError::MissingField("Description"));
        }
        if self.plans.is_empty() {
            return Err(ValidationError::NoPlans);
        }

        let mut seen = HashSet::new();
        for plan in &self.plans {
            let result = plan.validate().and_then(|_| {
                if seen.insert(plan.id.as_str()) {
                    Ok(())
                } else {
                    Err(ValidationError::DuplicatePlan(plan.id.clone()))
                }
            });
            result.map_err(|e| ValidationError::InService {
                service: self.name.clone(),
                source: Box::new(e),
            })?;
        }

        Ok(())
    }
}

impl ServicePlan {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("ID"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("Name"));
        }
        if self.description.is_empty() {
            return Err(ValidationError::MissingField("Description"));
        }

        let metadata = self
            .metadata
            .as_ref()
            .ok_or(ValidationError::MissingDeployment)?;

        metadata
            .deployment
            .validate()
            .map_err(|e| ValidationError::InPlan {
                plan: self.name.clone(),
                source: Box::new(e),
            })
    }

    /// Deployment block of a validated plan
    pub fn deployment(&self) -> Option<&DeploymentConfig> {
        self.metadata.as_ref().map(|m| &m.deployment)
    }
}

impl DeploymentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.chart.trim().is_empty() {
            return Err(ValidationError::MissingField("Chart"));
        }
        Ok(())
    }
}
