// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Caller-facing catalog view.
//!
//! Offerings are the catalog as platforms see it on `GET /v2/catalog`. The
//! conversion is a serde round trip, which also drops the deployment block:
//! chart coordinates are operator detail and are not advertised.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::catalog::Catalog;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offering {
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
    pub metadata: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_client: Option<serde_json::Value>,

    #[serde(default)]
    pub plan_updateable: bool,

    pub plans: Vec<OfferingPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingPlan {
    pub id: String,
    pub name: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OfferingPlanMetadata>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bindable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingPlanMetadata {
    #[serde(rename = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub costs: Vec<OfferingPlanCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferingPlanCost {
    #[serde(default)]
    pub amount: HashMap<String, f64>,

    #[serde(default)]
    pub unit: String,
}

/// Re-encode the catalog into offerings
pub fn offerings_from_catalog(catalog: &Catalog) -> Result<Vec<Offering>, serde_json::Error> {
    let encoded = serde_json::to_value(&catalog.services)?;
    serde_json::from_value(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{
        DeploymentConfig, Service, ServiceMetadata, ServicePlan, ServicePlanMetadata,
    };

    #[test]
    fn test_deployment_block_is_not_advertised() {
        let catalog = Catalog {
            services: vec![Service {
                id: "svc1".to_string(),
                name: "redis".to_string(),
                description: "Redis".to_string(),
                bindable: true,
                tags: vec!["cache".to_string()],
                metadata: Some(ServiceMetadata {
                    display_name: "Redis".to_string(),
                    ..Default::default()
                }),
                plans: vec![ServicePlan {
                    id: "plan1".to_string(),
                    name: "small".to_string(),
                    description: "Small".to_string(),
                    metadata: Some(ServicePlanMetadata {
                        display_name: "Small".to_string(),
                        bullets: vec!["1 replica".to_string()],
                        deployment: DeploymentConfig {
                            chart: "stable/redis".to_string(),
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                    free: true,
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };

        let offerings = offerings_from_catalog(&catalog).unwrap();
        assert_eq!(offerings.len(), 1);
        assert_eq!(offerings[0].tags, vec!["cache".to_string()]);
        assert_eq!(offerings[0].plans[0].free, Some(true));

        let json = serde_json::to_string(&offerings).unwrap();
        assert!(json.contains("\"displayName\":\"Small\""));
        assert!(!json.contains("stable/redis"));
        assert!(!json.contains("deployment"));
    }

    #[test]
    fn test_empty_catalog_has_no_offerings() {
        assert!(offerings_from_catalog(&Catalog::default()).unwrap().is_empty());
    }
}
