// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

#![allow(dead_code)]

use async_trait::async_trait;
use helm_broker_core::application::broker::ServiceBroker;
use helm_broker_core::domain::catalog::{
    Catalog, DeploymentConfig, Service, ServicePlan, ServicePlanMetadata,
};
use helm_broker_core::domain::config::{BrokerConfig, HelmConfig};
use helm_broker_core::domain::parameters::Parameters;
use helm_broker_core::infrastructure::command::{CommandExecutor, CommandOutput};
use helm_broker_core::infrastructure::helm::HelmClient;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const PREFIX: &str = "osb";
pub const NAMESPACE: &str = "services";

/// Stands in for the helm binary: records every invocation and replies with
/// queued outputs (exit 0 with empty output once the queue is drained)
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<Vec<String>>>,
    replies: Mutex<VecDeque<CommandOutput>>,
}

impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, output: CommandOutput) {
        self.replies.lock().unwrap().push_back(output);
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandExecutor for RecordingExecutor {
    async fn run(&self, _program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::succeeded(""));
        Ok(reply)
    }
}

pub fn catalog() -> Catalog {
    Catalog {
        services: vec![Service {
            id: "svc1".to_string(),
            name: "redis".to_string(),
            description: "Redis key/value store".to_string(),
            bindable: true,
            plans: vec![
                ServicePlan {
                    id: "plan1".to_string(),
                    name: "small".to_string(),
                    description: "Single node".to_string(),
                    metadata: Some(ServicePlanMetadata {
                        deployment: DeploymentConfig {
                            chart: "mychart".to_string(),
                            version: "1.0.0".to_string(),
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ServicePlan {
                    id: "plan2".to_string(),
                    name: "large".to_string(),
                    description: "Replicated".to_string(),
                    metadata: Some(ServicePlanMetadata {
                        deployment: DeploymentConfig {
                            chart: "mychart".to_string(),
                            repository: "https://charts.example.com".to_string(),
                            parameters: Parameters::from([(
                                "replicas".to_string(),
                                serde_json::json!(3),
                            )]),
                            ..Default::default()
                        },
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
    }
}

pub fn broker_config() -> BrokerConfig {
    BrokerConfig {
        username: "admin".to_string(),
        password: "secret".to_string(),
        catalog: catalog(),
        ..Default::default()
    }
}

pub fn helm_config() -> HelmConfig {
    HelmConfig {
        release_name_prefix: PREFIX.to_string(),
        default_namespace: NAMESPACE.to_string(),
        binary_location: "helm".to_string(),
        ..Default::default()
    }
}

pub fn broker_with(config: BrokerConfig) -> (Arc<ServiceBroker>, Arc<RecordingExecutor>) {
    let executor = RecordingExecutor::new();
    let engine = Arc::new(HelmClient::new(helm_config(), executor.clone()));
    let broker = Arc::new(ServiceBroker::new(Arc::new(config), engine));
    (broker, executor)
}

pub fn broker() -> (Arc<ServiceBroker>, Arc<RecordingExecutor>) {
    broker_with(broker_config())
}

pub fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
