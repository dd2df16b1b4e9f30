// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Broker Configuration Types
//
// Defines the configuration file consumed at start-up:
// - Broker credentials and TLS material
// - Operator policy for caller-supplied parameters
// - The service catalog
// - Helm connection settings (release naming, namespace, binary, tiller)
//
// The file is read once; nothing here is hot-reloaded.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::catalog::Catalog;
use crate::domain::release::MAX_RELEASE_NAME_PREFIX_LEN;

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Log level (DEBUG, INFO, WARN, ERROR, FATAL)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    pub broker: BrokerConfig,

    pub helm: HelmConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub username: String,

    pub password: String,

    /// Serve TLS when both certificate and key are set
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_cert_file: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tls_key_file: String,

    #[serde(default)]
    pub allow_user_provision_parameters: bool,

    #[serde(default)]
    pub allow_user_update_parameters: bool,

    #[serde(default)]
    pub allow_user_bind_parameters: bool,

    #[serde(default)]
    pub catalog: Catalog,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelmConfig {
    /// Prefix of every release name this broker creates
    pub release_name_prefix: String,

    /// Namespace releases are installed into
    pub default_namespace: String,

    /// Path (or `$PATH` name) of the helm binary
    #[serde(default = "default_binary_location")]
    pub binary_location: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tiller_host: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tiller_namespace: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kube_context: String,

    #[serde(default)]
    pub debug: bool,
}

impl Config {
    /// Load configuration from a file; `.yaml`/`.yml` parse as YAML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config = serde_json::from_str(json)?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HELM_BROKER_CONFIG_PATH environment variable
    /// 2. ./helm-broker.json (working directory)
    /// 3. /etc/helm-broker/config.json
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HELM_BROKER_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./helm-broker.json");
        if cwd.exists() {
            return Some(cwd);
        }

        let system_config = PathBuf::from("/etc/helm-broker/config.json");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration from an explicit path or by discovery, then apply
    /// environment overrides and validate.
    ///
    /// There is no default configuration: a broker without credentials must
    /// not start.
    pub fn load(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = match cli_path {
            Some(path) => {
                tracing::info!("Loading configuration from explicit path: {:?}", path);
                path
            }
            None => {
                let path = Self::discover_config()
                    .context("Must provide a non-empty configuration file")?;
                tracing::info!("Loading configuration from discovered path: {:?}", path);
                path
            }
        };

        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config
            .validate()
            .context("Validating configuration file contents")?;
        Ok(config)
    }

    /// Apply environment variable overrides so container deployments can
    /// inject credentials without writing them to the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HELM_BROKER_USERNAME") {
            tracing::info!("Environment override: HELM_BROKER_USERNAME");
            self.broker.username = val;
        }

        if let Ok(val) = std::env::var("HELM_BROKER_PASSWORD") {
            tracing::info!("Environment override: HELM_BROKER_PASSWORD");
            self.broker.password = val;
        }

        if let Ok(val) = std::env::var("HELM_BROKER_NAMESPACE") {
            tracing::info!("Environment override: HELM_BROKER_NAMESPACE={}", val);
            self.helm.default_namespace = val;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.log_level.is_empty() {
            anyhow::bail!("Must provide a non-empty Log Level");
        }

        self.broker
            .validate()
            .context("Validating Broker configuration")?;

        self.helm
            .validate()
            .context("Validating Helm configuration")?;

        Ok(())
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.username.is_empty() {
            anyhow::bail!("Must provide a non-empty Username");
        }

        if self.password.is_empty() {
            anyhow::bail!("Must provide a non-empty Password");
        }

        if self.tls_cert_file.is_empty() != self.tls_key_file.is_empty() {
            anyhow::bail!("Must provide both TLS Cert File and TLS Key File, or neither");
        }

        self.catalog
            .validate()
            .context("Validating Catalog configuration")?;

        Ok(())
    }

    pub fn tls_enabled(&self) -> bool {
        !self.tls_cert_file.is_empty() && !self.tls_key_file.is_empty()
    }
}

impl HelmConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.release_name_prefix.is_empty() {
            anyhow::bail!("Must provide a non-empty Release Name Prefix");
        }

        // Release names are DNS-1123 labels; the prefix is used verbatim
        let prefix_ok = self
            .release_name_prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && self.release_name_prefix.starts_with(|c: char| c.is_ascii_lowercase());
        if !prefix_ok {
            anyhow::bail!(
                "Release Name Prefix `{}` must start with a lowercase letter and contain only lowercase letters, digits and '-'",
                self.release_name_prefix
            );
        }

        if self.release_name_prefix.len() > MAX_RELEASE_NAME_PREFIX_LEN {
            anyhow::bail!(
                "Release Name Prefix `{}` must be at most {} characters",
                self.release_name_prefix,
                MAX_RELEASE_NAME_PREFIX_LEN
            );
        }

        if self.default_namespace.is_empty() {
            anyhow::bail!("Must provide a non-empty Default Namespace");
        }

        if self.binary_location.is_empty() {
            anyhow::bail!("Must provide a non-empty Binary Location");
        }

        Ok(())
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_binary_location() -> String {
    "helm".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{DeploymentConfig, Service, ServicePlanMetadata};
    use std::io::Write;

    fn valid_config() -> Config {
        Config {
            log_level: "DEBUG".to_string(),
            broker: BrokerConfig {
                username: "fake-broker-username".to_string(),
                password: "fake-broker-password".to_string(),
                ..Default::default()
            },
            helm: HelmConfig {
                release_name_prefix: "fake-prefix".to_string(),
                default_namespace: "fake-default-namespace".to_string(),
                binary_location: "helm".to_string(),
                ..Default::default()
            },
        }
    }

    fn root_message(err: &anyhow::Error) -> String {
        err.root_cause().to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_log_level() {
        let mut config = valid_config();
        config.log_level.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Must provide a non-empty Log Level");
    }

    #[test]
    fn test_broker_section_errors() {
        let mut config = valid_config();
        config.broker.username.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Validating Broker configuration");
        assert_eq!(root_message(&err), "Must provide a non-empty Username");

        let mut config = valid_config();
        config.broker.password.clear();
        let err = config.validate().unwrap_err();
        assert_eq!(root_message(&err), "Must provide a non-empty Password");

        let mut config = valid_config();
        config.broker.tls_cert_file = "/tmp/cert.pem".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_helm_section_errors() {
        let cases: [(fn(&mut HelmConfig), &str); 3] = [
            (|h: &mut HelmConfig| h.release_name_prefix.clear(), "Must provide a non-empty Release Name Prefix"),
            (|h: &mut HelmConfig| h.default_namespace.clear(), "Must provide a non-empty Default Namespace"),
            (|h: &mut HelmConfig| h.binary_location.clear(), "Must provide a non-empty Binary Location"),
        ];

        for (mutate, expected) in cases {
            let mut config = valid_config();
            mutate(&mut config.helm);
            let err = config.validate().unwrap_err();
            assert_eq!(err.to_string(), "Validating Helm configuration");
            assert_eq!(root_message(&err), expected);
        }
    }

    #[test]
    fn test_prefix_charset() {
        let mut config = valid_config();
        config.helm.release_name_prefix = "Bad_Prefix".to_string();
        assert!(config.helm.validate().is_err());
    }

    #[test]
    fn test_prefix_length_leaves_room_for_uuid() {
        let mut config = valid_config();
        config.helm.release_name_prefix = "averylongprefixname1".to_string();
        assert!(config.helm.validate().is_ok());

        config.helm.release_name_prefix.push('2');
        let err = config.helm.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Release Name Prefix `averylongprefixname12` must be at most 20 characters"
        );
    }

    #[test]
    fn test_invalid_catalog_is_reported() {
        let mut config = valid_config();
        config.broker.catalog.services.push(Service {
            id: "svc".to_string(),
            name: "svc".to_string(),
            description: "svc".to_string(),
            plans: vec![],
            ..Default::default()
        });
        let err = config.validate().unwrap_err();
        assert_eq!(root_message(&err), "Must contain at least one plan");
    }

    #[test]
    fn test_load_json_file() {
        let json = r#"{
            "log_level": "INFO",
            "broker": {
                "username": "admin",
                "password": "secret",
                "allow_user_provision_parameters": true,
                "catalog": { "services": [{
                    "id": "svc1", "name": "redis", "description": "Redis",
                    "bindable": true,
                    "plans": [{
                        "id": "plan1", "name": "small", "description": "Small",
                        "metadata": { "deployment": { "chart": "stable/redis", "version": "1.0.0" } }
                    }]
                }]}
            },
            "helm": {
                "release_name_prefix": "osb",
                "default_namespace": "services"
            }
        }"#;

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::load(Some(file.path().to_path_buf())).unwrap();
        assert!(config.broker.allow_user_provision_parameters);
        assert!(!config.broker.allow_user_bind_parameters);
        assert_eq!(config.helm.binary_location, "helm");
        let plan = config.broker.catalog.find_service_plan("svc1", "plan1").unwrap();
        assert_eq!(
            plan.metadata,
            Some(ServicePlanMetadata {
                deployment: DeploymentConfig {
                    chart: "stable/redis".to_string(),
                    version: "1.0.0".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_missing_chart_fails_validation_with_plan_context() {
        for deployment in [r#""deployment": { "version": "1.0.0" }"#, r#""displayName": "Small""#] {
            let json = format!(
                r#"{{
                "broker": {{
                    "username": "admin",
                    "password": "secret",
                    "catalog": {{ "services": [{{
                        "id": "svc1", "name": "redis", "description": "Redis",
                        "plans": [{{
                            "id": "plan1", "name": "small", "description": "Small",
                            "metadata": {{ {deployment} }}
                        }}]
                    }}]}}
                }},
                "helm": {{ "release_name_prefix": "osb", "default_namespace": "services" }}
            }}"#
            );

            let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
            file.write_all(json.as_bytes()).unwrap();

            let err = Config::load(Some(file.path().to_path_buf())).unwrap_err();
            assert_eq!(root_message(&err), "Must provide a non-empty Chart");
            let chain = format!("{err:#}");
            assert!(chain.contains("Validating Catalog configuration"));
            assert!(chain.contains(
                "Validating Plans configuration for Service `redis`: \
                 Validating Deployment configuration for Service Plan `small`"
            ));
        }
    }

    #[test]
    fn test_load_yaml_file() {
        let yaml = "\
log_level: DEBUG
broker:
  username: admin
  password: secret
helm:
  release_name_prefix: osb
  default_namespace: services
  binary_location: /usr/local/bin/helm
  debug: true
";
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert!(config.helm.debug);
        assert_eq!(config.helm.binary_location, "/usr/local/bin/helm");
        assert!(config.broker.catalog.services.is_empty());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = Config::load(Some(PathBuf::from("/nonexistent/helm-broker.json")));
        assert!(result.is_err());
    }
}
