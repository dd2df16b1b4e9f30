// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Helm Release Adapter
//!
//! Translates lifecycle intents into `helm` invocations and normalises their
//! output. Every call goes through [`HelmClient::helm`]:
//!
//! ```text
//! helm [--host h] [--tiller-namespace n] [--kube-context c] [--debug] <verb ...>
//!
//! install <chart> --name <release> --namespace <ns> [--repo r] [--version v] [--set k=v ...]
//! upgrade <release> <chart> --namespace <ns> [--repo r] [--version v] [--set k=v ...]
//! delete --purge <release>
//! status <release>
//! ```
//!
//! Empty repository/version values are omitted rather than passed as empty
//! flags. Parameters become `--set` / `--set-string` pairs in key order.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::domain::catalog::DeploymentConfig;
use crate::domain::config::HelmConfig;
use crate::domain::engine::{EngineError, ReleaseAction, ReleaseEngine};
use crate::domain::parameters::Parameters;
use crate::domain::release::{parse_status, ReleaseName, ReleaseStatus};
use crate::infrastructure::command::{CommandExecutor, ProcessExecutor};

pub struct HelmClient {
    config: HelmConfig,
    executor: Arc<dyn CommandExecutor>,
}

impl HelmClient {
    pub fn new(config: HelmConfig, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }

    /// Client that spawns the configured helm binary
    pub fn with_process_executor(config: HelmConfig) -> Self {
        Self::new(config, Arc::new(ProcessExecutor::new()))
    }

    /// Connection/context flags that precede every verb
    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if !self.config.tiller_host.is_empty() {
            args.push("--host".to_string());
            args.push(self.config.tiller_host.clone());
        }
        if !self.config.tiller_namespace.is_empty() {
            args.push("--tiller-namespace".to_string());
            args.push(self.config.tiller_namespace.clone());
        }
        if !self.config.kube_context.is_empty() {
            args.push("--kube-context".to_string());
            args.push(self.config.kube_context.clone());
        }
        if self.config.debug {
            args.push("--debug".to_string());
        }
        args
    }

    fn install_args(
        &self,
        release: &ReleaseName,
        deployment: &DeploymentConfig,
        parameters: &Parameters,
    ) -> Vec<String> {
        let mut args = vec![
            "install".to_string(),
            deployment.chart.clone(),
            "--name".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            self.config.default_namespace.clone(),
        ];
        args.extend(source_args(deployment));
        args.extend(set_args(parameters));
        args
    }

    fn upgrade_args(
        &self,
        release: &ReleaseName,
        deployment: &DeploymentConfig,
        parameters: &Parameters,
    ) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            release.to_string(),
            deployment.chart.clone(),
            "--namespace".to_string(),
            self.config.default_namespace.clone(),
        ];
        args.extend(source_args(deployment));
        args.extend(set_args(parameters));
        args
    }

    /// Run helm with the global flags followed by `verb_args`.
    ///
    /// Returns the combined output on a zero exit. The output is logged at
    /// debug level whatever the outcome and never placed in the error.
    async fn helm(
        &self,
        action: ReleaseAction,
        release: &ReleaseName,
        verb_args: Vec<String>,
    ) -> Result<String, EngineError> {
        let mut args = self.global_args();
        args.extend(verb_args);

        debug!(
            program = %self.config.binary_location,
            arguments = ?args,
            "helm"
        );

        let result = self
            .executor
            .run(&self.config.binary_location, &args)
            .await
            .map_err(|source| {
                error!(%action, %release, error = %source, "helm could not be started");
                EngineError::Unreachable {
                    action,
                    release: release.clone(),
                    source,
                }
            })?;

        debug!(%action, %release, exit_code = ?result.exit_code, output = %result.output, "helm");

        if !result.success {
            error!(%action, %release, exit_code = ?result.exit_code, "helm exited unsuccessfully");
            return Err(EngineError::CommandFailed {
                action,
                release: release.clone(),
            });
        }

        Ok(result.output)
    }
}

#[async_trait]
impl ReleaseEngine for HelmClient {
    fn release_name(&self, instance_id: &str) -> Result<ReleaseName, EngineError> {
        Ok(ReleaseName::derive(&self.config.release_name_prefix, instance_id)?)
    }

    async fn install(
        &self,
        instance_id: &str,
        deployment: &DeploymentConfig,
        parameters: &Parameters,
    ) -> Result<(), EngineError> {
        let release = self.release_name(instance_id)?;
        info!(instance_id, %release, chart = %deployment.chart, "Installing release");

        let args = self.install_args(&release, deployment, parameters);
        self.helm(ReleaseAction::Install, &release, args).await?;
        Ok(())
    }

    async fn upgrade(
        &self,
        instance_id: &str,
        deployment: &DeploymentConfig,
        parameters: &Parameters,
    ) -> Result<(), EngineError> {
        let release = self.release_name(instance_id)?;
        info!(instance_id, %release, chart = %deployment.chart, "Upgrading release");

        let args = self.upgrade_args(&release, deployment, parameters);
        self.helm(ReleaseAction::Upgrade, &release, args).await?;
        Ok(())
    }

    async fn delete(&self, instance_id: &str) -> Result<(), EngineError> {
        let release = self.release_name(instance_id)?;
        info!(instance_id, %release, "Deleting release");

        let args = vec![
            "delete".to_string(),
            "--purge".to_string(),
            release.to_string(),
        ];
        self.helm(ReleaseAction::Delete, &release, args).await?;
        Ok(())
    }

    async fn status(&self, instance_id: &str) -> Result<ReleaseStatus, EngineError> {
        let release = self.release_name(instance_id)?;

        let args = vec!["status".to_string(), release.to_string()];
        let output = self.helm(ReleaseAction::Status, &release, args).await?;

        let status = parse_status(&output);
        debug!(instance_id, %release, state = %status.state, "Parsed release status");
        Ok(status)
    }
}

fn source_args(deployment: &DeploymentConfig) -> Vec<String> {
    let mut args = Vec::new();
    if !deployment.repository.is_empty() {
        args.push("--repo".to_string());
        args.push(deployment.repository.clone());
    }
    if !deployment.version.is_empty() {
        args.push("--version".to_string());
        args.push(deployment.version.clone());
    }
    args
}

/// Render parameters as helm `--set` arguments.
///
/// Nested objects flatten to dotted keys, arrays to `key[i]`. Strings go
/// through `--set-string` so helm does not re-type values like `"true"`.
fn set_args(parameters: &Parameters) -> Vec<String> {
    let mut pairs = Vec::new();
    for (key, value) in parameters {
        flatten(escape_key(key), value, &mut pairs);
    }

    pairs
        .into_iter()
        .flat_map(|(flag, assignment)| [flag.to_string(), assignment])
        .collect()
}

fn flatten(path: String, value: &Value, out: &mut Vec<(&'static str, String)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, nested) in map {
                flatten(format!("{path}.{}", escape_key(key)), nested, out);
            }
        }
        Value::Object(_) => {}
        Value::Array(items) if items.is_empty() => out.push(("--set", format!("{path}={{}}"))),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(format!("{path}[{index}]"), item, out);
            }
        }
        Value::String(s) => out.push(("--set-string", format!("{path}={}", escape_value(s)))),
        Value::Null => out.push(("--set", format!("{path}=null"))),
        Value::Bool(b) => out.push(("--set", format!("{path}={b}"))),
        Value::Number(n) => out.push(("--set", format!("{path}={n}"))),
    }
}

/// Backslash-escape every character helm's key parser treats as syntax
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for c in key.chars() {
        if matches!(c, '\\' | '.' | '=' | ',' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape separators, and a leading `{` that helm would read as a list
fn escape_value(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace(',', "\\,");
    match escaped.strip_prefix('{') {
        Some(rest) => format!("\\{{{rest}"),
        None => escaped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::release::LifecycleOperationState;
    use crate::infrastructure::command::CommandOutput;
    use serde_json::json;
    use std::sync::Mutex;

    struct ScriptedExecutor {
        calls: Mutex<Vec<(String, Vec<String>)>>,
        response: std::io::Result<CommandOutput>,
    }

    impl ScriptedExecutor {
        fn replying(response: std::io::Result<CommandOutput>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                response,
            })
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandExecutor for ScriptedExecutor {
        async fn run(&self, program: &str, args: &[String]) -> std::io::Result<CommandOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((program.to_string(), args.to_vec()));
            match &self.response {
                Ok(output) => Ok(output.clone()),
                Err(e) => Err(std::io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    fn config() -> HelmConfig {
        HelmConfig {
            release_name_prefix: "osb".to_string(),
            default_namespace: "services".to_string(),
            binary_location: "/usr/local/bin/helm".to_string(),
            ..Default::default()
        }
    }

    fn deployment(repository: &str, version: &str) -> DeploymentConfig {
        DeploymentConfig {
            chart: "mychart".to_string(),
            repository: repository.to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_install_omits_empty_source_pins() {
        let executor = ScriptedExecutor::replying(Ok(CommandOutput::succeeded("")));
        let client = HelmClient::new(config(), executor.clone());

        client
            .install("abc-123", &deployment("", "1.0.0"), &Parameters::new())
            .await
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/usr/local/bin/helm");
        assert_eq!(
            calls[0].1,
            strings(&["install", "mychart", "--name", "osb-abc123", "--namespace", "services", "--version", "1.0.0"])
        );
    }

    #[tokio::test]
    async fn test_upgrade_addresses_release_first() {
        let executor = ScriptedExecutor::replying(Ok(CommandOutput::succeeded("")));
        let client = HelmClient::new(config(), executor.clone());

        client
            .upgrade("abc-123", &deployment("https://charts.example.com", ""), &Parameters::new())
            .await
            .unwrap();

        assert_eq!(
            executor.calls()[0].1,
            strings(&[
                "upgrade", "osb-abc123", "mychart", "--namespace", "services",
                "--repo", "https://charts.example.com",
            ])
        );
    }

    #[tokio::test]
    async fn test_global_flags_precede_verb() {
        let executor = ScriptedExecutor::replying(Ok(CommandOutput::succeeded("")));
        let mut config = config();
        config.tiller_host = "tiller.kube-system:44134".to_string();
        config.tiller_namespace = "kube-system".to_string();
        config.kube_context = "prod".to_string();
        config.debug = true;
        let client = HelmClient::new(config, executor.clone());

        client.delete("abc-123").await.unwrap();

        assert_eq!(
            executor.calls()[0].1,
            strings(&[
                "--host", "tiller.kube-system:44134",
                "--tiller-namespace", "kube-system",
                "--kube-context", "prod",
                "--debug",
                "delete", "--purge", "osb-abc123",
            ])
        );
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_engine_error_without_output() {
        let executor = ScriptedExecutor::replying(Ok(CommandOutput::failed(
            1,
            "Error: release: \"osb-abc123\" not found",
        )));
        let client = HelmClient::new(config(), executor);

        let err = client.delete("abc-123").await.unwrap_err();
        assert!(matches!(err, EngineError::CommandFailed { action: ReleaseAction::Delete, .. }));
        assert_eq!(err.release().map(ReleaseName::as_str), Some("osb-abc123"));
        assert!(!err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_unreachable() {
        let executor = ScriptedExecutor::replying(Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "No such file or directory",
        )));
        let client = HelmClient::new(config(), executor);

        let err = client.status("abc-123").await.unwrap_err();
        assert!(matches!(err, EngineError::Unreachable { action: ReleaseAction::Status, .. }));
    }

    #[tokio::test]
    async fn test_status_parses_output() {
        let executor = ScriptedExecutor::replying(Ok(CommandOutput::succeeded(
            "LAST DEPLOYED: Tue Oct 10 12:25:08 2017\nNAMESPACE: services\nSTATUS: DEPLOYED\n",
        )));
        let client = HelmClient::new(config(), executor.clone());

        let status = client.status("abc-123").await.unwrap();
        assert_eq!(status.state, LifecycleOperationState::Succeeded);
        assert_eq!(
            status.description.as_deref(),
            Some("Last deployed: Tue Oct 10 12:25:08 2017")
        );
        assert_eq!(executor.calls()[0].1, strings(&["status", "osb-abc123"]));
    }

    #[test]
    fn test_set_args_flatten_and_escape() {
        let parameters = Parameters::from([
            ("replicas".to_string(), json!(3)),
            ("image".to_string(), json!({"tag": "7.0", "pull.policy": "Always"})),
            ("hosts".to_string(), json!(["a.example.com", "b,c"])),
            ("persistence".to_string(), json!({"enabled": false, "annotations": {}})),
            ("extraArgs".to_string(), json!([])),
            ("password".to_string(), Value::Null),
        ]);

        assert_eq!(
            set_args(&parameters),
            strings(&[
                "--set", "extraArgs={}",
                "--set-string", "hosts[0]=a.example.com",
                "--set-string", "hosts[1]=b\\,c",
                "--set-string", "image.pull\\.policy=Always",
                "--set-string", "image.tag=7.0",
                "--set", "password=null",
                "--set", "persistence.enabled=false",
                "--set", "replicas=3",
            ])
        );
    }

    #[test]
    fn test_set_args_escape_parser_delimiters() {
        let parameters = Parameters::from([
            ("a=b".to_string(), json!("x")),
            ("k,extra".to_string(), json!("y")),
            ("list[0]".to_string(), json!("z")),
            ("s".to_string(), json!("{not-a-list}")),
            ("path".to_string(), json!("C:\\tmp")),
        ]);

        assert_eq!(
            set_args(&parameters),
            strings(&[
                "--set-string", "a\\=b=x",
                "--set-string", "k\\,extra=y",
                "--set-string", "list\\[0\\]=z",
                "--set-string", "path=C:\\\\tmp",
                "--set-string", "s=\\{not-a-list}",
            ])
        );
    }
}
