//! Docker CLI runtime backend.
//!
//! Shells out to the `docker` binary. Instances are containers named
//! `convoy-<service>` and labeled with the spec fingerprint, so
//! [`DockerCli::inspect`] can detect drift across orchestrator restarts.
//! Every invocation is bounded by a call timeout.

use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use convoy_core::{NetworkSpec, ServiceSpec};

use crate::error::{RuntimeError, RuntimeResult};
use crate::{InstanceId, InstanceRecord, NetworkRecord, Runtime};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Container runtime backed by the `docker` command-line client.
pub struct DockerCli {
    binary: String,
    call_timeout: Duration,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Use a different binary (e.g. "podman") or timeout.
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Container name for a service.
    fn container_name(service: &str) -> String {
        format!("convoy-{service}")
    }

    /// Run the binary with args, failing on non-zero exit.
    async fn run(&self, args: &[String]) -> RuntimeResult<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeError::Command(format!(
                "{} {}: {}",
                self.binary,
                args.join(" "),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run the binary with args, returning stdout on success and `None`
    /// on non-zero exit. Used where "not found" is an expected answer.
    async fn run_optional(&self, args: &[String]) -> RuntimeResult<Option<String>> {
        let output = self.output(args).await?;
        if !output.status.success() {
            trace!(args = ?args, "runtime lookup returned nothing");
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    async fn output(&self, args: &[String]) -> RuntimeResult<Output> {
        let fut = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output();
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| RuntimeError::Timeout(self.call_timeout))?
            .map_err(RuntimeError::Io)
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the `docker create` argument list for a spec.
fn create_args(spec: &ServiceSpec) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        DockerCli::container_name(&spec.name),
        "--label".to_string(),
        format!("convoy.service={}", spec.name),
        "--label".to_string(),
        format!("convoy.fingerprint={}", spec.fingerprint()),
    ];
    for port in &spec.ports {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    for mount in &spec.volumes {
        args.push("-v".to_string());
        args.push(mount.to_string());
    }
    // Only one network can be attached at create time; the rest are
    // connected afterwards.
    if let Some(first) = spec.networks.first() {
        args.push("--network".to_string());
        args.push(first.clone());
    }
    args.push(spec.image.clone());
    args
}

#[async_trait]
impl Runtime for DockerCli {
    async fn create(&self, spec: &ServiceSpec) -> RuntimeResult<InstanceId> {
        let id = self.run(&create_args(spec)).await?;
        for network in spec.networks.iter().skip(1) {
            self.run(&[
                "network".to_string(),
                "connect".to_string(),
                network.clone(),
                id.clone(),
            ])
            .await?;
        }
        debug!(service = %spec.name, %id, "container created");
        Ok(id)
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["start".to_string(), id.to_string()]).await?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["stop".to_string(), id.to_string()]).await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> RuntimeResult<()> {
        self.run(&["rm".to_string(), "-f".to_string(), id.to_string()])
            .await?;
        Ok(())
    }

    async fn inspect(&self, service: &str) -> RuntimeResult<Option<InstanceRecord>> {
        let format = r#"{{.Id}}|{{.State.Running}}|{{index .Config.Labels "convoy.fingerprint"}}"#;
        let args = vec![
            "inspect".to_string(),
            "--format".to_string(),
            format.to_string(),
            Self::container_name(service),
        ];
        let Some(line) = self.run_optional(&args).await? else {
            return Ok(None);
        };

        let mut fields = line.splitn(3, '|');
        let id = fields.next().unwrap_or_default().to_string();
        let running = fields.next() == Some("true");
        let fingerprint = fields.next().unwrap_or_default().to_string();
        if id.is_empty() {
            return Err(RuntimeError::Command(format!(
                "unparseable inspect output: {line:?}"
            )));
        }

        Ok(Some(InstanceRecord {
            id,
            service: service.to_string(),
            fingerprint,
            running,
        }))
    }

    async fn exec_probe(&self, id: &str, command: &[String]) -> RuntimeResult<bool> {
        let mut args = vec!["exec".to_string(), id.to_string()];
        args.extend_from_slice(command);
        let output = self.output(&args).await?;
        Ok(output.status.success())
    }

    async fn network_create(&self, spec: &NetworkSpec) -> RuntimeResult<()> {
        self.run(&[
            "network".to_string(),
            "create".to_string(),
            "--driver".to_string(),
            spec.driver.clone(),
            spec.name.clone(),
        ])
        .await?;
        debug!(network = %spec.name, driver = %spec.driver, "network created");
        Ok(())
    }

    async fn network_inspect(&self, name: &str) -> RuntimeResult<Option<NetworkRecord>> {
        let args = vec![
            "network".to_string(),
            "inspect".to_string(),
            "--format".to_string(),
            "{{.Driver}}".to_string(),
            name.to_string(),
        ];
        let Some(driver) = self.run_optional(&args).await? else {
            return Ok(None);
        };
        Ok(Some(NetworkRecord {
            name: name.to_string(),
            driver,
        }))
    }
}
