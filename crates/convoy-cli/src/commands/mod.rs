use std::sync::Arc;

use anyhow::bail;

use convoy_runtime::{DockerCli, Runtime};

pub mod deploy;
pub mod down;
pub mod plan;
pub mod status;

/// Construct the runtime backend named on the command line.
pub fn runtime_backend(kind: &str) -> anyhow::Result<Arc<dyn Runtime>> {
    match kind {
        "docker" => Ok(Arc::new(DockerCli::new())),
        "podman" => Ok(Arc::new(DockerCli::new().with_binary("podman"))),
        other => bail!("unknown runtime backend: {other} (expected docker or podman)"),
    }
}
