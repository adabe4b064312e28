//! convoy-runtime: the container runtime seam.
//!
//! The orchestrator's only external dependency is a runtime capable of
//! creating, starting, stopping, and inspecting container-like instances
//! and named networks. The [`Runtime`] trait captures exactly that
//! capability set; [`DockerCli`] implements it against the `docker`
//! binary, and [`FakeRuntime`] is the in-memory double used by tests.

pub mod docker;
pub mod error;
pub mod fake;
pub mod provisioner;

use async_trait::async_trait;

use convoy_core::{NetworkSpec, ServiceSpec};

pub use docker::DockerCli;
pub use error::{RuntimeError, RuntimeResult};
pub use fake::{FakeRuntime, ProbePlan};
pub use provisioner::NetworkProvisioner;

/// Runtime identifier of a created instance.
pub type InstanceId = String;

/// What a runtime knows about an existing instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub id: InstanceId,
    /// Service name the instance was created for.
    pub service: String,
    /// Spec fingerprint the instance was created from.
    pub fingerprint: String,
    pub running: bool,
}

/// What a runtime knows about an existing network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    pub name: String,
    pub driver: String,
}

/// Abstract container runtime capability.
///
/// Implementations must be safe to call concurrently; every method is
/// expected to be bounded in time by the implementation (the engine never
/// wraps these in its own unbounded waits).
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Create a stopped instance for the spec, carrying its fingerprint.
    async fn create(&self, spec: &ServiceSpec) -> RuntimeResult<InstanceId>;

    /// Start a created instance.
    async fn start(&self, id: &str) -> RuntimeResult<()>;

    /// Stop a running instance. Stopping an already-stopped instance is
    /// a no-op.
    async fn stop(&self, id: &str) -> RuntimeResult<()>;

    /// Remove an instance entirely.
    async fn remove(&self, id: &str) -> RuntimeResult<()>;

    /// Look up the instance for a service name, if one exists.
    async fn inspect(&self, service: &str) -> RuntimeResult<Option<InstanceRecord>>;

    /// Run a health-check command inside an instance; `true` means the
    /// command exited 0.
    async fn exec_probe(&self, id: &str, command: &[String]) -> RuntimeResult<bool>;

    /// Create a named network.
    async fn network_create(&self, spec: &NetworkSpec) -> RuntimeResult<()>;

    /// Look up a network by name, if one exists.
    async fn network_inspect(&self, name: &str) -> RuntimeResult<Option<NetworkRecord>>;
}
