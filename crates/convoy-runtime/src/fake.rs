//! In-memory runtime double for tests.
//!
//! Tracks instances and networks in a plain map and counts every mutating
//! call, so idempotence properties ("re-running an unchanged spec performs
//! zero creations") are directly assertable. Command probes are scripted
//! per service via [`ProbePlan`].

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use convoy_core::{NetworkSpec, ServiceSpec};

use crate::error::{RuntimeError, RuntimeResult};
use crate::{InstanceId, InstanceRecord, NetworkRecord, Runtime};

/// Scripted outcome sequence for a service's command probe.
#[derive(Debug, Clone, Copy)]
pub enum ProbePlan {
    /// Every probe succeeds.
    AlwaysHealthy,
    /// Every probe fails.
    NeverHealthy,
    /// The first N probes fail, then all succeed.
    HealthyAfter(u32),
}

#[derive(Debug, Clone)]
struct FakeInstance {
    id: InstanceId,
    service: String,
    fingerprint: String,
    running: bool,
}

#[derive(Debug, Default)]
struct Counters {
    creates: u32,
    starts: u32,
    stops: u32,
    removes: u32,
    network_creates: u32,
}

#[derive(Default)]
struct Inner {
    instances: HashMap<String, FakeInstance>,
    /// network name -> driver
    networks: HashMap<String, String>,
    probe_plans: HashMap<String, (ProbePlan, u32)>,
    fail_creates: HashSet<String>,
    counters: Counters,
    next_id: u64,
}

/// In-memory [`Runtime`] implementation.
#[derive(Default)]
pub struct FakeRuntime {
    inner: Mutex<Inner>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the command-probe outcomes for a service.
    pub fn set_probe_plan(&self, service: &str, plan: ProbePlan) {
        let mut inner = self.inner.lock().unwrap();
        inner.probe_plans.insert(service.to_string(), (plan, 0));
    }

    /// Make `create` fail for a service, to exercise error paths.
    pub fn fail_create_for(&self, service: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_creates.insert(service.to_string());
    }

    /// Seed a pre-existing instance, as if a previous run created it.
    pub fn preload(&self, spec: &ServiceSpec, running: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let instance = FakeInstance {
            id: format!("fake-{}", inner.next_id),
            service: spec.name.clone(),
            fingerprint: spec.fingerprint(),
            running,
        };
        inner.instances.insert(spec.name.clone(), instance);
    }

    /// Seed a pre-existing network.
    pub fn preload_network(&self, name: &str, driver: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.networks.insert(name.to_string(), driver.to_string());
    }

    pub fn creates(&self) -> u32 {
        self.inner.lock().unwrap().counters.creates
    }

    pub fn starts(&self) -> u32 {
        self.inner.lock().unwrap().counters.starts
    }

    pub fn stops(&self) -> u32 {
        self.inner.lock().unwrap().counters.stops
    }

    pub fn removes(&self) -> u32 {
        self.inner.lock().unwrap().counters.removes
    }

    pub fn network_creates(&self) -> u32 {
        self.inner.lock().unwrap().counters.network_creates
    }

    pub fn is_running(&self, service: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .instances
            .get(service)
            .map(|i| i.running)
            .unwrap_or(false)
    }

    pub fn has_network(&self, name: &str) -> bool {
        self.inner.lock().unwrap().networks.contains_key(name)
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    async fn create(&self, spec: &ServiceSpec) -> RuntimeResult<InstanceId> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_creates.contains(&spec.name) {
            return Err(RuntimeError::Command(format!(
                "injected create failure for {}",
                spec.name
            )));
        }
        inner.counters.creates += 1;
        inner.next_id += 1;
        let id = format!("fake-{}", inner.next_id);
        let instance = FakeInstance {
            id: id.clone(),
            service: spec.name.clone(),
            fingerprint: spec.fingerprint(),
            running: false,
        };
        inner.instances.insert(spec.name.clone(), instance);
        Ok(id)
    }

    async fn start(&self, id: &str) -> RuntimeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let instance = inner
            .instances
            .values_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))?;
        instance.running = true;
        inner.counters.starts += 1;
        Ok(())
    }

    async fn stop(&self, id: &str) -> RuntimeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let instance = inner
            .instances
            .values_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))?;
        instance.running = false;
        inner.counters.stops += 1;
        Ok(())
    }

    async fn remove(&self, id: &str) -> RuntimeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.counters.removes += 1;
        inner.instances.retain(|_, i| i.id != id);
        Ok(())
    }

    async fn inspect(&self, service: &str) -> RuntimeResult<Option<InstanceRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.instances.get(service).map(|i| InstanceRecord {
            id: i.id.clone(),
            service: i.service.clone(),
            fingerprint: i.fingerprint.clone(),
            running: i.running,
        }))
    }

    async fn exec_probe(&self, id: &str, _command: &[String]) -> RuntimeResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let service = inner
            .instances
            .values()
            .find(|i| i.id == id)
            .map(|i| i.service.clone())
            .ok_or_else(|| RuntimeError::InstanceNotFound(id.to_string()))?;

        let (plan, attempts) = inner
            .probe_plans
            .entry(service)
            .or_insert((ProbePlan::AlwaysHealthy, 0));
        *attempts += 1;
        Ok(match plan {
            ProbePlan::AlwaysHealthy => true,
            ProbePlan::NeverHealthy => false,
            ProbePlan::HealthyAfter(n) => *attempts > *n,
        })
    }

    async fn network_create(&self, spec: &NetworkSpec) -> RuntimeResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.networks.contains_key(&spec.name) {
            // A real runtime refuses duplicate names; the provisioner is
            // expected to have checked first.
            return Err(RuntimeError::Command(format!(
                "network {} already exists",
                spec.name
            )));
        }
        inner.counters.network_creates += 1;
        inner
            .networks
            .insert(spec.name.clone(), spec.driver.clone());
        Ok(())
    }

    async fn network_inspect(&self, name: &str) -> RuntimeResult<Option<NetworkRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.networks.get(name).map(|driver| NetworkRecord {
            name: name.to_string(),
            driver: driver.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn spec(name: &str) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            image: format!("{name}:latest"),
            ports: vec![],
            env: BTreeMap::new(),
            networks: vec![],
            depends_on: vec![],
            volumes: vec![],
            health: None,
        }
    }

    #[tokio::test]
    async fn create_start_inspect_roundtrip() {
        let rt = FakeRuntime::new();
        let spec = spec("db");

        let id = rt.create(&spec).await.unwrap();
        assert!(!rt.is_running("db"));
        rt.start(&id).await.unwrap();

        let record = rt.inspect("db").await.unwrap().unwrap();
        assert_eq!(record.id, id);
        assert!(record.running);
        assert_eq!(record.fingerprint, spec.fingerprint());
        assert_eq!(rt.creates(), 1);
        assert_eq!(rt.starts(), 1);
    }

    #[tokio::test]
    async fn inspect_unknown_service_is_none() {
        let rt = FakeRuntime::new();
        assert!(rt.inspect("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn start_unknown_id_fails() {
        let rt = FakeRuntime::new();
        let err = rt.start("missing").await.unwrap_err();
        assert!(matches!(err, RuntimeError::InstanceNotFound(_)));
    }

    #[tokio::test]
    async fn probe_plan_healthy_after() {
        let rt = FakeRuntime::new();
        let id = rt.create(&spec("api")).await.unwrap();
        rt.set_probe_plan("api", ProbePlan::HealthyAfter(2));

        let cmd = vec!["true".to_string()];
        assert!(!rt.exec_probe(&id, &cmd).await.unwrap());
        assert!(!rt.exec_probe(&id, &cmd).await.unwrap());
        assert!(rt.exec_probe(&id, &cmd).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_network_create_fails() {
        let rt = FakeRuntime::new();
        let net = NetworkSpec {
            name: "edge".to_string(),
            driver: "bridge".to_string(),
        };
        rt.network_create(&net).await.unwrap();
        assert!(rt.network_create(&net).await.is_err());
        assert_eq!(rt.network_creates(), 1);
    }

    #[tokio::test]
    async fn injected_create_failure() {
        let rt = FakeRuntime::new();
        rt.fail_create_for("db");
        assert!(rt.create(&spec("db")).await.is_err());
        assert_eq!(rt.creates(), 0);
    }
}
