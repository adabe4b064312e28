//! The orchestrator driver.
//!
//! Walks the deployment plan wave by wave: provision the networks the
//! wave introduces, converge every service in the wave concurrently,
//! then wait for the whole wave to settle before admitting the next.
//! Any failure stops wave admission (fail-fast) but never tears down
//! branches that already converged.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use convoy_core::StackSpec;
use convoy_health::HealthGate;
use convoy_plan::DeploymentPlan;
use convoy_runtime::{NetworkProvisioner, Runtime};

use crate::converge::{converge_service, stop_service};
use crate::state::{EventSender, ServiceState, Tracker};

/// Terminal (or last observed) state of one service after a run.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub service: String,
    pub state: ServiceState,
}

/// Aggregated outcome of one convergence run.
#[derive(Debug, Clone)]
pub struct ConvergenceReport {
    entries: Vec<ReportEntry>,
}

impl ConvergenceReport {
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    pub fn state(&self, service: &str) -> Option<ServiceState> {
        self.entries
            .iter()
            .find(|e| e.service == service)
            .map(|e| e.state)
    }

    pub fn healthy_count(&self) -> usize {
        self.count(|s| s == ServiceState::Healthy)
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| s == ServiceState::Failed)
    }

    /// Services that never reached a terminal state.
    pub fn pending_count(&self) -> usize {
        self.count(|s| !s.is_terminal())
    }

    /// Full convergence: everything healthy, nothing failed or stuck.
    pub fn succeeded(&self) -> bool {
        self.failed_count() == 0 && self.pending_count() == 0
    }

    fn count(&self, pred: impl Fn(ServiceState) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(e.state)).count()
    }
}

impl fmt::Display for ConvergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} healthy, {} failed",
            self.healthy_count(),
            self.failed_count()
        )?;
        if self.pending_count() > 0 {
            write!(f, ", {} pending", self.pending_count())?;
        }
        Ok(())
    }
}

/// Drives a whole stack through convergence.
pub struct Orchestrator {
    runtime: Arc<dyn Runtime>,
    provisioner: NetworkProvisioner,
    gate: Arc<HealthGate>,
    events: Option<EventSender>,
}

impl Orchestrator {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            provisioner: NetworkProvisioner::new(runtime.clone()),
            gate: Arc::new(HealthGate::new(runtime.clone())),
            runtime,
            events: None,
        }
    }

    /// Publish state transitions to the given channel.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Converge the stack along the plan. Load-time errors have already
    /// been ruled out; from here every per-service problem settles as a
    /// `Failed` entry in the report rather than an early return.
    pub async fn converge(
        &self,
        stack: &StackSpec,
        plan: &DeploymentPlan,
        cancel: watch::Receiver<bool>,
    ) -> ConvergenceReport {
        let mut states: HashMap<String, ServiceState> = plan
            .waves()
            .iter()
            .flat_map(|w| w.services.iter())
            .map(|s| (s.clone(), ServiceState::Pending))
            .collect();

        info!(stack = %stack.name, waves = plan.waves().len(), "starting convergence");

        for (index, wave) in plan.waves().iter().enumerate() {
            if *cancel.borrow() {
                warn!(wave = index, "run cancelled, halting wave admission");
                break;
            }

            let broken_networks = self.provision_wave_networks(stack, plan, index).await;

            let mut tasks = JoinSet::new();
            for name in &wave.services {
                let Some(spec) = stack.service(name) else {
                    continue;
                };
                if spec.networks.iter().any(|n| broken_networks.contains(n)) {
                    // The service cannot be placed; fail it without
                    // touching the runtime.
                    let mut tracker = Tracker::new(name, self.events.clone());
                    tracker.advance(ServiceState::Failed);
                    states.insert(name.clone(), ServiceState::Failed);
                    continue;
                }
                tasks.spawn(converge_service(
                    spec.clone(),
                    self.runtime.clone(),
                    self.gate.clone(),
                    self.events.clone(),
                    cancel.clone(),
                ));
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(outcome) => {
                        states.insert(outcome.service.clone(), outcome.state);
                    }
                    Err(e) => error!(error = %e, "convergence task panicked"),
                }
            }

            let failed_in_wave = wave
                .services
                .iter()
                .filter(|s| states.get(*s) == Some(&ServiceState::Failed))
                .count();
            if failed_in_wave > 0 {
                warn!(
                    wave = index,
                    failed = failed_in_wave,
                    "wave failed, dependents will stay pending"
                );
                break;
            }
        }

        let entries = plan
            .waves()
            .iter()
            .flat_map(|w| w.services.iter())
            .map(|s| ReportEntry {
                service: s.clone(),
                state: states.get(s).copied().unwrap_or(ServiceState::Pending),
            })
            .collect();
        let report = ConvergenceReport { entries };
        info!(stack = %stack.name, report = %report, "convergence finished");
        report
    }

    /// Provision the networks a wave introduces. Returns the names that
    /// could not be provisioned; services referencing them must fail.
    async fn provision_wave_networks(
        &self,
        stack: &StackSpec,
        plan: &DeploymentPlan,
        wave: usize,
    ) -> HashSet<String> {
        let mut broken = HashSet::new();
        for name in plan.networks_for_wave(wave) {
            let Some(net) = stack.network(name) else {
                // Validation guarantees declared networks; guard anyway.
                broken.insert(name.clone());
                continue;
            };
            if let Err(e) = self.provisioner.ensure(net).await {
                error!(network = %name, error = %e, "network provisioning failed");
                broken.insert(name.clone());
            }
        }
        broken
    }

    /// Tear the stack down in reverse wave order. Returns the number of
    /// instances actually stopped; per-service errors are logged and do
    /// not abort the teardown.
    pub async fn down(&self, plan: &DeploymentPlan) -> usize {
        let mut stopped = 0;
        for service in plan.reverse_order() {
            match stop_service(&service, self.runtime.as_ref(), self.events.as_ref()).await {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(e) => warn!(%service, error = %e, "teardown stop failed"),
            }
        }
        info!(stopped, "teardown finished");
        stopped
    }
}
