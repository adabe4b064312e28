//! The health gate: holds a started service until it is ready.
//!
//! Polls the service's declared probe at its interval, up to its retry
//! count, each attempt bounded by its timeout. First success unblocks
//! dependents. The gate is cancellable: when the run is aborted the
//! poll loop returns immediately without touching the instance.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use convoy_core::{Probe, ServiceSpec};
use convoy_runtime::Runtime;

use crate::probe::{http_probe, tcp_probe, ProbeResult};

/// Terminal answer of one gate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// A probe attempt succeeded.
    Healthy,
    /// Retries exhausted without a success.
    Unhealthy,
    /// The run was aborted while polling.
    Cancelled,
}

/// Polls services through their declared health checks.
pub struct HealthGate {
    runtime: Arc<dyn Runtime>,
}

impl HealthGate {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }

    /// Poll until the service reports ready, retries are exhausted, or
    /// the run is cancelled.
    ///
    /// A service without a declared health check is considered healthy
    /// as soon as the runtime reports its instance running.
    pub async fn await_healthy(
        &self,
        spec: &ServiceSpec,
        instance_id: &str,
        mut cancel: watch::Receiver<bool>,
    ) -> GateOutcome {
        let Some(check) = &spec.health else {
            return match self.runtime.inspect(&spec.name).await {
                Ok(Some(record)) if record.running => GateOutcome::Healthy,
                Ok(_) => {
                    warn!(service = %spec.name, "instance not running after start");
                    GateOutcome::Unhealthy
                }
                Err(e) => {
                    warn!(service = %spec.name, error = %e, "inspect failed during health gate");
                    GateOutcome::Unhealthy
                }
            };
        };

        for attempt in 1..=check.retries {
            if *cancel.borrow() {
                return GateOutcome::Cancelled;
            }

            let result = match &check.probe {
                Probe::Command(command) => {
                    match self.runtime.exec_probe(instance_id, command).await {
                        Ok(true) => ProbeResult::Healthy,
                        Ok(false) => ProbeResult::Unhealthy,
                        Err(e) => {
                            debug!(service = %spec.name, error = %e, "command probe failed to run");
                            ProbeResult::Failed
                        }
                    }
                }
                Probe::Tcp { port } => {
                    tcp_probe(&format!("127.0.0.1:{port}"), check.timeout).await
                }
                Probe::Http { port, path } => {
                    http_probe(&format!("127.0.0.1:{port}"), path, check.timeout).await
                }
            };

            if result == ProbeResult::Healthy {
                debug!(service = %spec.name, attempt, "health probe succeeded");
                return GateOutcome::Healthy;
            }
            debug!(
                service = %spec.name,
                attempt,
                retries = check.retries,
                ?result,
                "health probe not ready"
            );

            // Last attempt: no point waiting out the interval.
            if attempt == check.retries {
                break;
            }
            if wait_or_cancel(check.interval, &mut cancel).await {
                return GateOutcome::Cancelled;
            }
        }

        warn!(service = %spec.name, retries = check.retries, "health retries exhausted");
        GateOutcome::Unhealthy
    }
}

/// Sleep for the interval, returning early with `true` if cancelled.
async fn wait_or_cancel(
    interval: std::time::Duration,
    cancel: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(interval) => false,
        changed = cancel.changed() => match changed {
            Ok(()) => *cancel.borrow(),
            // Sender gone: nobody can cancel any more, finish the sleep.
            Err(_) => {
                tokio::time::sleep(interval).await;
                false
            }
        },
    }
}
