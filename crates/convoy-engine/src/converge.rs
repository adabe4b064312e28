//! Per-service convergence.
//!
//! Drives one service from `Pending` to a settled state: ensure an
//! instance matching the spec exists and runs, then hold it at the
//! health gate. Creation is idempotent: an instance whose fingerprint
//! matches the spec is left untouched; a drifted instance is stopped
//! and recreated.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use convoy_core::ServiceSpec;
use convoy_health::{GateOutcome, HealthGate};
use convoy_runtime::{InstanceId, Runtime, RuntimeResult};

use crate::state::{EventSender, ServiceState, Tracker};

/// How one service ended up after convergence.
#[derive(Debug, Clone)]
pub struct ServiceOutcome {
    pub service: String,
    pub state: ServiceState,
    pub instance: Option<InstanceId>,
}

/// Converge one service. Never panics and never propagates errors:
/// any runtime failure settles the service in `Failed`.
pub(crate) async fn converge_service(
    spec: ServiceSpec,
    runtime: Arc<dyn Runtime>,
    gate: Arc<HealthGate>,
    events: Option<EventSender>,
    cancel: watch::Receiver<bool>,
) -> ServiceOutcome {
    let mut tracker = Tracker::new(&spec.name, events);

    if *cancel.borrow() {
        // Aborted before any side effect: stay Pending.
        return outcome(&spec, &tracker, None);
    }

    tracker.advance(ServiceState::Starting);
    let instance = match ensure_instance(&spec, runtime.as_ref()).await {
        Ok(id) => id,
        Err(e) => {
            error!(service = %spec.name, error = %e, "instance start failed");
            tracker.advance(ServiceState::Failed);
            return outcome(&spec, &tracker, None);
        }
    };

    tracker.advance(ServiceState::AwaitingHealth);
    match gate.await_healthy(&spec, &instance, cancel).await {
        GateOutcome::Healthy => tracker.advance(ServiceState::Healthy),
        GateOutcome::Unhealthy => tracker.advance(ServiceState::Failed),
        // Cancelled: the instance keeps running, state stays AwaitingHealth.
        GateOutcome::Cancelled => {
            info!(service = %spec.name, "health gate cancelled");
        }
    }

    outcome(&spec, &tracker, Some(instance))
}

fn outcome(spec: &ServiceSpec, tracker: &Tracker, instance: Option<InstanceId>) -> ServiceOutcome {
    ServiceOutcome {
        service: spec.name.clone(),
        state: tracker.state(),
        instance,
    }
}

/// Ensure a running instance matching the spec exists.
///
/// - matching fingerprint, running: no action
/// - matching fingerprint, stopped: start it
/// - fingerprint mismatch: stop, remove, recreate (recreate semantics)
/// - no instance: create and start
async fn ensure_instance(spec: &ServiceSpec, runtime: &dyn Runtime) -> RuntimeResult<InstanceId> {
    let fingerprint = spec.fingerprint();

    match runtime.inspect(&spec.name).await? {
        Some(record) if record.fingerprint == fingerprint && record.running => {
            debug!(service = %spec.name, id = %record.id, "instance matches spec, leaving untouched");
            Ok(record.id)
        }
        Some(record) if record.fingerprint == fingerprint => {
            debug!(service = %spec.name, id = %record.id, "instance matches spec but is stopped, starting");
            runtime.start(&record.id).await?;
            Ok(record.id)
        }
        Some(record) => {
            info!(service = %spec.name, id = %record.id, "instance drifted from spec, recreating");
            if record.running {
                runtime.stop(&record.id).await?;
            }
            runtime.remove(&record.id).await?;
            create_and_start(spec, runtime).await
        }
        None => create_and_start(spec, runtime).await,
    }
}

async fn create_and_start(spec: &ServiceSpec, runtime: &dyn Runtime) -> RuntimeResult<InstanceId> {
    let id = runtime.create(spec).await?;
    runtime.start(&id).await?;
    info!(service = %spec.name, %id, image = %spec.image, "instance started");
    Ok(id)
}

/// Stop a service's instance if one is running. Returns whether a stop
/// was performed.
pub(crate) async fn stop_service(
    service: &str,
    runtime: &dyn Runtime,
    events: Option<&EventSender>,
) -> RuntimeResult<bool> {
    let Some(record) = runtime.inspect(service).await? else {
        return Ok(false);
    };
    if !record.running {
        return Ok(false);
    }
    runtime.stop(&record.id).await?;
    info!(%service, id = %record.id, "instance stopped");
    if let Some(events) = events {
        let _ = events.send(crate::state::TransitionEvent {
            service: service.to_string(),
            from: ServiceState::Healthy,
            to: ServiceState::Stopped,
            at: crate::state::epoch_secs(),
        });
    }
    Ok(true)
}
