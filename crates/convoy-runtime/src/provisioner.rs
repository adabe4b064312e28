//! Idempotent network provisioning.
//!
//! Check-then-create per network name, serialized by a per-name async
//! lock so concurrent provisioning attempts for the same network cannot
//! race the runtime. Re-provisioning an existing, compatible network is
//! a silent no-op; a driver mismatch is a conflict.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use convoy_core::NetworkSpec;

use crate::error::{RuntimeError, RuntimeResult};
use crate::Runtime;

/// Ensures declared networks exist before services attach to them.
pub struct NetworkProvisioner {
    runtime: Arc<dyn Runtime>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NetworkProvisioner {
    pub fn new(runtime: Arc<dyn Runtime>) -> Self {
        Self {
            runtime,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Ensure the network exists with a compatible driver.
    pub async fn ensure(&self, spec: &NetworkSpec) -> RuntimeResult<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(spec.name.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        match self.runtime.network_inspect(&spec.name).await? {
            Some(existing) if existing.driver == spec.driver => {
                debug!(network = %spec.name, "network already present, nothing to do");
                Ok(())
            }
            Some(existing) => Err(RuntimeError::NetworkConflict {
                name: spec.name.clone(),
                existing: existing.driver,
                requested: spec.driver.clone(),
            }),
            None => {
                self.runtime.network_create(spec).await?;
                info!(network = %spec.name, driver = %spec.driver, "network provisioned");
                Ok(())
            }
        }
    }
}
