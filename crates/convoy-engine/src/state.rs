//! Service lifecycle states and transition events.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle state of one service within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Waiting on dependencies; no runtime action taken yet.
    Pending,
    /// Instance is being created/started.
    Starting,
    /// Instance started, health gate polling.
    AwaitingHealth,
    /// Health gate passed; dependents may start.
    Healthy,
    /// Explicitly torn down.
    Stopped,
    /// Start failed or health retries exhausted.
    Failed,
}

impl ServiceState {
    /// Whether the state machine can advance further from here.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Healthy | Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Starting => "starting",
            Self::AwaitingHealth => "awaiting_health",
            Self::Healthy => "healthy",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Observable side-effect record: one state transition of one service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub service: String,
    pub from: ServiceState,
    pub to: ServiceState,
    /// Unix timestamp (seconds).
    pub at: u64,
}

/// Channel half the driver hands to observers.
pub type EventSender = mpsc::UnboundedSender<TransitionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransitionEvent>;

/// Tracks one service's state and publishes transitions.
pub(crate) struct Tracker {
    service: String,
    state: ServiceState,
    events: Option<EventSender>,
}

impl Tracker {
    pub(crate) fn new(service: &str, events: Option<EventSender>) -> Self {
        Self {
            service: service.to_string(),
            state: ServiceState::Pending,
            events,
        }
    }

    /// Move to a new state, publishing the transition.
    pub(crate) fn advance(&mut self, to: ServiceState) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        debug!(service = %self.service, %from, %to, "state transition");
        if let Some(events) = &self.events {
            let _ = events.send(TransitionEvent {
                service: self.service.clone(),
                from,
                to,
                at: epoch_secs(),
            });
        }
    }

    pub(crate) fn state(&self) -> ServiceState {
        self.state
    }
}

/// Current Unix epoch in seconds.
pub(crate) fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(ServiceState::Healthy.is_terminal());
        assert!(ServiceState::Stopped.is_terminal());
        assert!(ServiceState::Failed.is_terminal());
        assert!(!ServiceState::Pending.is_terminal());
        assert!(!ServiceState::Starting.is_terminal());
        assert!(!ServiceState::AwaitingHealth.is_terminal());
    }

    #[test]
    fn display_matches_serde_names() {
        assert_eq!(ServiceState::AwaitingHealth.to_string(), "awaiting_health");
        assert_eq!(
            serde_json::to_string(&ServiceState::AwaitingHealth).unwrap(),
            "\"awaiting_health\""
        );
    }

    #[tokio::test]
    async fn tracker_publishes_transitions() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tracker = Tracker::new("db", Some(tx));

        tracker.advance(ServiceState::Starting);
        tracker.advance(ServiceState::AwaitingHealth);
        // No-op transition publishes nothing.
        tracker.advance(ServiceState::AwaitingHealth);
        tracker.advance(ServiceState::Healthy);
        drop(tracker);

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push((event.from, event.to));
        }
        assert_eq!(
            seen,
            vec![
                (ServiceState::Pending, ServiceState::Starting),
                (ServiceState::Starting, ServiceState::AwaitingHealth),
                (ServiceState::AwaitingHealth, ServiceState::Healthy),
            ]
        );
    }
}
