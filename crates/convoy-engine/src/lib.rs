//! convoy-engine: service convergence and the orchestrator driver.
//!
//! The engine owns every `ServiceInstance` mutation: it alone decides
//! whether an existing instance is kept, restarted, or replaced, and it
//! reports every lifecycle transition as a structured event. The driver
//! sequences waves, gates them on health, and aggregates the final
//! [`ConvergenceReport`].

pub mod converge;
pub mod driver;
pub mod state;

pub use converge::ServiceOutcome;
pub use driver::{ConvergenceReport, Orchestrator, ReportEntry};
pub use state::{EventReceiver, EventSender, ServiceState, TransitionEvent};
