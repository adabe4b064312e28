//! convoy-health: readiness probing and the health gate.
//!
//! A started service is not a ready service. The gate polls each
//! instance through its declared probe (command, TCP, or HTTP) and only
//! a positive result unblocks the services that depend on it.

pub mod gate;
pub mod probe;

pub use gate::{GateOutcome, HealthGate};
pub use probe::{http_probe, tcp_probe, ProbeResult};
