//! Planning error types.

use thiserror::Error;

/// Result type alias for plan resolution.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that can occur while resolving a deployment plan.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    /// The dependency graph contains a cycle; the listed services
    /// participate in it, in traversal order.
    #[error("cyclic dependency between services: {}", .0.join(" -> "))]
    CyclicDependency(Vec<String>),
}
