//! convoy-plan: dependency-ordered deployment planning.
//!
//! Turns a validated [`convoy_core::StackSpec`] into a [`DeploymentPlan`]:
//! an ordered list of waves where every service's dependencies sit in a
//! strictly earlier wave. Cycles are rejected before any side effect.

pub mod error;
pub mod resolver;

pub use error::{PlanError, PlanResult};
pub use resolver::{DeploymentPlan, Wave};
