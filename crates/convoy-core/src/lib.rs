//! convoy-core: stack spec model, parsing, and validation.
//!
//! The spec document is TOML; [`StackSpec::from_file`] is the only entry
//! point the rest of the system needs. Loading is pure parse-and-validate:
//! every malformed shape is rejected here, before any runtime side effect.

pub mod config;
pub mod duration;
pub mod error;
pub mod types;

pub use duration::parse_duration;
pub use error::{SpecError, SpecResult};
pub use types::*;
