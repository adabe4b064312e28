//! Error types for stack spec loading and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for spec operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Errors produced while loading or validating a stack spec.
///
/// All variants are load-time failures: none of them is raised after
/// any side effect has been performed against a runtime.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read spec file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid spec document: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("stack declares no services")]
    EmptyStack,

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("duplicate network name: {0}")]
    DuplicateNetwork(String),

    #[error("service {0}: missing image reference")]
    MissingImage(String),

    #[error("service {service}: cannot parse port mapping {mapping:?} (expected \"host:container\")")]
    BadPortMapping { service: String, mapping: String },

    #[error("service {service}: cannot parse volume mount {mount:?} (expected \"host:container\")")]
    BadVolumeMount { service: String, mount: String },

    #[error("service {service} depends on unknown service {dependency:?}")]
    UnknownDependency { service: String, dependency: String },

    #[error("service {service} joins undeclared network {network:?}")]
    UnknownNetwork { service: String, network: String },

    #[error("service {service}: health check must declare exactly one of command, tcp_port, http_port")]
    AmbiguousProbe { service: String },

    #[error("service {service}: health check declares no probe")]
    MissingProbe { service: String },

    #[error("service {service}: health retries must be at least 1")]
    ZeroRetries { service: String },

    #[error("cannot parse duration {0:?} (expected forms: \"500ms\", \"5s\", \"1m\")")]
    BadDuration(String),
}
