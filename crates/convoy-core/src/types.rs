//! Domain types for the convoy stack model.
//!
//! A `StackSpec` is the validated, in-memory form of a spec document:
//! a set of services with images, ports, networks, dependency edges, and
//! health checks, plus the named networks they attach to. Specs are
//! immutable once loaded for a given run.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Unique name of a service within one stack.
pub type ServiceName = String;

/// A host:container port pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host: u16,
    pub container: u16,
}

impl PortMapping {
    /// Parse a "host:container" string.
    pub fn parse(s: &str) -> Option<Self> {
        let (host, container) = s.split_once(':')?;
        Some(Self {
            host: host.trim().parse().ok()?,
            container: container.trim().parse().ok()?,
        })
    }
}

impl fmt::Display for PortMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.container)
    }
}

/// A host path bind-mounted into an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
}

impl VolumeMount {
    /// Parse a "host:container" string. Splits on the first colon.
    pub fn parse(s: &str) -> Option<Self> {
        let (host, container) = s.split_once(':')?;
        if host.is_empty() || container.is_empty() {
            return None;
        }
        Some(Self {
            host_path: host.to_string(),
            container_path: container.to_string(),
        })
    }
}

impl fmt::Display for VolumeMount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host_path, self.container_path)
    }
}

/// The probe half of a health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    /// Run a command inside the instance; exit 0 means healthy.
    Command(Vec<String>),
    /// Open a TCP connection to the given (host-side) port.
    Tcp { port: u16 },
    /// GET an HTTP path on the given (host-side) port; 2xx means healthy.
    Http { port: u16, path: String },
}

/// Health check parameters for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub probe: Probe,
    /// Delay between probe attempts.
    pub interval: Duration,
    /// Bound on a single probe attempt.
    pub timeout: Duration,
    /// Attempts before the service is declared unhealthy.
    pub retries: u32,
}

/// Desired state of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: ServiceName,
    /// Image reference, e.g. "postgres:16".
    pub image: String,
    pub ports: Vec<PortMapping>,
    /// Environment variables. BTreeMap keeps the fingerprint canonical.
    pub env: BTreeMap<String, String>,
    /// Networks this service attaches to.
    pub networks: Vec<String>,
    /// Services that must be healthy before this one starts.
    pub depends_on: Vec<ServiceName>,
    pub volumes: Vec<VolumeMount>,
    pub health: Option<HealthCheck>,
}

impl ServiceSpec {
    /// Content hash of the desired state, used to detect drift between
    /// a running instance and the spec (recreate semantics).
    pub fn fingerprint(&self) -> String {
        let canonical =
            serde_json::to_vec(self).unwrap_or_else(|_| self.name.clone().into_bytes());
        hex::encode(Sha256::digest(&canonical))
    }
}

/// A named virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    /// Network driver/mode, e.g. "bridge".
    pub driver: String,
}

/// A fully validated stack: the unit of one deployment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSpec {
    /// Stack name, used for logging only.
    pub name: String,
    /// Services in declaration order.
    pub services: Vec<ServiceSpec>,
    /// Declared networks.
    pub networks: Vec<NetworkSpec>,
}

impl StackSpec {
    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Look up a network by name.
    pub fn network(&self, name: &str) -> Option<&NetworkSpec> {
        self.networks.iter().find(|n| n.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            image: "postgres:16".to_string(),
            ports: vec![],
            env: BTreeMap::new(),
            networks: vec![],
            depends_on: vec![],
            volumes: vec![],
            health: None,
        }
    }

    #[test]
    fn port_mapping_parses_pairs() {
        let p = PortMapping::parse("8080:80").unwrap();
        assert_eq!(p.host, 8080);
        assert_eq!(p.container, 80);
        assert_eq!(p.to_string(), "8080:80");
    }

    #[test]
    fn port_mapping_rejects_bad_input() {
        assert!(PortMapping::parse("8080").is_none());
        assert!(PortMapping::parse("eighty:80").is_none());
        assert!(PortMapping::parse("8080:http").is_none());
    }

    #[test]
    fn volume_mount_splits_on_first_colon() {
        let v = VolumeMount::parse("/data/pg:/var/lib/postgresql/data").unwrap();
        assert_eq!(v.host_path, "/data/pg");
        assert_eq!(v.container_path, "/var/lib/postgresql/data");
    }

    #[test]
    fn volume_mount_rejects_missing_half() {
        assert!(VolumeMount::parse("/data/pg").is_none());
        assert!(VolumeMount::parse(":/var/lib").is_none());
        assert!(VolumeMount::parse("/data:").is_none());
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = spec("db");
        let b = spec("db");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_spec() {
        let a = spec("db");
        let mut b = spec("db");
        b.env.insert("POSTGRES_DB".to_string(), "app".to_string());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn stack_lookup() {
        let stack = StackSpec {
            name: "demo".to_string(),
            services: vec![spec("db"), spec("api")],
            networks: vec![NetworkSpec {
                name: "backend".to_string(),
                driver: "bridge".to_string(),
            }],
        };
        assert!(stack.service("db").is_some());
        assert!(stack.service("proxy").is_none());
        assert_eq!(stack.network("backend").unwrap().driver, "bridge");
    }
}
