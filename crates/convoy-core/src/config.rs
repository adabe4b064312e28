//! Stack spec document parser.
//!
//! The on-disk format is TOML with `[[services]]` and `[[networks]]`
//! array-of-tables, so declaration order is preserved and later feeds the
//! resolver's deterministic tie-break. Parsing is two-phase: a raw document
//! with optional fields is deserialized first, then validated into the
//! strict [`StackSpec`] model. Unknown keys are rejected up front. No
//! runtime operation happens here.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::duration::parse_duration;
use crate::error::{SpecError, SpecResult};
use crate::types::{
    HealthCheck, NetworkSpec, PortMapping, Probe, ServiceSpec, StackSpec, VolumeMount,
};

const DEFAULT_INTERVAL: &str = "5s";
const DEFAULT_TIMEOUT: &str = "2s";
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_DRIVER: &str = "bridge";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStack {
    stack: Option<RawMeta>,
    #[serde(default)]
    networks: Vec<RawNetwork>,
    #[serde(default)]
    services: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMeta {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNetwork {
    name: String,
    driver: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawService {
    name: String,
    image: Option<String>,
    #[serde(default)]
    ports: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    networks: Vec<String>,
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    volumes: Vec<String>,
    health: Option<RawHealth>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHealth {
    command: Option<Vec<String>>,
    tcp_port: Option<u16>,
    http_port: Option<u16>,
    http_path: Option<String>,
    interval: Option<String>,
    timeout: Option<String>,
    retries: Option<u32>,
}

impl StackSpec {
    /// Load and validate a stack spec from a file.
    pub fn from_file(path: &Path) -> SpecResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a stack spec from a TOML string.
    pub fn from_toml(content: &str) -> SpecResult<Self> {
        let raw: RawStack = toml::from_str(content)?;
        validate(raw)
    }
}

fn validate(raw: RawStack) -> SpecResult<StackSpec> {
    if raw.services.is_empty() {
        return Err(SpecError::EmptyStack);
    }

    let mut networks = Vec::with_capacity(raw.networks.len());
    let mut network_names = HashSet::new();
    for net in raw.networks {
        if !network_names.insert(net.name.clone()) {
            return Err(SpecError::DuplicateNetwork(net.name));
        }
        networks.push(NetworkSpec {
            name: net.name,
            driver: net.driver.unwrap_or_else(|| DEFAULT_DRIVER.to_string()),
        });
    }

    let declared: HashSet<String> = raw.services.iter().map(|s| s.name.clone()).collect();

    let mut services = Vec::with_capacity(raw.services.len());
    let mut service_names = HashSet::new();
    for svc in raw.services {
        if !service_names.insert(svc.name.clone()) {
            return Err(SpecError::DuplicateService(svc.name));
        }
        services.push(validate_service(svc, &declared, &network_names)?);
    }

    let name = raw
        .stack
        .and_then(|m| m.name)
        .unwrap_or_else(|| "stack".to_string());

    Ok(StackSpec {
        name,
        services,
        networks,
    })
}

fn validate_service(
    raw: RawService,
    declared_services: &HashSet<String>,
    declared_networks: &HashSet<String>,
) -> SpecResult<ServiceSpec> {
    let name = raw.name;

    let image = match raw.image {
        Some(image) if !image.trim().is_empty() => image,
        _ => return Err(SpecError::MissingImage(name)),
    };

    let mut ports = Vec::with_capacity(raw.ports.len());
    for mapping in raw.ports {
        let parsed = PortMapping::parse(&mapping).ok_or_else(|| SpecError::BadPortMapping {
            service: name.clone(),
            mapping: mapping.clone(),
        })?;
        ports.push(parsed);
    }

    let mut volumes = Vec::with_capacity(raw.volumes.len());
    for mount in raw.volumes {
        let parsed = VolumeMount::parse(&mount).ok_or_else(|| SpecError::BadVolumeMount {
            service: name.clone(),
            mount: mount.clone(),
        })?;
        volumes.push(parsed);
    }

    for dependency in &raw.depends_on {
        if !declared_services.contains(dependency) {
            return Err(SpecError::UnknownDependency {
                service: name.clone(),
                dependency: dependency.clone(),
            });
        }
    }

    for network in &raw.networks {
        if !declared_networks.contains(network) {
            return Err(SpecError::UnknownNetwork {
                service: name.clone(),
                network: network.clone(),
            });
        }
    }

    let health = match raw.health {
        Some(h) => Some(validate_health(h, &name)?),
        None => None,
    };

    Ok(ServiceSpec {
        name,
        image,
        ports,
        env: raw.env,
        networks: raw.networks,
        depends_on: raw.depends_on,
        volumes,
        health,
    })
}

fn validate_health(raw: RawHealth, service: &str) -> SpecResult<HealthCheck> {
    let declared = [
        raw.command.is_some(),
        raw.tcp_port.is_some(),
        raw.http_port.is_some(),
    ]
    .iter()
    .filter(|p| **p)
    .count();

    let probe = match declared {
        0 => {
            return Err(SpecError::MissingProbe {
                service: service.to_string(),
            });
        }
        1 => {
            if let Some(command) = raw.command {
                Probe::Command(command)
            } else if let Some(port) = raw.tcp_port {
                Probe::Tcp { port }
            } else {
                Probe::Http {
                    // declared == 1 and the other two were None
                    port: raw.http_port.unwrap_or_default(),
                    path: raw.http_path.unwrap_or_else(|| "/".to_string()),
                }
            }
        }
        _ => {
            return Err(SpecError::AmbiguousProbe {
                service: service.to_string(),
            });
        }
    };

    let retries = raw.retries.unwrap_or(DEFAULT_RETRIES);
    if retries == 0 {
        return Err(SpecError::ZeroRetries {
            service: service.to_string(),
        });
    }

    Ok(HealthCheck {
        probe,
        interval: parse_duration(raw.interval.as_deref().unwrap_or(DEFAULT_INTERVAL))?,
        timeout: parse_duration(raw.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))?,
        retries,
    })
}
