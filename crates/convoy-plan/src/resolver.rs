//! Deployment plan resolution.
//!
//! Layers the service graph into waves with a standard layered
//! topological sort: wave 0 holds services with no dependencies, wave N
//! holds services whose dependencies all sit in waves < N. Ties within a
//! wave keep the spec's declaration order, so identical input always
//! yields the identical plan. A plan is derived state: it is recomputed
//! from the stack on every run and never persisted.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use convoy_core::{ServiceName, StackSpec};

use crate::error::{PlanError, PlanResult};

/// Services eligible to start concurrently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub services: Vec<ServiceName>,
}

/// The resolved, cycle-free bring-up order for one stack.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    waves: Vec<Wave>,
    /// Networks first referenced by each wave, in first-reference order.
    networks_by_wave: Vec<Vec<String>>,
}

impl DeploymentPlan {
    /// Resolve a stack into waves, failing on any dependency cycle.
    pub fn resolve(stack: &StackSpec) -> PlanResult<Self> {
        detect_cycle(stack)?;

        let mut assigned: HashSet<&str> = HashSet::new();
        let mut waves: Vec<Wave> = Vec::new();

        while assigned.len() < stack.services.len() {
            let mut services = Vec::new();
            for svc in &stack.services {
                if assigned.contains(svc.name.as_str()) {
                    continue;
                }
                if svc
                    .depends_on
                    .iter()
                    .all(|dep| assigned.contains(dep.as_str()))
                {
                    services.push(svc.name.clone());
                }
            }
            // detect_cycle guarantees progress on every pass.
            debug_assert!(!services.is_empty());
            if services.is_empty() {
                return Err(PlanError::CyclicDependency(
                    stack
                        .services
                        .iter()
                        .filter(|s| !assigned.contains(s.name.as_str()))
                        .map(|s| s.name.clone())
                        .collect(),
                ));
            }
            for name in &services {
                assigned.insert(
                    stack
                        .service(name)
                        .map(|s| s.name.as_str())
                        .unwrap_or_default(),
                );
            }
            waves.push(Wave { services });
        }

        let networks_by_wave = layer_networks(stack, &waves);
        debug!(waves = waves.len(), services = stack.services.len(), "plan resolved");

        Ok(Self {
            waves,
            networks_by_wave,
        })
    }

    /// Waves in bring-up order.
    pub fn waves(&self) -> &[Wave] {
        &self.waves
    }

    /// Networks a wave references that no earlier wave referenced.
    pub fn networks_for_wave(&self, wave: usize) -> &[String] {
        self.networks_by_wave
            .get(wave)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All service names in teardown order: last wave first, and within
    /// a wave the reverse of bring-up order.
    pub fn reverse_order(&self) -> Vec<ServiceName> {
        self.waves
            .iter()
            .rev()
            .flat_map(|w| w.services.iter().rev().cloned())
            .collect()
    }

    /// Total number of services in the plan.
    pub fn service_count(&self) -> usize {
        self.waves.iter().map(|w| w.services.len()).sum()
    }
}

/// Group network names by the wave that first references them.
fn layer_networks(stack: &StackSpec, waves: &[Wave]) -> Vec<Vec<String>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut by_wave = Vec::with_capacity(waves.len());
    for wave in waves {
        let mut nets = Vec::new();
        for name in &wave.services {
            let Some(svc) = stack.service(name) else {
                continue;
            };
            for net in &svc.networks {
                if seen.insert(net.as_str()) {
                    nets.push(net.clone());
                }
            }
        }
        by_wave.push(nets);
    }
    by_wave
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first cycle detection. Reports the services on the first cycle
/// found, in traversal order starting from the back-edge target.
fn detect_cycle(stack: &StackSpec) -> PlanResult<()> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();

    for svc in &stack.services {
        if !marks.contains_key(svc.name.as_str()) {
            visit(svc.name.as_str(), stack, &mut marks, &mut path)?;
        }
    }
    Ok(())
}

fn visit<'a>(
    name: &'a str,
    stack: &'a StackSpec,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> PlanResult<()> {
    marks.insert(name, Mark::Visiting);
    path.push(name);

    if let Some(svc) = stack.service(name) {
        for dep in &svc.depends_on {
            match marks.get(dep.as_str()) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    // Back edge: the cycle is the path suffix from `dep`.
                    let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(dep.clone());
                    return Err(PlanError::CyclicDependency(cycle));
                }
                None => visit(dep.as_str(), stack, marks, path)?,
            }
        }
    }

    path.pop();
    marks.insert(name, Mark::Done);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use convoy_core::{NetworkSpec, ServiceSpec};
    use std::collections::BTreeMap;

    fn service(name: &str, deps: &[&str], nets: &[&str]) -> ServiceSpec {
        ServiceSpec {
            name: name.to_string(),
            image: format!("{name}:latest"),
            ports: vec![],
            env: BTreeMap::new(),
            networks: nets.iter().map(|n| n.to_string()).collect(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            volumes: vec![],
            health: None,
        }
    }

    fn stack(services: Vec<ServiceSpec>) -> StackSpec {
        let nets: HashSet<String> = services
            .iter()
            .flat_map(|s| s.networks.iter().cloned())
            .collect();
        StackSpec {
            name: "test".to_string(),
            services,
            networks: nets
                .into_iter()
                .map(|name| NetworkSpec {
                    name,
                    driver: "bridge".to_string(),
                })
                .collect(),
        }
    }

    fn wave_names(plan: &DeploymentPlan) -> Vec<Vec<String>> {
        plan.waves().iter().map(|w| w.services.clone()).collect()
    }

    #[test]
    fn three_tier_layers_into_three_waves() {
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("database", &[], &[]),
            service("backend", &["database"], &[]),
            service("httpd", &["backend", "database"], &[]),
        ]))
        .unwrap();

        assert_eq!(
            wave_names(&plan),
            vec![
                vec!["database".to_string()],
                vec!["backend".to_string()],
                vec!["httpd".to_string()],
            ]
        );
    }

    #[test]
    fn independent_services_share_wave_zero() {
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("a", &[], &[]),
            service("b", &[], &[]),
            service("c", &["a", "b"], &[]),
        ]))
        .unwrap();

        assert_eq!(
            wave_names(&plan),
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["c".to_string()],
            ]
        );
    }

    #[test]
    fn wave_order_follows_declaration_order() {
        // Same graph, reversed declaration: wave membership order flips.
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("b", &[], &[]),
            service("a", &[], &[]),
        ]))
        .unwrap();
        assert_eq!(
            wave_names(&plan),
            vec![vec!["b".to_string(), "a".to_string()]]
        );
    }

    #[test]
    fn dependencies_always_land_in_earlier_waves() {
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("e", &["d"], &[]),
            service("d", &["c"], &[]),
            service("c", &["a", "b"], &[]),
            service("b", &[], &[]),
            service("a", &[], &[]),
        ]))
        .unwrap();

        let mut wave_of: HashMap<String, usize> = HashMap::new();
        for (i, wave) in plan.waves().iter().enumerate() {
            for s in &wave.services {
                wave_of.insert(s.clone(), i);
            }
        }
        assert!(wave_of["c"] > wave_of["a"]);
        assert!(wave_of["c"] > wave_of["b"]);
        assert!(wave_of["d"] > wave_of["c"]);
        assert!(wave_of["e"] > wave_of["d"]);
    }

    #[test]
    fn cycle_is_rejected_and_named() {
        let err = DeploymentPlan::resolve(&stack(vec![
            service("a", &["b"], &[]),
            service("b", &["c"], &[]),
            service("c", &["a"], &[]),
        ]))
        .unwrap_err();

        let PlanError::CyclicDependency(members) = err;
        for name in ["a", "b", "c"] {
            assert!(members.iter().any(|m| m == name), "missing {name}");
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = DeploymentPlan::resolve(&stack(vec![service("a", &["a"], &[])])).unwrap_err();
        assert!(matches!(err, PlanError::CyclicDependency(_)));
    }

    #[test]
    fn networks_attach_to_first_referencing_wave() {
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("database", &[], &["backend-net"]),
            service("backend", &["database"], &["backend-net", "edge-net"]),
            service("httpd", &["backend"], &["edge-net"]),
        ]))
        .unwrap();

        assert_eq!(plan.networks_for_wave(0), ["backend-net".to_string()]);
        assert_eq!(plan.networks_for_wave(1), ["edge-net".to_string()]);
        assert!(plan.networks_for_wave(2).is_empty());
    }

    #[test]
    fn reverse_order_tears_down_last_wave_first() {
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("a", &[], &[]),
            service("b", &[], &[]),
            service("c", &["a", "b"], &[]),
        ]))
        .unwrap();

        assert_eq!(
            plan.reverse_order(),
            vec!["c".to_string(), "b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn identical_input_yields_identical_plan() {
        let build = || {
            stack(vec![
                service("a", &[], &[]),
                service("b", &["a"], &[]),
                service("c", &["a"], &[]),
                service("d", &["b", "c"], &[]),
            ])
        };
        let first = wave_names(&DeploymentPlan::resolve(&build()).unwrap());
        let second = wave_names(&DeploymentPlan::resolve(&build()).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn service_count_sums_waves() {
        let plan = DeploymentPlan::resolve(&stack(vec![
            service("a", &[], &[]),
            service("b", &["a"], &[]),
        ]))
        .unwrap();
        assert_eq!(plan.service_count(), 2);
    }
}
