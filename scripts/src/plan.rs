//! Validation and ordering of deployment plans.
//!
//! A plan is checked before any transaction is sent: every key a step needs
//! must either already be set in the registry or be registered by an earlier
//! step. The dependency graph between steps is built with `petgraph`; an edge
//! `a -> b` means step `b` needs a key provided by step `a`.

use std::collections::HashSet;

use itertools::Itertools;
use petgraph::{
    algo::{kosaraju_scc, toposort},
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};

use crate::{
    errors::ScriptError,
    types::{Component, DeploymentStep, Instantiation, RegistryKey},
};

/// The dependency graph between the steps of a plan
type StepGraph = DiGraph<Component, RegistryKey>;

/// The registry keys a step reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    /// The component deployed by the step
    pub component: Component,
    /// Keys that must be set before the step runs
    pub requires: Vec<RegistryKey>,
    /// Keys the step registers
    pub provides: Vec<RegistryKey>,
}

impl From<&DeploymentStep> for PlanNode {
    fn from(step: &DeploymentStep) -> Self {
        let spec = step.component.spec();
        let requires = match step.instantiation {
            // An upgrade neither re-links nor re-configures the component
            Instantiation::Upgrade(_) => Vec::new(),
            _ => spec.requires(),
        };

        Self {
            component: step.component,
            requires,
            provides: spec.provides(),
        }
    }
}

/// An ordered list of deployment steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// The steps, in execution order
    steps: Vec<DeploymentStep>,
}

impl DeploymentPlan {
    /// Create a plan executing the steps in the given order
    pub fn new(steps: Vec<DeploymentStep>) -> Self {
        Self { steps }
    }

    /// A plan freshly deploying each component in the given order
    pub fn fresh(components: &[Component]) -> Self {
        Self::new(components.iter().copied().map(DeploymentStep::fresh).collect())
    }

    /// The steps, in execution order
    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    /// The registry keys read by any step
    pub fn required_keys(&self) -> Vec<RegistryKey> {
        self.nodes()
            .into_iter()
            .flat_map(|node| node.requires)
            .unique()
            .collect()
    }

    /// Check the plan against the keys already set in the registry
    pub fn validate(&self, available: &HashSet<RegistryKey>) -> Result<(), ScriptError> {
        validate_nodes(&self.nodes(), available)
    }

    /// A dependency-respecting reordering of the plan.
    ///
    /// Steps keep their requested relative order unless a dependency forces
    /// a step to move after the step providing its key.
    pub fn ordered(&self, available: &HashSet<RegistryKey>) -> Result<Self, ScriptError> {
        let order = order_nodes(&self.nodes(), available)?;
        Ok(Self::new(
            order.into_iter().map(|i| self.steps[i].clone()).collect(),
        ))
    }

    /// The dependency view of each step
    fn nodes(&self) -> Vec<PlanNode> {
        self.steps.iter().map(PlanNode::from).collect()
    }
}

/// Check that a cycle-free plan only depends on earlier steps or available keys
pub fn validate_nodes(
    nodes: &[PlanNode],
    available: &HashSet<RegistryKey>,
) -> Result<(), ScriptError> {
    let graph = build_graph(nodes, available)?;
    if toposort(&graph, None).is_err() {
        return Err(cycle_error(&graph));
    }

    for edge in graph.edge_references() {
        if edge.source().index() > edge.target().index() {
            return Err(ScriptError::OutOfOrder {
                component: graph[edge.target()],
                key: *edge.weight(),
                provider: graph[edge.source()],
            });
        }
    }

    Ok(())
}

/// A stable topological order of the nodes, as indices into `nodes`.
///
/// At every point the earliest requested step whose dependencies are
/// satisfied is scheduled next.
pub fn order_nodes(
    nodes: &[PlanNode],
    available: &HashSet<RegistryKey>,
) -> Result<Vec<usize>, ScriptError> {
    let graph = build_graph(nodes, available)?;
    let mut in_degree = graph
        .node_indices()
        .map(|node| graph.edges_directed(node, Direction::Incoming).count())
        .collect_vec();

    let mut scheduled = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    while order.len() < nodes.len() {
        let Some(next) = (0..nodes.len()).find(|&i| !scheduled[i] && in_degree[i] == 0) else {
            return Err(cycle_error(&graph));
        };

        scheduled[next] = true;
        order.push(next);
        for edge in graph.edges(NodeIndex::new(next)) {
            in_degree[edge.target().index()] -= 1;
        }
    }

    Ok(order)
}

/// Link every required key to the step providing it.
///
/// The closest earlier provider wins; a key already set in the registry
/// needs no provider; otherwise the first later provider is used, which
/// validation reports as out of order.
fn build_graph(
    nodes: &[PlanNode],
    available: &HashSet<RegistryKey>,
) -> Result<StepGraph, ScriptError> {
    let mut graph = StepGraph::new();
    let indices = nodes
        .iter()
        .map(|node| graph.add_node(node.component))
        .collect_vec();

    for (i, node) in nodes.iter().enumerate() {
        for key in node.requires.iter().copied() {
            let provides = |j: &usize| nodes[*j].provides.contains(&key);

            let provider = match (0..i).rev().find(provides) {
                Some(j) => Some(j),
                None if available.contains(&key) => None,
                None => match (i + 1..nodes.len()).find(provides) {
                    Some(j) => Some(j),
                    None => {
                        return Err(ScriptError::MissingDependency {
                            component: node.component,
                            key,
                        })
                    }
                },
            };

            if let Some(j) = provider {
                graph.add_edge(indices[j], indices[i], key);
            }
        }
    }

    Ok(graph)
}

/// Name the components of the first dependency cycle, in plan order
fn cycle_error(graph: &StepGraph) -> ScriptError {
    let cycle = kosaraju_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|mut scc| {
            scc.sort();
            scc
        })
        .min()
        .unwrap_or_default();

    ScriptError::DependencyCycle(cycle.into_iter().map(|node| graph[node]).collect())
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;

    fn keys(keys: &[RegistryKey]) -> HashSet<RegistryKey> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_staking_before_payment_is_missing_dependency() {
        let plan = DeploymentPlan::fresh(&[Component::LpStaking]);
        let res = plan.validate(&keys(&[RegistryKey::Safe]));

        assert_eq!(
            res,
            Err(ScriptError::MissingDependency {
                component: Component::LpStaking,
                key: RegistryKey::Payment,
            })
        );
    }

    #[test]
    fn test_earlier_step_satisfies_dependency() {
        let plan = DeploymentPlan::fresh(&[Component::Payment, Component::LpStaking]);
        assert_eq!(plan.validate(&keys(&[RegistryKey::Safe])), Ok(()));
    }

    #[test]
    fn test_later_provider_is_out_of_order() {
        let plan = DeploymentPlan::fresh(&[Component::Presale, Component::Verifier]);
        let res = plan.validate(&keys(&[RegistryKey::Payment]));

        assert_eq!(
            res,
            Err(ScriptError::OutOfOrder {
                component: Component::Presale,
                key: RegistryKey::Verifier,
                provider: Component::Verifier,
            })
        );
    }

    #[test]
    fn test_registered_key_beats_later_provider() {
        // Re-deploying the payment token after staking is fine while the old one is registered
        let plan = DeploymentPlan::fresh(&[Component::LpStaking, Component::Payment]);
        let available = keys(&[RegistryKey::Safe, RegistryKey::Payment]);
        assert_eq!(plan.validate(&available), Ok(()));
    }

    #[test]
    fn test_ordered_is_stable() {
        let plan = DeploymentPlan::fresh(&[
            Component::Claim,
            Component::Presale,
            Component::Vault,
            Component::Payment,
            Component::Verifier,
            Component::Downline,
        ]);
        let ordered = plan.ordered(&HashSet::new()).unwrap();

        let components = ordered.steps().iter().map(|s| s.component).collect_vec();
        assert_eq!(
            components,
            vec![
                Component::Claim,
                Component::Vault,
                Component::Payment,
                Component::Verifier,
                Component::Presale,
                Component::Downline,
            ]
        );
        assert_eq!(ordered.validate(&HashSet::new()), Ok(()));
    }

    #[test]
    fn test_upgrade_requires_nothing() {
        let plan = DeploymentPlan::new(vec![DeploymentStep::upgrade(
            Component::LpStaking,
            Address::repeat_byte(0x42),
        )]);
        assert!(plan.required_keys().is_empty());
        assert_eq!(plan.validate(&HashSet::new()), Ok(()));
    }

    #[test]
    fn test_cycle_detected() {
        let nodes = vec![
            PlanNode {
                component: Component::Claim,
                requires: vec![],
                provides: vec![RegistryKey::Claim],
            },
            PlanNode {
                component: Component::Pool,
                requires: vec![RegistryKey::Vault],
                provides: vec![RegistryKey::Pool],
            },
            PlanNode {
                component: Component::Vault,
                requires: vec![RegistryKey::Pool],
                provides: vec![RegistryKey::Vault],
            },
        ];

        let expected = Err(ScriptError::DependencyCycle(vec![
            Component::Pool,
            Component::Vault,
        ]));
        assert_eq!(validate_nodes(&nodes, &HashSet::new()), expected);
        assert_eq!(
            order_nodes(&nodes, &HashSet::new()).map(|_| ()),
            expected
        );
    }
}
