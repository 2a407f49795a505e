//! Stack-level dependency graph and deployment ordering.
//!
//! Ordering uses Kahn's algorithm with an alphabetical ready queue so the
//! result is stable. Clusters caught in a cluster-level cycle cannot be
//! ordered; they are appended sorted by name and reported separately.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

use super::model::CrossStackDependency;
use crate::cluster::ResourceCluster;
use crate::constants::{RESOURCE_DEPLOY_SECS, STACK_OVERHEAD_SECS};

/// Result of ordering a set of stacks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeploymentPlan {
    /// All stack names, prerequisites first.
    pub order: Vec<String>,
    /// Stacks grouped by dependency depth. Stacks in one wave can deploy in
    /// parallel.
    pub waves: Vec<Vec<String>>,
    /// Stacks left over by a cycle, appended to `order` and to a final wave.
    pub unordered: Vec<String>,
}

/// Directed graph of stacks; an edge `a → b` means `a` needs `b` first.
#[derive(Debug, Default)]
pub struct StackGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl StackGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for a partition and its cross-stack edges.
    pub fn from_dependencies(
        clusters: &[ResourceCluster],
        dependencies: &[CrossStackDependency],
    ) -> Self {
        let mut graph = Self::new();
        for cluster in clusters {
            graph.ensure_node(&cluster.name);
        }
        for dependency in dependencies {
            graph.add_dependency(&dependency.source_cluster, &dependency.target_cluster);
        }
        graph
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Record that `from` depends on `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if from_idx != to_idx && !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Stacks `name` depends on directly, sorted.
    pub fn prerequisites(&self, name: &str) -> Vec<String> {
        let Some(&index) = self.node_map.get(name) else {
            return Vec::new();
        };
        let mut names: Vec<String> =
            self.graph.neighbors(index).map(|n| self.graph[n].clone()).collect();
        names.sort();
        names
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Order stacks so every stack follows its prerequisites.
    pub fn deployment_plan(&self) -> DeploymentPlan {
        let mut pending: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|index| (index, self.graph.neighbors_directed(index, Direction::Outgoing).count()))
            .collect();
        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();

        let mut ready: BTreeSet<(String, NodeIndex)> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(&index, _)| (self.graph[index].clone(), index))
            .collect();

        let mut plan = DeploymentPlan::default();
        while let Some((name, index)) = ready.pop_first() {
            let level = self
                .graph
                .neighbors_directed(index, Direction::Outgoing)
                .filter_map(|prerequisite| depth.get(&prerequisite))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(index, level);
            if plan.waves.len() <= level {
                plan.waves.resize_with(level + 1, Vec::new);
            }
            plan.waves[level].push(name.clone());
            plan.order.push(name);

            for dependent in self.graph.neighbors_directed(index, Direction::Incoming) {
                if let Some(count) = pending.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert((self.graph[dependent].clone(), dependent));
                    }
                }
            }
        }

        let mut leftover: Vec<String> = self
            .graph
            .node_indices()
            .filter(|index| !depth.contains_key(index))
            .map(|index| self.graph[index].clone())
            .collect();
        if !leftover.is_empty() {
            leftover.sort();
            warn!(stacks = ?leftover, "Stack dependencies form a cycle; appending in name order");
            plan.order.extend(leftover.iter().cloned());
            plan.waves.push(leftover.clone());
            plan.unordered = leftover;
        }

        for wave in &mut plan.waves {
            wave.sort();
        }
        plan
    }
}

/// Estimated wall-clock minutes: waves run one after another, stacks in a
/// wave run in parallel, and each stack costs a fixed overhead plus a
/// per-resource time.
pub fn estimate_deployment_minutes(plan: &DeploymentPlan, clusters: &[ResourceCluster]) -> f64 {
    let sizes: HashMap<&str, usize> = clusters
        .iter()
        .map(|cluster| (cluster.name.as_str(), cluster.len()))
        .collect();

    let seconds: f64 = plan
        .waves
        .iter()
        .map(|wave| {
            wave.iter()
                .map(|name| {
                    let resources = sizes.get(name.as_str()).copied().unwrap_or(0);
                    STACK_OVERHEAD_SECS + RESOURCE_DEPLOY_SECS * resources as f64
                })
                .fold(0.0, f64::max)
        })
        .sum();
    seconds / 60.0
}
