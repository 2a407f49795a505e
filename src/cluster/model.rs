//! Cluster data structures shared by every clustering stage.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use super::scoring::score_cluster;
use crate::core::SplitError;
use crate::graph::DependencyGraph;

/// How resources are partitioned into candidate stacks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringStrategy {
    /// One cluster per resource category.
    Semantic,
    /// Grow clusters along strong connections, seeded by cycles.
    Connectivity,
    /// Semantic clusters merged along strong cross-category connections.
    #[default]
    Hybrid,
}

impl ClusteringStrategy {
    /// Every strategy, in tie-break order.
    pub const ALL: [Self; 3] = [Self::Hybrid, Self::Connectivity, Self::Semantic];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Connectivity => "connectivity",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClusteringStrategy {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "connectivity" => Ok(Self::Connectivity),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(SplitError::InvalidOptions {
                reason: format!(
                    "unknown strategy '{other}' (expected semantic, connectivity, or hybrid)"
                ),
            }),
        }
    }
}

/// Quality figures of one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClusterScore {
    /// Internal edges relative to the graph's expected density, in `0..=1`.
    pub cohesion: f64,
    /// External edges per member.
    pub coupling: f64,
    /// Number of members.
    pub size: usize,
    /// Size as a percentage of the platform resource limit.
    pub size_percent: f64,
    /// `max(0, cohesion - 0.5 × coupling)`.
    pub quality: f64,
}

/// A candidate stack: a named set of resources.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceCluster {
    pub id: String,
    pub name: String,
    /// Semantic category label (lowercase).
    pub category: String,
    /// Member logical IDs, sorted once the cluster is finalized.
    pub resources: Vec<String>,
    /// Resource type → member count.
    pub resource_types: BTreeMap<String, usize>,
    pub score: ClusterScore,
}

impl ResourceCluster {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        resources: Vec<String>,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            category: category.into(),
            resources,
            resource_types: BTreeMap::new(),
            score: ClusterScore::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.iter().any(|r| r == logical_id)
    }

    /// Sort members and recompute the type histogram and score.
    pub fn refresh(&mut self, graph: &DependencyGraph) {
        self.resources.sort();
        self.resources.dedup();

        self.resource_types.clear();
        for id in &self.resources {
            if let Some(node) = graph.node(id) {
                *self.resource_types.entry(node.resource_type.clone()).or_default() += 1;
            }
        }

        let members: HashSet<&str> = self.resources.iter().map(String::as_str).collect();
        self.score = score_cluster(graph, &members);
    }
}

/// Refresh every cluster and assign positional IDs (`cluster-0`, ...).
///
/// Empty clusters are dropped.
pub fn finalize_clusters(clusters: &mut Vec<ResourceCluster>, graph: &DependencyGraph) {
    clusters.retain(|cluster| !cluster.is_empty());
    for (i, cluster) in clusters.iter_mut().enumerate() {
        cluster.id = format!("cluster-{i}");
        cluster.refresh(graph);
    }
}

/// Map each logical ID to the index of the cluster containing it.
pub fn cluster_membership(clusters: &[ResourceCluster]) -> HashMap<&str, usize> {
    clusters
        .iter()
        .enumerate()
        .flat_map(|(i, cluster)| cluster.resources.iter().map(move |id| (id.as_str(), i)))
        .collect()
}

/// Hands out unique cluster names: `Base`, then `Base2`, `Base3`, ...
#[derive(Debug, Default)]
pub struct UniqueNames {
    used: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as taken without claiming a variant of it.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    pub fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// First free `Base1`, `Base2`, ... name.
    pub fn claim_numbered(&mut self, base: &str) -> String {
        let mut n = 1;
        loop {
            let candidate = format!("{base}{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_round_trip() {
        for strategy in ClusteringStrategy::ALL {
            assert_eq!(strategy.as_str().parse::<ClusteringStrategy>().unwrap(), strategy);
        }
        assert_eq!(ClusteringStrategy::default(), ClusteringStrategy::Hybrid);
        assert!("random".parse::<ClusteringStrategy>().is_err());
    }

    #[test]
    fn test_unique_names() {
        let mut names = UniqueNames::new();
        names.reserve("Compute2");
        assert_eq!(names.claim("Compute"), "Compute");
        assert_eq!(names.claim("Compute"), "Compute3");
        assert_eq!(names.claim("Storage"), "Storage");
        assert_eq!(names.claim_numbered("Compute"), "Compute1");
        assert_eq!(names.claim_numbered("Compute"), "Compute4");
    }

    #[test]
    fn test_membership_index() {
        let clusters = vec![
            ResourceCluster::new("A", "a", vec!["x".to_string(), "y".to_string()]),
            ResourceCluster::new("B", "b", vec!["z".to_string()]),
        ];
        let membership = cluster_membership(&clusters);
        assert_eq!(membership["x"], 0);
        assert_eq!(membership["z"], 1);
    }
}
