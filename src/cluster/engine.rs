//! Partition resources into candidate stacks.
//!
//! All three strategies return a complete, disjoint partition of the graph's
//! resources, with every cyclic component inside a single cluster. Clusters
//! come back finalized: sorted members, type histogram, and score.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

use super::categories::{DEFAULT_CATEGORY, categorize, category_rank};
use super::model::{
    ClusteringStrategy, ResourceCluster, UniqueNames, cluster_membership, finalize_clusters,
};
use super::scoring::score_cluster;
use crate::constants::{
    HYBRID_MERGE_THRESHOLD, STRONG_CONNECTION_THRESHOLD, default_max_cluster_size,
};
use crate::core::{Result, SplitError};
use crate::graph::{ConnectivityMap, DependencyGraph, StrongComponents};

/// Inputs of [`cluster_resources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusteringOptions {
    pub strategy: ClusteringStrategy,
    /// Largest cluster a merge may produce.
    pub max_cluster_size: usize,
}

impl Default for ClusteringOptions {
    fn default() -> Self {
        Self {
            strategy: ClusteringStrategy::default(),
            max_cluster_size: default_max_cluster_size(),
        }
    }
}

impl ClusteringOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_cluster_size == 0 {
            return Err(SplitError::InvalidOptions {
                reason: "max_cluster_size must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Partition `graph` with the requested strategy.
pub fn cluster_resources(
    graph: &DependencyGraph,
    connectivity: &ConnectivityMap,
    components: &StrongComponents,
    options: &ClusteringOptions,
) -> Vec<ResourceCluster> {
    let mut clusters = match options.strategy {
        ClusteringStrategy::Semantic => semantic_clusters(graph, components),
        ClusteringStrategy::Connectivity => connectivity_clusters(graph, connectivity, components),
        ClusteringStrategy::Hybrid => {
            hybrid_clusters(graph, connectivity, components, options.max_cluster_size)
        }
    };
    finalize_clusters(&mut clusters, graph);

    debug!(
        strategy = %options.strategy,
        clusters = clusters.len(),
        resources = graph.node_count(),
        "Clustered resources"
    );
    clusters
}

/// Most common category among `members`; ties go to the earlier table entry.
fn dominant_category<'a>(
    graph: &DependencyGraph,
    members: impl IntoIterator<Item = &'a String>,
) -> &'static str {
    let mut counts: BTreeMap<(usize, &'static str), usize> = BTreeMap::new();
    for id in members {
        let category = graph
            .node(id)
            .map_or(DEFAULT_CATEGORY, |node| categorize(&node.resource_type));
        *counts.entry((category_rank(category), category)).or_default() += 1;
    }
    counts
        .iter()
        .max_by(|(a_key, a_count), (b_key, b_count)| {
            a_count.cmp(b_count).then_with(|| b_key.0.cmp(&a_key.0))
        })
        .map_or(DEFAULT_CATEGORY, |((_, category), _)| category)
}

fn semantic_clusters(
    graph: &DependencyGraph,
    components: &StrongComponents,
) -> Vec<ResourceCluster> {
    let mut assignment: HashMap<&str, &'static str> = graph
        .nodes()
        .values()
        .map(|node| (node.logical_id.as_str(), categorize(&node.resource_type)))
        .collect();

    for component in components.cyclic() {
        let category = dominant_category(graph, &component.members);
        for member in &component.members {
            assignment.insert(member.as_str(), category);
        }
    }

    let mut groups: BTreeMap<(usize, &'static str), Vec<String>> = BTreeMap::new();
    for id in graph.resource_ids() {
        if let Some(category) = assignment.get(id.as_str()) {
            groups.entry((category_rank(category), category)).or_default().push(id.clone());
        }
    }

    groups
        .into_iter()
        .map(|((_, category), members)| {
            ResourceCluster::new(category, category.to_ascii_lowercase(), members)
        })
        .collect()
}

fn connectivity_clusters(
    graph: &DependencyGraph,
    connectivity: &ConnectivityMap,
    components: &StrongComponents,
) -> Vec<ResourceCluster> {
    let mut assigned: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<String>> = Vec::new();

    for component in components.cyclic() {
        for member in &component.members {
            assigned.insert(member.as_str(), groups.len());
        }
        groups.push(component.members.clone());
    }

    let seeds = groups.len();
    for group in 0..seeds {
        expand_group(graph, connectivity, group, &mut groups, &mut assigned);
    }

    for id in graph.resource_ids() {
        if assigned.contains_key(id.as_str()) {
            continue;
        }
        assigned.insert(id.as_str(), groups.len());
        groups.push(vec![id.clone()]);
        let group = groups.len() - 1;
        expand_group(graph, connectivity, group, &mut groups, &mut assigned);
    }

    let mut names = UniqueNames::new();
    groups
        .into_iter()
        .map(|members| {
            let category = dominant_category(graph, &members);
            let name = names.claim(category);
            ResourceCluster::new(name, category.to_ascii_lowercase(), members)
        })
        .collect()
}

/// Breadth-first growth of `groups[group]` along strong connections.
fn expand_group<'g>(
    graph: &'g DependencyGraph,
    connectivity: &ConnectivityMap,
    group: usize,
    groups: &mut [Vec<String>],
    assigned: &mut HashMap<&'g str, usize>,
) {
    let mut queue: VecDeque<String> = groups[group].iter().cloned().collect();
    while let Some(current) = queue.pop_front() {
        for neighbor in graph.neighbors(&current) {
            if assigned.contains_key(neighbor) {
                continue;
            }
            if connectivity.between(&current, neighbor) < STRONG_CONNECTION_THRESHOLD {
                continue;
            }
            assigned.insert(neighbor, group);
            groups[group].push(neighbor.to_string());
            queue.push_back(neighbor.to_string());
        }
    }
}

fn hybrid_clusters(
    graph: &DependencyGraph,
    connectivity: &ConnectivityMap,
    components: &StrongComponents,
    max_cluster_size: usize,
) -> Vec<ResourceCluster> {
    let mut clusters = semantic_clusters(graph, components);
    let mut merges = 0usize;

    loop {
        let membership = cluster_membership(&clusters);

        let mut totals: BTreeMap<(usize, usize), u32> = BTreeMap::new();
        for strength in connectivity.iter().filter(|s| s.edge_count > 0) {
            let (Some(&a), Some(&b)) = (
                membership.get(strength.source.as_str()),
                membership.get(strength.target.as_str()),
            ) else {
                continue;
            };
            if a != b {
                *totals.entry((a.min(b), a.max(b))).or_default() += strength.score;
            }
        }

        let mut candidates: Vec<((usize, usize), u32)> = totals
            .into_iter()
            .filter(|(_, total)| *total >= HYBRID_MERGE_THRESHOLD)
            .collect();
        candidates.sort_by(|(a_pair, a_total), (b_pair, b_total)| {
            b_total.cmp(a_total).then_with(|| a_pair.cmp(b_pair))
        });

        let accepted = candidates.into_iter().find(|&((a, b), _)| {
            merge_is_beneficial(graph, components, &membership, &clusters, (a, b), max_cluster_size)
        });
        let Some(((a, b), total)) = accepted else {
            break;
        };

        let absorbed = clusters.remove(b);
        let keeper = &mut clusters[a];
        debug!(into = %keeper.name, from = %absorbed.name, total, "Merging clusters");
        if absorbed.len() > keeper.len() {
            keeper.name = absorbed.name;
            keeper.category = absorbed.category;
        }
        keeper.resources.extend(absorbed.resources);
        merges += 1;
    }

    debug!(merges, clusters = clusters.len(), "Hybrid merging finished");
    clusters
}

fn merge_is_beneficial(
    graph: &DependencyGraph,
    components: &StrongComponents,
    membership: &HashMap<&str, usize>,
    clusters: &[ResourceCluster],
    (a, b): (usize, usize),
    max_cluster_size: usize,
) -> bool {
    let (left, right) = (&clusters[a], &clusters[b]);
    if left.len() + right.len() > max_cluster_size {
        return false;
    }
    if !merge_keeps_components_whole(components, membership, a, b) {
        return false;
    }

    let left_set: HashSet<&str> = left.resources.iter().map(String::as_str).collect();
    let right_set: HashSet<&str> = right.resources.iter().map(String::as_str).collect();
    let merged: HashSet<&str> = left_set.union(&right_set).copied().collect();

    let left_quality = score_cluster(graph, &left_set).quality;
    let right_quality = score_cluster(graph, &right_set).quality;
    let merged_quality = score_cluster(graph, &merged).quality;
    let weighted = (left_quality * left.len() as f64 + right_quality * right.len() as f64)
        / merged.len() as f64;

    merged_quality >= weighted
}

/// After folding cluster `b` into `a`, every cyclic component must still
/// sit in exactly one cluster.
fn merge_keeps_components_whole(
    components: &StrongComponents,
    membership: &HashMap<&str, usize>,
    a: usize,
    b: usize,
) -> bool {
    components.cyclic().all(|component| {
        let homes: HashSet<usize> = component
            .members
            .iter()
            .filter_map(|member| membership.get(member.as_str()))
            .map(|&cluster| if cluster == b { a } else { cluster })
            .collect();
        homes.len() <= 1
    })
}
