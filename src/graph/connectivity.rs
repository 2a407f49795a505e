//! Pairwise connection strength between resources.
//!
//! The score answers "how much should these two resources stay together"
//! for the clustering stage. It is a fixed heuristic, not a probability:
//!
//! ```text
//! score = min(100, edges × 20 + (bidirectional ? 30 : 0) + shared_conditions × 15)
//! ```
//!
//! Pairs are keyed by ordered `(source, target)`. Pairs connected only by a
//! shared condition are stored once, under `source < target`.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use super::model::DependencyGraph;
use crate::constants::{BIDIRECTIONAL_BONUS, EDGE_WEIGHT, MAX_CONNECTION_SCORE, SHARED_CONDITION_WEIGHT};

/// Derived connection facts for one ordered resource pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStrength {
    pub source: String,
    pub target: String,
    /// Number of distinct edges `source → target`.
    pub edge_count: usize,
    /// Whether `target → source` also has edges.
    pub bidirectional: bool,
    /// Conditions gating both resources.
    pub shared_conditions: Vec<String>,
    /// Combined score in `0..=100`.
    pub score: u32,
}

/// Connection strengths keyed by ordered pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityMap {
    strengths: BTreeMap<(String, String), ConnectionStrength>,
}

impl ConnectivityMap {
    pub fn get(&self, source: &str, target: &str) -> Option<&ConnectionStrength> {
        self.strengths.get(&(source.to_string(), target.to_string()))
    }

    /// Score of the ordered pair, 0 when unconnected.
    pub fn score(&self, source: &str, target: &str) -> u32 {
        self.get(source, target).map_or(0, |strength| strength.score)
    }

    /// Strongest score between two resources in either direction.
    pub fn between(&self, a: &str, b: &str) -> u32 {
        self.score(a, b).max(self.score(b, a))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionStrength> {
        self.strengths.values()
    }

    pub fn len(&self) -> usize {
        self.strengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }
}

/// Compute the connectivity map of `graph`.
///
/// Only pairs with at least one edge or at least one shared condition appear.
pub fn analyze_connectivity(graph: &DependencyGraph) -> ConnectivityMap {
    let mut edge_counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for edge in graph.edges() {
        *edge_counts.entry((edge.source.clone(), edge.target.clone())).or_default() += 1;
    }

    let mut strengths = BTreeMap::new();

    for ((source, target), &edge_count) in &edge_counts {
        let bidirectional = edge_counts.contains_key(&(target.clone(), source.clone()));
        let shared_conditions = shared_conditions(graph, source, target);
        let score = connection_score(edge_count, bidirectional, shared_conditions.len());
        strengths.insert(
            (source.clone(), target.clone()),
            ConnectionStrength {
                source: source.clone(),
                target: target.clone(),
                edge_count,
                bidirectional,
                shared_conditions,
                score,
            },
        );
    }

    for share in graph.condition_shares() {
        let key = (share.source.clone(), share.target.clone());
        let reverse = (share.target.clone(), share.source.clone());
        if strengths.contains_key(&key) || strengths.contains_key(&reverse) {
            continue;
        }
        let shared_conditions = shared_conditions(graph, &share.source, &share.target);
        let score = connection_score(0, false, shared_conditions.len());
        strengths.insert(
            key,
            ConnectionStrength {
                source: share.source,
                target: share.target,
                edge_count: 0,
                bidirectional: false,
                shared_conditions,
                score,
            },
        );
    }

    ConnectivityMap {
        strengths,
    }
}

/// The fixed scoring rule.
pub fn connection_score(edge_count: usize, bidirectional: bool, shared_conditions: usize) -> u32 {
    let mut score = (edge_count as u32).saturating_mul(EDGE_WEIGHT);
    if bidirectional {
        score = score.saturating_add(BIDIRECTIONAL_BONUS);
    }
    score = score.saturating_add((shared_conditions as u32).saturating_mul(SHARED_CONDITION_WEIGHT));
    score.min(MAX_CONNECTION_SCORE)
}

fn shared_conditions(graph: &DependencyGraph, a: &str, b: &str) -> Vec<String> {
    let (Some(left), Some(right)) = (graph.node(a), graph.node(b)) else {
        return Vec::new();
    };
    let right: BTreeSet<&String> = right.conditions.iter().collect();
    let shared: BTreeSet<String> =
        left.conditions.iter().filter(|c| right.contains(c)).cloned().collect();
    shared.into_iter().collect()
}
