//! Cluster quality model.
//!
//! Infrastructure graphs are sparse, so cohesion is measured against the
//! number of internal edges a cluster of this size would hold at the graph's
//! average density, not against a complete graph:
//!
//! ```text
//! expected  = (edges / resources) × size
//! cohesion  = min(1, internal / expected)
//! coupling  = external / size
//! quality   = max(0, cohesion − 0.5 × coupling)
//! ```
//!
//! A cluster's score depends only on its own members, so moving one resource
//! between two clusters changes exactly those two scores.

use std::collections::HashSet;

use super::model::ClusterScore;
use crate::constants::{COUPLING_WEIGHT, MAX_RESOURCES};
use crate::graph::DependencyGraph;

/// Score the cluster made of `members`.
pub fn score_cluster(graph: &DependencyGraph, members: &HashSet<&str>) -> ClusterScore {
    let size = members.len();
    if size == 0 {
        return ClusterScore::default();
    }

    let mut internal = 0usize;
    let mut external = 0usize;
    for &member in members {
        for edge in graph.outgoing_edges(member) {
            if members.contains(edge.target.as_str()) {
                internal += 1;
            } else {
                external += 1;
            }
        }
        external += graph
            .incoming_edges(member)
            .filter(|edge| !members.contains(edge.source.as_str()))
            .count();
    }

    let expected = graph.edge_density() * size as f64;
    let cohesion = if expected > 0.0 {
        (internal as f64 / expected).min(1.0)
    } else {
        0.0
    };
    let coupling = external as f64 / size as f64;
    let quality = (cohesion - COUPLING_WEIGHT * coupling).max(0.0);

    ClusterScore {
        cohesion,
        coupling,
        size,
        size_percent: size as f64 / MAX_RESOURCES as f64 * 100.0,
        quality,
    }
}

/// Sum of quality over a set of scores.
pub fn total_quality<'a>(scores: impl IntoIterator<Item = &'a ClusterScore>) -> f64 {
    scores.into_iter().map(|score| score.quality).sum()
}
