//! Local-search refinement of a partition.
//!
//! Each round visits every resource in logical-ID order and tries moving it
//! into the clusters that hold its neighbours, strongest connection first.
//! A move is kept only when the combined quality of the source and
//! destination clusters rises by more than [`MIN_IMPROVEMENT`]. The loop
//! stops after a round with no accepted move or after
//! [`MAX_OPTIMIZATION_ROUNDS`].
//!
//! The number of clusters never changes: a resource is never moved out of a
//! single-member cluster, and members of cyclic components stay put so the
//! components remain whole.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

use super::model::{ClusterScore, ResourceCluster, finalize_clusters};
use super::scoring::score_cluster;
use crate::constants::{MAX_OPTIMIZATION_ROUNDS, MIN_IMPROVEMENT};
use crate::graph::{ConnectivityMap, DependencyGraph, StrongComponents};

/// Improve `clusters` by moving single resources between them.
pub fn optimize_clusters(
    graph: &DependencyGraph,
    connectivity: &ConnectivityMap,
    components: &StrongComponents,
    mut clusters: Vec<ResourceCluster>,
) -> Vec<ResourceCluster> {
    let mut members: Vec<HashSet<&str>> = clusters
        .iter()
        .map(|cluster| {
            cluster
                .resources
                .iter()
                .filter_map(|id| graph.nodes().get_key_value(id.as_str()))
                .map(|(key, _)| key.as_str())
                .collect()
        })
        .collect();
    let mut home: HashMap<&str, usize> = members
        .iter()
        .enumerate()
        .flat_map(|(i, set)| set.iter().map(move |&id| (id, i)))
        .collect();
    let mut scores: Vec<ClusterScore> =
        members.iter().map(|set| score_cluster(graph, set)).collect();

    let mut accepted = 0usize;
    let mut rounds = 0usize;
    while rounds < MAX_OPTIMIZATION_ROUNDS {
        rounds += 1;
        let mut moved = false;

        for id in graph.resource_ids() {
            let id = id.as_str();
            if components.is_in_cycle(id) {
                continue;
            }
            let Some(&from) = home.get(id) else {
                continue;
            };
            if members[from].len() <= 1 {
                continue;
            }

            // Candidate clusters ranked by connection strength to `id`.
            let mut affinity: BTreeMap<usize, u32> = BTreeMap::new();
            for neighbor in graph.neighbors(id) {
                if let Some(&cluster) = home.get(neighbor)
                    && cluster != from
                {
                    *affinity.entry(cluster).or_default() += connectivity.between(id, neighbor);
                }
            }
            let mut candidates: Vec<(usize, u32)> = affinity.into_iter().collect();
            candidates.sort_by(|(a, a_strength), (b, b_strength)| {
                b_strength.cmp(a_strength).then_with(|| a.cmp(b))
            });

            let mut source = members[from].clone();
            source.remove(id);
            let source_score = score_cluster(graph, &source);

            let mut best: Option<(usize, f64, ClusterScore)> = None;
            for (to, _) in candidates {
                let before = scores[from].quality + scores[to].quality;
                let mut destination = members[to].clone();
                destination.insert(id);
                let destination_score = score_cluster(graph, &destination);
                let gain = source_score.quality + destination_score.quality - before;
                if gain > MIN_IMPROVEMENT && best.as_ref().is_none_or(|(_, g, _)| gain > *g) {
                    best = Some((to, gain, destination_score));
                }
            }

            let Some((to, gain, destination_score)) = best else {
                continue;
            };
            trace!(
                resource = id,
                from = %clusters[from].name,
                to = %clusters[to].name,
                gain,
                "Moving resource"
            );
            members[from].remove(id);
            members[to].insert(id);
            home.insert(id, to);
            scores[from] = source_score;
            scores[to] = destination_score;
            accepted += 1;
            moved = true;
        }

        if !moved {
            break;
        }
    }

    debug!(rounds, moves = accepted, "Optimization finished");

    for (cluster, set) in clusters.iter_mut().zip(&members) {
        cluster.resources = set.iter().map(|id| (*id).to_string()).collect();
    }
    finalize_clusters(&mut clusters, graph);
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::scoring::total_quality;
    use crate::graph::{analyze_connectivity, build_graph, find_strong_components};
    use crate::template::Template;
    use serde_json::json;

    fn cluster(name: &str, ids: &[&str]) -> ResourceCluster {
        ResourceCluster::new(name, name.to_lowercase(), ids.iter().map(|s| s.to_string()).collect())
    }

    fn graph() -> DependencyGraph {
        // Api and Handler form a tight pair; Table hangs off Handler.
        let template = Template::from_value(json!({
            "Resources": {
                "Api": { "Type": "AWS::ApiGateway::RestApi", "Properties": { "H": { "Ref": "Handler" }, "A": { "Fn::GetAtt": ["Handler", "Arn"] } } },
                "Handler": { "Type": "AWS::Lambda::Function", "Properties": { "T": { "Ref": "Table" } } },
                "Table": { "Type": "AWS::DynamoDB::Table" },
                "Stray": { "Type": "AWS::DynamoDB::Table" }
            }
        }))
        .unwrap();
        build_graph(&template)
    }

    #[test]
    fn test_moves_misplaced_resource() {
        let graph = graph();
        let start = vec![
            cluster("Front", &["Api", "Table"]),
            cluster("Back", &["Handler", "Stray"]),
        ];
        let mut before = start.clone();
        finalize_clusters(&mut before, &graph);

        let after = optimize_clusters(
            &graph,
            &analyze_connectivity(&graph),
            &find_strong_components(&graph),
            start,
        );

        assert_eq!(after.len(), 2);
        assert!(
            total_quality(after.iter().map(|c| &c.score))
                >= total_quality(before.iter().map(|c| &c.score))
        );
        let api_home = after.iter().find(|c| c.contains("Api")).unwrap();
        assert_eq!(api_home.name, "Back");
        assert!(api_home.contains("Handler"));
    }

    #[test]
    fn test_never_empties_a_cluster() {
        let graph = graph();
        let start = vec![
            cluster("Front", &["Api"]),
            cluster("Back", &["Handler", "Table", "Stray"]),
        ];
        let after = optimize_clusters(
            &graph,
            &analyze_connectivity(&graph),
            &find_strong_components(&graph),
            start,
        );
        assert_eq!(after.len(), 2);
        assert!(after.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn test_cycle_members_stay_put() {
        let template = Template::from_value(json!({
            "Resources": {
                "A": { "Type": "AWS::SQS::Queue", "Properties": { "X": { "Ref": "B" } } },
                "B": { "Type": "AWS::SQS::Queue", "Properties": { "X": { "Ref": "A" }, "Y": { "Ref": "C" }, "Z": { "Fn::GetAtt": ["C", "Arn"] } } },
                "C": { "Type": "AWS::SNS::Topic" },
                "D": { "Type": "AWS::SNS::Topic" }
            }
        }))
        .unwrap();
        let graph = build_graph(&template);
        let after = optimize_clusters(
            &graph,
            &analyze_connectivity(&graph),
            &find_strong_components(&graph),
            vec![cluster("Queues", &["A", "B"]), cluster("Topics", &["C", "D"])],
        );
        let queues = after.iter().find(|c| c.name == "Queues").unwrap();
        assert!(queues.contains("A") && queues.contains("B"));
    }
}
