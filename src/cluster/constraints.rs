//! Hard size limits on clusters.
//!
//! An oversized cluster is broken into connected sub-clusters. Growth works
//! on units rather than single resources: a cyclic component is one unit and
//! is never divided. A unit that is larger than the cap on its own becomes an
//! oversized sub-cluster and is reported with a warning.

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

use super::model::{ResourceCluster, UniqueNames, finalize_clusters};
use crate::graph::{DependencyGraph, find_strong_components};

/// Split every cluster with more than `max_cluster_size` members.
///
/// Clusters within the cap pass through unchanged apart from re-finalization.
pub fn enforce_constraints(
    clusters: Vec<ResourceCluster>,
    graph: &DependencyGraph,
    max_cluster_size: usize,
) -> Vec<ResourceCluster> {
    let max_cluster_size = max_cluster_size.max(1);
    if clusters.iter().all(|cluster| cluster.len() <= max_cluster_size) {
        let mut clusters = clusters;
        finalize_clusters(&mut clusters, graph);
        return clusters;
    }

    let components = find_strong_components(graph);
    let mut names = UniqueNames::new();
    for cluster in &clusters {
        names.reserve(&cluster.name);
    }

    let mut result = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        if cluster.len() <= max_cluster_size {
            result.push(cluster);
            continue;
        }

        let members: HashSet<&str> = cluster.resources.iter().map(String::as_str).collect();

        // Units in member order; a cyclic component contributes one unit.
        let mut units: Vec<Vec<String>> = Vec::new();
        let mut unit_of: HashMap<&str, usize> = HashMap::new();
        let mut sorted: Vec<&str> = members.iter().copied().collect();
        sorted.sort_unstable();
        for member in sorted {
            if unit_of.contains_key(member) {
                continue;
            }
            let unit: Vec<String> = match components.component_of(member) {
                Some(component) if component.is_cyclic => component
                    .members
                    .iter()
                    .filter(|id| members.contains(id.as_str()))
                    .cloned()
                    .collect(),
                _ => vec![member.to_string()],
            };
            for id in &unit {
                if let Some(&key) = members.get(id.as_str()) {
                    unit_of.insert(key, units.len());
                }
            }
            units.push(unit);
        }

        let groups = grow_groups(graph, &units, &unit_of, max_cluster_size);
        for group in &groups {
            if group.len() > max_cluster_size {
                warn!(
                    cluster = %cluster.name,
                    size = group.len(),
                    max = max_cluster_size,
                    "Cyclic resource group exceeds the maximum cluster size and is kept whole"
                );
            }
        }

        debug!(cluster = %cluster.name, parts = groups.len(), "Split oversized cluster");
        if groups.len() == 1 {
            result.push(cluster);
            continue;
        }
        for group in groups {
            let name = names.claim_numbered(&cluster.name);
            result.push(ResourceCluster::new(name, cluster.category.clone(), group));
        }
    }

    finalize_clusters(&mut result, graph);
    result
}

/// Greedy breadth-first grouping of units up to the size cap.
///
/// A group grows along graph edges from its seed until it is full or no
/// connected unit is left; the next untaken unit then seeds a new group.
fn grow_groups(
    graph: &DependencyGraph,
    units: &[Vec<String>],
    unit_of: &HashMap<&str, usize>,
    max_cluster_size: usize,
) -> Vec<Vec<String>> {
    let mut taken = vec![false; units.len()];
    let mut groups = Vec::new();

    for seed in 0..units.len() {
        if taken[seed] {
            continue;
        }
        taken[seed] = true;
        let mut group = units[seed].clone();
        let mut queue = VecDeque::from([seed]);

        while let Some(current) = queue.pop_front() {
            if group.len() >= max_cluster_size {
                break;
            }
            for member in &units[current] {
                for neighbor in graph.neighbors(member) {
                    let Some(&unit) = unit_of.get(neighbor) else {
                        continue;
                    };
                    if taken[unit] || group.len() + units[unit].len() > max_cluster_size {
                        continue;
                    }
                    taken[unit] = true;
                    group.extend(units[unit].iter().cloned());
                    queue.push_back(unit);
                }
            }
        }
        groups.push(group);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::template::Template;
    use serde_json::{Map, Value, json};

    fn graph(links: &[(&str, &[&str])]) -> DependencyGraph {
        let mut resources = Map::new();
        for (id, targets) in links {
            let refs: Vec<Value> = targets.iter().map(|t| json!({ "Ref": t })).collect();
            resources.insert(
                (*id).to_string(),
                json!({ "Type": "AWS::SQS::Queue", "Properties": { "Refs": refs } }),
            );
        }
        build_graph(&Template::from_value(json!({ "Resources": resources })).unwrap())
    }

    fn one_cluster(graph: &DependencyGraph) -> Vec<ResourceCluster> {
        vec![ResourceCluster::new(
            "Messaging",
            "messaging",
            graph.resource_ids().iter().cloned().collect(),
        )]
    }

    #[test]
    fn test_clusters_within_cap_untouched() {
        let g = graph(&[("A", &["B"]), ("B", &[])]);
        let result = enforce_constraints(one_cluster(&g), &g, 5);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Messaging");
    }

    #[test]
    fn test_splits_to_cap_preserving_membership() {
        let g = graph(&[
            ("A", &["B"]),
            ("B", &["C"]),
            ("C", &["D"]),
            ("D", &["E"]),
            ("E", &[]),
        ]);
        let result = enforce_constraints(one_cluster(&g), &g, 2);
        assert!(result.iter().all(|c| c.len() <= 2));
        let mut all: Vec<&String> = result.iter().flat_map(|c| &c.resources).collect();
        all.sort();
        assert_eq!(all, vec!["A", "B", "C", "D", "E"]);
        let names: Vec<&str> = result.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Messaging1", "Messaging2", "Messaging3"]);
        assert_eq!(result[0].resources, vec!["A", "B"]);
    }

    #[test]
    fn test_cycles_are_not_divided() {
        let g = graph(&[
            ("A", &["B"]),
            ("B", &["A", "C"]),
            ("C", &["D"]),
            ("D", &["C"]),
            ("E", &[]),
        ]);
        let result = enforce_constraints(one_cluster(&g), &g, 2);
        for cluster in &result {
            let has_a = cluster.contains("A");
            assert_eq!(has_a, cluster.contains("B"));
            let has_c = cluster.contains("C");
            assert_eq!(has_c, cluster.contains("D"));
        }
        assert!(result.iter().all(|c| c.len() <= 2));
    }

    #[test]
    fn test_oversized_cycle_kept_whole() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"]), ("D", &[])]);
        let result = enforce_constraints(one_cluster(&g), &g, 2);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].resources, vec!["A", "B", "C"]);
        assert_eq!(result[1].resources, vec!["D"]);
    }

    #[test]
    fn test_new_group_seeded_when_neighbourhood_runs_out() {
        let g = graph(&[("A", &["B"]), ("B", &[]), ("C", &[]), ("D", &["E"]), ("E", &[])]);
        let result = enforce_constraints(one_cluster(&g), &g, 3);
        let groups: Vec<&Vec<String>> = result.iter().map(|c| &c.resources).collect();
        assert_eq!(groups, vec![&vec!["A", "B"], &vec!["C"], &vec!["D", "E"]]);
    }

    #[test]
    fn test_sub_cluster_names_avoid_existing() {
        let g = graph(&[("A", &[]), ("B", &[]), ("C", &[])]);
        let clusters = vec![
            ResourceCluster::new("Data", "other", vec!["A".into(), "B".into()]),
            ResourceCluster::new("Data1", "other", vec!["C".into()]),
        ];
        let result = enforce_constraints(clusters, &g, 1);
        let names: Vec<&str> = result.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Data2", "Data3", "Data1"]);
    }
}
