//! Properties every clustering strategy must hold.

use serde_json::json;
use std::collections::BTreeSet;

use stacksplit::cluster::scoring::total_quality;
use stacksplit::cluster::{
    ClusteringOptions, ClusteringStrategy, ResourceCluster, cluster_resources,
    enforce_constraints, optimize_clusters,
};
use stacksplit::graph::{
    DependencyEdge, DependencyGraph, StrongComponents, analyze_connectivity, build_graph,
    find_strong_components,
};
use stacksplit::split::{AnalyzeOptions, SplitOption, analyze_and_cluster};
use stacksplit::test_utils::{TemplateBuilder, TemplateFixture, init_test_logging};

fn assert_partition(option: &SplitOption, graph: &DependencyGraph) {
    let mut seen = BTreeSet::new();
    for cluster in &option.clusters {
        assert!(!cluster.is_empty(), "{} produced an empty cluster", option.strategy);
        for id in &cluster.resources {
            assert!(seen.insert(id.clone()), "{id} assigned twice by {}", option.strategy);
        }
    }
    assert_eq!(&seen, graph.resource_ids(), "{} lost resources", option.strategy);
}

fn assert_components_whole(option: &SplitOption, components: &StrongComponents) {
    for component in components.cyclic() {
        let homes: BTreeSet<&str> = component
            .members
            .iter()
            .filter_map(|id| option.cluster_of(id))
            .map(|cluster| cluster.name.as_str())
            .collect();
        assert_eq!(
            homes.len(),
            1,
            "{} divided cycle {:?} across {homes:?}",
            option.strategy,
            component.members
        );
    }
}

fn all_options(suggestion: &stacksplit::split::SplitSuggestion) -> Vec<&SplitOption> {
    std::iter::once(&suggestion.recommended).chain(&suggestion.alternatives).collect()
}

#[test]
fn test_every_strategy_partitions_resources() {
    init_test_logging(None);
    let template = TemplateFixture::large_application().build();
    let graph = build_graph(&template);
    let components = find_strong_components(&graph);

    let suggestion = analyze_and_cluster(&template, &graph, &AnalyzeOptions::default()).unwrap();
    let options = all_options(&suggestion);
    assert_eq!(options.len(), ClusteringStrategy::ALL.len());

    for option in options {
        assert_partition(option, &graph);
        assert_components_whole(option, &components);
        let names: BTreeSet<&str> = option.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), option.clusters.len(), "duplicate stack names");
        assert_eq!(option.deployment_order.len(), option.clusters.len());
    }
}

#[test]
fn test_size_cap_holds_for_every_strategy() {
    let template = TemplateFixture::large_application().build();
    let graph = build_graph(&template);
    let components = find_strong_components(&graph);

    let options = AnalyzeOptions {
        max_cluster_size: 3,
        ..AnalyzeOptions::default()
    };
    let suggestion = analyze_and_cluster(&template, &graph, &options).unwrap();
    for option in all_options(&suggestion) {
        assert_partition(option, &graph);
        assert_components_whole(option, &components);
        for cluster in &option.clusters {
            assert!(cluster.len() <= 3, "{} has {} members", cluster.name, cluster.len());
        }
    }
}

/// Members of `cluster` reachable from its first member without leaving it.
fn reachable_within(cluster: &ResourceCluster, graph: &DependencyGraph) -> BTreeSet<String> {
    let members: BTreeSet<&str> = cluster.resources.iter().map(String::as_str).collect();
    let mut seen = BTreeSet::new();
    let mut stack: Vec<&str> = cluster.resources.first().map(String::as_str).into_iter().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id.to_string()) {
            continue;
        }
        stack.extend(graph.neighbors(id).into_iter().filter(|n| members.contains(n)));
    }
    seen
}

#[test]
fn test_enforce_constraints_caps_every_cluster() {
    // Queue1 -> Queue2 -> ... -> Queue6; Queue7..Queue11 stand alone.
    let mut builder = TemplateBuilder::new().resources("Queue", "AWS::SQS::Queue", 11);
    for i in 1..6 {
        builder = builder.with_ref(&format!("Queue{i}"), "Next", &format!("Queue{}", i + 1));
    }
    let template = builder.build();
    let graph = build_graph(&template);
    let connectivity = analyze_connectivity(&graph);
    let components = find_strong_components(&graph);

    let clusters = cluster_resources(
        &graph,
        &connectivity,
        &components,
        &ClusteringOptions {
            strategy: ClusteringStrategy::Semantic,
            ..ClusteringOptions::default()
        },
    );
    assert_eq!(clusters.len(), 1);
    assert_eq!(enforce_constraints(clusters.clone(), &graph, 11).len(), 1);

    for cap in [1, 2, 4, 5] {
        let capped = enforce_constraints(clusters.clone(), &graph, cap);
        let total: usize = capped.iter().map(|c| c.len()).sum();
        assert_eq!(total, 11);
        for cluster in &capped {
            assert!(cluster.len() <= cap, "cap {cap} violated by {}", cluster.name);
            let reached = reachable_within(cluster, &graph);
            assert_eq!(
                reached.len(),
                cluster.len(),
                "{} is not connected from its seed: {:?}",
                cluster.name,
                cluster.resources
            );
        }
        for i in 7..=11 {
            let id = format!("Queue{i}");
            let home = capped.iter().find(|c| c.contains(&id)).unwrap();
            assert_eq!(home.len(), 1, "{id} grouped with unrelated queues at cap {cap}");
        }
    }
}

#[test]
fn test_oversized_cycle_is_reported_not_split() {
    let mut builder = TemplateBuilder::new();
    for i in 1..=4 {
        let next = i % 4 + 1;
        builder = builder
            .resource(&format!("Topic{i}"), "AWS::SNS::Topic")
            .with_ref(&format!("Topic{i}"), "Next", &format!("Topic{next}"));
    }
    let template = builder.build();
    let graph = build_graph(&template);

    let options = AnalyzeOptions {
        max_cluster_size: 2,
        ..AnalyzeOptions::default()
    };
    let suggestion = analyze_and_cluster(&template, &graph, &options).unwrap();
    assert_eq!(suggestion.recommended.clusters.len(), 1);
    assert_eq!(suggestion.recommended.clusters[0].len(), 4);
    assert!(!suggestion.analysis.warnings.is_empty());
}

#[test]
fn test_optimizer_never_lowers_total_quality() {
    for fixture in [
        TemplateFixture::web_service(),
        TemplateFixture::with_cycle(),
        TemplateFixture::large_application(),
    ] {
        let template = fixture.build();
        let graph = build_graph(&template);
        let connectivity = analyze_connectivity(&graph);
        let components = find_strong_components(&graph);

        for strategy in ClusteringStrategy::ALL {
            let options = ClusteringOptions {
                strategy,
                ..ClusteringOptions::default()
            };
            let before = cluster_resources(&graph, &connectivity, &components, &options);
            let before_quality = total_quality(before.iter().map(|c| &c.score));
            let after = optimize_clusters(&graph, &connectivity, &components, before.clone());
            let after_quality = total_quality(after.iter().map(|c| &c.score));

            assert!(
                after_quality + 1e-9 >= before_quality,
                "{strategy} on {}: {before_quality} -> {after_quality}",
                fixture.name
            );
            assert_eq!(after.len(), before.len());
        }
    }
}

#[test]
fn test_graph_build_is_idempotent() {
    let template = TemplateFixture::large_application().build();
    let snapshot = template.clone();

    let first = build_graph(&template);
    let second = build_graph(&template);
    assert_eq!(first.edges(), second.edges());
    assert_eq!(first.nodes(), second.nodes());
    assert_eq!(template, snapshot);
}

#[test]
fn test_repeated_reference_yields_one_edge() {
    let template = TemplateBuilder::new()
        .resource("B", "AWS::S3::Bucket")
        .resource("A", "AWS::SNS::Topic")
        .with_ref("A", "Name", "B")
        .property("A", "Tags", json!([{ "Key": "bucket", "Value": { "Ref": "B" } }]))
        .build();
    let graph = build_graph(&template);
    assert_eq!(graph.edges(), &[DependencyEdge::reference("A", "B")]);
}
