//! Run every clustering strategy, score the results, and explain them.

use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use super::model::{
    AntiPattern, Opportunity, SplitAnalysis, SplitOption, SplitSuggestion,
    cross_stack_dependencies,
};
use super::order::{StackGraph, estimate_deployment_minutes};
use crate::cluster::{
    ClusteringOptions, ClusteringStrategy, categorize, cluster_resources, enforce_constraints,
    optimize_clusters,
};
use crate::constants::{
    CLEAR_BOUNDARY_THRESHOLD, CROSS_STACK_PENALTY_WEIGHT, CYCLIC_DENSITY_THRESHOLD,
    DEFAULT_MIN_QUALITY, HIGH_COUPLING_THRESHOLD, MAX_OUTPUTS, MAX_PARAMETERS, MAX_RESOURCES,
    MAX_TEMPLATE_BYTES, MODULE_REPETITION_THRESHOLD, WARNING_THRESHOLD, default_max_cluster_size,
};
use crate::core::{Result, SplitError};
use crate::graph::{
    ConnectivityMap, DependencyGraph, StrongComponents, analyze_connectivity,
    find_strong_components,
};
use crate::stats::{check_thresholds, compute_stats};
use crate::template::Template;

/// Options of [`analyze_and_cluster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzeOptions {
    /// Preferred strategy; wins ties in the ranking.
    pub strategy: ClusteringStrategy,
    pub max_cluster_size: usize,
    /// Advisory quality floor; weaker options are flagged, not dropped.
    pub min_quality: f64,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            strategy: ClusteringStrategy::default(),
            max_cluster_size: default_max_cluster_size(),
            min_quality: DEFAULT_MIN_QUALITY,
        }
    }
}

impl AnalyzeOptions {
    pub fn validate(&self) -> Result<()> {
        self.clustering(self.strategy).validate()?;
        if !(0.0..=1.0).contains(&self.min_quality) {
            return Err(SplitError::InvalidOptions {
                reason: format!("min_quality must be between 0 and 1, got {}", self.min_quality),
            });
        }
        Ok(())
    }

    fn clustering(&self, strategy: ClusteringStrategy) -> ClusteringOptions {
        ClusteringOptions {
            strategy,
            max_cluster_size: self.max_cluster_size,
        }
    }
}

/// Cluster `graph` under every strategy and rank the results.
pub fn analyze_and_cluster(
    template: &Template,
    graph: &DependencyGraph,
    options: &AnalyzeOptions,
) -> Result<SplitSuggestion> {
    options.validate()?;

    let connectivity = analyze_connectivity(graph);
    let components = find_strong_components(graph);

    let mut ranked: Vec<SplitOption> = ClusteringStrategy::ALL
        .into_iter()
        .map(|strategy| {
            build_option(graph, &connectivity, &components, &options.clustering(strategy))
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| {
                (b.strategy == options.strategy).cmp(&(a.strategy == options.strategy))
            })
            .then_with(|| strategy_rank(a.strategy).cmp(&strategy_rank(b.strategy)))
    });

    let recommended = ranked.remove(0);
    let analysis = analyze(template, graph, &components, &recommended, &ranked, options);

    debug!(
        recommended = %recommended.strategy,
        score = recommended.score,
        stacks = recommended.clusters.len(),
        "Ranked split options"
    );

    Ok(SplitSuggestion {
        recommended,
        alternatives: ranked,
        analysis,
    })
}

fn strategy_rank(strategy: ClusteringStrategy) -> usize {
    ClusteringStrategy::ALL
        .iter()
        .position(|&s| s == strategy)
        .unwrap_or(ClusteringStrategy::ALL.len())
}

/// Cluster, optimize, constrain, and order one strategy.
fn build_option(
    graph: &DependencyGraph,
    connectivity: &ConnectivityMap,
    components: &StrongComponents,
    options: &ClusteringOptions,
) -> SplitOption {
    let clusters = cluster_resources(graph, connectivity, components, options);
    let clusters = optimize_clusters(graph, connectivity, components, clusters);
    let clusters = enforce_constraints(clusters, graph, options.max_cluster_size);

    let dependencies = cross_stack_dependencies(graph, &clusters);
    let plan = StackGraph::from_dependencies(&clusters, &dependencies).deployment_plan();

    let mean_quality = if clusters.is_empty() {
        0.0
    } else {
        clusters.iter().map(|c| c.score.quality).sum::<f64>() / clusters.len() as f64
    };
    let penalty = if graph.edge_count() == 0 {
        0.0
    } else {
        CROSS_STACK_PENALTY_WEIGHT * dependencies.len() as f64 / graph.edge_count() as f64
    };
    let estimated_deployment_minutes = estimate_deployment_minutes(&plan, &clusters);

    debug!(
        strategy = %options.strategy,
        stacks = clusters.len(),
        cross_stack = dependencies.len(),
        mean_quality,
        "Built split option"
    );

    SplitOption {
        strategy: options.strategy,
        clusters,
        cross_stack_dependencies: dependencies,
        deployment_order: plan.order,
        unordered: plan.unordered,
        score: mean_quality - penalty,
        mean_quality,
        estimated_deployment_minutes,
    }
}

fn analyze(
    template: &Template,
    graph: &DependencyGraph,
    components: &StrongComponents,
    recommended: &SplitOption,
    alternatives: &[SplitOption],
    options: &AnalyzeOptions,
) -> SplitAnalysis {
    let stats = compute_stats(template, None);
    let mut warnings: Vec<String> =
        check_thresholds(&stats).iter().map(ToString::to_string).collect();

    let mut anti_patterns = Vec::new();
    if stats.resource_count as f64 > MAX_RESOURCES as f64 * WARNING_THRESHOLD {
        anti_patterns.push(AntiPattern::Monolith {
            resources: stats.resource_count,
            limit: MAX_RESOURCES,
        });
    }
    if !recommended.clusters.is_empty() {
        let mean_coupling = recommended.clusters.iter().map(|c| c.score.coupling).sum::<f64>()
            / recommended.clusters.len() as f64;
        if mean_coupling > HIGH_COUPLING_THRESHOLD {
            anti_patterns.push(AntiPattern::HighCoupling { mean_coupling });
        }
    }
    let cyclic_resources = components.cyclic_resource_count();
    if !graph.is_empty() {
        let share = cyclic_resources as f64 / graph.node_count() as f64;
        if share > CYCLIC_DENSITY_THRESHOLD {
            anti_patterns.push(AntiPattern::CyclicDensity {
                cyclic_resources,
                share,
            });
        }
    }

    let mut opportunities = Vec::new();
    if let Some(boundaries) = category_boundaries(graph) {
        opportunities.push(boundaries);
    }
    for (resource_type, &count) in &stats.resource_types {
        if count >= MODULE_REPETITION_THRESHOLD {
            opportunities.push(Opportunity::RepeatedType {
                resource_type: resource_type.clone(),
                count,
            });
        }
    }

    if !recommended.unordered.is_empty() {
        warnings.push(format!(
            "stacks {} depend on each other in a cycle; they were appended to the deployment order by name",
            recommended.unordered.join(", ")
        ));
    }
    for cluster in &recommended.clusters {
        if cluster.len() > options.max_cluster_size {
            warnings.push(format!(
                "stack {} holds {} resources, above the maximum of {}, because they form a circular dependency",
                cluster.name,
                cluster.len(),
                options.max_cluster_size
            ));
        }
    }
    for option in std::iter::once(recommended).chain(alternatives) {
        if option.mean_quality < options.min_quality {
            warnings.push(format!(
                "{} split has mean quality {:.2}, below the minimum of {:.2}",
                option.strategy, option.mean_quality, options.min_quality
            ));
        }
    }

    SplitAnalysis {
        resource_overage: stats.resource_count.saturating_sub(MAX_RESOURCES),
        output_overage: stats.output_count.saturating_sub(MAX_OUTPUTS),
        parameter_overage: stats.parameter_count.saturating_sub(MAX_PARAMETERS),
        byte_overage: stats.template_bytes.saturating_sub(MAX_TEMPLATE_BYTES),
        stats,
        anti_patterns,
        opportunities,
        warnings,
    }
}

/// Semantic categories that few edges cross.
fn category_boundaries(graph: &DependencyGraph) -> Option<Opportunity> {
    let category: HashMap<&str, &str> = graph
        .nodes()
        .values()
        .map(|node| (node.logical_id.as_str(), categorize(&node.resource_type)))
        .collect();
    let categories: BTreeSet<&str> = category.values().copied().collect();
    if categories.len() < 2 {
        return None;
    }

    let crossing = graph
        .edges()
        .iter()
        .filter(|edge| category.get(edge.source.as_str()) != category.get(edge.target.as_str()))
        .count();
    let crossing_share = if graph.edge_count() == 0 {
        0.0
    } else {
        crossing as f64 / graph.edge_count() as f64
    };

    (crossing_share < CLEAR_BOUNDARY_THRESHOLD).then_some(Opportunity::ClearBoundaries {
        categories: categories.len(),
        crossing_share,
    })
}
