//! Split suggestion data structures.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::cluster::{ClusteringStrategy, ResourceCluster};
use crate::graph::{DependencyEdge, DependencyGraph};
use crate::stats::TemplateStats;

/// A graph edge whose endpoints ended up in different clusters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossStackDependency {
    pub edge: DependencyEdge,
    /// Cluster of the referencing resource.
    pub source_cluster: String,
    /// Cluster of the referenced resource; deploys first.
    pub target_cluster: String,
}

impl fmt::Display for CrossStackDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.source_cluster, self.target_cluster, self.edge)
    }
}

/// Every edge of `graph` that crosses a cluster boundary, in edge order.
pub fn cross_stack_dependencies(
    graph: &DependencyGraph,
    clusters: &[ResourceCluster],
) -> Vec<CrossStackDependency> {
    let owner: HashMap<&str, &str> = clusters
        .iter()
        .flat_map(|cluster| {
            cluster
                .resources
                .iter()
                .map(|id| (id.as_str(), cluster.name.as_str()))
        })
        .collect();

    graph
        .edges()
        .iter()
        .filter_map(|edge| {
            let source = owner.get(edge.source.as_str())?;
            let target = owner.get(edge.target.as_str())?;
            (source != target).then(|| CrossStackDependency {
                edge: edge.clone(),
                source_cluster: (*source).to_string(),
                target_cluster: (*target).to_string(),
            })
        })
        .collect()
}

/// One strategy's complete result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitOption {
    pub strategy: ClusteringStrategy,
    pub clusters: Vec<ResourceCluster>,
    pub cross_stack_dependencies: Vec<CrossStackDependency>,
    /// Cluster names, prerequisites first.
    pub deployment_order: Vec<String>,
    /// Clusters that could only be appended because of a cluster-level cycle.
    pub unordered: Vec<String>,
    /// Mean quality minus the cross-stack penalty.
    pub score: f64,
    pub mean_quality: f64,
    pub estimated_deployment_minutes: f64,
}

impl SplitOption {
    pub fn cluster(&self, name: &str) -> Option<&ResourceCluster> {
        self.clusters.iter().find(|cluster| cluster.name == name)
    }

    /// Cluster owning `logical_id`.
    pub fn cluster_of(&self, logical_id: &str) -> Option<&ResourceCluster> {
        self.clusters.iter().find(|cluster| cluster.contains(logical_id))
    }
}

/// Structural problems worth flagging before deploying.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AntiPattern {
    /// The template is close to the platform resource limit.
    Monolith { resources: usize, limit: usize },
    /// The recommended clusters exchange many references.
    HighCoupling { mean_coupling: f64 },
    /// A large share of resources sit in cycles.
    CyclicDensity { cyclic_resources: usize, share: f64 },
}

impl fmt::Display for AntiPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monolith { resources, limit } => write!(
                f,
                "monolithic template: {resources} resources against a limit of {limit}"
            ),
            Self::HighCoupling { mean_coupling } => write!(
                f,
                "high coupling: clusters average {mean_coupling:.2} external references per resource"
            ),
            Self::CyclicDensity {
                cyclic_resources,
                share,
            } => write!(
                f,
                "dense cycles: {cyclic_resources} resources ({:.0}%) belong to circular dependencies",
                share * 100.0
            ),
        }
    }
}

/// Features that make a template easy to split or modularise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Opportunity {
    /// Semantic categories with few references between them.
    ClearBoundaries { categories: usize, crossing_share: f64 },
    /// A resource type repeated often enough to become a module.
    RepeatedType { resource_type: String, count: usize },
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClearBoundaries {
                categories,
                crossing_share,
            } => write!(
                f,
                "clear boundaries: {categories} categories with {:.0}% of references crossing them",
                crossing_share * 100.0
            ),
            Self::RepeatedType {
                resource_type,
                count,
            } => write!(f, "repeated type: {resource_type} appears {count} times"),
        }
    }
}

/// Limit overage plus heuristic findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitAnalysis {
    pub stats: TemplateStats,
    /// Resources above the platform limit (0 when within it).
    pub resource_overage: usize,
    pub output_overage: usize,
    pub parameter_overage: usize,
    pub byte_overage: usize,
    pub anti_patterns: Vec<AntiPattern>,
    pub opportunities: Vec<Opportunity>,
    pub warnings: Vec<String>,
}

impl SplitAnalysis {
    pub fn exceeds_limits(&self) -> bool {
        self.resource_overage > 0
            || self.output_overage > 0
            || self.parameter_overage > 0
            || self.byte_overage > 0
    }
}

/// The recommended option, the ranked alternatives, and the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSuggestion {
    pub recommended: SplitOption,
    pub alternatives: Vec<SplitOption>,
    pub analysis: SplitAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::template::Template;
    use serde_json::json;

    #[test]
    fn test_cross_stack_dependencies() {
        let template = Template::from_value(json!({
            "Resources": {
                "Vpc": { "Type": "AWS::EC2::VPC" },
                "Subnet": { "Type": "AWS::EC2::Subnet", "Properties": { "VpcId": { "Ref": "Vpc" } } },
                "Role": { "Type": "AWS::IAM::Role" },
                "Fn": { "Type": "AWS::Lambda::Function", "Properties": { "Role": { "Fn::GetAtt": ["Role", "Arn"] } } }
            }
        }))
        .unwrap();
        let graph = build_graph(&template);
        let clusters = vec![
            ResourceCluster::new("Networking", "networking", vec!["Vpc".into(), "Subnet".into()]),
            ResourceCluster::new("IAM", "iam", vec!["Role".into()]),
            ResourceCluster::new("Compute", "compute", vec!["Fn".into()]),
        ];

        let deps = cross_stack_dependencies(&graph, &clusters);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].source_cluster, "Compute");
        assert_eq!(deps[0].target_cluster, "IAM");
        assert_eq!(deps[0].edge.attribute.as_deref(), Some("Arn"));
    }

    #[test]
    fn test_findings_render() {
        let finding = AntiPattern::Monolith {
            resources: 450,
            limit: 500,
        };
        assert!(finding.to_string().contains("450"));
        let opportunity = Opportunity::RepeatedType {
            resource_type: "AWS::SQS::Queue".to_string(),
            count: 7,
        };
        assert_eq!(opportunity.to_string(), "repeated type: AWS::SQS::Queue appears 7 times");
    }
}
