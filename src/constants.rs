//! Global constants used throughout the stacksplit codebase.
//!
//! This module contains the fixed platform limits, scoring weights, and
//! heuristic thresholds used across the analysis pipeline. Defining them
//! centrally keeps the magic numbers discoverable and lets the reporting
//! layer quote the same values the algorithms use.

/// Maximum number of resources a single stack may declare.
pub const MAX_RESOURCES: usize = 500;

/// Maximum number of outputs a single stack may declare.
pub const MAX_OUTPUTS: usize = 200;

/// Maximum number of parameters a single stack may declare.
pub const MAX_PARAMETERS: usize = 200;

/// Maximum serialized template size (bytes) for a template uploaded to object storage.
pub const MAX_TEMPLATE_BYTES: usize = 1_048_576;

/// Fraction of a limit at which the stats checker starts warning.
pub const WARNING_THRESHOLD: f64 = 0.8;

/// Fraction of [`MAX_RESOURCES`] used as the default maximum cluster size.
pub const DEFAULT_CLUSTER_SIZE_FRACTION: f64 = 0.8;

/// Default maximum number of resources per generated stack.
pub fn default_max_cluster_size() -> usize {
    (MAX_RESOURCES as f64 * DEFAULT_CLUSTER_SIZE_FRACTION) as usize
}

/// Default advisory quality threshold for a split option.
pub const DEFAULT_MIN_QUALITY: f64 = 0.3;

/// Score contributed by each edge between a resource pair.
pub const EDGE_WEIGHT: u32 = 20;

/// Bonus applied when a resource pair references each other in both directions.
pub const BIDIRECTIONAL_BONUS: u32 = 30;

/// Score contributed by each condition two resources share.
pub const SHARED_CONDITION_WEIGHT: u32 = 15;

/// Upper bound of a connection strength score.
pub const MAX_CONNECTION_SCORE: u32 = 100;

/// Minimum connection score the connectivity strategy follows when growing a cluster.
pub const STRONG_CONNECTION_THRESHOLD: u32 = 40;

/// Minimum summed connection score between two clusters before the hybrid
/// strategy considers merging them.
pub const HYBRID_MERGE_THRESHOLD: u32 = 60;

/// Weight of coupling in the cluster quality formula.
pub const COUPLING_WEIGHT: f64 = 0.5;

/// Maximum number of local-search rounds the optimizer runs.
pub const MAX_OPTIMIZATION_ROUNDS: usize = 10;

/// Minimum combined quality gain required to accept a resource move.
pub const MIN_IMPROVEMENT: f64 = 0.01;

/// Weight applied to the fraction of graph edges that cross stack boundaries.
pub const CROSS_STACK_PENALTY_WEIGHT: f64 = 0.5;

/// Fixed cost (seconds) of deploying one nested stack.
pub const STACK_OVERHEAD_SECS: f64 = 60.0;

/// Cost (seconds) attributed to each resource of a nested stack.
pub const RESOURCE_DEPLOY_SECS: f64 = 10.0;

/// Average coupling above which the analysis reports excessive coupling.
pub const HIGH_COUPLING_THRESHOLD: f64 = 1.0;

/// Share of resources in cyclic components above which the analysis reports cycle density.
pub const CYCLIC_DENSITY_THRESHOLD: f64 = 0.1;

/// Share of edges crossing semantic categories below which boundaries are considered clear.
pub const CLEAR_BOUNDARY_THRESHOLD: f64 = 0.2;

/// Number of resources of one type that suggests extracting a reusable module.
pub const MODULE_REPETITION_THRESHOLD: usize = 5;

/// Maximum length of a cross-stack export name.
pub const MAX_EXPORT_NAME_LEN: usize = 255;

/// Parameter the parent stack uses to locate uploaded child templates.
pub const TEMPLATE_BASE_URL_PARAMETER: &str = "TemplateBaseUrl";

/// Logical ID and file name of the generated orchestrator stack.
pub const PARENT_STACK_NAME: &str = "Parent";

/// Resource type of a nested stack in the orchestrator template.
pub const NESTED_STACK_TYPE: &str = "AWS::CloudFormation::Stack";

/// Template format version of the parent stack, and of child stacks whose
/// source declares none.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Prefix shared by all platform pseudo-parameters.
pub const PSEUDO_PARAMETER_PREFIX: &str = "AWS::";
