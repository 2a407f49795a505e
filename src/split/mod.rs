//! Split ranking and generation.
//!
//! - [`suggest`] - Run all strategies end to end and rank the results
//! - [`order`] - Stack dependency graph and deployment ordering
//! - [`exports`] - Export names and cross-stack reference rewriting
//! - [`generator`] - Child and parent template generation
//! - [`model`] - Suggestion, option, and analysis types

pub mod exports;
pub mod generator;
pub mod model;
pub mod order;
pub mod suggest;

pub use exports::export_name;
pub use generator::{GenerateOptions, GeneratedStack, SplitOutput, generate_split};
pub use model::{
    AntiPattern, CrossStackDependency, Opportunity, SplitAnalysis, SplitOption, SplitSuggestion,
    cross_stack_dependencies,
};
pub use order::{DeploymentPlan, StackGraph};
pub use suggest::{AnalyzeOptions, analyze_and_cluster};
