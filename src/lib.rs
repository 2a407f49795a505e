//! stacksplit - dependency analysis and automatic splitting of infrastructure templates.
//!
//! A fully resolved template is turned into a typed dependency graph, its
//! resources are clustered into cohesive groups, and each group becomes a
//! child stack. References that cross stack boundaries are rewritten into
//! export/import pairs and an optional parent stack deploys the children in
//! dependency order.
//!
//! # Pipeline
//!
//! 1. [`graph::build_graph`] - resources and typed edges
//! 2. [`split::analyze_and_cluster`] - cluster with every strategy, optimize,
//!    enforce the size cap, and rank the results
//! 3. [`split::generate_split`] - child and parent templates for the
//!    recommended option
//!
//! [`stats`] reports template size against the platform limits.
//!
//! # Example
//!
//! ```rust,no_run
//! use stacksplit::graph::build_graph;
//! use stacksplit::split::{AnalyzeOptions, GenerateOptions, analyze_and_cluster, generate_split};
//! use stacksplit::template::io::{TemplateFormat, parse_template};
//!
//! # fn example(text: &str) -> stacksplit::core::Result<()> {
//! let template = parse_template(text, TemplateFormat::Yaml, "template.yaml")?;
//! let graph = build_graph(&template);
//! let suggestion = analyze_and_cluster(&template, &graph, &AnalyzeOptions::default())?;
//! let output = generate_split(&template, &graph, &suggestion, &GenerateOptions::default())?;
//! for stack in output.stacks() {
//!     println!("{}", stack.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod core;
pub mod graph;
pub mod split;
pub mod stats;
pub mod template;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
