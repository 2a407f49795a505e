//! Dependency-graph model and analyses.
//!
//! - [`builder`] - Turn a resolved template into a [`DependencyGraph`]
//! - [`connectivity`] - Pairwise connection strength scores
//! - [`scc`] - Strongly-connected components (cycle detection)
//! - [`model`] - Nodes, typed edges, and the graph itself

pub mod builder;
pub mod connectivity;
pub mod model;
pub mod scc;

pub use builder::build_graph;
pub use connectivity::{ConnectionStrength, ConnectivityMap, analyze_connectivity};
pub use model::{DependencyEdge, DependencyGraph, EdgeKind, ResourceNode};
pub use scc::{StrongComponent, StrongComponents, find_strong_components};
