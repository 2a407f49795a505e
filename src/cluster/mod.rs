//! Resource clustering.
//!
//! The stages run in order, each producing a fresh partition:
//!
//! 1. [`engine::cluster_resources`] - initial partition by strategy
//! 2. [`optimizer::optimize_clusters`] - single-resource moves that raise quality
//! 3. [`constraints::enforce_constraints`] - split clusters above the size cap
//!
//! Every stage keeps cyclic components inside one cluster.

pub mod categories;
pub mod constraints;
pub mod engine;
pub mod model;
pub mod optimizer;
pub mod scoring;

pub use categories::categorize;
pub use constraints::enforce_constraints;
pub use engine::{ClusteringOptions, cluster_resources};
pub use model::{ClusterScore, ClusteringStrategy, ResourceCluster, cluster_membership};
pub use optimizer::optimize_clusters;
pub use scoring::score_cluster;
