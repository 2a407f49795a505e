//! Integration test suite for stacksplit
//!
//! End-to-end checks of the analysis pipeline, the generated templates, and
//! the command-line binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **pipeline**: partition, cycle, size-cap, and quality properties of every strategy
//! - **generation**: cross-stack wiring of the generated child and parent templates
//! - **cli**: the `stats`, `graph`, `analyze`, and `split` commands

use std::path::{Path, PathBuf};

mod cli;
mod generation;
mod pipeline;

/// Path of a checked-in fixture under `tests/fixtures/`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}
