//! Test utilities for stacksplit
//!
//! Compiled for unit tests and, through the `test-utils` feature, for the
//! integration suite:
//! - [`TemplateBuilder`] - assemble template documents resource by resource
//! - [`TemplateFixture`] - named templates shared across tests
//! - [`init_test_logging`] - once-only `tracing` setup
//!
//! # Example
//!
//! ```rust,no_run
//! use stacksplit::graph::build_graph;
//! use stacksplit::test_utils::TemplateFixture;
//!
//! let template = TemplateFixture::web_service().build();
//! let graph = build_graph(&template);
//! assert!(graph.contains("Function"));
//! ```

pub mod builder;
pub mod fixtures;

pub use builder::TemplateBuilder;
pub use fixtures::TemplateFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, logging
/// stays off. Output goes through the test writer so it is captured per
/// test.
///
/// ```bash
/// RUST_LOG=stacksplit=trace cargo test optimizer
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}
