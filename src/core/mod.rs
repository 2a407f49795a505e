//! Core types shared across stacksplit.
//!
//! Currently this is the error system:
//! - [`SplitError`] - Enumerated error type for every failure mode
//! - [`ErrorContext`] - User-friendly wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error into an [`ErrorContext`]

pub mod error;

pub use error::{ErrorContext, SplitError, user_friendly_error};

/// Result alias used by the library pipeline.
pub type Result<T> = std::result::Result<T, SplitError>;
