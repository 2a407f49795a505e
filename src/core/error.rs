//! Error handling for stacksplit
//!
//! This module provides the error type shared by the analysis pipeline and the
//! user-facing error reporting used by the CLI. The design follows two rules:
//! 1. **Strongly-typed errors** for precise handling inside the library
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! The pipeline itself is total over well-formed input. The only failures the
//! library raises are structural problems in the template handed to it
//! ([`SplitError::InvalidSection`], [`SplitError::InvalidResource`]) and
//! out-of-range options ([`SplitError::InvalidOptions`]). Everything else in
//! the enum belongs to the host layer: parsing, serialization, and
//! configuration. File I/O errors stay `std::io::Error` under an `anyhow`
//! context and are recognized by [`user_friendly_error`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use stacksplit::core::{SplitError, user_friendly_error};
//!
//! let err = SplitError::InvalidSection {
//!     section: "Resources".to_string(),
//!     reason: "expected a mapping, found a sequence".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for stacksplit operations.
#[derive(Error, Debug)]
pub enum SplitError {
    /// A top-level template section has the wrong shape.
    ///
    /// # Fields
    /// - `section`: Name of the offending section (e.g., "Resources")
    /// - `reason`: What was wrong with it
    #[error("Invalid template section '{section}': {reason}")]
    InvalidSection {
        /// Name of the offending top-level section
        section: String,
        /// Description of the structural problem
        reason: String,
    },

    /// A resource definition inside `Resources` is malformed.
    #[error("Invalid resource '{logical_id}': {reason}")]
    InvalidResource {
        /// Logical ID of the malformed resource
        logical_id: String,
        /// Description of the structural problem
        reason: String,
    },

    /// Analysis or generation options are out of range.
    #[error("Invalid options: {reason}")]
    InvalidOptions {
        /// Which option was rejected and why
        reason: String,
    },

    /// Template text could not be parsed.
    #[error("Failed to parse template {file}: {reason}")]
    TemplateParseError {
        /// Path (or label) of the template being parsed
        file: String,
        /// Parser message
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for SplitError {
    fn clone(&self) -> Self {
        match self {
            Self::InvalidSection {
                section,
                reason,
            } => Self::InvalidSection {
                section: section.clone(),
                reason: reason.clone(),
            },
            Self::InvalidResource {
                logical_id,
                reason,
            } => Self::InvalidResource {
                logical_id: logical_id.clone(),
                reason: reason.clone(),
            },
            Self::InvalidOptions {
                reason,
            } => Self::InvalidOptions {
                reason: reason.clone(),
            },
            Self::TemplateParseError {
                file,
                reason,
            } => Self::TemplateParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // Library error types are not Clone; keep their rendered message.
            Self::JsonError(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::YamlError(e) => Self::Other {
                message: format!("YAML error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error wrapper carrying user-facing details and a suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: SplitError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: SplitError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for CLI display.
///
/// Known [`SplitError`] variants get tailored suggestions. I/O and parse
/// errors are recognized through downcasting; anything else is reported with
/// its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(split_error) = error.downcast_ref::<SplitError>() {
        return create_error_context(split_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(SplitError::Other {
                    message: render_chain(&error),
                })
                .with_suggestion("Check that the template path exists and is spelled correctly");
            }
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(SplitError::Other {
                    message: render_chain(&error),
                })
                .with_suggestion("Check read permissions on the template and write permissions on the output directory");
            }
            _ => {}
        }
    }

    if error.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorContext::new(SplitError::ConfigError {
            message: render_chain(&error),
        })
        .with_suggestion("Check the TOML syntax of your stacksplit.toml");
    }

    ErrorContext::new(SplitError::Other {
        message: render_chain(&error),
    })
}

fn render_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();

    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    message
}

fn create_error_context(error: SplitError) -> ErrorContext {
    match &error {
        SplitError::InvalidSection {
            section,
            ..
        } => {
            let details = format!(
                "The '{section}' section must be a mapping of names to definitions"
            );
            ErrorContext::new(error)
                .with_suggestion("Make sure the template is fully resolved before splitting it")
                .with_details(details)
        }
        SplitError::InvalidResource {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Every resource needs a string 'Type'; 'DependsOn' must be a name or a list of names")
            .with_details("Resources are read from the fully resolved template, after macros and includes are expanded"),
        SplitError::InvalidOptions {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Use --max-cluster-size of at least 1 and --min-quality between 0 and 1"),
        SplitError::TemplateParseError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the template syntax; files ending in .json are parsed as JSON, anything else as YAML"),
        SplitError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check stacksplit.toml, or point --config at a different file"),
        _ => ErrorContext::new(error),
    }
}
