//! Template text codecs.
//!
//! Templates arrive either as JSON or as YAML. Both are decoded into the same
//! `serde_json::Value` tree (YAML through `serde_yaml`), so the rest of the
//! pipeline never cares which syntax the author used. Key order is preserved
//! in both directions.

use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::Template;
use crate::core::{Result, SplitError};

/// Serialization format of a template file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Json,
    #[default]
    Yaml,
}

impl TemplateFormat {
    /// Guess the format from a file extension; anything not `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// File extension written for this format.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TemplateFormat {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(SplitError::InvalidOptions {
                reason: format!("unknown template format '{other}' (expected json or yaml)"),
            }),
        }
    }
}

/// Parse template text and validate it.
///
/// `label` names the source in error messages (usually the file path).
pub fn parse_template(text: &str, format: TemplateFormat, label: &str) -> Result<Template> {
    let parse_error = |reason: String| SplitError::TemplateParseError {
        file: label.to_string(),
        reason,
    };

    let value: Value = match format {
        TemplateFormat::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        TemplateFormat::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
    };

    Template::from_value(value)
}

/// Serialize a generated document in the requested format.
pub fn render_document(document: &Value, format: TemplateFormat) -> Result<String> {
    match format {
        TemplateFormat::Json => {
            let mut text = serde_json::to_string_pretty(document)?;
            text.push('\n');
            Ok(text)
        }
        TemplateFormat::Yaml => Ok(serde_yaml::to_string(document)?),
    }
}
