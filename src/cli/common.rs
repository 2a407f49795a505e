//! Helpers shared by the subcommands.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::template::Template;
use crate::template::io::{TemplateFormat, parse_template};

/// Report format of the read-only commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A parsed template plus the size of the file it came from.
#[derive(Debug)]
pub struct LoadedTemplate {
    pub template: Template,
    pub format: TemplateFormat,
    pub bytes: usize,
}

/// Read and parse a template, picking the syntax from the file extension.
pub async fn load_template(path: &Path) -> Result<LoadedTemplate> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read template {}", path.display()))?;

    let format = TemplateFormat::from_path(path);
    let template = parse_template(&text, format, &path.display().to_string())?;
    debug!(
        "Parsed {} ({} resources, {} bytes)",
        path.display(),
        template.resources().len(),
        text.len()
    );

    Ok(LoadedTemplate {
        template,
        format,
        bytes: text.len(),
    })
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_template_by_extension() {
        let temp = TempDir::new().unwrap();

        let json_path = temp.path().join("stack.json");
        std::fs::write(&json_path, r#"{"Resources":{"Q":{"Type":"AWS::SQS::Queue"}}}"#).unwrap();
        let loaded = load_template(&json_path).await.unwrap();
        assert_eq!(loaded.format, TemplateFormat::Json);
        assert_eq!(loaded.template.resources().len(), 1);
        assert_eq!(loaded.bytes, std::fs::metadata(&json_path).unwrap().len() as usize);

        let yaml_path = temp.path().join("stack.yaml");
        std::fs::write(&yaml_path, "Resources:\n  T:\n    Type: AWS::SNS::Topic\n").unwrap();
        let loaded = load_template(&yaml_path).await.unwrap();
        assert_eq!(loaded.format, TemplateFormat::Yaml);
        assert!(loaded.template.resource("T").is_some());
    }

    #[tokio::test]
    async fn test_load_missing_template() {
        let temp = TempDir::new().unwrap();
        let err = load_template(&temp.path().join("missing.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read template"));
    }
}
