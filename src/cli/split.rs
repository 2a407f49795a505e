//! Split a template and write the generated stacks to disk.
//!
//! One file per child stack, named after its cluster, plus `Parent.<ext>`
//! wiring them together as nested stacks.
//!
//! ```bash
//! stacksplit split template.yaml --output-dir out/
//! stacksplit split template.json -o out/ --prefix shop --format json --no-parent
//! ```

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use super::analyze::ClusteringArgs;
use super::common::load_template;
use crate::config::SplitConfig;
use crate::graph::build_graph;
use crate::split::{SplitOutput, analyze_and_cluster, generate_split};
use crate::template::io::{TemplateFormat, render_document};

/// Command to generate child and parent templates.
#[derive(Args, Debug)]
pub struct SplitCommand {
    /// Template file (`.json`, `.yaml`, or `.yml`)
    template: PathBuf,

    /// Directory the generated templates are written to
    #[arg(short, long)]
    output_dir: PathBuf,

    #[command(flatten)]
    clustering: ClusteringArgs,

    /// Prefix of every cross-stack export name
    #[arg(short, long)]
    prefix: Option<String>,

    /// Skip the parent stack
    #[arg(long)]
    no_parent: bool,

    /// Serialization of the generated files (defaults to the input's)
    #[arg(short = 'f', long, value_enum)]
    format: Option<TemplateFormat>,
}

impl SplitCommand {
    pub async fn execute(self, config: &SplitConfig) -> Result<()> {
        let loaded = load_template(&self.template).await?;
        let format = self.format.or(config.generate.format).unwrap_or(loaded.format);
        let analyze_options = config.analyze_options(&self.clustering.overrides());
        let generate_options = config.generate_options(self.prefix, self.no_parent, Some(format));

        let graph = build_graph(&loaded.template);
        let suggestion = analyze_and_cluster(&loaded.template, &graph, &analyze_options)?;
        let output = generate_split(&loaded.template, &graph, &suggestion, &generate_options)?;

        let written = write_stacks(&output, &self.output_dir, format).await?;

        for warning in &suggestion.analysis.warnings {
            eprintln!("{}: {warning}", "warning".yellow().bold());
        }
        println!(
            "{} {} into {} stacks ({} strategy)",
            "Split".green().bold(),
            self.template.display(),
            output.child_stacks.len(),
            suggestion.recommended.strategy
        );
        for path in &written {
            println!("  {}", path.display());
        }
        Ok(())
    }
}

/// Serialize every stack into `dir`, creating it when needed.
pub async fn write_stacks(
    output: &SplitOutput,
    dir: &Path,
    format: TemplateFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for stack in output.stacks() {
        let path = dir.join(stack.file_name(format));
        let text = render_document(&stack.template, format)?;
        fs::write(&path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    info!("Wrote {} templates to {}", written.len(), dir.display());
    Ok(written)
}
