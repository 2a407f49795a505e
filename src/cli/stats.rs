//! Report template size against the platform limits.
//!
//! ```bash
//! stacksplit stats template.yaml
//! stacksplit stats template.json --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use super::common::{OutputFormat, load_template, print_json};
use crate::constants::{MAX_OUTPUTS, MAX_PARAMETERS, MAX_RESOURCES, MAX_TEMPLATE_BYTES};
use crate::stats::{LimitWarning, TemplateStats, check_thresholds, compute_stats};

/// Command to print resource, output, parameter, and byte counts.
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Template file (`.json`, `.yaml`, or `.yml`)
    template: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl StatsCommand {
    pub async fn execute(self) -> Result<()> {
        let loaded = load_template(&self.template).await?;
        let stats = compute_stats(&loaded.template, Some(loaded.bytes));
        let warnings = check_thresholds(&stats);

        match self.format {
            OutputFormat::Json => print_json(&json!({
                "stats": stats,
                "warnings": warnings,
            })),
            OutputFormat::Text => {
                print_text(&self.template, &stats, &warnings);
                Ok(())
            }
        }
    }
}

fn print_text(path: &std::path::Path, stats: &TemplateStats, warnings: &[LimitWarning]) {
    println!("{} {}", "Template:".bold(), path.display());
    let rows = [
        ("Resources", stats.resource_count, MAX_RESOURCES, stats.resource_percent),
        ("Outputs", stats.output_count, MAX_OUTPUTS, stats.output_percent),
        ("Parameters", stats.parameter_count, MAX_PARAMETERS, stats.parameter_percent),
        ("Bytes", stats.template_bytes, MAX_TEMPLATE_BYTES, stats.bytes_percent),
    ];
    for (label, value, limit, percent) in rows {
        println!("  {label:<11} {value:>8} / {limit:<8} ({percent:.1}%)");
    }

    if !stats.resource_types.is_empty() {
        println!("\n{}", "Resource types:".bold());
        for (resource_type, count) in &stats.resource_types {
            println!("  {count:>5}  {resource_type}");
        }
    }

    if !warnings.is_empty() {
        println!();
        for warning in warnings {
            let label = if warning.exceeded() {
                "error".red().bold()
            } else {
                "warning".yellow().bold()
            };
            println!("{label}: {warning}");
        }
    }
}
