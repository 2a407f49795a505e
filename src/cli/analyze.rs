//! Suggest how to split a template into smaller stacks.
//!
//! Runs every clustering strategy and prints the ranked options along with
//! limit overage, anti-patterns, and opportunities.
//!
//! ```bash
//! stacksplit analyze template.yaml
//! stacksplit analyze template.yaml --strategy semantic --max-cluster-size 150
//! stacksplit analyze template.json --format json
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::common::{OutputFormat, load_template, print_json};
use crate::cluster::ClusteringStrategy;
use crate::config::{AnalysisOverrides, SplitConfig};
use crate::graph::build_graph;
use crate::split::{SplitOption, SplitSuggestion, analyze_and_cluster};

/// Clustering flags shared by `analyze` and `split`.
#[derive(Args, Debug, Clone, Default)]
pub struct ClusteringArgs {
    /// Preferred clustering strategy; wins ties between equally scored options
    #[arg(short, long, value_enum)]
    pub strategy: Option<ClusteringStrategy>,

    /// Maximum number of resources per stack
    #[arg(long)]
    pub max_cluster_size: Option<usize>,

    /// Quality below which an option is flagged (0.0 to 1.0)
    #[arg(long)]
    pub min_quality: Option<f64>,
}

impl ClusteringArgs {
    pub fn overrides(&self) -> AnalysisOverrides {
        AnalysisOverrides {
            strategy: self.strategy,
            max_cluster_size: self.max_cluster_size,
            min_quality: self.min_quality,
        }
    }
}

/// Command to rank split options for a template.
#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    /// Template file (`.json`, `.yaml`, or `.yml`)
    template: PathBuf,

    #[command(flatten)]
    clustering: ClusteringArgs,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl AnalyzeCommand {
    pub fn clustering(&self) -> &ClusteringArgs {
        &self.clustering
    }

    pub async fn execute(self, config: &SplitConfig) -> Result<()> {
        let loaded = load_template(&self.template).await?;
        let options = config.analyze_options(&self.clustering.overrides());
        let graph = build_graph(&loaded.template);
        let suggestion = analyze_and_cluster(&loaded.template, &graph, &options)?;

        match self.format {
            OutputFormat::Json => print_json(&suggestion),
            OutputFormat::Text => {
                print_suggestion(&suggestion);
                Ok(())
            }
        }
    }
}

fn print_option(option: &SplitOption) {
    println!(
        "  score {:.3}, mean quality {:.3}, {} cross-stack references, ~{:.1} min to deploy",
        option.score,
        option.mean_quality,
        option.cross_stack_dependencies.len(),
        option.estimated_deployment_minutes
    );
    for name in &option.deployment_order {
        let Some(cluster) = option.cluster(name) else {
            continue;
        };
        println!(
            "  {:<20} {:>4} resources  quality {:.2}  coupling {:.2}",
            cluster.name.cyan(),
            cluster.len(),
            cluster.score.quality,
            cluster.score.coupling
        );
    }
}

fn print_suggestion(suggestion: &SplitSuggestion) {
    let analysis = &suggestion.analysis;
    let stats = &analysis.stats;
    println!(
        "{} {} resources, {} outputs, {} parameters, {} bytes",
        "Template:".bold(),
        stats.resource_count,
        stats.output_count,
        stats.parameter_count,
        stats.template_bytes
    );
    if analysis.exceeds_limits() {
        println!(
            "{} over by {} resources, {} outputs, {} parameters, {} bytes",
            "Limits:".red().bold(),
            analysis.resource_overage,
            analysis.output_overage,
            analysis.parameter_overage,
            analysis.byte_overage
        );
    }

    println!(
        "\n{} {}",
        "Recommended:".green().bold(),
        suggestion.recommended.strategy
    );
    print_option(&suggestion.recommended);

    for alternative in &suggestion.alternatives {
        println!("\n{} {}", "Alternative:".bold(), alternative.strategy);
        print_option(alternative);
    }

    if !analysis.anti_patterns.is_empty() {
        println!("\n{}", "Anti-patterns:".yellow().bold());
        for pattern in &analysis.anti_patterns {
            println!("  - {pattern}");
        }
    }
    if !analysis.opportunities.is_empty() {
        println!("\n{}", "Opportunities:".bold());
        for opportunity in &analysis.opportunities {
            println!("  - {opportunity}");
        }
    }
    if !analysis.warnings.is_empty() {
        println!();
        for warning in &analysis.warnings {
            println!("{}: {warning}", "warning".yellow().bold());
        }
    }
}
