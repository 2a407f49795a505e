//! Print the dependency graph of a template.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

use super::common::{OutputFormat, load_template, print_json};
use crate::graph::{DependencyGraph, StrongComponents, build_graph, find_strong_components};

/// Command to list resources, typed edges, and circular groups.
#[derive(Args, Debug)]
pub struct GraphCommand {
    /// Template file (`.json`, `.yaml`, or `.yml`)
    template: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl GraphCommand {
    pub async fn execute(self) -> Result<()> {
        let loaded = load_template(&self.template).await?;
        let graph = build_graph(&loaded.template);
        let components = find_strong_components(&graph);

        match self.format {
            OutputFormat::Json => {
                let cycles: Vec<_> = components.cyclic().collect();
                print_json(&json!({
                    "nodes": graph.nodes().values().collect::<Vec<_>>(),
                    "edges": graph.edges(),
                    "cycles": cycles,
                }))
            }
            OutputFormat::Text => {
                print_text(&graph, &components);
                Ok(())
            }
        }
    }
}

fn print_text(graph: &DependencyGraph, components: &StrongComponents) {
    println!("{} ({})", "Resources".bold(), graph.node_count());
    for node in graph.nodes().values() {
        let marker = if components.is_in_cycle(&node.logical_id) {
            " (cycle)".red().to_string()
        } else {
            String::new()
        };
        println!("  {} {}{marker}", node.logical_id, node.resource_type.bright_black());
    }

    println!("\n{} ({})", "Edges".bold(), graph.edge_count());
    for edge in graph.edges() {
        println!("  {edge}");
    }

    let cycles: Vec<_> = components.cyclic().collect();
    if !cycles.is_empty() {
        println!("\n{} ({})", "Circular dependencies".bold(), cycles.len());
        for component in cycles {
            println!("  {}", component.members.join(" <-> "));
        }
    }
}
