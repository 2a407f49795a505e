//! Build a [`DependencyGraph`] from a resolved template.
//!
//! One node is created per declared resource. Each resource's definition is
//! scanned for three kinds of relationships:
//!
//! - value references (`Ref`, bare `${Name}` placeholders)
//! - attribute references (`Fn::GetAtt` in list or dotted form, `${Name.Attr}`)
//! - explicit ordering (`DependsOn`, singular or list)
//!
//! Names that are not resources of this template (parameters, pseudo
//! parameters, dangling names) never become edges.

use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use super::model::{DependencyEdge, DependencyGraph, ResourceNode};
use crate::template::Template;
use crate::template::references::{TemplateReference, collect_references, is_pseudo_parameter};

/// Resource attributes whose values are scanned for references.
pub const SCANNED_ATTRIBUTES: [&str; 4] = ["Properties", "Metadata", "CreationPolicy", "UpdatePolicy"];

/// Build the dependency graph of `template`.
///
/// The template is only read; building twice yields equal graphs.
pub fn build_graph(template: &Template) -> DependencyGraph {
    let parameters: BTreeSet<String> =
        template.parameters().map(|declared| declared.keys().cloned().collect()).unwrap_or_default();

    let resource_ids: HashSet<&str> =
        template.resources().iter().map(|resource| resource.logical_id.as_str()).collect();

    let is_resource = |name: &str| {
        resource_ids.contains(name) && !parameters.contains(name) && !is_pseudo_parameter(name)
    };

    let mut nodes = Vec::with_capacity(template.resources().len());
    let mut edges = BTreeSet::new();

    for resource in template.resources() {
        let source = resource.logical_id.as_str();
        let mut node = ResourceNode::new(source, resource.resource_type.as_str());
        node.conditions = resource.condition.iter().cloned().collect();
        nodes.push(node);

        for attribute in SCANNED_ATTRIBUTES {
            let Some(value) = resource.definition.get(attribute) else {
                continue;
            };
            for reference in collect_references(value) {
                match reference {
                    TemplateReference::Ref(target) if is_resource(&target) => {
                        edges.insert(DependencyEdge::reference(source, target));
                    }
                    TemplateReference::GetAtt {
                        target,
                        attribute,
                    } if is_resource(&target) => {
                        edges.insert(DependencyEdge::attribute_reference(source, target, attribute));
                    }
                    _ => {}
                }
            }
        }

        for target in &resource.depends_on {
            if is_resource(target) {
                edges.insert(DependencyEdge::explicit_ordering(source, target.as_str()));
            }
        }
    }

    let graph = DependencyGraph::assemble(nodes, edges, parameters);
    debug!(
        "Built dependency graph: {} resources, {} edges, {} conditions",
        graph.node_count(),
        graph.edge_count(),
        graph.condition_index().len()
    );
    graph
}
