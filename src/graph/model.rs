//! Dependency graph data structures.
//!
//! A [`DependencyGraph`] is built once per template by the builder and is
//! read-only afterwards. Besides the plain node map and edge list it keeps a
//! `petgraph` adjacency index (one edge per ordered resource pair) for graph
//! walks, and per-node incident edge lists for the scoring model.

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// Kind of relationship between two resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// The source's definition names the target's logical ID.
    Reference,
    /// The source reads a named attribute of the target.
    AttributeReference,
    /// The source lists the target in `DependsOn`.
    ExplicitOrdering,
    /// Both resources are gated on the same condition.
    ConditionShare,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reference => "ref",
            Self::AttributeReference => "getatt",
            Self::ExplicitOrdering => "depends-on",
            Self::ConditionShare => "condition",
        };
        f.write_str(name)
    }
}

/// A typed, directed relationship `source → target`.
///
/// Equality covers every field, so two edges between the same pair coexist
/// when they differ in kind or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct DependencyEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl DependencyEdge {
    pub fn reference(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::Reference,
            attribute: None,
        }
    }

    pub fn attribute_reference(
        source: impl Into<String>,
        target: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::AttributeReference,
            attribute: Some(attribute.into()),
        }
    }

    pub fn explicit_ordering(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::ExplicitOrdering,
            attribute: None,
        }
    }

    pub fn condition_share(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: EdgeKind::ConditionShare,
            attribute: None,
        }
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}", self.source, self.kind)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " {attribute}")?;
        }
        write!(f, "]-> {}", self.target)
    }
}

/// One resource of the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNode {
    pub logical_id: String,
    pub resource_type: String,
    /// Conditions this resource is gated on.
    pub conditions: Vec<String>,
    /// Logical IDs this resource's definition refers to.
    pub depends_on: BTreeSet<String>,
    /// Logical IDs whose definitions refer to this resource.
    pub depended_on_by: BTreeSet<String>,
}

impl ResourceNode {
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            conditions: Vec::new(),
            depends_on: BTreeSet::new(),
            depended_on_by: BTreeSet::new(),
        }
    }
}

/// Directed dependency graph over the resources of one template.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, ResourceNode>,
    edges: Vec<DependencyEdge>,
    resource_ids: BTreeSet<String>,
    parameters: BTreeSet<String>,
    condition_index: BTreeMap<String, BTreeSet<String>>,
    adjacency: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
    outgoing: HashMap<String, Vec<usize>>,
    incoming: HashMap<String, Vec<usize>>,
}

impl DependencyGraph {
    /// Assemble a graph from freshly created nodes and a deduplicated edge set.
    ///
    /// Adjacency sets on the nodes are populated here. Edges whose endpoints
    /// are not nodes are dropped, as are self-edges.
    pub(crate) fn assemble(
        nodes: Vec<ResourceNode>,
        edges: BTreeSet<DependencyEdge>,
        parameters: BTreeSet<String>,
    ) -> Self {
        let mut nodes: BTreeMap<String, ResourceNode> =
            nodes.into_iter().map(|node| (node.logical_id.clone(), node)).collect();

        let edges: Vec<DependencyEdge> = edges
            .into_iter()
            .filter(|edge| {
                edge.source != edge.target
                    && nodes.contains_key(&edge.source)
                    && nodes.contains_key(&edge.target)
            })
            .collect();

        let mut adjacency = DiGraph::new();
        let mut node_indices = HashMap::new();
        for id in nodes.keys() {
            node_indices.insert(id.clone(), adjacency.add_node(id.clone()));
        }

        let mut outgoing: HashMap<String, Vec<usize>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<usize>> = HashMap::new();

        for (position, edge) in edges.iter().enumerate() {
            if let Some(node) = nodes.get_mut(&edge.source) {
                node.depends_on.insert(edge.target.clone());
            }
            if let Some(node) = nodes.get_mut(&edge.target) {
                node.depended_on_by.insert(edge.source.clone());
            }

            let from = node_indices[&edge.source];
            let to = node_indices[&edge.target];
            if !adjacency.contains_edge(from, to) {
                adjacency.add_edge(from, to, ());
            }

            outgoing.entry(edge.source.clone()).or_default().push(position);
            incoming.entry(edge.target.clone()).or_default().push(position);
        }

        let mut condition_index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in nodes.values() {
            for condition in &node.conditions {
                condition_index
                    .entry(condition.clone())
                    .or_default()
                    .insert(node.logical_id.clone());
            }
        }

        let resource_ids = nodes.keys().cloned().collect();

        Self {
            nodes,
            edges,
            resource_ids,
            parameters,
            condition_index,
            adjacency,
            node_indices,
            outgoing,
            incoming,
        }
    }

    /// All nodes keyed by logical ID.
    pub fn nodes(&self) -> &BTreeMap<String, ResourceNode> {
        &self.nodes
    }

    pub fn node(&self, logical_id: &str) -> Option<&ResourceNode> {
        self.nodes.get(logical_id)
    }

    /// The deduplicated edge list, sorted by `(source, target, kind, attribute)`.
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    pub fn resource_ids(&self) -> &BTreeSet<String> {
        &self.resource_ids
    }

    /// Names declared in the template's `Parameters` section.
    pub fn parameters(&self) -> &BTreeSet<String> {
        &self.parameters
    }

    /// Condition name → resources gated on it.
    pub fn condition_index(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.condition_index
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.nodes.contains_key(logical_id)
    }

    pub fn is_parameter(&self, name: &str) -> bool {
        self.parameters.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Average number of edges per resource.
    pub fn edge_density(&self) -> f64 {
        if self.nodes.is_empty() {
            0.0
        } else {
            self.edges.len() as f64 / self.nodes.len() as f64
        }
    }

    /// Edges whose source is `logical_id`.
    pub fn outgoing_edges<'a>(
        &'a self,
        logical_id: &str,
    ) -> impl Iterator<Item = &'a DependencyEdge> + use<'a> {
        self.outgoing
            .get(logical_id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.edges[position])
    }

    /// Edges whose target is `logical_id`.
    pub fn incoming_edges<'a>(
        &'a self,
        logical_id: &str,
    ) -> impl Iterator<Item = &'a DependencyEdge> + use<'a> {
        self.incoming
            .get(logical_id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.edges[position])
    }

    /// Resources connected to `logical_id` in either direction.
    pub fn neighbors(&self, logical_id: &str) -> BTreeSet<&str> {
        self.nodes
            .get(logical_id)
            .map(|node| {
                node.depends_on
                    .iter()
                    .chain(node.depended_on_by.iter())
                    .map(String::as_str)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// One `ConditionShare` edge per unordered pair of resources gated on a
    /// common condition (`source < target`), deduplicated across conditions.
    pub fn condition_shares(&self) -> Vec<DependencyEdge> {
        let mut shares = BTreeSet::new();
        for members in self.condition_index.values() {
            let members: Vec<&String> = members.iter().collect();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    shares.insert(DependencyEdge::condition_share(a.as_str(), b.as_str()));
                }
            }
        }
        shares.into_iter().collect()
    }

    /// Pair-level adjacency index (one edge per ordered pair).
    pub(crate) fn adjacency(&self) -> &DiGraph<String, ()> {
        &self.adjacency
    }

    pub(crate) fn node_index(&self, logical_id: &str) -> Option<NodeIndex> {
        self.node_indices.get(logical_id).copied()
    }
}

impl PartialEq for DependencyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
            && self.edges == other.edges
            && self.resource_ids == other.resource_ids
            && self.parameters == other.parameters
            && self.condition_index == other.condition_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, conditions: &[&str]) -> ResourceNode {
        let mut node = ResourceNode::new(id, "AWS::S3::Bucket");
        node.conditions = conditions.iter().map(|c| (*c).to_string()).collect();
        node
    }

    #[test]
    fn test_assemble_populates_adjacency() {
        let edges = BTreeSet::from([
            DependencyEdge::reference("A", "B"),
            DependencyEdge::attribute_reference("A", "B", "Arn"),
            DependencyEdge::reference("B", "C"),
        ]);
        let graph = DependencyGraph::assemble(
            vec![node("A", &[]), node("B", &[]), node("C", &[])],
            edges,
            BTreeSet::new(),
        );

        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.adjacency().edge_count(), 2);
        assert!(graph.node("A").unwrap().depends_on.contains("B"));
        assert!(graph.node("C").unwrap().depended_on_by.contains("B"));
        assert_eq!(graph.outgoing_edges("A").count(), 2);
        assert_eq!(graph.incoming_edges("B").count(), 2);
        assert_eq!(graph.neighbors("B"), BTreeSet::from(["A", "C"]));
    }

    #[test]
    fn test_assemble_drops_dangling_and_self_edges() {
        let edges = BTreeSet::from([
            DependencyEdge::reference("A", "Missing"),
            DependencyEdge::reference("A", "A"),
        ]);
        let graph = DependencyGraph::assemble(vec![node("A", &[])], edges, BTreeSet::new());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node("A").unwrap().depends_on.is_empty());
    }

    #[test]
    fn test_condition_shares_deduplicated() {
        let graph = DependencyGraph::assemble(
            vec![node("A", &["X", "Y"]), node("B", &["X", "Y"]), node("C", &["Y"])],
            BTreeSet::new(),
            BTreeSet::new(),
        );
        let shares = graph.condition_shares();
        assert_eq!(
            shares,
            vec![
                DependencyEdge::condition_share("A", "B"),
                DependencyEdge::condition_share("A", "C"),
                DependencyEdge::condition_share("B", "C"),
            ]
        );
    }

    #[test]
    fn test_edge_display() {
        let edge = DependencyEdge::attribute_reference("Fn", "Role", "Arn");
        assert_eq!(edge.to_string(), "Fn -[getatt Arn]-> Role");
    }

    #[test]
    fn test_edge_density() {
        let graph = DependencyGraph::assemble(
            vec![node("A", &[]), node("B", &[])],
            BTreeSet::from([DependencyEdge::reference("A", "B")]),
            BTreeSet::new(),
        );
        assert!((graph.edge_density() - 0.5).abs() < f64::EPSILON);
    }
}
