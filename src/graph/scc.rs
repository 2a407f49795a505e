//! Strongly-connected components of the dependency graph.
//!
//! Tarjan's algorithm with an explicit call stack, so long dependency chains
//! cannot overflow the thread stack. Nodes and neighbours are visited in
//! logical-ID order and each component's members are sorted, so the result
//! is deterministic for a given graph.
//!
//! A component with more than one member is cyclic. Every later stage treats
//! a cyclic component as indivisible: its members must end up in the same
//! stack, otherwise no deployment order exists.

use serde::Serialize;
use std::collections::HashMap;

use super::model::DependencyGraph;

/// A maximal set of mutually reachable resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrongComponent {
    /// Sorted logical IDs.
    pub members: Vec<String>,
    pub is_cyclic: bool,
}

impl StrongComponent {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The component partition of a graph plus a membership index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrongComponents {
    components: Vec<StrongComponent>,
    membership: HashMap<String, usize>,
}

impl StrongComponents {
    /// All components, ordered by their first member.
    pub fn all(&self) -> &[StrongComponent] {
        &self.components
    }

    /// Components with more than one member.
    pub fn cyclic(&self) -> impl Iterator<Item = &StrongComponent> {
        self.components.iter().filter(|component| component.is_cyclic)
    }

    /// Index of the component containing `logical_id`.
    pub fn component_index(&self, logical_id: &str) -> Option<usize> {
        self.membership.get(logical_id).copied()
    }

    /// The component containing `logical_id`.
    pub fn component_of(&self, logical_id: &str) -> Option<&StrongComponent> {
        self.component_index(logical_id).map(|i| &self.components[i])
    }

    /// Whether `logical_id` belongs to a cyclic component.
    pub fn is_in_cycle(&self, logical_id: &str) -> bool {
        self.component_of(logical_id).is_some_and(|component| component.is_cyclic)
    }

    /// Number of resources that belong to cyclic components.
    pub fn cyclic_resource_count(&self) -> usize {
        self.cyclic().map(StrongComponent::len).sum()
    }
}

/// Decompose `graph` into strongly-connected components.
pub fn find_strong_components(graph: &DependencyGraph) -> StrongComponents {
    let ids: Vec<&String> = graph.resource_ids().iter().collect();
    let position: HashMap<&str, usize> =
        ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();

    // Successor lists in ID order.
    let adjacency = graph.adjacency();
    let successors: Vec<Vec<usize>> = ids
        .iter()
        .map(|id| {
            let Some(index) = graph.node_index(id) else {
                return Vec::new();
            };
            let mut next: Vec<usize> = adjacency
                .neighbors(index)
                .filter_map(|n| position.get(adjacency[n].as_str()).copied())
                .collect();
            next.sort_unstable();
            next
        })
        .collect();

    let n = ids.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut call: Vec<(usize, usize)> = Vec::new();
    let mut counter = 0usize;
    let mut found: Vec<Vec<usize>> = Vec::new();

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }

        index[root] = Some(counter);
        lowlink[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;
        call.push((root, 0));

        while let Some(frame) = call.last_mut() {
            let v = frame.0;
            if frame.1 < successors[v].len() {
                let w = successors[v][frame.1];
                frame.1 += 1;
                match index[w] {
                    None => {
                        index[w] = Some(counter);
                        lowlink[w] = counter;
                        counter += 1;
                        stack.push(w);
                        on_stack[w] = true;
                        call.push((w, 0));
                    }
                    Some(w_index) if on_stack[w] => {
                        lowlink[v] = lowlink[v].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            call.pop();
            if let Some(&(parent, _)) = call.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[v]);
            }

            if Some(lowlink[v]) == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                found.push(component);
            }
        }
    }

    let mut components: Vec<StrongComponent> = found
        .into_iter()
        .map(|members| {
            let mut members: Vec<String> = members.into_iter().map(|i| ids[i].clone()).collect();
            members.sort();
            StrongComponent {
                is_cyclic: members.len() > 1,
                members,
            }
        })
        .collect();
    components.sort_by(|a, b| a.members.cmp(&b.members));

    let membership = components
        .iter()
        .enumerate()
        .flat_map(|(i, component)| component.members.iter().map(move |id| (id.clone(), i)))
        .collect();

    StrongComponents {
        components,
        membership,
    }
}
