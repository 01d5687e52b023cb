//! A directed graph over string nodes with cycle detection.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// A cycle found while ordering a graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Dependency Cycle Found: {}", .path.join(" -> "))]
pub struct CycleError {
    /// Nodes along the cycle; the first node is repeated at the end.
    pub path: Vec<String>,
}

/// Directed graph with an owned node arena.
///
/// Nodes are identified by name; edges point from a dependency to its
/// dependant.
#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    index: HashMap<String, usize>,
    nodes: Vec<String>,
    edges: Vec<BTreeSet<usize>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl DepGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it does not exist yet, returning its index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }
        let i = self.nodes.len();
        self.index.insert(name.to_string(), i);
        self.nodes.push(name.to_string());
        self.edges.push(BTreeSet::new());
        i
    }

    /// Add an edge `from -> to`, creating missing nodes.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        self.edges[from].insert(to);
    }

    /// Whether the node exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct dependants of a node.
    pub fn dependants_of(&self, name: &str) -> Vec<&str> {
        self.index
            .get(name)
            .map(|&i| self.edges[i].iter().map(|&j| self.nodes[j].as_str()).collect())
            .unwrap_or_default()
    }

    /// Every node, dependencies before dependants.
    ///
    /// Depth-first search with three colours; reaching a node that is still
    /// on the stack reports the cycle through it.
    pub fn overall_order(&self) -> Result<Vec<&str>, CycleError> {
        let mut color = vec![Color::White; self.nodes.len()];
        let mut finished = Vec::with_capacity(self.nodes.len());

        for root in 0..self.nodes.len() {
            if color[root] != Color::White {
                continue;
            }
            let mut stack: Vec<(usize, Vec<usize>)> = vec![(root, self.successors(root))];
            color[root] = Color::Gray;

            while let Some((node, pending)) = stack.last_mut() {
                let node = *node;
                match pending.pop() {
                    Some(next) => match color[next] {
                        Color::White => {
                            color[next] = Color::Gray;
                            stack.push((next, self.successors(next)));
                        }
                        Color::Gray => {
                            let start = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                            let mut path: Vec<String> = stack[start..]
                                .iter()
                                .map(|(n, _)| self.nodes[*n].clone())
                                .collect();
                            path.push(self.nodes[next].clone());
                            return Err(CycleError { path });
                        }
                        Color::Black => {}
                    },
                    None => {
                        color[node] = Color::Black;
                        finished.push(node);
                        stack.pop();
                    }
                }
            }
        }

        finished.reverse();
        Ok(finished.into_iter().map(|i| self.nodes[i].as_str()).collect())
    }

    fn successors(&self, node: usize) -> Vec<usize> {
        self.edges[node].iter().rev().copied().collect()
    }
}
