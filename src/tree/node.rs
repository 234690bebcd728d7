use std::fmt::Display;

use thiserror::Error;

use super::{EdgeId, NodeId};

/// Errors that can occur when querying [`Node`] adjacency.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NodeError {
    /// More than one incident edge points to the node; the tree is
    /// malformed or still under construction
    #[error("Node {0} has more than one parent")]
    MultipleParents(NodeId),
    /// No incident edge points to the node; it may be the root
    #[error("Node {0} has no parent, it may be the root")]
    NoParent(NodeId),
    /// The other node is not adjacent to this one
    #[error("Node {other} is not a neighbor of node {node}")]
    NotANeighbor {
        /// The node whose neighbors were searched
        node: NodeId,
        /// The node that was not found among them
        other: NodeId,
    },
    /// The edge is not incident to this node
    #[error("Edge {edge} is not incident to node {node}")]
    NotAnEdge {
        /// The node whose incident edges were searched
        node: NodeId,
        /// The edge that was not found among them
        edge: EdgeId,
    },
}

/// A node of the tree.
///
/// `neighbors` and `edges` are parallel sequences: index *i* of one
/// corresponds to index *i* of the other, and any removal removes the
/// same-index entry of both. The node stores no parent pointer;
/// rootedness is derived from the orientation of its incident edges.
#[derive(Debug, Clone)]
pub struct Node {
    /// Index of the node within the tree
    pub id: NodeId,
    /// Name of the node, `None` for anonymous internal nodes
    pub name: Option<String>,
    /// Free-text comments attached to the node in the source file
    pub comments: Vec<String>,
    /// Adjacent nodes, in attachment order
    pub neighbors: Vec<NodeId>,
    /// Incident edges, parallel to `neighbors`
    pub edges: Vec<EdgeId>,
    /// Number of edges between the node and the root
    pub(crate) depth: usize,
}

impl Node {
    /// Creates a new unnamed node
    pub fn new() -> Self {
        Self {
            id: 0,
            name: None,
            comments: vec![],
            neighbors: vec![],
            edges: vec![],
            depth: 0,
        }
    }

    /// Creates a new named node
    pub fn new_named(name: &str) -> Self {
        Self {
            name: Some(String::from(name)),
            ..Self::new()
        }
    }

    /// Sets the node name
    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Appends a comment to the node
    pub fn add_comment(&mut self, comment: String) {
        self.comments.push(comment);
    }

    /// Sets the depth of the node
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    /// Gets the depth of the node
    pub fn get_depth(&self) -> usize {
        self.depth
    }

    /// Appends `neighbor` and `edge` to the parallel adjacency lists.
    ///
    /// This only mutates the receiving node: callers that want the
    /// connection visible from both endpoints attach it on both.
    pub fn attach(&mut self, neighbor: NodeId, edge: EdgeId) {
        self.neighbors.push(neighbor);
        self.edges.push(edge);
    }

    /// Position of `other` in the neighbor list
    pub fn neighbor_index(&self, other: NodeId) -> Result<usize, NodeError> {
        self.neighbors
            .iter()
            .position(|&n| n == other)
            .ok_or(NodeError::NotANeighbor {
                node: self.id,
                other,
            })
    }

    /// Position of `edge` in the incident edge list
    pub fn edge_index(&self, edge: EdgeId) -> Result<usize, NodeError> {
        self.edges
            .iter()
            .position(|&e| e == edge)
            .ok_or(NodeError::NotAnEdge {
                node: self.id,
                edge,
            })
    }

    /// Removes `other` from the neighbor list along with the same-index
    /// edge entry, returning the removed edge id.
    pub fn detach(&mut self, other: NodeId) -> Result<EdgeId, NodeError> {
        let i = self.neighbor_index(other)?;
        self.neighbors.remove(i);
        Ok(self.edges.remove(i))
    }

    /// Number of incident edges
    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    /// Check if the node is a tip
    pub fn is_tip(&self) -> bool {
        self.neighbors.len() <= 1
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "<node {}>", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_lists_stay_in_sync() {
        let mut node = Node::new_named("parent");
        node.attach(1, 10);
        node.attach(2, 11);
        node.attach(3, 12);

        assert_eq!(node.neighbor_index(2).unwrap(), 1);
        assert_eq!(node.edge_index(11).unwrap(), 1);

        let removed = node.detach(2).unwrap();
        assert_eq!(removed, 11);
        assert_eq!(node.neighbors, vec![1, 3]);
        assert_eq!(node.edges, vec![10, 12]);

        assert_eq!(
            node.neighbor_index(2),
            Err(NodeError::NotANeighbor { node: 0, other: 2 })
        );
    }

    #[test]
    fn detach_unknown_neighbor() {
        let mut node = Node::new();
        node.attach(1, 0);
        assert!(node.detach(7).is_err());
        assert_eq!(node.degree(), 1);
    }
}
