use super::{EdgeId, EdgeLength, NodeId, Support};

/// An edge of the tree, connecting two entries of the node arena.
///
/// The graph itself is undirected, but the `left`/`right` orientation
/// carries the rooting convention: `left` is the parent of `right`.
/// All rooted queries ([`super::Tree::parent`] and friends) are derived
/// from this orientation instead of a stored parent pointer.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Index of the edge within the tree
    pub id: EdgeId,
    /// Parent-side endpoint
    pub left: NodeId,
    /// Child-side endpoint
    pub right: NodeId,
    /// Branch length, if annotated
    pub length: Option<EdgeLength>,
    /// Support value, if annotated
    pub support: Option<Support>,
}

impl Edge {
    /// Creates a new edge oriented from `left` (parent) to `right` (child),
    /// with no length or support annotation.
    pub fn new(left: NodeId, right: NodeId) -> Self {
        Self {
            id: 0,
            left,
            right,
            length: None,
            support: None,
        }
    }

    /// Sets the branch length of the edge
    pub fn set_length(&mut self, length: EdgeLength) {
        self.length = Some(length);
    }

    /// Sets the support value of the edge
    pub fn set_support(&mut self, support: Support) {
        self.support = Some(support);
    }

    /// Returns the endpoint opposite to `node`.
    /// Traversals walk the undirected graph this way.
    pub fn other(&self, node: NodeId) -> NodeId {
        if self.left == node {
            self.right
        } else {
            self.left
        }
    }

    /// Whether `node` is the child-side endpoint of this edge
    pub fn points_to(&self, node: NodeId) -> bool {
        self.right == node
    }
}
