use std::collections::HashMap;
use std::fs;
use std::iter::Peekable;
use std::path::Path;
use std::str::Chars;

use itertools::Itertools;
use thiserror::Error;

use super::edge::Edge;
use super::node::{Node, NodeError};
use super::{EdgeId, EdgeLength, NodeId};

use crate::distance::{DistanceMatrix, MatrixError};

/// Errors that can occur when manipulating [`Tree`] structs.
#[derive(Error, Debug)]
pub enum TreeError {
    /// The requested node does not exist in the tree
    #[error("There is no node with index: {0}")]
    NodeNotFound(NodeId),
    /// The requested edge does not exist in the tree
    #[error("There is no edge with index: {0}")]
    EdgeNotFound(EdgeId),
    /// No node without a parent edge was found
    #[error("No root node found")]
    RootNotFound,
    /// Some of the tips of the tree have no name
    #[error("All your tip nodes must be named.")]
    UnnamedTips,
    /// There was a [`NodeError`] when querying a node
    #[error(transparent)]
    Node(#[from] NodeError),
    /// There was a [`MatrixError`] when extracting the distance matrix
    #[error("Could not build the distance matrix")]
    Matrix(#[from] MatrixError),
    /// There was a [`std::io::Error`] when writing the tree to a file
    #[error("Error writing tree to file")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when parsing newick strings.
#[derive(Error, Debug)]
pub enum NewickParseError {
    /// There is an unclosed subtree in the newick string
    #[error("Missing a closing bracket.")]
    UnclosedBracket,
    /// There is an unclosed comment in the newick string
    #[error("Missing a closing square bracket in a comment.")]
    UnclosedComment,
    /// The newick string is missing a final semicolon
    #[error("The tree is missing a semicolon at the end.")]
    NoClosingSemicolon,
    /// A character that cannot appear at this position of the grammar
    #[error("Unexpected character {0:?} in newick string.")]
    UnexpectedCharacter(char),
    /// There was a [`std::num::ParseFloatError`] when parsing a branch length
    #[error("Could not parse a branch length")]
    FloatError(#[from] std::num::ParseFloatError),
    /// There was a [`TreeError`] when building the tree
    #[error("Problem with building the tree.")]
    TreeError(#[from] TreeError),
    /// There was a [`std::io::Error`] when reading a newick file
    #[error("Problem reading file")]
    IoError(#[from] std::io::Error),
}

/// A phylogenetic tree.
///
/// Nodes and edges live in two parallel arenas and reference each other
/// by index only. The graph is undirected; the rooting is implicit in
/// the `left`/`right` orientation of the edges, and the root is the one
/// node that is never a `right` endpoint. Malformed shapes (several
/// parent edges, no root) are reported by the queries that encounter
/// them, not at construction time, so partially linked trees are legal
/// while a parser assembles them.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Base methods to add and get [`Node`] and [`Edge`] objects to and from
/// the [`Tree`].
///
/// ----
/// ----
impl Tree {
    /// Create a new empty Tree object
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a new node to the tree arena.
    pub fn add(&mut self, node: Node) -> NodeId {
        let idx = self.nodes.len();
        let mut node = node;
        node.id = idx;
        self.nodes.push(node);

        idx
    }

    /// Add a new edge to the tree arena. The edge is not attached to the
    /// adjacency lists of its endpoints, see [`Tree::connect`].
    pub fn add_edge(&mut self, edge: Edge) -> EdgeId {
        let idx = self.edges.len();
        let mut edge = edge;
        edge.id = idx;
        self.edges.push(edge);

        idx
    }

    /// Get a reference to a specific Node of the tree
    pub fn get(&self, id: &NodeId) -> Result<&Node, TreeError> {
        self.nodes.get(*id).ok_or(TreeError::NodeNotFound(*id))
    }

    /// Get a mutable reference to a specific Node of the tree
    pub fn get_mut(&mut self, id: &NodeId) -> Result<&mut Node, TreeError> {
        self.nodes.get_mut(*id).ok_or(TreeError::NodeNotFound(*id))
    }

    /// Get a reference to a specific Edge of the tree
    pub fn get_edge(&self, id: &EdgeId) -> Result<&Edge, TreeError> {
        self.edges.get(*id).ok_or(TreeError::EdgeNotFound(*id))
    }

    /// Get a mutable reference to a specific Edge of the tree
    pub fn get_edge_mut(&mut self, id: &EdgeId) -> Result<&mut Edge, TreeError> {
        self.edges.get_mut(*id).ok_or(TreeError::EdgeNotFound(*id))
    }

    /// Get a reference to a node in the tree by name.
    /// If several nodes match, the first match in the arena is returned.
    pub fn get_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|node| node.name.as_deref() == Some(name))
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Iterates over the nodes of the tree, in arena order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of edges in the tree
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Create an edge oriented from `parent` to `child` and attach it to
    /// the adjacency lists of both endpoints. The child depth is derived
    /// from the parent depth.
    /// ```
    /// use quartetree::tree::{Node, Tree};
    ///
    /// let mut tree = Tree::new();
    /// let root = tree.add(Node::new_named("root"));
    /// let child = tree.add(Node::new_named("child"));
    /// tree.connect(root, child).unwrap();
    ///
    /// assert_eq!(tree.parent(child).unwrap(), root);
    /// assert_eq!(tree.get(&child).unwrap().get_depth(), 1);
    /// ```
    pub fn connect(&mut self, parent: NodeId, child: NodeId) -> Result<EdgeId, TreeError> {
        if parent >= self.nodes.len() {
            return Err(TreeError::NodeNotFound(parent));
        }
        if child >= self.nodes.len() {
            return Err(TreeError::NodeNotFound(child));
        }

        let eid = self.add_edge(Edge::new(parent, child));
        let depth = self.get(&parent)?.get_depth() + 1;

        self.get_mut(&parent)?.attach(child, eid);
        let child_node = self.get_mut(&child)?;
        child_node.attach(parent, eid);
        child_node.set_depth(depth);

        Ok(eid)
    }

    /// Add a child to one of the tree's nodes.
    ///
    /// # Example
    /// ```
    /// use quartetree::tree::{Node, Tree};
    ///
    /// // Create the tree and add a root node
    /// let mut tree = Tree::new();
    /// let root_id = tree.add(Node::new());
    ///
    /// // Add children to the root
    /// let left = tree.add_child(Node::new(), root_id, None).unwrap();
    /// let right = tree.add_child(Node::new(), root_id, Some(0.1)).unwrap();
    ///
    /// assert_eq!(tree.get(&root_id).unwrap().degree(), 2);
    ///
    /// // The depths of child nodes are derived from the parent node
    /// assert_eq!(tree.get(&left).unwrap().get_depth(), 1);
    /// assert_eq!(tree.get(&right).unwrap().get_depth(), 1);
    ///
    /// // If an edge length is specified it is carried by the new edge
    /// let edge = tree.parent_edge(right).unwrap();
    /// assert_eq!(tree.get_edge(&edge).unwrap().length, Some(0.1));
    /// ```
    pub fn add_child(
        &mut self,
        node: Node,
        parent: NodeId,
        edge: Option<EdgeLength>,
    ) -> Result<NodeId, TreeError> {
        if parent >= self.nodes.len() {
            return Err(TreeError::NodeNotFound(parent));
        }

        let id = self.add(node);
        let eid = self.connect(parent, id)?;
        if let Some(length) = edge {
            self.get_edge_mut(&eid)?.set_length(length);
        }

        Ok(id)
    }
}

/// Methods to query the rooted structure derived from edge orientations.
///
/// ----
/// ----
impl Tree {
    /// Retrieve the parent of a node by scanning its incident edges for
    /// the one oriented towards it.
    ///
    /// Fails with [`NodeError::MultipleParents`] if several incident
    /// edges point to the node and with [`NodeError::NoParent`] if none
    /// does (the node is the root). O(degree).
    pub fn parent(&self, id: NodeId) -> Result<NodeId, TreeError> {
        Ok(self.get_edge(&self.parent_edge(id)?)?.left)
    }

    /// Retrieve the edge going to the parent of a node, with the same
    /// failure modes as [`Tree::parent`].
    pub fn parent_edge(&self, id: NodeId) -> Result<EdgeId, TreeError> {
        let node = self.get(&id)?;
        let mut parent_edge = None;
        for &eid in node.edges.iter() {
            if self.get_edge(&eid)?.points_to(id) {
                if parent_edge.is_some() {
                    return Err(NodeError::MultipleParents(id).into());
                }
                parent_edge = Some(eid);
            }
        }

        parent_edge.ok_or_else(|| NodeError::NoParent(id).into())
    }

    /// Gets the root of the tree: the node that is never the child-side
    /// endpoint of an edge.
    pub fn get_root(&self) -> Result<NodeId, TreeError> {
        self.nodes
            .iter()
            .find(|node| {
                node.edges
                    .iter()
                    .all(|&eid| !self.edges[eid].points_to(node.id))
            })
            .map(|node| node.id)
            .ok_or(TreeError::RootNotFound)
    }

    /// Remove `other` from the adjacency lists of `node`. The parallel
    /// neighbor and edge entries are removed together; the edge itself
    /// stays in the arena, and the reverse direction (if any) stays
    /// attached to `other`.
    pub fn remove_neighbor(&mut self, node: NodeId, other: NodeId) -> Result<EdgeId, TreeError> {
        if node >= self.nodes.len() {
            return Err(TreeError::NodeNotFound(node));
        }
        Ok(self.nodes[node].detach(other)?)
    }

    /// Returns the tips of the tree in depth-first traversal order from
    /// the root. This order is deterministic and defines the tip order
    /// used by the distance matrix and the quartet index.
    /// ```
    /// use quartetree::tree::Tree;
    ///
    /// let tree = Tree::from_newick("(A,(B,C),D);").unwrap();
    /// let names: Vec<_> = tree.tips().unwrap().iter()
    ///     .map(|id| tree.get(id).unwrap().name.clone().unwrap())
    ///     .collect();
    ///
    /// assert_eq!(names, vec!["A", "B", "C", "D"]);
    /// ```
    pub fn tips(&self) -> Result<Vec<NodeId>, TreeError> {
        if self.nodes.is_empty() {
            return Ok(vec![]);
        }

        let root = self.get_root()?;
        let mut tips = vec![];
        let mut stack = vec![(root, None)];

        while let Some((id, came_from)) = stack.pop() {
            let node = self.get(&id)?;
            let children = node
                .neighbors
                .iter()
                .filter(|&&n| Some(n) != came_from)
                .collect_vec();

            if children.is_empty() {
                tips.push(id);
            } else {
                for &&child in children.iter().rev() {
                    stack.push((child, Some(id)));
                }
            }
        }

        Ok(tips)
    }

    /// Number of tips in the tree
    pub fn n_tips(&self) -> Result<usize, TreeError> {
        Ok(self.tips()?.len())
    }

    /// Names of the tips of the tree, in traversal order. Fails with
    /// [`TreeError::UnnamedTips`] if a tip has no name.
    pub fn tip_names(&self) -> Result<Vec<String>, TreeError> {
        self.tips()?
            .iter()
            .map(|id| {
                self.get(id)
                    .and_then(|node| node.name.clone().ok_or(TreeError::UnnamedTips))
            })
            .collect()
    }

    /// Whether the tree is rooted, i.e. its root node has exactly two
    /// children.
    pub fn is_rooted(&self) -> Result<bool, TreeError> {
        Ok(self.get(&self.get_root()?)?.degree() == 2)
    }

    /// Height of the tree: the largest accumulated distance between the
    /// root and a tip. Edges without a branch length count 1.
    pub fn height(&self) -> Result<EdgeLength, TreeError> {
        let root = self.get_root()?;
        let mut height: EdgeLength = 0.0;
        let mut stack = vec![(root, None, 0.0)];

        while let Some((id, came_from, dist)) = stack.pop() {
            height = height.max(dist);
            let node = self.get(&id)?;
            for (&neighbor, &eid) in node.neighbors.iter().zip(node.edges.iter()) {
                if Some(neighbor) == came_from {
                    continue;
                }
                let length = self.get_edge(&eid)?.length.unwrap_or(1.0);
                stack.push((neighbor, Some(id), dist + length));
            }
        }

        Ok(height)
    }

    /// Renames the nodes of the tree according to a mapping from current
    /// names to new names. Nodes whose name is absent from the mapping
    /// are left untouched.
    /// ```
    /// use std::collections::HashMap;
    /// use quartetree::tree::Tree;
    ///
    /// let mut tree = Tree::from_newick("(A,(B,C));").unwrap();
    /// let mapping = HashMap::from([("B".to_string(), "B2".to_string())]);
    /// tree.rename(&mapping);
    ///
    /// assert_eq!(tree.to_newick().unwrap(), "(A,(B2,C));");
    /// ```
    pub fn rename(&mut self, mapping: &HashMap<String, String>) {
        for node in self.nodes.iter_mut() {
            if let Some(name) = &node.name {
                if let Some(new_name) = mapping.get(name) {
                    node.name = Some(new_name.clone());
                }
            }
        }
    }
}

/// Methods to read and write [`Tree`] objects to and from files or
/// [`String`] objects.
///
/// ----
/// ----
impl Tree {
    /// Generate the newick representation of the subtree rooted at `id`,
    /// using `came_from` as the traversal parent to avoid backtracking
    /// over the undirected graph.
    fn to_newick_impl(
        &self,
        id: NodeId,
        came_from: Option<NodeId>,
        newick: &mut String,
    ) -> Result<(), TreeError> {
        let node = self.get(&id)?;
        let children = node
            .neighbors
            .iter()
            .zip(node.edges.iter())
            .filter(|(&neighbor, _)| Some(neighbor) != came_from)
            .map(|(&neighbor, &eid)| (neighbor, eid))
            .collect_vec();

        if children.len() > 1 {
            newick.push('(');
        }
        for (i, &(child, eid)) in children.iter().enumerate() {
            if i > 0 {
                newick.push(',');
            }
            self.to_newick_impl(child, Some(id), newick)?;
            let edge = self.get_edge(&eid)?;
            if let Some(support) = edge.support {
                newick.push_str(&format!("{support:.5}"));
            }
            for comment in self.get(&child)?.comments.iter() {
                newick.push_str(&format!("[{comment}]"));
            }
            if let Some(length) = edge.length {
                newick.push_str(&format!(":{length:.5}"));
            }
        }
        if children.len() > 1 {
            newick.push(')');
        }
        if let Some(name) = &node.name {
            newick.push_str(name);
        }

        Ok(())
    }

    /// Writes the tree as a newick formatted string. Branch lengths and
    /// support values are rendered with 5 decimals; comments follow the
    /// node they are attached to, bracketed in `[...]`. The rendering is
    /// a single depth-first pass and calling it twice yields identical
    /// bytes.
    /// # Example
    /// ```
    /// use quartetree::tree::Tree;
    ///
    /// let newick = "(A:0.10000,B:0.20000,(C:0.30000,D:0.40000)E:0.50000)F;";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(tree.to_newick().unwrap(), newick);
    /// ```
    pub fn to_newick(&self) -> Result<String, TreeError> {
        let root = self.get_root()?;
        let mut newick = String::new();
        self.to_newick_impl(root, None, &mut newick)?;
        newick.push(';');

        Ok(newick)
    }

    /// Read a newick formatted string and build a [`Tree`] struct from it.
    ///
    /// Numeric labels attached to internal nodes are interpreted as
    /// support values of the edge above them; `[...]` comments are
    /// attached to the node they follow.
    /// # Example
    /// ```
    /// use quartetree::tree::Tree;
    ///
    /// let newick = "(A:0.1,B:0.2,(C:0.3,D:0.4)E:0.5)F;";
    /// let tree = Tree::from_newick(newick).unwrap();
    ///
    /// assert_eq!(tree.size(), 6);
    /// assert_eq!(tree.n_tips().unwrap(), 4);
    /// ```
    pub fn from_newick(newick: &str) -> Result<Self, NewickParseError> {
        let mut tree = Tree::new();
        let mut chars = newick.trim().chars().peekable();

        Self::parse_clade(&mut tree, &mut chars, None)?;

        Self::skip_whitespace(&mut chars);
        match chars.next() {
            Some(';') => Ok(tree),
            _ => Err(NewickParseError::NoClosingSemicolon),
        }
    }

    fn skip_whitespace(chars: &mut Peekable<Chars>) {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
    }

    /// Recursive descent over one clade of the newick string: optional
    /// `(...)` child list, then label, comments and `:length`.
    fn parse_clade(
        tree: &mut Tree,
        chars: &mut Peekable<Chars>,
        parent: Option<NodeId>,
    ) -> Result<NodeId, NewickParseError> {
        Self::skip_whitespace(chars);

        let id = tree.add(Node::new());
        let edge = match parent {
            Some(parent) => Some(tree.connect(parent, id)?),
            None => None,
        };

        let mut has_children = false;
        if chars.next_if_eq(&'(').is_some() {
            has_children = true;
            loop {
                Self::parse_clade(tree, chars, Some(id))?;
                Self::skip_whitespace(chars);
                match chars.next() {
                    Some(',') => continue,
                    Some(')') => break,
                    Some(c) => return Err(NewickParseError::UnexpectedCharacter(c)),
                    None => return Err(NewickParseError::UnclosedBracket),
                }
            }
        }

        Self::skip_whitespace(chars);

        // Label: node name, or support value for internal nodes
        let mut label = String::new();
        while let Some(c) = chars.next_if(|&c| !"(),:;[".contains(c) && !c.is_whitespace()) {
            label.push(c);
        }
        if !label.is_empty() {
            match (has_children, edge) {
                (true, Some(eid)) if label.parse::<f64>().is_ok() => {
                    tree.get_edge_mut(&eid)?.set_support(label.parse()?);
                }
                _ => tree.get_mut(&id)?.set_name(label),
            }
        }

        // Comments attach to the node that precedes them
        Self::skip_whitespace(chars);
        while chars.next_if_eq(&'[').is_some() {
            let mut comment = String::new();
            loop {
                match chars.next() {
                    Some(']') => break,
                    Some(c) => comment.push(c),
                    None => return Err(NewickParseError::UnclosedComment),
                }
            }
            tree.get_mut(&id)?.add_comment(comment);
            Self::skip_whitespace(chars);
        }

        // Branch length
        if chars.next_if_eq(&':').is_some() {
            Self::skip_whitespace(chars);
            let mut number = String::new();
            while let Some(c) = chars.next_if(|c| "0123456789.-+eE".contains(*c)) {
                number.push(c);
            }
            let length: EdgeLength = number.parse()?;
            if let Some(eid) = edge {
                tree.get_edge_mut(&eid)?.set_length(length);
            }
        }

        Ok(id)
    }

    /// Writes the tree to a newick file
    pub fn to_file(&self, path: &Path) -> Result<(), TreeError> {
        fs::write(path, self.to_newick()?)?;
        Ok(())
    }

    /// Creates a tree from a newick file
    pub fn from_file(path: &Path) -> Result<Self, NewickParseError> {
        let newick_string = fs::read_to_string(path)?;
        Self::from_newick(&newick_string)
    }

    /// Outputs a minimal Nexus formatted document containing the tree
    pub fn to_nexus(&self) -> Result<String, TreeError> {
        let nwk = self.to_newick()?;
        let labels = self.tip_names()?.join(" ");

        Ok(format!(
            "#NEXUS
BEGIN TAXA;
    TAXLABELS {labels};
END;
BEGIN TREES;
    TREE tree1 = {nwk}
END;
"
        ))
    }
}

/// Distance matrix extraction.
///
/// ----
/// ----
impl Tree {
    /// Computes the matrix of patristic distances between all pairs of
    /// tips, with one whole-tree traversal per tip (paths in a tree are
    /// unique, so no per-pair search is needed). The taxa of the matrix
    /// follow the tree's own tip traversal order. Edges without a branch
    /// length count 1, so the matrix of an unannotated tree holds
    /// topological distances.
    /// ```
    /// use quartetree::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((T3:0.2,T1:0.2):0.3,(T2:0.4,T0:0.5):0.6);").unwrap();
    /// let matrix = tree.distance_matrix().unwrap();
    ///
    /// assert_eq!(matrix.taxa, vec!["T3", "T1", "T2", "T0"]);
    /// assert!((matrix.get_at(0, 1).unwrap() - 0.4).abs() < f64::EPSILON);
    /// assert!((matrix.get_at(1, 0).unwrap() - 0.4).abs() < f64::EPSILON);
    /// ```
    pub fn distance_matrix(&self) -> Result<DistanceMatrix<EdgeLength>, TreeError> {
        let tips = self.tips()?;
        let names = self.tip_names()?;

        let mut rank = vec![usize::MAX; self.nodes.len()];
        for (i, &tip) in tips.iter().enumerate() {
            rank[tip] = i;
        }

        let mut matrix = DistanceMatrix::new_with_size(tips.len());
        matrix.set_taxa(names)?;

        for (i, &source) in tips.iter().enumerate() {
            let mut stack = vec![(source, None, 0.0)];
            while let Some((id, came_from, dist)) = stack.pop() {
                if id != source && rank[id] != usize::MAX && rank[id] > i {
                    matrix.set_at(i, rank[id], dist)?;
                }
                let node = self.get(&id)?;
                for (&neighbor, &eid) in node.neighbors.iter().zip(node.edges.iter()) {
                    if Some(neighbor) == came_from {
                        continue;
                    }
                    let length = self.get_edge(&eid)?.length.unwrap_or(1.0);
                    stack.push((neighbor, Some(id), dist + length));
                }
            }
        }

        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    /// Tree from the newick format wikipedia page
    fn build_tree_with_lengths() -> Result<Tree, TreeError> {
        let mut tree = Tree::new();
        tree.add(Node::new_named("F")); // 0
        tree.add_child(Node::new_named("A"), 0, Some(0.1))?; // 1
        tree.add_child(Node::new_named("B"), 0, Some(0.2))?; // 2
        tree.add_child(Node::new_named("E"), 0, Some(0.5))?; // 3
        tree.add_child(Node::new_named("C"), 3, Some(0.3))?; // 4
        tree.add_child(Node::new_named("D"), 3, Some(0.4))?; // 5

        Ok(tree)
    }

    #[test]
    fn to_newick() {
        let tree = build_tree_with_lengths().unwrap();
        assert_eq!(
            tree.to_newick().unwrap(),
            "(A:0.10000,B:0.20000,(C:0.30000,D:0.40000)E:0.50000)F;"
        );
    }

    #[test]
    fn newick_round_trip() {
        let test_cases = vec![
            "(A,(B,C));",
            "(A,B,(C,D)E)F;",
            "(A:0.10000,B:0.20000,(C:0.30000,D:0.40000)E:0.50000)F;",
            "((B:0.10000,C:0.20000)0.95000:0.30000,A:0.40000);",
            "(A[a comment]:0.10000,B:0.20000);",
        ];

        for newick in test_cases {
            let tree = Tree::from_newick(newick).unwrap();
            assert_eq!(tree.to_newick().unwrap(), newick, "failed on {newick}");
            // Rendering is deterministic
            assert_eq!(tree.to_newick().unwrap(), tree.to_newick().unwrap());
        }
    }

    #[test]
    fn newick_errors() {
        assert!(matches!(
            Tree::from_newick("(A,(B,C);"),
            Err(NewickParseError::UnexpectedCharacter(';'))
        ));
        assert!(matches!(
            Tree::from_newick("(A,(B,C"),
            Err(NewickParseError::UnclosedBracket)
        ));
        assert!(matches!(
            Tree::from_newick("(A,(B,C))"),
            Err(NewickParseError::NoClosingSemicolon)
        ));
        assert!(matches!(
            Tree::from_newick("(A[no closing;"),
            Err(NewickParseError::UnclosedComment)
        ));
        assert!(matches!(
            Tree::from_newick("(A:abc,B);"),
            Err(NewickParseError::FloatError(_))
        ));
    }

    #[test]
    fn parents() {
        let tree = build_tree_with_lengths().unwrap();

        assert!(matches!(
            tree.parent(0),
            Err(TreeError::Node(NodeError::NoParent(0)))
        ));
        assert_eq!(tree.parent(1).unwrap(), 0);
        assert_eq!(tree.parent(4).unwrap(), 3);

        let edge = tree.parent_edge(4).unwrap();
        assert_eq!(tree.get_edge(&edge).unwrap().length, Some(0.3));
    }

    #[test]
    fn multiple_parents_detected() {
        let mut tree = Tree::new();
        let a = tree.add(Node::new_named("a"));
        let b = tree.add(Node::new_named("b"));
        let c = tree.add(Node::new_named("c"));
        tree.connect(a, c).unwrap();
        tree.connect(b, c).unwrap();

        assert!(matches!(
            tree.parent(c),
            Err(TreeError::Node(NodeError::MultipleParents(2)))
        ));
    }

    #[test]
    fn remove_neighbor() {
        let mut tree = build_tree_with_lengths().unwrap();
        let n_edges = tree.get(&0).unwrap().edges.len();

        tree.remove_neighbor(0, 2).unwrap();

        let root = tree.get(&0).unwrap();
        assert_eq!(root.edges.len(), n_edges - 1);
        assert!(root.neighbor_index(2).is_err());

        // Removal is one-sided, B still sees the root
        assert!(tree.get(&2).unwrap().neighbor_index(0).is_ok());

        assert!(matches!(
            tree.remove_neighbor(0, 2),
            Err(TreeError::Node(NodeError::NotANeighbor { node: 0, other: 2 }))
        ));
    }

    #[test]
    fn depths() {
        let tree = Tree::from_newick("(A,(B,(C,D)));").unwrap();
        let c = tree.get_by_name("C").unwrap();
        assert_eq!(c.get_depth(), 3);
        assert_eq!(tree.get(&tree.get_root().unwrap()).unwrap().get_depth(), 0);
    }

    #[test]
    fn tips_in_traversal_order() {
        let tree = Tree::from_newick("((D,E)B,(F,G)C)A;").unwrap();
        let names: Vec<_> = tree
            .tips()
            .unwrap()
            .iter()
            .map(|id| tree.get(id).unwrap().name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["D", "E", "F", "G"]);
    }

    #[test]
    fn support_values() {
        let tree = Tree::from_newick("((B,C)0.95:0.3,A);").unwrap();
        let b = tree.get_by_name("B").unwrap();
        let inner = tree.parent(b.id).unwrap();
        let edge = tree.parent_edge(inner).unwrap();

        assert_eq!(tree.get_edge(&edge).unwrap().support, Some(0.95));
        assert_eq!(tree.get_edge(&edge).unwrap().length, Some(0.3));
        // The internal node itself stays anonymous
        assert!(tree.get(&inner).unwrap().name.is_none());
    }

    #[test]
    fn comments_attach_to_previous_node() {
        let tree = Tree::from_newick("(A[first][second]:0.1,B);").unwrap();
        let a = tree.get_by_name("A").unwrap();
        assert_eq!(a.comments, vec!["first", "second"]);
    }

    #[test]
    fn distance_matrix_values() {
        let tree = Tree::from_newick("((T3:0.2,T1:0.2):0.3,(T2:0.4,T0:0.5):0.6);").unwrap();
        let matrix = tree.distance_matrix().unwrap();

        assert_eq!(matrix.taxa, vec!["T3", "T1", "T2", "T0"]);

        // (row, col, expected patristic distance)
        let test_cases = vec![
            (0, 1, 0.4),
            (0, 2, 1.5),
            (0, 3, 1.6),
            (1, 2, 1.5),
            (1, 3, 1.6),
            (2, 3, 0.9),
        ];

        for (i, j, expected) in test_cases {
            assert!((matrix.get_at(i, j).unwrap() - expected).abs() < 1e-12);
            // Symmetry
            assert!((matrix.get_at(j, i).unwrap() - matrix.get_at(i, j).unwrap()).abs() == 0.0);
        }
        for i in 0..4 {
            assert_eq!(matrix.get_at(i, i).unwrap(), 0.0);
        }
    }

    #[test]
    fn distance_matrix_topological_fallback() {
        let tree = Tree::from_newick("(A,(B,C));").unwrap();
        let matrix = tree.distance_matrix().unwrap();

        assert_eq!(matrix.get_at(0, 1).unwrap(), 3.0); // A -> B
        assert_eq!(matrix.get_at(1, 2).unwrap(), 2.0); // B -> C
    }

    #[test]
    fn height_and_rooted() {
        let tree = Tree::from_newick("((T3:0.2,T1:0.2):0.3,(T2:0.4,T0:0.5):0.6);").unwrap();
        assert!(tree.is_rooted().unwrap());
        assert!((tree.height().unwrap() - 1.1).abs() < f64::EPSILON);

        let unrooted = Tree::from_newick("(A,B,(C,D));").unwrap();
        assert!(!unrooted.is_rooted().unwrap());
    }

    #[test]
    fn rename_tips() {
        let mut tree = Tree::from_newick("(A,(B,C));").unwrap();
        let mapping = HashMap::from([
            ("A".to_string(), "A2".to_string()),
            ("C".to_string(), "C2".to_string()),
            ("Z".to_string(), "Z2".to_string()),
        ]);
        tree.rename(&mapping);

        assert_eq!(tree.to_newick().unwrap(), "(A2,(B,C2));");
    }
}
