//! Enumerate and index the quartets of a tree.
//!
//! A quartet is an unordered choice of 4 tips together with the
//! bipartition topology the tree induces on them. A tree with k tips has
//! C(k,4) quartets, which reaches tens of billions for tens of thousands
//! of tips, so the enumeration is lazy: quartets stream to a caller
//! supplied sink and nothing is materialized. Each quartet is classified
//! in O(1) against a precomputed Euler-tour ancestor table, and indexed
//! under a content-derived key so that two runs over the same tree
//! produce identical indices regardless of the number of workers.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;

use crate::tree::{NodeId, Tree, TreeError};

/// Errors that can occur when indexing quartets.
#[derive(Error, Debug)]
pub enum QuartetError {
    /// The quartet key space of the tree does not fit in 64 bits
    #[error("Quartet keys for {0} tips do not fit in 64 bits")]
    IndexOverflow(usize),
    /// There was a [`TreeError`] while walking the tree
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// The bipartition topology a tree induces on four tips `a < b < c < d`
/// (ordered by tip rank).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// `a` pairs with `b`, and `c` with `d`
    AbCd,
    /// `a` pairs with `c`, and `b` with `d`
    AcBd,
    /// `a` pairs with `d`, and `b` with `c`
    AdBc,
    /// The four tips meet in a polytomy (star quartet)
    Unresolved,
}

impl Topology {
    fn code(self) -> u64 {
        match self {
            Self::AbCd => 0,
            Self::AcBd => 1,
            Self::AdBc => 2,
            Self::Unresolved => 3,
        }
    }

    fn from_code(code: u64) -> Self {
        match code & 3 {
            0 => Self::AbCd,
            1 => Self::AcBd,
            2 => Self::AdBc,
            _ => Self::Unresolved,
        }
    }
}

/// A quartet of a tree: four tip ranks in ascending order, plus the
/// topology the tree induces on them. Ranks refer to the tree's tip
/// traversal order (see [`Tree::tips`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quartet {
    /// Ranks of the four tips, ascending
    pub tips: [usize; 4],
    /// The induced topology
    pub topology: Topology,
}

impl Quartet {
    /// The two pairs of the induced bipartition, or `None` for star
    /// quartets.
    pub fn pairs(&self) -> Option<([usize; 2], [usize; 2])> {
        let [a, b, c, d] = self.tips;
        match self.topology {
            Topology::AbCd => Some(([a, b], [c, d])),
            Topology::AcBd => Some(([a, c], [b, d])),
            Topology::AdBc => Some(([a, d], [b, c])),
            Topology::Unresolved => None,
        }
    }
}

// Pascal's triangle up to C(n, 4), with a guard that the full key space
// 4 * C(n, 4) + 3 fits in a u64.
fn binomial_table(n: usize) -> Result<Vec<[u64; 5]>, QuartetError> {
    let mut binom = vec![[0u64; 5]; n + 1];
    for i in 0..=n {
        binom[i][0] = 1;
        for j in 1..=4.min(i) {
            binom[i][j] = binom[i - 1][j - 1]
                .checked_add(binom[i - 1][j])
                .ok_or(QuartetError::IndexOverflow(n))?;
        }
    }
    binom[n][4]
        .checked_mul(4)
        .and_then(|v| v.checked_add(3))
        .ok_or(QuartetError::IndexOverflow(n))?;

    Ok(binom)
}

/// Euler-tour table answering least-common-ancestor depth queries over a
/// tree in O(1), built once per enumeration.
struct AncestorTable {
    /// First occurrence of each node in the tour
    first: Vec<usize>,
    /// `sparse[j][i]` is the minimum tour depth over `[i, i + 2^j)`
    sparse: Vec<Vec<usize>>,
}

impl AncestorTable {
    fn new(tree: &Tree) -> Result<Self, TreeError> {
        let root = tree.get_root()?;
        let mut first = vec![usize::MAX; tree.size()];
        let mut euler = vec![0usize];
        first[root] = 0;

        // Iterative Euler tour: a node's depth is appended on entry and
        // again after each of its children returns.
        let mut stack: Vec<(NodeId, Option<NodeId>, usize, usize)> = vec![(root, None, 0, 0)];
        while let Some(&(node, came_from, next, depth)) = stack.last() {
            let neighbors = &tree.get(&node)?.neighbors;
            let mut descended = false;
            for (i, &neighbor) in neighbors.iter().enumerate().skip(next) {
                if Some(neighbor) == came_from {
                    continue;
                }
                stack.last_mut().unwrap().2 = i + 1;
                first[neighbor] = euler.len();
                euler.push(depth + 1);
                stack.push((neighbor, Some(node), 0, depth + 1));
                descended = true;
                break;
            }
            if !descended {
                stack.pop();
                if let Some(&(_, _, _, parent_depth)) = stack.last() {
                    euler.push(parent_depth);
                }
            }
        }

        // Sparse table for range-minimum queries over the tour
        let mut sparse = vec![euler];
        let mut span = 1;
        while span * 2 <= sparse[0].len() {
            let prev = sparse.last().unwrap();
            let level = (0..prev.len() - span)
                .map(|i| prev[i].min(prev[i + span]))
                .collect();
            sparse.push(level);
            span *= 2;
        }

        Ok(Self { first, sparse })
    }

    /// Depth of the least common ancestor of nodes `a` and `b`
    fn lca_depth(&self, a: NodeId, b: NodeId) -> usize {
        let (lo, hi) = if self.first[a] <= self.first[b] {
            (self.first[a], self.first[b])
        } else {
            (self.first[b], self.first[a])
        };
        let len = hi - lo + 1;
        let level = (usize::BITS - 1 - len.leading_zeros()) as usize;
        let span = 1 << level;

        self.sparse[level][lo].min(self.sparse[level][hi + 1 - span])
    }

    /// Topology induced on four tip nodes: the pairing with the strictly
    /// deepest pair ancestor wins, and a tie means the quartet is a star.
    fn classify(&self, a: NodeId, b: NodeId, c: NodeId, d: NodeId) -> Topology {
        let ab_cd = self.lca_depth(a, b).max(self.lca_depth(c, d));
        let ac_bd = self.lca_depth(a, c).max(self.lca_depth(b, d));
        let ad_bc = self.lca_depth(a, d).max(self.lca_depth(b, c));

        if ab_cd > ac_bd && ab_cd > ad_bc {
            Topology::AbCd
        } else if ac_bd > ab_cd && ac_bd > ad_bc {
            Topology::AcBd
        } else if ad_bc > ab_cd && ad_bc > ac_bd {
            Topology::AdBc
        } else {
            Topology::Unresolved
        }
    }
}

/// Quartet enumeration and indexing.
///
/// ----
/// ----
impl Tree {
    /// Calls `sink` on every quartet of the tree, in combinadic order of
    /// the tip ranks. Memory stays O(1) per quartet: nothing is
    /// materialized besides the ancestor table.
    /// ```
    /// use quartetree::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,B),(C,D),E);").unwrap();
    /// let mut count = 0;
    /// tree.quartets(|_| count += 1).unwrap();
    ///
    /// assert_eq!(count, 5); // C(5, 4)
    /// ```
    pub fn quartets(&self, mut sink: impl FnMut(&Quartet)) -> Result<(), TreeError> {
        let tips = self.tips()?;
        if tips.len() < 4 {
            return Ok(());
        }
        let table = AncestorTable::new(self)?;

        for t3 in 3..tips.len() {
            for t2 in 2..t3 {
                for t1 in 1..t2 {
                    for t0 in 0..t1 {
                        let topology = table.classify(tips[t0], tips[t1], tips[t2], tips[t3]);
                        sink(&Quartet {
                            tips: [t0, t1, t2, t3],
                            topology,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Total number of quartets of the tree, C(k, 4) for k tips.
    pub fn quartet_count(&self) -> Result<u64, QuartetError> {
        let k = self.n_tips()?;
        Ok(binomial_table(k)?[k][4])
    }

    /// Builds the quartet index of the tree.
    ///
    /// The subset space is partitioned over the rayon worker pool by the
    /// largest tip rank; since keys derive from content alone the result
    /// is identical whatever the worker count. A cancellation flag, when
    /// given, is checked between partitions: cancelling leaves a valid
    /// partial index.
    /// ```
    /// use quartetree::tree::Tree;
    ///
    /// let tree = Tree::from_newick("((A,B),(C,D));").unwrap();
    /// let index = tree.quartet_index(None).unwrap();
    ///
    /// assert_eq!(index.len(), 1);
    /// assert_eq!(index.decode(index.keys()[0]).tips, [0, 1, 2, 3]);
    /// ```
    pub fn quartet_index(&self, cancel: Option<&AtomicBool>) -> Result<QuartetIndex, QuartetError> {
        let tips = self.tips()?;
        let n_tips = tips.len();
        let binom = binomial_table(n_tips)?;

        if n_tips < 4 {
            return Ok(QuartetIndex {
                n_tips,
                keys: vec![],
                binom,
            });
        }

        let table = AncestorTable::new(self)?;

        let partitions: Vec<Vec<u64>> = (3..n_tips)
            .into_par_iter()
            .map(|t3| {
                if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                    return vec![];
                }
                let mut keys = vec![];
                let base3 = binom[t3][4];
                for t2 in 2..t3 {
                    let base2 = base3 + binom[t2][3];
                    for t1 in 1..t2 {
                        let base1 = base2 + binom[t1][2];
                        for t0 in 0..t1 {
                            let topology =
                                table.classify(tips[t0], tips[t1], tips[t2], tips[t3]);
                            keys.push((base1 + t0 as u64) * 4 + topology.code());
                        }
                    }
                }
                keys
            })
            .collect();

        Ok(QuartetIndex {
            n_tips,
            keys: partitions.into_iter().flatten().collect(),
            binom,
        })
    }
}

/// The quartet index of a tree: one content-derived key per enumerated
/// quartet, in ascending order.
///
/// A key encodes the tip subset through the combinatorial number system
/// (a bijection between 4-subsets and `[0, C(k,4))`) in its high bits
/// and the induced [`Topology`] in its two low bits, so the same quartet
/// always maps to the same key and indices of different runs over the
/// same tree are directly comparable.
#[derive(Debug, Clone)]
pub struct QuartetIndex {
    n_tips: usize,
    keys: Vec<u64>,
    binom: Vec<[u64; 5]>,
}

impl QuartetIndex {
    /// Number of keys in the index. Tracked at construction: no
    /// re-enumeration happens here.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the index holds no key
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of tips of the indexed tree
    pub fn n_tips(&self) -> usize {
        self.n_tips
    }

    /// The keys of the index, ascending
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    /// Whether the index contains `key`
    pub fn contains(&self, key: u64) -> bool {
        self.keys.binary_search(&key).is_ok()
    }

    /// The key of a quartet
    pub fn key(&self, quartet: &Quartet) -> u64 {
        let [t0, t1, t2, t3] = quartet.tips;
        let rank =
            self.binom[t3][4] + self.binom[t2][3] + self.binom[t1][2] + self.binom[t0][1];

        rank * 4 + quartet.topology.code()
    }

    /// Reconstructs the quartet a key of this index encodes.
    pub fn decode(&self, key: u64) -> Quartet {
        let topology = Topology::from_code(key & 3);
        let mut rank = key >> 2;
        let mut tips = [0usize; 4];

        // Greedy combinadic unranking, largest element first
        for size in (1..=4).rev() {
            let t = (0..self.n_tips)
                .rev()
                .find(|&t| self.binom[t][size] <= rank)
                .unwrap_or(0);
            rank -= self.binom[t][size];
            tips[size - 1] = t;
        }

        Quartet { tips, topology }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tips in traversal order: A=0, B=1, X=2, C=3, D=4
    const FIVE_TIPS: &str = "((A,(B,X)),(C,D));";

    #[test]
    fn classify_four_tips() {
        let tree = Tree::from_newick("((A,B),(C,D));").unwrap();
        let mut quartets = vec![];
        tree.quartets(|q| quartets.push(*q)).unwrap();

        assert_eq!(quartets.len(), 1);
        assert_eq!(quartets[0].tips, [0, 1, 2, 3]);
        assert_eq!(quartets[0].topology, Topology::AbCd);
        assert_eq!(quartets[0].pairs(), Some(([0, 1], [2, 3])));
    }

    #[test]
    fn star_quartets_are_unresolved() {
        let tree = Tree::from_newick("(A,B,C,D);").unwrap();
        let mut quartets = vec![];
        tree.quartets(|q| quartets.push(*q)).unwrap();

        assert_eq!(quartets[0].topology, Topology::Unresolved);
        assert_eq!(quartets[0].pairs(), None);

        // A partial polytomy leaves the quartet unresolved too
        let tree = Tree::from_newick("((A,B,C),D);").unwrap();
        let mut quartets = vec![];
        tree.quartets(|q| quartets.push(*q)).unwrap();
        assert_eq!(quartets[0].topology, Topology::Unresolved);
    }

    #[test]
    fn five_tip_tree_keys() {
        let tree = Tree::from_newick(FIVE_TIPS).unwrap();
        let index = tree.quartet_index(None).unwrap();

        // {A,B,X,C} and {A,B,X,D} pair the B,X cherry against the rest;
        // the other three quartets pair their two cherries together.
        assert_eq!(index.keys(), &[2, 6, 8, 12, 16]);
        assert_eq!(index.len(), 5);
        assert_eq!(tree.quartet_count().unwrap(), 5);

        assert_eq!(
            index.decode(2),
            Quartet {
                tips: [0, 1, 2, 3],
                topology: Topology::AdBc
            }
        );
        assert_eq!(
            index.decode(16),
            Quartet {
                tips: [1, 2, 3, 4],
                topology: Topology::AbCd
            }
        );
    }

    #[test]
    fn streaming_and_index_agree() {
        let tree = Tree::from_newick(FIVE_TIPS).unwrap();
        let index = tree.quartet_index(None).unwrap();

        let mut streamed = vec![];
        tree.quartets(|q| streamed.push(index.key(q))).unwrap();

        assert_eq!(streamed, index.keys());
    }

    #[test]
    fn key_roundtrip() {
        let tree = Tree::from_newick(FIVE_TIPS).unwrap();
        let index = tree.quartet_index(None).unwrap();

        for &key in index.keys() {
            let quartet = index.decode(key);
            assert_eq!(index.key(&quartet), key);
            assert!(index.contains(key));
        }
        assert!(!index.contains(3));
    }

    #[test]
    fn index_is_deterministic_across_worker_counts() {
        let tree =
            Tree::from_newick("(((A,B),(C,(D,E))),((F,G),(H,(I,J))));").unwrap();
        let reference = tree.quartet_index(None).unwrap();
        assert_eq!(reference.len(), 210); // C(10, 4)

        for threads in [1, 2, 4] {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            let index = pool.install(|| tree.quartet_index(None)).unwrap();
            assert_eq!(index.keys(), reference.keys());
        }
    }

    #[test]
    fn cancellation_leaves_a_valid_index() {
        let tree = Tree::from_newick(FIVE_TIPS).unwrap();
        let cancel = AtomicBool::new(true);
        let index = tree.quartet_index(Some(&cancel)).unwrap();

        assert!(index.is_empty());
        assert!(!index.contains(2));
    }

    #[test]
    fn small_trees_have_no_quartets() {
        let tree = Tree::from_newick("(A,(B,C));").unwrap();
        let mut count = 0;
        tree.quartets(|_| count += 1).unwrap();

        assert_eq!(count, 0);
        assert_eq!(tree.quartet_count().unwrap(), 0);
        assert!(tree.quartet_index(None).unwrap().is_empty());
    }

    #[test]
    fn keys_follow_tip_content_not_node_ids() {
        // The same topology written in two different orders indexes the
        // same quartets once ranks are taken over the traversal order
        let tree = Tree::from_newick(FIVE_TIPS).unwrap();
        let index = tree.quartet_index(None).unwrap();
        let again = tree.quartet_index(None).unwrap();

        assert_eq!(index.keys(), again.keys());
        assert_eq!(index.len(), again.len());
    }
}
