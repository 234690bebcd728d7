//! `quartetree` parses phylogenetic trees from Newick and Nexus files,
//! holds them in an index-based graph, and runs combinatorial analyses
//! over them: all-pairs patristic distance matrices and
//! enumeration/indexing of the 4-tip quartets a tree induces.
//!
//! The main entry points are:
//!  - [`tree::Tree::from_newick`] and [`io::Nexus::from_reader`] to
//!    parse trees,
//!  - [`tree::Tree::distance_matrix`] for patristic distances,
//!  - [`tree::Tree::quartets`] and [`tree::Tree::quartet_index`] for
//!    quartet enumeration and indexing.

use std::collections::VecDeque;

use rand::prelude::*;

use distr::Distr;
use tree::{Node, Tree, TreeError};

pub mod alignment;
pub mod distance;
pub mod distr;
pub mod io;
pub mod quartets;
pub mod tree;

/// Generates a random binary tree of a given size, splitting a random
/// pending tip at every step. Branch lengths are drawn from the chosen
/// distribution.
pub fn generate_tree(
    n_tips: usize,
    brlens: bool,
    sampler_type: Distr,
) -> Result<Tree, TreeError> {
    let mut tree = Tree::new();
    let mut rng = thread_rng();
    let sampler = sampler_type.sampler::<f64>();

    let mut pending = VecDeque::new();
    pending.push_back(tree.add(Node::new()));

    for _ in 0..(n_tips.saturating_sub(1)) {
        let parent = if rng.gen_bool(0.5) {
            pending.pop_front()
        } else {
            pending.pop_back()
        }
        .unwrap();

        for _ in 0..2 {
            let length = brlens.then(|| sampler.sample(&mut rng));
            pending.push_back(tree.add_child(Node::new(), parent, length)?);
        }
    }

    for (i, id) in pending.iter().enumerate() {
        tree.get_mut(id)?.set_name(format!("Tip_{i}"));
    }

    Ok(tree)
}

/// Generates a caterpillar tree by repeatedly adding a tip and a new
/// internal node to the last internal node added. Branch lengths are
/// drawn from the chosen distribution.
pub fn generate_caterpillar(
    n_tips: usize,
    brlens: bool,
    sampler_type: Distr,
) -> Result<Tree, TreeError> {
    let mut tree = Tree::new();
    let mut rng = thread_rng();
    let sampler = sampler_type.sampler::<f64>();

    let mut draw = |rng: &mut ThreadRng| brlens.then(|| sampler.sample(rng));

    let mut parent = tree.add(Node::new());
    for i in 1..n_tips {
        let length = draw(&mut rng);
        if i == n_tips - 1 {
            // The last two tips share the innermost node
            tree.add_child(Node::new_named(&format!("Tip_{i}")), parent, length)?;
            let length = draw(&mut rng);
            tree.add_child(Node::new_named(&format!("Tip_{}", i + 1)), parent, length)?;
        } else {
            tree.add_child(Node::new_named(&format!("Tip_{i}")), parent, length)?;
            let length = draw(&mut rng);
            parent = tree.add_child(Node::new(), parent, length)?;
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_trees_have_the_requested_tips() {
        for n in [4, 10, 33] {
            let tree = generate_tree(n, true, Distr::Uniform).unwrap();
            assert_eq!(tree.n_tips().unwrap(), n);

            let caterpillar = generate_caterpillar(n, false, Distr::Uniform).unwrap();
            assert_eq!(caterpillar.n_tips().unwrap(), n);
        }
    }

    #[test]
    fn generated_trees_round_trip() {
        let tree = generate_tree(12, true, Distr::Exponential).unwrap();
        let newick = tree.to_newick().unwrap();
        let reparsed = Tree::from_newick(&newick).unwrap();

        assert_eq!(reparsed.to_newick().unwrap(), newick);
        assert_eq!(reparsed.n_tips().unwrap(), 12);
    }
}
