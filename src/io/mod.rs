//! Read trees and alignments from text formats.
//!
//! The [`scanner`] module tokenizes Nexus documents and the [`nexus`]
//! module parses them. Newick parsing itself lives on
//! [`Tree::from_newick`](crate::tree::Tree::from_newick); this module
//! adds the streaming helpers used at the boundary when several trees
//! come from one source.

use std::fmt::Display;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread;

use crate::tree::{NewickParseError, Tree};

pub mod nexus;
pub mod scanner;

pub use nexus::{Nexus, NexusError};

/// A non-fatal diagnostic emitted while parsing a document, such as an
/// unsupported block or command that was skipped.
///
/// Diagnostics never interrupt a parse; they accumulate on the returned
/// [`Nexus`] document where callers can inspect or ignore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The block or construct the diagnostic was emitted from
    pub context: String,
    /// Human readable description of what was skipped
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.context, self.message)
    }
}

/// Reads newline-separated newick trees from `reader` on a producer
/// thread and publishes each parsed tree (or parse error) on a bounded
/// channel, in input order.
///
/// Parse errors are terminal for their own tree only: the producer keeps
/// reading further lines, so halting on the first error is the
/// consumer's choice. The channel closes when the input is exhausted or
/// the consumer hangs up.
/// ```
/// use std::io::Cursor;
/// use quartetree::io::read_newick_trees;
///
/// let input = "(A,B);\n(C,(D,E));\n";
/// let trees: Vec<_> = read_newick_trees(Cursor::new(input.as_bytes().to_vec()))
///     .into_iter()
///     .collect();
///
/// assert_eq!(trees.len(), 2);
/// assert!(trees.iter().all(|t| t.is_ok()));
/// ```
pub fn read_newick_trees<R>(reader: R) -> Receiver<Result<Tree, NewickParseError>>
where
    R: Read + Send + 'static,
{
    let (sender, receiver) = sync_channel(15);

    thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            let result = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => Tree::from_newick(&line),
                Err(e) => Err(e.into()),
            };
            if sender.send(result).is_err() {
                // Consumer hung up
                return;
            }
        }
    });

    receiver
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn cursor(content: &str) -> Cursor<Vec<u8>> {
        Cursor::new(content.as_bytes().to_vec())
    }

    #[test]
    fn trees_arrive_in_order() {
        let input = "(A,B);\n\n(C,(D,E));\n(F,G);\n";
        let trees: Vec<_> = read_newick_trees(cursor(input)).into_iter().collect();

        assert_eq!(trees.len(), 3);
        let first = trees[0].as_ref().unwrap();
        assert_eq!(first.to_newick().unwrap(), "(A,B);");
        let last = trees[2].as_ref().unwrap();
        assert_eq!(last.to_newick().unwrap(), "(F,G);");
    }

    #[test]
    fn errors_are_terminal_for_one_tree_only() {
        let input = "(A,B);\n(C,(D,E;\n(F,G);\n";
        let results: Vec<_> = read_newick_trees(cursor(input)).into_iter().collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }
}
