use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use quartetree::distr::Distr;

/// A command line tool to parse phylogenetic trees, compute their
/// distance matrices and index their quartets
#[derive(Parser, Debug)]
pub struct Args {
    #[command(subcommand)]
    /// The command to execute
    pub command: Commands,
}

/// The available commands in the `quartetree` tool
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the distance matrix of each input tree
    Matrix {
        /// Input newick or nexus file ('-' for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output a square matrix instead of a triangular one
        #[arg(short, long)]
        square: bool,

        /// File to save the matrix to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count the quartets of the input trees, and optionally index them
    Quartets {
        /// Input newick or nexus file ('-' for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Build the quartet index and print its length
        #[arg(long)]
        index: bool,

        /// Number of worker threads used to build the index
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
    },

    /// Rename the tips of the input trees according to a map file
    ///
    /// The map file must be tab separated with two columns: the current
    /// name of a tip and its desired new name. Tips absent from the map
    /// file keep their name. With --auto, identifiers are generated
    /// instead and the correspondence is written to the map file.
    #[clap(verbatim_doc_comment)]
    Rename {
        /// Input newick or nexus file ('-' for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Tab separated name map file
        #[arg(short, long)]
        map: PathBuf,

        /// Revert the orientation of the map file
        #[arg(short, long)]
        revert: bool,

        /// Rename internal nodes too
        #[arg(long)]
        internal: bool,

        /// Rename with automatically generated identifiers, writing the
        /// correspondence to the map file
        #[arg(short, long)]
        auto: bool,

        /// Length of automatically generated identifiers (min 5)
        #[arg(short, long, default_value_t = 10)]
        length: usize,

        /// File to save the renamed trees to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate random tree(s)
    Generate {
        /// Number of tips in the generated tree
        #[arg(short, long, default_value_t = 20)]
        tips: usize,

        /// Generate branch lengths
        #[arg(short, long)]
        branch_lengths: bool,

        /// Generate a caterpillar tree instead of a random binary one
        #[arg(short, long)]
        caterpillar: bool,

        /// Distribution of branch lengths
        #[arg(value_enum, short, long, default_value_t = Distr::Uniform)]
        distribution: Distr,

        /// Number of trees to generate
        #[arg(short = 'n', long)]
        trees: Option<usize>,

        /// Output file (directory if generating multiple trees)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print statistics about the input trees
    Stats {
        /// Input newick or nexus files
        trees: Vec<PathBuf>,
    },

    /// Parse a Nexus document and print its trees as newick
    Convert {
        /// Input nexus file ('-' for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// File to save the newick trees to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completions
    Completion {
        /// The shell to generate completions for
        shell: Shell,
    },
}
