#![warn(missing_docs)]
//! The `quartetree` binary is a command line tool using the `quartetree`
//! crate to execute common operations on phylogenetic trees directly in
//! the terminal: distance matrices, quartet counting and indexing,
//! renaming, random generation and Nexus conversion.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{BufWriter, Cursor, Read, Write},
    path::{Path, PathBuf},
};

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use indicatif::ProgressBar;
use quartetree::{
    generate_caterpillar, generate_tree,
    io::{read_newick_trees, Nexus},
    quartets::Topology,
    tree::Tree,
};

/// contains the struct representing the command line arguments
/// parsed by [`clap`] and used to execute this binary
pub mod cli;

fn read_input(path: &Path) -> String {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .expect("Could not read stdin");
        content
    } else {
        fs::read_to_string(path).expect("Could not read the input file")
    }
}

/// Reads the input trees, auto-detecting the format: a leading `#`
/// selects the Nexus parser, anything else is treated as
/// newline-separated newick. Nexus diagnostics go to stderr.
fn load_trees(path: &Path) -> Vec<(String, Tree)> {
    let content = read_input(path);

    if content.trim_start().starts_with('#') {
        let nexus = Nexus::from_nexus_string(&content).unwrap();
        for diagnostic in nexus.diagnostics() {
            eprintln!("{diagnostic}");
        }
        nexus.into_trees()
    } else {
        read_newick_trees(Cursor::new(content.into_bytes()))
            .into_iter()
            .enumerate()
            .map(|(i, tree)| (format!("tree_{}", i + 1), tree.unwrap()))
            .collect()
    }
}

fn open_output(output: Option<PathBuf>) -> BufWriter<Box<dyn Write>> {
    BufWriter::new(match output {
        Some(path) => Box::new(File::create(&path).unwrap()) as Box<dyn Write>,
        None => Box::new(std::io::stdout()) as Box<dyn Write>,
    })
}

fn read_map_file(path: &Path, revert: bool) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for (i, line) in read_input(path).lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(2, '\t');
        let (Some(old), Some(new)) = (fields.next(), fields.next()) else {
            panic!("Map file line {} is not tab separated: {line:?}", i + 1)
        };
        if revert {
            mapping.insert(new.trim().to_string(), old.trim().to_string());
        } else {
            mapping.insert(old.trim().to_string(), new.trim().to_string());
        }
    }

    mapping
}

fn write_name_map(mapping: &HashMap<String, String>, path: &Path) {
    let mut writer = open_output(Some(path.to_path_buf()));
    for (old, new) in mapping.iter() {
        writeln!(writer, "{old}\t{new}").unwrap();
    }
}

fn main() {
    match cli::Args::parse().command {
        cli::Commands::Matrix {
            input,
            square,
            output,
        } => {
            let mut writer = open_output(output);
            for (_, tree) in load_trees(&input) {
                let matrix = tree.distance_matrix().unwrap();
                writer
                    .write_all(matrix.to_phylip(square).unwrap().as_bytes())
                    .unwrap();
            }
        }
        cli::Commands::Quartets {
            input,
            index,
            threads,
        } => {
            if threads > 1 {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build_global()
                    .unwrap();
            }

            for (name, tree) in load_trees(&input) {
                let total = tree.quartet_count().unwrap();
                println!("{name}: {} tips, {total} quartets", tree.n_tips().unwrap());

                if index {
                    let quartet_index = tree.quartet_index(None).unwrap();
                    println!("Index length: {}", quartet_index.len());
                } else {
                    let progress = ProgressBar::new(total);
                    let mut resolved = 0u64;
                    let mut unresolved = 0u64;
                    let mut seen = 0u64;
                    tree.quartets(|quartet| {
                        match quartet.topology {
                            Topology::Unresolved => unresolved += 1,
                            _ => resolved += 1,
                        }
                        seen += 1;
                        if seen % (1 << 20) == 0 {
                            progress.set_position(seen);
                        }
                    })
                    .unwrap();
                    progress.finish_and_clear();
                    println!("{resolved} resolved, {unresolved} unresolved");
                }
            }
        }
        cli::Commands::Rename {
            input,
            map,
            revert,
            internal,
            auto,
            length,
            output,
        } => {
            let mut mapping = if auto {
                HashMap::new()
            } else {
                read_map_file(&map, revert)
            };
            let length = length.max(5);

            let mut writer = open_output(output);
            let mut current_id = 1usize;

            for (_, mut tree) in load_trees(&input) {
                let mut tree_mapping = HashMap::new();
                for node in tree.nodes() {
                    let is_tip = node.is_tip();
                    if !is_tip && !internal {
                        continue;
                    }
                    let Some(name) = node.name.clone() else {
                        continue;
                    };

                    if auto {
                        if !mapping.contains_key(&name) {
                            let prefix = if is_tip { 'T' } else { 'N' };
                            let generated = format!("{prefix}{current_id:0>width$}", width = length - 1);
                            assert!(
                                generated.len() == length,
                                "Id length {length} does not allow to generate that many ids: {current_id}"
                            );
                            mapping.insert(name.clone(), generated);
                            current_id += 1;
                        }
                        tree_mapping.insert(name.clone(), mapping[&name].clone());
                    } else if let Some(new_name) = mapping.get(&name) {
                        tree_mapping.insert(name, new_name.clone());
                    }
                }

                tree.rename(&tree_mapping);
                writeln!(writer, "{}", tree.to_newick().unwrap()).unwrap();
            }

            if auto {
                write_name_map(&mapping, &map);
            }
        }
        cli::Commands::Generate {
            tips,
            branch_lengths,
            caterpillar,
            distribution,
            trees,
            output,
        } => {
            let generate = |tips, brlens, distr| {
                if caterpillar {
                    generate_caterpillar(tips, brlens, distr)
                } else {
                    generate_tree(tips, brlens, distr)
                }
            };

            if let Some(n_trees) = trees {
                let output = output
                    .expect("If you are generating multiple trees you must specify an output directory");
                fs::create_dir_all(&output).unwrap();

                for i in 1..=n_trees {
                    let path = output.join(format!("{i}_{tips}_tips.nwk"));
                    let random = generate(tips, branch_lengths, distribution).unwrap();
                    random.to_file(&path).unwrap()
                }
            } else {
                let random = generate(tips, branch_lengths, distribution).unwrap();
                if let Some(path) = output {
                    random.to_file(&path).unwrap()
                } else {
                    println!("{}", random.to_newick().unwrap())
                }
            }
        }
        cli::Commands::Stats { trees } => {
            println!("file\ttree\tnodes\ttips\theight\trooted");
            for path in trees {
                for (name, tree) in load_trees(&path) {
                    println!(
                        "{}\t{}\t{}\t{}\t{:.5}\t{}",
                        path.display(),
                        name,
                        tree.size(),
                        tree.n_tips().unwrap(),
                        tree.height().unwrap(),
                        tree.is_rooted().unwrap(),
                    )
                }
            }
        }
        cli::Commands::Convert { input, output } => {
            let nexus = Nexus::from_nexus_string(&read_input(&input)).unwrap();
            for diagnostic in nexus.diagnostics() {
                eprintln!("{diagnostic}");
            }
            if let Some(alignment) = nexus.alignment() {
                eprintln!(
                    "Dropping the {} alignment ({} sequences)",
                    alignment.alphabet(),
                    alignment.sequence_count()
                );
            }

            let mut writer = open_output(output);
            for (_, tree) in nexus.trees() {
                writeln!(writer, "{}", tree.to_newick().unwrap()).unwrap();
            }
        }
        cli::Commands::Completion { shell } => {
            let mut cmd = cli::Args::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
        }
    }
}
