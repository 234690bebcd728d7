//! Parse Nexus formatted documents.
//!
//! The parser is a recursive descent over the tokens of
//! [`Scanner`](super::scanner::Scanner): a loop over `BEGIN <name>; ...
//! END;` blocks with one sub-state-machine per supported block (TAXA,
//! TREES, DATA/CHARACTERS). Newick tree bodies collected from a TREES
//! block are handed to [`Tree::from_newick`]. Unsupported blocks,
//! commands and keys are skipped with a [`Diagnostic`] as long as they
//! keep a recognizable shape; anything else aborts the parse. Either a
//! fully validated [`Nexus`] document is returned, or an error: never a
//! partial document.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use thiserror::Error;

use super::scanner::{Scanner, Token, TokenKind};
use super::Diagnostic;
use crate::alignment::{Alignment, AlignmentError, Alphabet};
use crate::tree::{NewickParseError, Tree, TreeError};

/// Errors that can occur when parsing a Nexus document.
#[derive(Error, Debug)]
pub enum NexusError {
    /// The scanner produced an illegal token
    #[error("Found illegal token {0:?}")]
    Lexical(String),
    /// A token of the wrong kind at a grammar position
    #[error("Found {found:?}, expected {expected} in {context}")]
    Syntax {
        /// What the grammar expected at this position
        expected: &'static str,
        /// The literal text that was found instead
        found: String,
        /// The command or block the error occurred in
        context: String,
    },
    /// The input ended inside an open construct
    #[error("Reached the end of the file inside {0}")]
    UnexpectedEof(&'static str),
    /// The declared datatype does not resolve to a known alphabet
    #[error("Unknown datatype: {0:?}")]
    UnknownDatatype(String),
    /// The number of alignment rows contradicts the declared NTAX
    #[error("The alignment has {found} sequences, which does not correspond to NTAX={declared}")]
    TaxaCountMismatch {
        /// The declared taxa count
        declared: u64,
        /// The number of rows actually collected
        found: usize,
    },
    /// A row length contradicts the declared NCHAR
    #[error("Sequence {name:?} has {found} characters, which does not correspond to NCHAR={declared}")]
    SequenceLengthMismatch {
        /// Name of the offending row
        name: String,
        /// The declared character count
        declared: u64,
        /// The row length actually found
        found: usize,
    },
    /// A sequence or tip name is missing from the declared taxon labels
    #[error("Name {name:?} in {place} is not defined in the TAXLABELS block")]
    NameNotInTaxlabels {
        /// The undeclared name
        name: String,
        /// Where the name was found (the alignment or a tree)
        place: String,
    },
    /// Some declared taxon labels are unused
    #[error("Some labels of the TAXLABELS block are not present in {0}")]
    TaxlabelsCardinality(String),
    /// Non-default gap or missing characters are not supported
    #[error("Only '-' gaps and '*' missing characters are supported so far (found gap {gap:?} and missing {missing:?})")]
    UnsupportedFeature {
        /// The declared gap character
        gap: char,
        /// The declared missing character
        missing: char,
    },
    /// A collected tree body failed to parse as newick
    #[error(transparent)]
    Newick(#[from] NewickParseError),
    /// The alignment rejected a row
    #[error(transparent)]
    Alignment(#[from] AlignmentError),
    /// A tree query failed during validation
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// There was a [`std::io::Error`] opening the document
    #[error("Error reading the document")]
    Io(#[from] std::io::Error),
}

/// A parsed and validated Nexus document: an optional alignment, the
/// named trees in document order, the declared taxon labels (if any) and
/// the non-fatal diagnostics accumulated along the way.
#[derive(Debug, Clone)]
pub struct Nexus {
    alignment: Option<Alignment>,
    trees: Vec<(String, Tree)>,
    taxlabels: Option<HashSet<String>>,
    diagnostics: Vec<Diagnostic>,
}

impl Nexus {
    /// Parses a Nexus document from a byte source.
    pub fn from_reader(reader: impl Read) -> Result<Self, NexusError> {
        Parser::new(reader).parse()
    }

    /// Parses a Nexus document from a file.
    pub fn from_file(path: &Path) -> Result<Self, NexusError> {
        Self::from_reader(File::open(path)?)
    }

    /// Parses a Nexus document from a string.
    /// ```
    /// use quartetree::io::Nexus;
    ///
    /// let document = "#NEXUS
    /// BEGIN TAXA;
    /// TAXLABELS A B C;
    /// END;
    /// BEGIN TREES;
    /// TREE t1 = (A,(B,C));
    /// END;
    /// ";
    /// let nexus = Nexus::from_nexus_string(document).unwrap();
    ///
    /// assert_eq!(nexus.trees().len(), 1);
    /// assert_eq!(nexus.trees()[0].0, "t1");
    /// ```
    pub fn from_nexus_string(content: &str) -> Result<Self, NexusError> {
        Self::from_reader(Cursor::new(content.as_bytes().to_vec()))
    }

    /// The named trees of the document, in document order
    pub fn trees(&self) -> &[(String, Tree)] {
        &self.trees
    }

    /// Gets a tree of the document by name
    pub fn tree(&self, name: &str) -> Option<&Tree> {
        self.trees
            .iter()
            .find(|(tree_name, _)| tree_name == name)
            .map(|(_, tree)| tree)
    }

    /// Consumes the document and returns its trees
    pub fn into_trees(self) -> Vec<(String, Tree)> {
        self.trees
    }

    /// The alignment of the document, if it declared one
    pub fn alignment(&self) -> Option<&Alignment> {
        self.alignment.as_ref()
    }

    /// The declared taxon labels, if a TAXA block declared them
    pub fn taxlabels(&self) -> Option<&HashSet<String>> {
        self.taxlabels.as_ref()
    }

    /// The non-fatal diagnostics emitted while parsing
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

// Collected state of a DATA/CHARACTERS block, before validation.
struct DataBlock {
    names: Vec<String>,
    sequences: Vec<String>,
    ntax: Option<u64>,
    nchar: Option<u64>,
    datatype: String,
    missing: char,
    gap: char,
}

impl DataBlock {
    fn new() -> Self {
        Self {
            names: vec![],
            sequences: vec![],
            ntax: None,
            nchar: None,
            datatype: String::from("dna"),
            missing: '*',
            gap: '-',
        }
    }
}

/// A recursive-descent parser over the Nexus token stream.
pub struct Parser<R: Read> {
    scanner: Scanner<R>,
    diagnostics: Vec<Diagnostic>,
}

impl<R: Read> Parser<R> {
    /// Creates a parser over a byte source
    pub fn new(reader: R) -> Self {
        Self {
            scanner: Scanner::new(reader),
            diagnostics: Vec::new(),
        }
    }

    fn diagnose(&mut self, context: &str, message: String) {
        self.diagnostics.push(Diagnostic {
            context: context.to_string(),
            message,
        });
    }

    // Scans the next non-whitespace token and checks it against an
    // expected kind.
    fn expect(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
        context: &'static str,
    ) -> Result<Token, NexusError> {
        let token = self.scanner.scan_ignore_whitespace();
        match token.kind {
            k if k == kind => Ok(token),
            TokenKind::Illegal => Err(NexusError::Lexical(token.text)),
            TokenKind::Eof => Err(NexusError::UnexpectedEof(context)),
            _ => Err(NexusError::Syntax {
                expected,
                found: token.text,
                context: context.to_string(),
            }),
        }
    }

    /// Parses the whole document and validates its cross-references.
    pub fn parse(mut self) -> Result<Nexus, NexusError> {
        let header = self.scanner.scan_ignore_whitespace();
        match header.kind {
            TokenKind::Nexus => {}
            TokenKind::Illegal => return Err(NexusError::Lexical(header.text)),
            _ => {
                return Err(NexusError::Syntax {
                    expected: "#NEXUS",
                    found: header.text,
                    context: "document header".to_string(),
                })
            }
        }

        let mut taxlabels = None;
        let mut data = None;
        let mut tree_strings = vec![];

        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => break,
                TokenKind::EndOfLine => continue,
                TokenKind::Begin => {
                    let name = self.scanner.scan_ignore_whitespace();
                    self.expect(TokenKind::EndOfCommand, "';'", "BEGIN command")?;
                    match name.kind {
                        TokenKind::Taxa => taxlabels = Some(self.parse_taxa()?),
                        TokenKind::Trees => tree_strings.extend(self.parse_trees()?),
                        TokenKind::Data => data = Some(self.parse_data()?),
                        _ => {
                            self.diagnose(
                                "document",
                                format!("Unsupported block {:?}, skipping", name.text),
                            );
                            self.parse_unsupported_block()?;
                        }
                    }
                }
                // Stray tokens between blocks are ignored
                _ => continue,
            }
        }

        self.validate(taxlabels, data, tree_strings)
    }

    // Whole-document validation, run once after the block loop.
    fn validate(
        self,
        taxlabels: Option<HashSet<String>>,
        data: Option<DataBlock>,
        tree_strings: Vec<(String, String)>,
    ) -> Result<Nexus, NexusError> {
        let mut alignment = None;

        if let Some(data) = data {
            if data.gap != '-' || data.missing != '*' {
                return Err(NexusError::UnsupportedFeature {
                    gap: data.gap,
                    missing: data.missing,
                });
            }

            let alphabet = Alphabet::from_datatype(&data.datatype)
                .ok_or(NexusError::UnknownDatatype(data.datatype.clone()))?;

            if let Some(ntax) = data.ntax {
                if data.names.len() as u64 != ntax {
                    return Err(NexusError::TaxaCountMismatch {
                        declared: ntax,
                        found: data.names.len(),
                    });
                }
            }

            let mut al = Alignment::new(alphabet);
            for (name, sequence) in data.names.iter().zip(data.sequences.iter()) {
                if let Some(nchar) = data.nchar {
                    if sequence.chars().count() as u64 != nchar {
                        return Err(NexusError::SequenceLengthMismatch {
                            name: name.clone(),
                            declared: nchar,
                            found: sequence.chars().count(),
                        });
                    }
                }
                al.add_sequence(name, sequence, None)?;
            }

            if let Some(labels) = &taxlabels {
                let mut undeclared = None;
                al.iterate(|name, _| {
                    if undeclared.is_none() && !labels.contains(name) {
                        undeclared = Some(name.to_string());
                    }
                });
                if let Some(name) = undeclared {
                    return Err(NexusError::NameNotInTaxlabels {
                        name,
                        place: "the alignment".to_string(),
                    });
                }
                if al.sequence_count() != labels.len() {
                    return Err(NexusError::TaxlabelsCardinality(
                        "the alignment".to_string(),
                    ));
                }
            }

            alignment = Some(al);
        }

        let mut trees = vec![];
        for (name, body) in tree_strings {
            // The embedded grammar requires its own terminator
            let tree = Tree::from_newick(&format!("{body};"))?;

            if let Some(labels) = &taxlabels {
                let tips = tree.tip_names()?;
                for tip in tips.iter() {
                    if !labels.contains(tip) {
                        return Err(NexusError::NameNotInTaxlabels {
                            name: tip.clone(),
                            place: format!("tree {name:?}"),
                        });
                    }
                }
                if tips.len() != labels.len() {
                    return Err(NexusError::TaxlabelsCardinality(format!("tree {name:?}")));
                }
            }

            trees.push((name, tree));
        }

        Ok(Nexus {
            alignment,
            trees,
            taxlabels,
            diagnostics: self.diagnostics,
        })
    }

    // TAXA block: collect the TAXLABELS identifier list.
    fn parse_taxa(&mut self) -> Result<HashSet<String>, NexusError> {
        let mut labels = HashSet::new();

        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::EndOfLine => continue,
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a TAXA block")),
                TokenKind::End => {
                    self.expect(TokenKind::EndOfCommand, "';'", "END command")?;
                    return Ok(labels);
                }
                TokenKind::TaxLabels => loop {
                    let label = self.scanner.scan_ignore_whitespace();
                    match label.kind {
                        TokenKind::EndOfCommand => break,
                        TokenKind::Ident => {
                            labels.insert(label.text);
                        }
                        TokenKind::Illegal => return Err(NexusError::Lexical(label.text)),
                        TokenKind::Eof => {
                            return Err(NexusError::UnexpectedEof("a TAXLABELS command"))
                        }
                        _ => {
                            return Err(NexusError::Syntax {
                                expected: "a taxon label",
                                found: label.text,
                                context: "TAXLABELS command".to_string(),
                            })
                        }
                    }
                },
                _ => {
                    self.diagnose(
                        "TAXA",
                        format!("Unsupported command {:?} in block TAXA, skipping", token.text),
                    );
                    self.parse_unsupported_command()?;
                }
            }
        }
    }

    // TREES block: collect (name, newick body) pairs. Whitespace inside
    // the bodies is discarded; tree construction happens at validation.
    fn parse_trees(&mut self) -> Result<Vec<(String, String)>, NexusError> {
        let mut trees = vec![];

        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::EndOfLine => continue,
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a TREES block")),
                TokenKind::End => {
                    self.expect(TokenKind::EndOfCommand, "';'", "END command")?;
                    return Ok(trees);
                }
                TokenKind::Tree => {
                    let name = self.expect(TokenKind::Ident, "a tree name", "TREE command")?;
                    self.expect(TokenKind::Equal, "'='", "TREE command")?;

                    let mut body = String::new();
                    loop {
                        let part = self.scanner.scan_ignore_whitespace();
                        match part.kind {
                            TokenKind::EndOfCommand => break,
                            TokenKind::Ident
                            | TokenKind::Number
                            | TokenKind::OpenParen
                            | TokenKind::CloseParen
                            | TokenKind::Comma
                            | TokenKind::Colon => body.push_str(&part.text),
                            TokenKind::Illegal => return Err(NexusError::Lexical(part.text)),
                            TokenKind::Eof => {
                                return Err(NexusError::UnexpectedEof("a TREE command"))
                            }
                            _ => {
                                return Err(NexusError::Syntax {
                                    expected: "a newick tree body",
                                    found: part.text,
                                    context: "TREE command".to_string(),
                                })
                            }
                        }
                    }

                    trees.push((name.text, body));
                }
                _ => {
                    self.diagnose(
                        "TREES",
                        format!(
                            "Unsupported command {:?} in block TREES, skipping",
                            token.text
                        ),
                    );
                    self.parse_unsupported_command()?;
                }
            }
        }
    }

    // DATA/CHARACTERS block: DIMENSIONS, FORMAT and MATRIX commands.
    fn parse_data(&mut self) -> Result<DataBlock, NexusError> {
        let mut data = DataBlock::new();

        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::EndOfLine => continue,
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a DATA block")),
                TokenKind::End => {
                    self.expect(TokenKind::EndOfCommand, "';'", "END command")?;
                    return Ok(data);
                }
                TokenKind::Dimensions => self.parse_dimensions(&mut data)?,
                TokenKind::Format => self.parse_format(&mut data)?,
                TokenKind::Matrix => self.parse_matrix(&mut data)?,
                kind if kind.is_word() => {
                    self.diagnose(
                        "DATA",
                        format!("Unsupported command {:?} in block DATA, skipping", token.text),
                    );
                    self.parse_unsupported_command()?;
                }
                _ => {
                    return Err(NexusError::Syntax {
                        expected: "a command",
                        found: token.text,
                        context: "DATA block".to_string(),
                    })
                }
            }
        }
    }

    // DIMENSIONS command: NTAX=<int> and NCHAR=<int> keys.
    fn parse_dimensions(&mut self, data: &mut DataBlock) -> Result<(), NexusError> {
        loop {
            let key = self.scanner.scan_ignore_whitespace();
            match key.kind {
                TokenKind::EndOfCommand => return Ok(()),
                TokenKind::NTax => data.ntax = Some(self.parse_integer_value("NTAX")?),
                TokenKind::NChar => data.nchar = Some(self.parse_integer_value("NCHAR")?),
                TokenKind::Illegal => return Err(NexusError::Lexical(key.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a DIMENSIONS command")),
                kind if kind.is_word() => {
                    self.diagnose(
                        "DATA",
                        format!(
                            "Unsupported key {:?} in DIMENSIONS command, skipping",
                            key.text
                        ),
                    );
                    self.parse_unsupported_key()?;
                }
                _ => {
                    return Err(NexusError::Syntax {
                        expected: "a key",
                        found: key.text,
                        context: "DIMENSIONS command".to_string(),
                    })
                }
            }
        }
    }

    fn parse_integer_value(&mut self, key: &'static str) -> Result<u64, NexusError> {
        self.expect(TokenKind::Equal, "'='", key)?;
        let value = self.expect(TokenKind::Number, "an integer value", key)?;
        value.text.parse().map_err(|_| NexusError::Syntax {
            expected: "an integer value",
            found: value.text,
            context: key.to_string(),
        })
    }

    // FORMAT command: DATATYPE, MISSING and GAP keys.
    fn parse_format(&mut self, data: &mut DataBlock) -> Result<(), NexusError> {
        loop {
            let key = self.scanner.scan_ignore_whitespace();
            match key.kind {
                TokenKind::EndOfCommand => return Ok(()),
                TokenKind::Datatype => {
                    self.expect(TokenKind::Equal, "'='", "DATATYPE key")?;
                    let value =
                        self.expect(TokenKind::Ident, "an identifier", "DATATYPE key")?;
                    data.datatype = value.text;
                }
                TokenKind::Missing => data.missing = self.parse_character_value("MISSING")?,
                TokenKind::Gap => data.gap = self.parse_character_value("GAP")?,
                TokenKind::Illegal => return Err(NexusError::Lexical(key.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a FORMAT command")),
                kind if kind.is_word() => {
                    self.diagnose(
                        "DATA",
                        format!("Unsupported key {:?} in FORMAT command, skipping", key.text),
                    );
                    self.parse_unsupported_key()?;
                }
                _ => {
                    return Err(NexusError::Syntax {
                        expected: "a key",
                        found: key.text,
                        context: "FORMAT command".to_string(),
                    })
                }
            }
        }
    }

    fn parse_character_value(&mut self, key: &'static str) -> Result<char, NexusError> {
        self.expect(TokenKind::Equal, "'='", key)?;
        let value = self.expect(TokenKind::Ident, "a single character", key)?;
        let mut chars = value.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(NexusError::Syntax {
                expected: "a single character",
                found: value.text,
                context: key.to_string(),
            }),
        }
    }

    // MATRIX command: one row per line, a name followed by sequence
    // chunks, until a lone `;`. Interleaved matrices are out of scope.
    fn parse_matrix(&mut self, data: &mut DataBlock) -> Result<(), NexusError> {
        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::EndOfLine => continue,
                TokenKind::EndOfCommand => return Ok(()),
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a MATRIX command")),
                TokenKind::Ident => {
                    // Whitespace inside the sequence is discarded
                    let mut sequence = String::new();
                    loop {
                        let chunk = self.scanner.scan_ignore_whitespace();
                        match chunk.kind {
                            TokenKind::Ident => sequence.push_str(&chunk.text),
                            TokenKind::EndOfLine => break,
                            TokenKind::Illegal => return Err(NexusError::Lexical(chunk.text)),
                            TokenKind::Eof => {
                                return Err(NexusError::UnexpectedEof("a MATRIX command"))
                            }
                            _ => {
                                return Err(NexusError::Syntax {
                                    expected: "sequence characters",
                                    found: chunk.text,
                                    context: format!("MATRIX row {:?}", token.text),
                                })
                            }
                        }
                    }
                    data.names.push(token.text);
                    data.sequences.push(sequence);
                }
                _ => {
                    return Err(NexusError::Syntax {
                        expected: "a sequence identifier",
                        found: token.text,
                        context: "MATRIX command".to_string(),
                    })
                }
            }
        }
    }

    // Skips a command that still looks like a bare terminated command.
    fn parse_unsupported_command(&mut self) -> Result<(), NexusError> {
        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a command")),
                TokenKind::EndOfCommand => return Ok(()),
                _ => continue,
            }
        }
    }

    // Skips a key that still looks like KEY=value.
    fn parse_unsupported_key(&mut self) -> Result<(), NexusError> {
        self.expect(TokenKind::Equal, "'='", "key/value pair")?;
        let value = self.scanner.scan_ignore_whitespace();
        match value.kind {
            kind if kind.is_word() => Ok(()),
            TokenKind::Illegal => Err(NexusError::Lexical(value.text)),
            TokenKind::Eof => Err(NexusError::UnexpectedEof("a key/value pair")),
            _ => Err(NexusError::Syntax {
                expected: "a value",
                found: value.text,
                context: "key/value pair".to_string(),
            }),
        }
    }

    // Skips an entire unsupported block up to its END; terminator.
    fn parse_unsupported_block(&mut self) -> Result<(), NexusError> {
        loop {
            let token = self.scanner.scan_ignore_whitespace();
            match token.kind {
                TokenKind::Illegal => return Err(NexusError::Lexical(token.text)),
                TokenKind::Eof => return Err(NexusError::UnexpectedEof("a block")),
                TokenKind::End => {
                    self.expect(TokenKind::EndOfCommand, "';'", "END command")?;
                    return Ok(());
                }
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAXA_AND_TREE: &str = "#NEXUS
BEGIN TAXA;
TAXLABELS A B C;
END;
BEGIN TREES;
TREE t1 = (A,(B,C));
END;
";

    #[test]
    fn taxa_and_tree() {
        let nexus = Nexus::from_nexus_string(TAXA_AND_TREE).unwrap();

        assert_eq!(nexus.trees().len(), 1);
        assert_eq!(nexus.trees()[0].0, "t1");

        let tree = nexus.tree("t1").unwrap();
        assert_eq!(tree.tip_names().unwrap(), vec!["A", "B", "C"]);
        assert_eq!(tree.to_newick().unwrap(), "(A,(B,C));");

        assert_eq!(nexus.taxlabels().unwrap().len(), 3);
        assert!(nexus.diagnostics().is_empty());
        assert!(nexus.alignment().is_none());
    }

    #[test]
    fn tip_missing_from_taxlabels() {
        let document = TAXA_AND_TREE.replace("TAXLABELS A B C;", "TAXLABELS A B D;");
        let err = Nexus::from_nexus_string(&document).unwrap_err();
        assert!(matches!(
            err,
            NexusError::NameNotInTaxlabels { name, .. } if name == "C"
        ));
    }

    #[test]
    fn unused_taxlabels_are_an_error() {
        let document = TAXA_AND_TREE.replace("TAXLABELS A B C;", "TAXLABELS A B C D;");
        let err = Nexus::from_nexus_string(&document).unwrap_err();
        assert!(matches!(err, NexusError::TaxlabelsCardinality(_)));
    }

    #[test]
    fn no_taxlabels_no_cross_validation() {
        let document = "#NEXUS
BEGIN TREES;
TREE t1 = (A,(B,C));
END;
";
        let nexus = Nexus::from_nexus_string(document).unwrap();
        assert_eq!(nexus.trees().len(), 1);
        assert!(nexus.taxlabels().is_none());
    }

    #[test]
    fn missing_header() {
        let err = Nexus::from_nexus_string("BEGIN TAXA;\nEND;\n").unwrap_err();
        assert!(matches!(
            err,
            NexusError::Syntax { expected: "#NEXUS", .. }
        ));
    }

    fn data_document(dimensions: &str, rows: &str) -> String {
        format!(
            "#NEXUS
BEGIN DATA;
DIMENSIONS {dimensions};
FORMAT DATATYPE=DNA;
MATRIX
{rows}
;
END;
"
        )
    }

    #[test]
    fn alignment_parses() {
        let document = data_document("NTAX=2 NCHAR=4", "seq1 ACGT\nseq2 AC-T");
        let nexus = Nexus::from_nexus_string(&document).unwrap();

        let alignment = nexus.alignment().unwrap();
        assert_eq!(alignment.sequence_count(), 2);
        assert_eq!(alignment.get("seq1").unwrap().sequence, "ACGT");
    }

    #[test]
    fn row_length_mismatch() {
        let document = data_document("NTAX=2 NCHAR=4", "seq1 ACGT\nseq2 AC");
        let err = Nexus::from_nexus_string(&document).unwrap_err();
        assert!(matches!(
            err,
            NexusError::SequenceLengthMismatch { name, declared: 4, found: 2 } if name == "seq2"
        ));
    }

    #[test]
    fn taxa_count_mismatch() {
        for dimensions in ["NTAX=3 NCHAR=4", "NTAX=1 NCHAR=4"] {
            let document = data_document(dimensions, "seq1 ACGT\nseq2 ACGT");
            let err = Nexus::from_nexus_string(&document).unwrap_err();
            assert!(matches!(err, NexusError::TaxaCountMismatch { .. }));
        }

        // No declared NTAX, no count check
        let document = data_document("NCHAR=4", "seq1 ACGT\nseq2 ACGT");
        assert!(Nexus::from_nexus_string(&document).is_ok());
    }

    #[test]
    fn unknown_datatype_is_fatal() {
        let document = data_document("NTAX=1 NCHAR=4", "seq1 ACGT")
            .replace("DATATYPE=DNA", "DATATYPE=morphology");
        let err = Nexus::from_nexus_string(&document).unwrap_err();
        assert!(matches!(err, NexusError::UnknownDatatype(d) if d == "morphology"));
    }

    #[test]
    fn non_default_gap_and_missing_are_unsupported() {
        let document = data_document("NTAX=1 NCHAR=4", "seq1 ACGT")
            .replace("DATATYPE=DNA", "DATATYPE=DNA GAP=.");
        let err = Nexus::from_nexus_string(&document).unwrap_err();
        assert!(matches!(
            err,
            NexusError::UnsupportedFeature { gap: '.', missing: '*' }
        ));

        let document = data_document("NTAX=1 NCHAR=4", "seq1 ACGT")
            .replace("DATATYPE=DNA", "DATATYPE=DNA MISSING=?");
        let err = Nexus::from_nexus_string(&document).unwrap_err();
        assert!(matches!(
            err,
            NexusError::UnsupportedFeature { gap: '-', missing: '?' }
        ));
    }

    #[test]
    fn alignment_validated_against_taxlabels() {
        let document = "#NEXUS
BEGIN TAXA;
TAXLABELS seq1 seq2;
END;
BEGIN DATA;
DIMENSIONS NTAX=2 NCHAR=4;
FORMAT DATATYPE=DNA;
MATRIX
seq1 ACGT
seq2 ACGT
;
END;
";
        let nexus = Nexus::from_nexus_string(document).unwrap();
        assert!(nexus.alignment().is_some());

        let mismatch = document.replace("TAXLABELS seq1 seq2;", "TAXLABELS seq1 other;");
        let err = Nexus::from_nexus_string(&mismatch).unwrap_err();
        assert!(matches!(
            err,
            NexusError::NameNotInTaxlabels { name, .. } if name == "seq2"
        ));
    }

    #[test]
    fn unsupported_block_is_skipped_with_diagnostic() {
        let document = "#NEXUS
BEGIN FIGTREE;
set appearance.branchLineWidth=1.0;
END;
BEGIN TREES;
TREE t1 = (A,B);
END;
";
        let nexus = Nexus::from_nexus_string(document).unwrap();
        assert_eq!(nexus.trees().len(), 1);
        assert_eq!(nexus.diagnostics().len(), 1);
        assert!(nexus.diagnostics()[0].message.contains("FIGTREE"));
    }

    #[test]
    fn unsupported_command_and_key_are_skipped() {
        let document = "#NEXUS
BEGIN TAXA;
DIMENSIONS NTAX=2;
TAXLABELS A B;
END;
BEGIN DATA;
DIMENSIONS NTAX=1 NCHAR=2 NSTATES=4;
FORMAT DATATYPE=DNA INTERLEAVE=no;
MATRIX
A AC
;
END;
";
        let nexus = Nexus::from_nexus_string(document).unwrap();
        assert_eq!(nexus.diagnostics().len(), 3);
        assert_eq!(nexus.alignment().unwrap().sequence_count(), 1);
    }

    #[test]
    fn eof_inside_block() {
        let err = Nexus::from_nexus_string("#NEXUS\nBEGIN TREES;\nTREE t1 = (A,B);\n").unwrap_err();
        assert!(matches!(err, NexusError::UnexpectedEof("a TREES block")));
    }

    #[test]
    fn malformed_tree_command() {
        let err =
            Nexus::from_nexus_string("#NEXUS\nBEGIN TREES;\nTREE t1 (A,B);\nEND;\n").unwrap_err();
        assert!(matches!(err, NexusError::Syntax { expected: "'='", .. }));
    }

    #[test]
    fn tree_bodies_survive_whitespace_and_lengths() {
        let document = "#NEXUS
BEGIN TREES;
TREE t1 = (A:0.1, (B:0.2, C:0.3)0.99:0.4);
END;
";
        let nexus = Nexus::from_nexus_string(document).unwrap();
        let tree = nexus.tree("t1").unwrap();
        assert_eq!(
            tree.to_newick().unwrap(),
            "(A:0.10000,(B:0.20000,C:0.30000)0.99000:0.40000);"
        );
    }
}
