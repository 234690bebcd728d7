//! Multiple sequence alignments and their alphabets.
//!
//! The Nexus parser hands finished alignment rows to this module; the
//! alignment validates every character against its declared alphabet
//! and keeps the rows in insertion order.

use std::fmt::Display;

use thiserror::Error;

/// Errors that can occur when filling an [`Alignment`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlignmentError {
    /// A sequence contains a character outside of the declared alphabet
    #[error("Character {character:?} in sequence {name:?} is not part of the {alphabet} alphabet")]
    InvalidCharacter {
        /// Name of the offending sequence
        name: String,
        /// The rejected character
        character: char,
        /// The alphabet that rejected it
        alphabet: Alphabet,
    },
    /// Two sequences share the same name
    #[error("Duplicate sequence name {0:?}")]
    DuplicateName(String),
}

/// The character alphabet of an alignment.
///
/// Sequences accept the IUPAC codes of their alphabet plus the `-` gap
/// and `*` missing characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// Nucleotides (DNA)
    Dna,
    /// Nucleotides (RNA)
    Rna,
    /// Amino acids
    Protein,
}

impl Alphabet {
    /// Resolve a Nexus `DATATYPE` string into an alphabet. Returns
    /// `None` for datatypes this crate does not know about.
    pub fn from_datatype(datatype: &str) -> Option<Self> {
        match datatype.to_ascii_lowercase().as_str() {
            "dna" | "nucleotide" => Some(Self::Dna),
            "rna" => Some(Self::Rna),
            "protein" | "aa" => Some(Self::Protein),
            _ => None,
        }
    }

    /// Whether `c` belongs to the alphabet (IUPAC codes, gap and
    /// missing characters included)
    pub fn contains(&self, c: char) -> bool {
        let c = c.to_ascii_uppercase();
        match self {
            Self::Dna => "ACGTRYSWKMBDHVN-*".contains(c),
            Self::Rna => "ACGURYSWKMBDHVN-*".contains(c),
            Self::Protein => "ACDEFGHIKLMNPQRSTVWYBZJXUO-*".contains(c),
        }
    }
}

impl Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dna => write!(f, "dna"),
            Self::Rna => write!(f, "rna"),
            Self::Protein => write!(f, "protein"),
        }
    }
}

/// A named sequence of an [`Alignment`]
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Name of the sequence
    pub name: String,
    /// The sequence characters
    pub sequence: String,
    /// Free-text annotation carried along with the sequence
    pub annotation: Option<String>,
}

/// A multiple sequence alignment: named rows over a shared alphabet.
#[derive(Debug, Clone)]
pub struct Alignment {
    alphabet: Alphabet,
    sequences: Vec<Sequence>,
}

impl Alignment {
    /// Creates an empty alignment over the given alphabet
    pub fn new(alphabet: Alphabet) -> Self {
        Self {
            alphabet,
            sequences: vec![],
        }
    }

    /// The alphabet of the alignment
    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    /// Adds a row to the alignment. Fails if the alphabet rejects one of
    /// the characters or if the name is already taken.
    /// ```
    /// use quartetree::alignment::{Alignment, Alphabet};
    ///
    /// let mut alignment = Alignment::new(Alphabet::Dna);
    /// alignment.add_sequence("seq1", "ACGT-", None).unwrap();
    /// assert!(alignment.add_sequence("seq2", "AFFE!", None).is_err());
    /// assert_eq!(alignment.sequence_count(), 1);
    /// ```
    pub fn add_sequence(
        &mut self,
        name: &str,
        sequence: &str,
        annotation: Option<&str>,
    ) -> Result<(), AlignmentError> {
        if self.get(name).is_some() {
            return Err(AlignmentError::DuplicateName(name.to_string()));
        }
        for character in sequence.chars() {
            if !self.alphabet.contains(character) {
                return Err(AlignmentError::InvalidCharacter {
                    name: name.to_string(),
                    character,
                    alphabet: self.alphabet,
                });
            }
        }

        self.sequences.push(Sequence {
            name: name.to_string(),
            sequence: sequence.to_string(),
            annotation: annotation.map(String::from),
        });

        Ok(())
    }

    /// Calls `f` on every (name, sequence) pair, in insertion order
    pub fn iterate(&self, mut f: impl FnMut(&str, &str)) {
        for sequence in self.sequences.iter() {
            f(&sequence.name, &sequence.sequence);
        }
    }

    /// Gets a sequence by name
    pub fn get(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.name == name)
    }

    /// Number of sequences in the alignment
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the alignment holds no sequence
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datatype_resolution() {
        assert_eq!(Alphabet::from_datatype("DNA"), Some(Alphabet::Dna));
        assert_eq!(Alphabet::from_datatype("Protein"), Some(Alphabet::Protein));
        assert_eq!(Alphabet::from_datatype("standard"), None);
    }

    #[test]
    fn alphabet_rejects_characters() {
        let mut alignment = Alignment::new(Alphabet::Dna);
        alignment.add_sequence("ok", "acgtRY-N*", None).unwrap();

        let err = alignment.add_sequence("bad", "ACFT", None).unwrap_err();
        assert_eq!(
            err,
            AlignmentError::InvalidCharacter {
                name: "bad".to_string(),
                character: 'F',
                alphabet: Alphabet::Dna,
            }
        );
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut alignment = Alignment::new(Alphabet::Protein);
        alignment.add_sequence("seq1", "MKV", None).unwrap();
        assert_eq!(
            alignment.add_sequence("seq1", "MKV", None),
            Err(AlignmentError::DuplicateName("seq1".to_string()))
        );
    }

    #[test]
    fn iterate_in_order() {
        let mut alignment = Alignment::new(Alphabet::Dna);
        alignment.add_sequence("b", "AC", None).unwrap();
        alignment.add_sequence("a", "GT", None).unwrap();

        let mut seen = vec![];
        alignment.iterate(|name, seq| seen.push((name.to_string(), seq.to_string())));
        assert_eq!(
            seen,
            vec![
                ("b".to_string(), "AC".to_string()),
                ("a".to_string(), "GT".to_string())
            ]
        );
    }
}
