//! Compute and manipulate phylogenetic distance matrices
//!

use std::{
    fmt::{Debug, Display},
    fs,
    path::Path,
};

use num_traits::{Float, Zero};
use thiserror::Error;

/// Errors that can occur when building and writing [`DistanceMatrix`] structs.
#[derive(Error, Debug)]
pub enum MatrixError {
    /// We are trying to add a different number of taxa than what we alloted
    #[error("Trying to add {n_taxa} taxa to a matrix of size {size}")]
    SizeError {
        /// Size of the distance matrix
        size: usize,
        /// Number of taxa we are trying to add
        n_taxa: usize,
    },
    /// We are trying to access a taxon that does not exist
    #[error("Missing taxon {0}")]
    MissingTaxon(String),
    /// We are trying to access a pair outside of the matrix
    #[error("Pair ({0}, {1}) is out of the matrix")]
    IndexError(usize, usize),
    /// We are trying to set a non zero distance for an identical taxa pair
    #[error("Identical taxa cannot have a non zero distance")]
    NonZeroIdenticalDistance,
    /// There was a [`std::io::Error`] when writing the matrix to a file
    #[error("Error writing file")]
    IoError(#[from] std::io::Error),
}

/// Index of the pair `(i, j)` (with `i < j`) within the single vector
/// storing the upper triangle of an `n`x`n` matrix row by row.
pub(crate) fn tril_to_rowvec_index(n: usize, i: usize, j: usize) -> usize {
    (2 * n - 3 - i) * i / 2 + j - 1
}

/// A phylogenetic distance matrix.
///
/// The matrix is symmetric with a zero diagonal, so only the upper
/// triangle is stored. Taxa keep the order they were inserted in, which
/// for matrices extracted from a tree is the tree's own tip traversal
/// order.
#[derive(Debug, Clone)]
pub struct DistanceMatrix<T> {
    /// Number of taxa in the matrix
    pub size: usize,
    /// Identifiers of the taxa, in insertion order
    pub taxa: Vec<String>,
    /// Distances between taxa (upper triangle)
    matrix: Vec<T>,
    /// Distance value for identical taxa
    zero: T,
}

impl<T> DistanceMatrix<T>
where
    T: Display + Debug + Float + Zero,
{
    /// Create an empty distance matrix for a given number of taxa
    pub fn new_with_size(size: usize) -> Self {
        Self {
            size,
            taxa: Vec::with_capacity(size),
            matrix: vec![Zero::zero(); size * size.saturating_sub(1) / 2],
            zero: Zero::zero(),
        }
    }

    /// Set the taxa of the matrix
    pub fn set_taxa(&mut self, taxa: Vec<String>) -> Result<(), MatrixError> {
        if taxa.len() != self.size {
            Err(MatrixError::SizeError {
                size: self.size,
                n_taxa: taxa.len(),
            })
        } else {
            self.taxa = taxa;
            Ok(())
        }
    }

    fn vec_index(&self, i: usize, j: usize) -> Result<usize, MatrixError> {
        if i == j || i >= self.size || j >= self.size {
            return Err(MatrixError::IndexError(i, j));
        }
        let (i, j) = if i < j { (i, j) } else { (j, i) };

        Ok(tril_to_rowvec_index(self.size, i, j))
    }

    /// Get the distance between the taxa at positions `i` and `j`
    pub fn get_at(&self, i: usize, j: usize) -> Result<T, MatrixError> {
        if i == j {
            if i >= self.size {
                return Err(MatrixError::IndexError(i, j));
            }
            return Ok(self.zero);
        }

        Ok(self.matrix[self.vec_index(i, j)?])
    }

    /// Set the distance between the taxa at positions `i` and `j`.
    /// The diagonal can only hold zero.
    pub fn set_at(&mut self, i: usize, j: usize, dist: T) -> Result<(), MatrixError> {
        if i == j {
            if dist != self.zero {
                return Err(MatrixError::NonZeroIdenticalDistance);
            }
            return Ok(());
        }

        let idx = self.vec_index(i, j)?;
        self.matrix[idx] = dist;

        Ok(())
    }

    /// Get the distance between two taxa by name
    pub fn get(&self, taxon1: &str, taxon2: &str) -> Result<T, MatrixError> {
        let i = self
            .taxa
            .iter()
            .position(|v| v == taxon1)
            .ok_or_else(|| MatrixError::MissingTaxon(taxon1.to_string()))?;
        let j = self
            .taxa
            .iter()
            .position(|v| v == taxon2)
            .ok_or_else(|| MatrixError::MissingTaxon(taxon2.to_string()))?;

        self.get_at(i, j)
    }

    /// Returns a string representing the distance matrix in square format
    fn to_phylip_square(&self) -> Result<String, MatrixError> {
        let mut output = format!("{}\n", self.size);

        for (i, name) in self.taxa.iter().enumerate() {
            output += name;
            for j in 0..self.size {
                output += &format!("  {}", self.get_at(i, j)?);
            }
            output += "\n";
        }

        Ok(output)
    }

    /// Returns a string representing the distance matrix in triangle format
    fn to_phylip_triangle(&self) -> Result<String, MatrixError> {
        let mut output = format!("{}\n", self.size);

        for (i, name) in self.taxa.iter().enumerate() {
            output += name;
            for j in 0..i {
                output += &format!("  {}", self.get_at(i, j)?);
            }
            output += "\n";
        }

        Ok(output)
    }

    /// Outputs the matrix as a phylip formatted string
    pub fn to_phylip(&self, square: bool) -> Result<String, MatrixError> {
        if square {
            self.to_phylip_square()
        } else {
            self.to_phylip_triangle()
        }
    }

    /// Writes the matrix to a phylip file
    pub fn to_file(&self, path: &Path, square: bool) -> Result<(), MatrixError> {
        fs::write(path, self.to_phylip(square)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn build_matrix() -> DistanceMatrix<f64> {
        let mut matrix = DistanceMatrix::new_with_size(3);
        matrix
            .set_taxa(vec!["s1".to_string(), "s2".to_string(), "s3".to_string()])
            .unwrap();
        matrix.set_at(0, 1, 2.0).unwrap();
        matrix.set_at(0, 2, 3.0).unwrap();
        matrix.set_at(2, 1, 6.0).unwrap();

        matrix
    }

    #[test]
    fn symmetry_and_diagonal() {
        let matrix = build_matrix();
        for i in 0..3 {
            assert_eq!(matrix.get_at(i, i).unwrap(), 0.0);
            for j in 0..3 {
                assert_eq!(matrix.get_at(i, j).unwrap(), matrix.get_at(j, i).unwrap());
            }
        }
    }

    #[test]
    fn get_by_name() {
        let matrix = build_matrix();
        assert_eq!(matrix.get("s2", "s3").unwrap(), 6.0);
        assert!(matches!(
            matrix.get("s2", "nope"),
            Err(MatrixError::MissingTaxon(_))
        ));
    }

    #[test]
    fn to_phylip() {
        let matrix = build_matrix();

        let square = "3
s1  0  2  3
s2  2  0  6
s3  3  6  0
";
        let triangle = "3
s1
s2  2
s3  3  6
";
        assert_eq!(matrix.to_phylip(true).unwrap(), square);
        assert_eq!(matrix.to_phylip(false).unwrap(), triangle);
    }

    #[test]
    fn diagonal_is_locked() {
        let mut matrix = build_matrix();
        assert!(matrix.set_at(1, 1, 0.0).is_ok());
        assert!(matches!(
            matrix.set_at(1, 1, 4.0),
            Err(MatrixError::NonZeroIdenticalDistance)
        ));
    }
}
