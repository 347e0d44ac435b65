//! This module provides utilities for loading operators from files.
//!
//! It parses Matrix Market coordinate files (`%%MatrixMarket matrix coordinate ...`)
//! with `real`, `integer` or `complex` entries and `general`, `symmetric`,
//! `hermitian` or `skew-symmetric` storage, and assembles them into a sparse
//! [`Operator`].

use crate::operator::Operator;
use faer::{
    c64,
    sparse::{SparseColMat, Triplet},
};
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};
use thiserror::Error;

/// Represents all possible errors that can occur during data loading and parsing.
#[derive(Error, Debug)]
pub enum DataLoaderError {
    /// Wraps a standard I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Occurs when a string cannot be parsed into an integer.
    #[error("Parse error: Failed to parse integer from '{0}'")]
    ParseInt(String),
    /// Occurs when a string cannot be parsed into a float.
    #[error("Parse error: Failed to parse float from '{0}'")]
    ParseFloat(String),
    /// Occurs if the `%%MatrixMarket` banner is missing or describes an unsupported layout.
    #[error("Format error: unsupported or missing Matrix Market header '{0}'.")]
    InvalidHeader(String),
    /// Occurs when the end of a file is reached unexpectedly during parsing.
    #[error("Format error: Unexpected end of file while reading data.")]
    UnexpectedEof,
    /// Occurs if an entry line has too few fields.
    #[error("Format error: malformed entry line '{0}'.")]
    MalformedEntry(String),
    /// Occurs if an entry lies outside the declared shape.
    #[error("Format error: entry ({row}, {col}) is outside the declared {nrows}x{ncols} shape.")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
    /// Occurs if the number of entries does not match the size line.
    #[error("Dimension mismatch: size line declares {declared} entries, but the file has {found}.")]
    EntryCountMismatch { declared: usize, found: usize },
    /// Occurs if the sparse matrix construction fails internally.
    #[error("Internal error: Failed to construct the sparse matrix from triplets.")]
    SparseMatrixConstructionError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Real,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Symmetry {
    General,
    Symmetric,
    Hermitian,
    SkewSymmetric,
}

fn parse_header(line: &str) -> Result<(Field, Symmetry), DataLoaderError> {
    let invalid = || DataLoaderError::InvalidHeader(line.trim().to_string());
    let parts: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
    if parts.len() != 5
        || parts[0] != "%%matrixmarket"
        || parts[1] != "matrix"
        || parts[2] != "coordinate"
    {
        return Err(invalid());
    }
    let field = match parts[3].as_str() {
        "real" | "integer" | "double" => Field::Real,
        "complex" => Field::Complex,
        _ => return Err(invalid()),
    };
    let symmetry = match parts[4].as_str() {
        "general" => Symmetry::General,
        "symmetric" => Symmetry::Symmetric,
        "hermitian" => Symmetry::Hermitian,
        "skew-symmetric" => Symmetry::SkewSymmetric,
        _ => return Err(invalid()),
    };
    Ok((field, symmetry))
}

fn parse_usize(s: &str) -> Result<usize, DataLoaderError> {
    s.parse::<usize>()
        .map_err(|_| DataLoaderError::ParseInt(s.to_string()))
}

fn parse_f64(s: &str) -> Result<f64, DataLoaderError> {
    s.parse::<f64>()
        .map_err(|_| DataLoaderError::ParseFloat(s.to_string()))
}

/// Upper bound on the entries reserved up front from a size line.
const MAX_RESERVED_ENTRIES: usize = 1 << 20;

/// Parses Matrix Market coordinate data from any buffered reader.
///
/// Entries of `symmetric`, `hermitian` and `skew-symmetric` files are mirrored
/// across the diagonal. Hermitian files, and symmetric files with real entries,
/// produce operators flagged as Hermitian.
pub fn parse_matrix_market(reader: impl BufRead) -> Result<Operator, DataLoaderError> {
    let mut lines = reader.lines();
    let header = lines.next().ok_or(DataLoaderError::UnexpectedEof)??;
    let (field, symmetry) = parse_header(&header)?;

    // Skip comments up to the size line.
    let size_line = loop {
        let line = lines.next().ok_or(DataLoaderError::UnexpectedEof)??;
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('%') {
            break line;
        }
    };
    let size: Vec<&str> = size_line.split_whitespace().collect();
    if size.len() != 3 {
        return Err(DataLoaderError::MalformedEntry(size_line.clone()));
    }
    let nrows = parse_usize(size[0])?;
    let ncols = parse_usize(size[1])?;
    let declared = parse_usize(size[2])?;

    // The size line is untrusted; reserve no more than the shape and a fixed ceiling allow.
    let reserved = declared
        .min(nrows.saturating_mul(ncols))
        .min(MAX_RESERVED_ENTRIES)
        .saturating_mul(2);
    let mut triplets: Vec<Triplet<usize, usize, c64>> = Vec::with_capacity(reserved);
    let mut found = 0;
    for line in lines {
        let line = line?;
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0].starts_with('%') {
            continue;
        }
        let needed = match field {
            Field::Real => 3,
            Field::Complex => 4,
        };
        if parts.len() < needed {
            return Err(DataLoaderError::MalformedEntry(line.clone()));
        }

        // Matrix Market indices are 1-based.
        let row = parse_usize(parts[0])?;
        let col = parse_usize(parts[1])?;
        if row == 0 || col == 0 || row > nrows || col > ncols {
            return Err(DataLoaderError::IndexOutOfBounds { row, col, nrows, ncols });
        }
        let (row, col) = (row - 1, col - 1);
        let val = match field {
            Field::Real => c64::new(parse_f64(parts[2])?, 0.0),
            Field::Complex => c64::new(parse_f64(parts[2])?, parse_f64(parts[3])?),
        };

        triplets.push(Triplet { row, col, val });
        if row != col {
            let mirrored = match symmetry {
                Symmetry::General => None,
                Symmetry::Symmetric => Some(val),
                Symmetry::Hermitian => Some(val.conj()),
                Symmetry::SkewSymmetric => Some(-val),
            };
            if let Some(val) = mirrored {
                triplets.push(Triplet { row: col, col: row, val });
            }
        }
        found += 1;
    }

    if found != declared {
        return Err(DataLoaderError::EntryCountMismatch { declared, found });
    }

    let matrix = SparseColMat::try_new_from_triplets(nrows, ncols, &triplets)
        .map_err(|_| DataLoaderError::SparseMatrixConstructionError)?;
    let op = Operator::sparse(matrix);
    let hermitian_by_header = symmetry == Symmetry::Hermitian
        || (symmetry == Symmetry::Symmetric && field == Field::Real);
    Ok(if hermitian_by_header {
        op.with_hermitian(true)
    } else {
        op
    })
}

/// Loads a Matrix Market coordinate file into a sparse [`Operator`].
///
/// # Arguments
/// * `path`: The path to the `.mtx` file.
pub fn load_matrix_market(path: impl AsRef<Path>) -> Result<Operator, DataLoaderError> {
    let file = File::open(path)?;
    parse_matrix_market(BufReader::new(file))
}
