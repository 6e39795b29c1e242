//! Error type shared by all J/K builds.

use std::fmt;

/// Everything that can abort a J/K build.
///
/// A build either finishes and returns all requested matrices, or it fails with one
/// of these variants and returns nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum JkError {
    /// The exchange-divergence treatment string is not understood.
    InvalidExxDiv(String),
    /// Reduced dimensionality needs an explicit G=0 treatment for exchange.
    ExxDivRequired { dimension: usize },
    /// Array dimensions that must agree do not.
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// k-point arrays must have exactly three columns.
    InvalidKpts { ncols: usize },
    /// Neither J nor K was requested.
    NothingRequested,
    /// Not even the minimal grid block fits in the memory ceiling.
    InsufficientMemory { max_memory: f64, required: f64 },
    /// The cell definition is inconsistent.
    InvalidCell(String),
    /// An overlap matrix could not be inverted.
    SingularOverlap { kpt: usize },
    /// Reading or parsing an input file failed.
    Input(String),
    /// A scratch buffer could not be viewed with the requested shape.
    Layout(String),
}

impl fmt::Display for JkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JkError::InvalidExxDiv(s) => write!(
                f,
                "exchange-divergence treatment must be 'ewald' or none, got '{}'",
                s
            ),
            JkError::ExxDivRequired { dimension } => write!(
                f,
                "exchange-divergence treatment must be 'ewald' for a cell of dimension {}",
                dimension
            ),
            JkError::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(f, "inconsistent {}: expected {}, found {}", what, expected, found),
            JkError::InvalidKpts { ncols } => write!(
                f,
                "k-points must be given as (n, 3) arrays, got {} columns",
                ncols
            ),
            JkError::NothingRequested => write!(f, "neither J nor K was requested"),
            JkError::InsufficientMemory {
                max_memory,
                required,
            } => write!(
                f,
                "insufficient memory budget: {:.3} MB available, at least {:.3} MB required",
                max_memory, required
            ),
            JkError::InvalidCell(s) => write!(f, "invalid cell: {}", s),
            JkError::SingularOverlap { kpt } => {
                write!(f, "overlap matrix at k-point {} is singular", kpt)
            }
            JkError::Input(s) => write!(f, "input error: {}", s),
            JkError::Layout(s) => write!(f, "array layout error: {}", s),
        }
    }
}

impl std::error::Error for JkError {}

impl From<ndarray::ShapeError> for JkError {
    fn from(err: ndarray::ShapeError) -> Self {
        JkError::Layout(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JkError>;
