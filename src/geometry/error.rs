use thiserror::Error;

/// Why a coordinate literal could not be read.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("empty coordinate literal")]
    Empty,
    #[error("unexpected character '{character}' at offset {offset}")]
    UnexpectedCharacter { character: char, offset: usize },
    #[error("unbalanced brackets at offset {offset}")]
    UnbalancedBrackets { offset: usize },
    #[error("malformed coordinates: {0}")]
    Malformed(String),
    #[error("position with {0} values, at least 2 required")]
    ShortPosition(usize),
}

/// Failure to turn a geo-bearing row into a feature. Row indices count from zero over the input
/// rows, including rows that were skipped for lacking geometry.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("row {row}: field '{field}' is not a number: {raw:?}")]
    InvalidNumber {
        row: usize,
        field: String,
        raw: String,
    },
    #[error("row {row}: invalid {field} coordinates {raw:?}: {source}")]
    InvalidCoordinates {
        row: usize,
        field: String,
        raw: String,
        source: CoordinateError,
    },
    #[error("row {row}: several coordinate alias pairs present ({pairs})")]
    AmbiguousAliases { row: usize, pairs: String },
    #[error("row {row}: geometry fields present but no geometry type could be determined")]
    Unclassified { row: usize },
}

impl ParseError {
    pub fn row(&self) -> usize {
        match self {
            ParseError::InvalidNumber { row, .. }
            | ParseError::InvalidCoordinates { row, .. }
            | ParseError::AmbiguousAliases { row, .. }
            | ParseError::Unclassified { row } => *row,
        }
    }
}
