//! Errors raised by the layout engine, the value container and the byte stream.

use crate::value::Value;

pub type Result<T> = std::result::Result<T, LayoutError>;

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// Catalog descriptor is malformed (too few parts, non-integer size, bad bounds).
    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),
    /// Array declared with a lengths count different from its dimension.
    #[error("Dimension mismatch: {lengths} length(s) for dimension {dimension}")]
    DimensionMismatch { lengths: usize, dimension: usize },
    /// Array declared with a zero length; lengths are positive.
    #[error("Zero length: dimension {index} of an array has length 0")]
    ZeroLength { index: usize },
    /// A byte size does not fit in `usize`.
    #[error("Size overflow: {0}")]
    SizeOverflow(String),
    /// A named predicate rejected the value written to a field.
    #[error("{field}: value <{value}> does not respect restriction \"{rule}\"")]
    RestrictionViolation {
        field: String,
        value: Value,
        rule: String,
    },
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid text: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),
    #[error("Invalid scalar width: {0} (expected 8, 16, 32 or 64)")]
    InvalidScalarWidth(u32),
}

impl LayoutError {
    /// Name of the failing predicate, for restriction violations.
    pub fn rule(&self) -> Option<&str> {
        match self {
            LayoutError::RestrictionViolation { rule, .. } => Some(rule),
            _ => None,
        }
    }
}
