//! Household domain model.
//!
//! # Responsibility
//! - Define canonical data structures for households and their records.
//! - Carry the visibility fields shared by every shareable record.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID.
//! - Dates and timestamps are Unix epoch milliseconds.
//! - Enumerated fields have one stored string form each.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod household;
pub mod location;
pub mod task;
pub mod visibility;

/// Field-level validation failure for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    /// Required text field is empty or whitespace.
    EmptyField(&'static str),
    /// Numeric field outside its allowed range.
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    /// End date/time precedes start.
    InvertedRange {
        start_field: &'static str,
        end_field: &'static str,
    },
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "`{field}` value {value} is outside {min}..={max}"),
            Self::InvertedRange {
                start_field,
                end_field,
            } => write!(f, "`{end_field}` must not be earlier than `{start_field}`"),
        }
    }
}

impl Error for ModelValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelValidationError> {
    if value.trim().is_empty() {
        return Err(ModelValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<(), ModelValidationError> {
    if value < min || value > max {
        return Err(ModelValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
