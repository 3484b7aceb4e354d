//! Period errors.

use rungs_shared::types::PeriodId;
use thiserror::Error;

use super::types::PeriodType;

/// Errors raised by period arithmetic and the period calendar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// The ISO period code could not be parsed.
    #[error("Invalid period code '{0}'")]
    InvalidCode(String),

    /// Date arithmetic left the supported calendar range.
    #[error("Date out of range")]
    OutOfRange,

    /// The period does not match the boundaries of its type.
    #[error("Period {start} - {end} is not a {period_type} period")]
    Misaligned {
        /// Declared period type.
        period_type: PeriodType,
        /// Declared start.
        start: chrono::NaiveDate,
        /// Declared end.
        end: chrono::NaiveDate,
    },

    /// Another period of the same type already covers part of this range.
    #[error("Period overlaps existing {period_type} period {existing}")]
    Overlap {
        /// Type of both periods.
        period_type: PeriodType,
        /// The already registered period.
        existing: PeriodId,
    },

    /// No period with this id is registered.
    #[error("Period {0} not found")]
    NotFound(PeriodId),
}

impl PeriodError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCode(_) | Self::OutOfRange | Self::Misaligned { .. } => 400,
            Self::Overlap { .. } => 409,
            Self::NotFound(_) => 404,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCode(_) => "INVALID_PERIOD_CODE",
            Self::OutOfRange => "PERIOD_OUT_OF_RANGE",
            Self::Misaligned { .. } => "PERIOD_MISALIGNED",
            Self::Overlap { .. } => "PERIOD_OVERLAP",
            Self::NotFound(_) => "PERIOD_NOT_FOUND",
        }
    }
}
