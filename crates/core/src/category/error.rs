//! Category catalog errors.

use rungs_shared::types::{CategoryComboId, CategoryOptionComboId, CategoryOptionId, Uid};
use thiserror::Error;

/// Errors raised while building the category catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryError {
    /// Referenced category option is unknown.
    #[error("Category option {0} not found")]
    UnknownOption(CategoryOptionId),

    /// Referenced attribute option combo is unknown.
    #[error("Category option combo {0} not found")]
    UnknownOptionCombo(CategoryOptionComboId),

    /// Referenced category combo is unknown.
    #[error("Category combo {0} not found")]
    UnknownCategoryCombo(CategoryComboId),

    /// The UID is already used in the catalog.
    #[error("UID {0} already in use")]
    DuplicateUid(Uid),

    /// The default category combo must contain exactly one option combo.
    #[error("Default category combo must contain exactly one option combo, found {0}")]
    InvalidDefault(usize),
}

impl CategoryError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownOption(_) | Self::UnknownOptionCombo(_) | Self::UnknownCategoryCombo(_) => {
                404
            }
            Self::DuplicateUid(_) => 409,
            Self::InvalidDefault(_) => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownOption(_) => "CATEGORY_OPTION_NOT_FOUND",
            Self::UnknownOptionCombo(_) => "OPTION_COMBO_NOT_FOUND",
            Self::UnknownCategoryCombo(_) => "CATEGORY_COMBO_NOT_FOUND",
            Self::DuplicateUid(_) => "DUPLICATE_UID",
            Self::InvalidDefault(_) => "INVALID_DEFAULT_COMBO",
        }
    }
}
