//! Attribute categories: options, option combos, sharing and candidate
//! enumeration.

mod catalog;
mod enumerator;
mod error;
mod sharing;
mod types;

pub use catalog::CategoryCatalog;
pub use enumerator::{Candidate, CandidateEnumerator, ComboFilter};
pub use error::CategoryError;
pub use sharing::Sharing;
pub use types::{CategoryCombo, CategoryOption, CategoryOptionCombo};
