//! Periods and period types.
//!
//! A workflow has a period type; approvals for any requested period are
//! recorded against the workflow period of that type containing the
//! requested period's end date.

mod calendar;
mod error;
mod types;

pub use calendar::PeriodCalendar;
pub use error::PeriodError;
pub use types::{Period, PeriodType};
