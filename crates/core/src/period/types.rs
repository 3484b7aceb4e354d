//! Period types and concrete periods.

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use rungs_shared::types::PeriodId;
use serde::{Deserialize, Serialize};

use super::error::PeriodError;

/// Frequency of a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PeriodType {
    /// One calendar day.
    Daily,
    /// ISO week starting on Monday.
    Weekly,
    /// Calendar month.
    Monthly,
    /// Calendar quarter.
    Quarterly,
    /// January-June or July-December.
    SixMonthly,
    /// Calendar year.
    Yearly,
}

impl PeriodType {
    /// Months covered by one period, for month-based types.
    fn months(self) -> Option<u32> {
        match self {
            Self::Daily | Self::Weekly => None,
            Self::Monthly => Some(1),
            Self::Quarterly => Some(3),
            Self::SixMonthly => Some(6),
            Self::Yearly => Some(12),
        }
    }

    /// First day of the period of this type containing `date`.
    #[must_use]
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date,
            Self::Weekly => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            _ => {
                let span = self.months().unwrap_or(1);
                let month = date.month0() / span * span + 1;
                date.with_day(1)
                    .and_then(|d| d.with_month(month))
                    .unwrap_or(date)
            }
        }
    }

    /// Moves `date` by `n` periods of this type; negative `n` moves back.
    pub fn shift(self, date: NaiveDate, n: i32) -> Result<NaiveDate, PeriodError> {
        let steps = n.unsigned_abs();
        let shifted = match self.months() {
            None => {
                let days = Days::new(u64::from(steps) * if self == Self::Weekly { 7 } else { 1 });
                if n >= 0 {
                    date.checked_add_days(days)
                } else {
                    date.checked_sub_days(days)
                }
            }
            Some(span) => {
                let months = Months::new(steps.checked_mul(span).ok_or(PeriodError::OutOfRange)?);
                if n >= 0 {
                    date.checked_add_months(months)
                } else {
                    date.checked_sub_months(months)
                }
            }
        };
        shifted.ok_or(PeriodError::OutOfRange)
    }

    /// Start and end (inclusive) of the period containing `date`.
    pub fn bounds_containing(self, date: NaiveDate) -> Result<(NaiveDate, NaiveDate), PeriodError> {
        let start = self.start_of(date);
        let end = self
            .shift(start, 1)?
            .pred_opt()
            .ok_or(PeriodError::OutOfRange)?;
        Ok((start, end))
    }

    /// ISO code of the period starting at `start`.
    #[must_use]
    pub fn iso_code(self, start: NaiveDate) -> String {
        match self {
            Self::Daily => start.format("%Y%m%d").to_string(),
            Self::Weekly => {
                let week = start.iso_week();
                format!("{}W{}", week.year(), week.week())
            }
            Self::Monthly => start.format("%Y%m").to_string(),
            Self::Quarterly => format!("{}Q{}", start.year(), start.month0() / 3 + 1),
            Self::SixMonthly => format!("{}S{}", start.year(), start.month0() / 6 + 1),
            Self::Yearly => start.year().to_string(),
        }
    }

    /// Parses an ISO period code into its type and start date.
    pub fn parse_iso(code: &str) -> Result<(Self, NaiveDate), PeriodError> {
        let invalid = || PeriodError::InvalidCode(code.to_string());
        let number = |s: &str| -> Result<u32, PeriodError> {
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            s.parse().map_err(|_| invalid())
        };
        let year = |s: &str| -> Result<i32, PeriodError> {
            if s.len() != 4 {
                return Err(invalid());
            }
            i32::try_from(number(s)?).map_err(|_| invalid())
        };

        let parsed = if let Some((y, w)) = code.split_once('W') {
            NaiveDate::from_isoywd_opt(year(y)?, number(w)?, Weekday::Mon).map(|d| (Self::Weekly, d))
        } else if let Some((y, q)) = code.split_once('Q') {
            let (y, q) = (year(y)?, number(q)?);
            if (1..=4).contains(&q) {
                NaiveDate::from_ymd_opt(y, (q - 1) * 3 + 1, 1).map(|d| (Self::Quarterly, d))
            } else {
                None
            }
        } else if let Some((y, h)) = code.split_once('S') {
            let (y, h) = (year(y)?, number(h)?);
            if (1..=2).contains(&h) {
                NaiveDate::from_ymd_opt(y, (h - 1) * 6 + 1, 1).map(|d| (Self::SixMonthly, d))
            } else {
                None
            }
        } else {
            number(code)?;
            match code.len() {
                4 => NaiveDate::from_ymd_opt(year(code)?, 1, 1).map(|d| (Self::Yearly, d)),
                6 => NaiveDate::from_ymd_opt(year(&code[..4])?, number(&code[4..])?, 1)
                    .map(|d| (Self::Monthly, d)),
                8 => NaiveDate::parse_from_str(code, "%Y%m%d")
                    .ok()
                    .map(|d| (Self::Daily, d)),
                _ => None,
            }
        };

        parsed.ok_or_else(invalid)
    }

    /// Name of the type as used in metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::SixMonthly => "SixMonthly",
            Self::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concrete reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Unique identifier.
    pub id: PeriodId,
    /// Frequency of the period.
    pub period_type: PeriodType,
    /// First day of the period.
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
}

impl Period {
    /// The period of `period_type` containing `date`, with a fresh id.
    pub fn containing(period_type: PeriodType, date: NaiveDate) -> Result<Self, PeriodError> {
        let (start_date, end_date) = period_type.bounds_containing(date)?;
        Ok(Self {
            id: PeriodId::new(),
            period_type,
            start_date,
            end_date,
        })
    }

    /// Builds a period from an ISO code such as `202401` or `2024Q1`.
    pub fn from_iso(code: &str) -> Result<Self, PeriodError> {
        let (period_type, start) = PeriodType::parse_iso(code)?;
        Self::containing(period_type, start)
    }

    /// ISO code of this period.
    #[must_use]
    pub fn iso_code(&self) -> String {
        self.period_type.iso_code(self.start_date)
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if the two periods share at least one day.
    #[must_use]
    pub fn overlaps(&self, other: &Period) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }

    /// Checks that the dates are the exact bounds of the period type.
    pub fn validate(&self) -> Result<(), PeriodError> {
        let (start, end) = self.period_type.bounds_containing(self.start_date)?;
        if start == self.start_date && end == self.end_date {
            Ok(())
        } else {
            Err(PeriodError::Misaligned {
                period_type: self.period_type,
                start: self.start_date,
                end: self.end_date,
            })
        }
    }
}
