//! Registry of known periods.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rungs_shared::types::PeriodId;

use super::error::PeriodError;
use super::types::{Period, PeriodType};

/// Known periods indexed by type and start date.
///
/// Periods of one type never overlap, so at most one period of a given type
/// contains any date.
#[derive(Debug, Clone, Default)]
pub struct PeriodCalendar {
    periods: HashMap<PeriodId, Period>,
    by_type: HashMap<PeriodType, BTreeMap<NaiveDate, PeriodId>>,
}

impl PeriodCalendar {
    /// Creates an empty calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a period.
    pub fn add(&mut self, period: Period) -> Result<PeriodId, PeriodError> {
        period.validate()?;

        if let Some(existing) = self.find(period.period_type, |p| p.overlaps(&period)) {
            return Err(PeriodError::Overlap {
                period_type: period.period_type,
                existing: existing.id,
            });
        }

        let id = period.id;
        self.by_type
            .entry(period.period_type)
            .or_default()
            .insert(period.start_date, id);
        self.periods.insert(id, period);
        Ok(id)
    }

    /// Looks up a period by id.
    #[must_use]
    pub fn get(&self, id: PeriodId) -> Option<&Period> {
        self.periods.get(&id)
    }

    /// Looks up a period by id, failing if it is unknown.
    pub fn require(&self, id: PeriodId) -> Result<&Period, PeriodError> {
        self.get(id).ok_or(PeriodError::NotFound(id))
    }

    /// The registered period of `period_type` containing `date`.
    #[must_use]
    pub fn workflow_period(&self, period_type: PeriodType, date: NaiveDate) -> Option<&Period> {
        let (_, id) = self.by_type.get(&period_type)?.range(..=date).next_back()?;
        self.periods.get(id).filter(|p| p.contains_date(date))
    }

    /// Returns the period of `period_type` containing `date`, registering it
    /// first if needed.
    pub fn get_or_create(
        &mut self,
        period_type: PeriodType,
        date: NaiveDate,
    ) -> Result<&Period, PeriodError> {
        let id = match self.workflow_period(period_type, date) {
            Some(period) => period.id,
            None => self.add(Period::containing(period_type, date)?)?,
        };
        self.require(id)
    }

    /// Looks up a registered period by ISO code.
    #[must_use]
    pub fn find_by_iso(&self, code: &str) -> Option<&Period> {
        let (period_type, start) = PeriodType::parse_iso(code).ok()?;
        self.workflow_period(period_type, start)
            .filter(|p| p.start_date == start)
    }

    /// All registered periods, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    /// Latest-starting period of this type accepted by `matches`.
    fn find(&self, period_type: PeriodType, matches: impl Fn(&Period) -> bool) -> Option<&Period> {
        let starts = self.by_type.get(&period_type)?;
        starts
            .values()
            .rev()
            .filter_map(|id| self.periods.get(id))
            .find(|p| matches(p))
    }
}
