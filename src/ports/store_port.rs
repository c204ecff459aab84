//! Prediction store port: a repository of [`PredictionSet`]s keyed by
//! reference date.

use chrono::NaiveDate;

use crate::domain::error::PredtrackError;
use crate::domain::prediction::{PredictionRecord, PredictionSet};

/// One logical entry per reference date. Implementations assume a single
/// writer; concurrent runs must be serialized by the caller.
pub trait PredictionStore {
    fn get(&self, date: NaiveDate) -> Result<Option<PredictionSet>, PredtrackError>;

    /// Insert or replace the set for `set.reference_date` and persist it.
    fn put(&mut self, set: &PredictionSet) -> Result<(), PredtrackError>;

    /// All reference dates, ascending.
    fn all_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError>;

    fn load_all(&self) -> Result<Vec<PredictionSet>, PredtrackError> {
        let mut sets = Vec::new();
        for date in self.all_dates()? {
            if let Some(set) = self.get(date)? {
                sets.push(set);
            }
        }
        Ok(sets)
    }

    /// Replace whatever is stored for `date` with a fresh set whose horizons
    /// are all pending.
    fn upsert(
        &mut self,
        date: NaiveDate,
        records: Vec<PredictionRecord>,
    ) -> Result<PredictionSet, PredtrackError> {
        let set = PredictionSet::new(date, records);
        self.put(&set)?;
        Ok(set)
    }
}
