//! Access to archived daily reports for historical import.

use chrono::NaiveDate;

use crate::domain::error::PredtrackError;

/// The documents archived for one trading day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDocuments {
    /// Pre-market report with forward-looking predictions.
    pub forecast: Option<String>,
    /// Post-market report, possibly with a predicted-vs-observed table.
    pub review: Option<String>,
}

pub trait ReportSource {
    /// Dates that have a forecast report, ascending.
    fn available_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError>;

    fn load(&self, date: NaiveDate) -> Result<ReportDocuments, PredtrackError>;
}
