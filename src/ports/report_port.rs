//! Historical accuracy report port.

use chrono::NaiveDate;

use crate::domain::accuracy::AccuracyReport;
use crate::domain::error::PredtrackError;

pub struct ReportContext<'a> {
    pub report: &'a AccuracyReport,
    pub generated_on: NaiveDate,
}

pub trait ReportPort {
    fn write(&self, ctx: &ReportContext, output_path: &str) -> Result<(), PredtrackError>;
}
