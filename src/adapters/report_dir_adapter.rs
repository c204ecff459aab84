//! Report archive laid out as `<root>/<YYYY-MM-DD>/{before,after}_market_analysis.md`.

use crate::domain::error::PredtrackError;
use crate::ports::report_source_port::{ReportDocuments, ReportSource};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

pub const FORECAST_FILE: &str = "before_market_analysis.md";
pub const REVIEW_FILE: &str = "after_market_analysis.md";

pub struct ReportDirAdapter {
    root: PathBuf,
}

impl ReportDirAdapter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join(date.format("%Y-%m-%d").to_string())
    }

    fn read_optional(path: &Path) -> Result<Option<String>, PredtrackError> {
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }
}

impl ReportSource for ReportDirAdapter {
    fn available_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError> {
        let mut dates = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Ok(date) = NaiveDate::parse_from_str(&name.to_string_lossy(), "%Y-%m-%d") else {
                continue;
            };
            if entry.path().join(FORECAST_FILE).is_file() {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    fn load(&self, date: NaiveDate) -> Result<ReportDocuments, PredtrackError> {
        let dir = self.day_dir(date);
        Ok(ReportDocuments {
            forecast: Self::read_optional(&dir.join(FORECAST_FILE))?,
            review: Self::read_optional(&dir.join(REVIEW_FILE))?,
        })
    }
}
