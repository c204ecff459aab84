//! Bulk import of archived daily reports.

use chrono::NaiveDate;

use crate::domain::error::PredtrackError;
use crate::domain::extract::{extract, DocumentKind, Extraction};
use crate::domain::verification::VerificationEngine;
use crate::ports::report_source_port::{ReportDocuments, ReportSource};
use crate::ports::store_port::PredictionStore;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedDay {
    pub date: NaiveDate,
    pub kind: DocumentKind,
    pub records: usize,
    pub discarded: usize,
    pub verified: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportSummary {
    pub imported: Vec<ImportedDay>,
    /// Dates with no usable predictions in either document.
    pub skipped: Vec<NaiveDate>,
}

impl ImportSummary {
    pub fn total_records(&self) -> usize {
        self.imported.iter().map(|d| d.records).sum()
    }

    pub fn total_verified(&self) -> usize {
        self.imported.iter().map(|d| d.verified).sum()
    }
}

/// Pick the extraction for one day: the post-market table when it yields
/// records, the pre-market forecasts otherwise.
pub fn extract_day(docs: &ReportDocuments) -> Option<Extraction> {
    let review = docs.review.as_deref().map(extract);
    if let Some(ex) = review.filter(|ex| !ex.is_empty()) {
        return Some(ex);
    }
    docs.forecast
        .as_deref()
        .map(extract)
        .filter(|ex| !ex.is_empty())
}

/// Extract, store and forward-verify each date in order. Records are stored
/// under the archive date, whatever date the document headings carry.
pub fn import_history(
    source: &dyn ReportSource,
    store: &mut dyn PredictionStore,
    engine: &VerificationEngine<'_>,
    dates: &[NaiveDate],
) -> Result<ImportSummary, PredtrackError> {
    let mut summary = ImportSummary::default();

    for &date in dates {
        let docs = source.load(date)?;
        let Some(extraction) = extract_day(&docs) else {
            tracing::warn!("{date}: no predictions found, skipping");
            summary.skipped.push(date);
            continue;
        };

        if extraction.reference_date.is_some_and(|d| d != date) {
            tracing::debug!(
                "{date}: document dated {:?}, storing under archive date",
                extraction.reference_date
            );
        }

        let records = extraction.records.len();
        store.upsert(date, extraction.records)?;
        let report = engine.verify_forward(store, date)?;

        tracing::info!(
            "{date}: imported {records} predictions ({} discarded), {} verified",
            extraction.diagnostics.len(),
            report.total_verified()
        );
        summary.imported.push(ImportedDay {
            date,
            kind: extraction.kind,
            records,
            discarded: extraction.diagnostics.len(),
            verified: report.total_verified(),
        });
    }

    Ok(summary)
}
