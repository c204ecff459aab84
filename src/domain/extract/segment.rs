//! Block segmentation: splits a report into typed candidate blocks.
//!
//! Nothing here validates fields. A candidate only says "this region looks
//! like a prediction"; the field extractors decide whether it is usable.

use chrono::NaiveDate;

use super::scanner::{find_date, strip_decoration, Scanner};

const MARKERS: [&str; 4] = ["預測", "预测", "Prediction", "prediction"];
const PREDICTED_COLUMNS: [&str; 3] = ["預測", "预测", "Predict"];
const ACTUAL_COLUMNS: [&str; 3] = ["實際", "实际", "Actual"];
const RESULT_MARKS: [&str; 4] = ["✅", "❌", "⚠️", "⭕"];

/// A `#### 預測N: ...` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBlock<'a> {
    /// 1-based line of the heading.
    pub line: usize,
    /// Heading text after the marker's colon.
    pub header: &'a str,
    pub body: Vec<&'a str>,
}

/// A Markdown table row, cells trimmed, outer pipes removed.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow<'a> {
    pub line: usize,
    pub cells: Vec<&'a str>,
    /// The table's header row names both predicted and actual columns.
    pub in_review_table: bool,
}

impl TableRow<'_> {
    /// Shaped like a post-hoc review row: `| name SYMBOL | +2~4% | -1.3% | ✅ |`
    /// inside a predicted/actual table, or carrying a result mark.
    pub fn is_review_candidate(&self) -> bool {
        if self.cells.len() < 3 || !self.cells[1].contains('%') {
            return false;
        }
        let has_mark = self
            .cells
            .iter()
            .any(|c| RESULT_MARKS.iter().any(|m| c.contains(m)));
        if !(self.in_review_table || has_mark) {
            return false;
        }
        let first = strip_decoration(self.cells[0]);
        first
            .split_whitespace()
            .last()
            .is_some_and(looks_like_symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateBlock<'a> {
    Forecast(ForecastBlock<'a>),
    ReviewRow(TableRow<'a>),
}

impl CandidateBlock<'_> {
    pub fn line(&self) -> usize {
        match self {
            CandidateBlock::Forecast(b) => b.line,
            CandidateBlock::ReviewRow(r) => r.line,
        }
    }
}

#[derive(Debug, Default)]
pub struct Segments<'a> {
    pub reference_date: Option<NaiveDate>,
    pub forecasts: Vec<ForecastBlock<'a>>,
    pub table_rows: Vec<TableRow<'a>>,
}

impl<'a> Segments<'a> {
    pub fn review_rows(&self) -> impl Iterator<Item = &TableRow<'a>> {
        self.table_rows.iter().filter(|r| r.is_review_candidate())
    }

    /// Forecast blocks when present, otherwise review rows.
    pub fn candidates(&self) -> Vec<CandidateBlock<'a>> {
        if !self.forecasts.is_empty() {
            self.forecasts
                .iter()
                .cloned()
                .map(CandidateBlock::Forecast)
                .collect()
        } else {
            self.review_rows()
                .cloned()
                .map(CandidateBlock::ReviewRow)
                .collect()
        }
    }
}

pub fn segment(text: &str) -> Segments<'_> {
    let mut segments = Segments::default();
    let mut current: Option<(usize, ForecastBlock)> = None;
    // Some(review?) while inside a table, decided by its first row.
    let mut table: Option<bool> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if !trimmed.starts_with('|') {
            table = None;
        }

        if let Some((level, heading)) = heading(trimmed) {
            if segments.reference_date.is_none() {
                segments.reference_date = find_date(heading);
            }

            let marker = forecast_marker(heading);
            let closes_current = match &current {
                Some((open_level, _)) => marker.is_some() || level <= *open_level,
                None => false,
            };
            if closes_current {
                if let Some((_, block)) = current.take() {
                    segments.forecasts.push(block);
                }
            }
            if let Some(header) = marker {
                current = Some((
                    level,
                    ForecastBlock {
                        line: line_no,
                        header,
                        body: Vec::new(),
                    },
                ));
                continue;
            }
        }

        if let Some(mut row) = table_row(trimmed, line_no) {
            let review = *table.get_or_insert_with(|| is_review_header(&row.cells));
            row.in_review_table = review;
            segments.table_rows.push(row);
        }

        if let Some((_, block)) = current.as_mut() {
            block.body.push(trimmed);
        }
    }

    if let Some((_, block)) = current.take() {
        segments.forecasts.push(block);
    }

    segments
}

/// `(level, text)` for an ATX heading.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    Some((level, line[level..].trim()))
}

/// Text after `預測N:` / `Prediction N:`, if the heading carries the marker.
fn forecast_marker(heading: &str) -> Option<&str> {
    let mut s = Scanner::new(heading);
    s.skip_decoration();
    if !s.consume_any(&MARKERS) {
        return None;
    }
    s.skip_whitespace();
    let mut digits = 0;
    while s.peek().is_some_and(|c| c.is_ascii_digit()) {
        s.advance();
        digits += 1;
    }
    if digits == 0 {
        return None;
    }
    s.skip_whitespace();
    if !s.consume_any(&[":", "："]) {
        return None;
    }
    Some(s.remaining().trim())
}

fn table_row(line: &str, line_no: usize) -> Option<TableRow<'_>> {
    let inner = line.strip_prefix('|')?;
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    let cells: Vec<&str> = inner.split('|').map(str::trim).collect();
    let is_separator = cells
        .iter()
        .all(|c| !c.is_empty() && c.chars().all(|ch| matches!(ch, '-' | ':' | ' ')));
    if is_separator {
        return None;
    }
    Some(TableRow {
        line: line_no,
        cells,
        in_review_table: false,
    })
}

fn is_review_header(cells: &[&str]) -> bool {
    let has = |names: &[&str]| cells.iter().any(|c| names.iter().any(|n| c.contains(n)));
    has(&PREDICTED_COLUMNS) && has(&ACTUAL_COLUMNS)
}

/// Exchange ticker token: ASCII alphanumerics (plus `.`) with at least one digit.
pub(crate) fn looks_like_symbol(token: &str) -> bool {
    (2..=10).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_alphanumeric() || c == '.')
        && token.chars().any(|c| c.is_ascii_digit())
}
