//! Prediction extraction from report text.
//!
//! Two stages: [`segment`] cuts the document into candidate blocks, then the
//! extractors in [`fields`] pull each field out with an explicit outcome.
//! A block whose required fields fail is dropped and reported as a
//! [`Diagnostic`]; extraction itself never fails.

pub mod fields;
mod scanner;
pub mod segment;

use chrono::NaiveDate;

use crate::domain::error::FieldError;
use crate::domain::prediction::PredictionRecord;
use segment::{CandidateBlock, ForecastBlock, Segments, TableRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Forward-looking `預測N:` sections with price targets.
    Forecast,
    /// Post-hoc table of predicted vs observed percentage moves.
    Review,
    Empty,
}

/// A dropped block and the reason it was dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub symbol: Option<String>,
    pub error: FieldError,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "line {} ({}): {}", self.line, symbol, self.error),
            None => write!(f, "line {}: {}", self.line, self.error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub reference_date: Option<NaiveDate>,
    pub kind: DocumentKind,
    pub records: Vec<PredictionRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn discarded(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn extract(text: &str) -> Extraction {
    let segments = segment::segment(text);

    let Some(reference_date) = segments.reference_date else {
        return Extraction {
            reference_date: None,
            kind: DocumentKind::Empty,
            records: Vec::new(),
            diagnostics: vec![Diagnostic {
                line: 0,
                symbol: None,
                error: FieldError::MissingReferenceDate,
            }],
        };
    };

    let candidates = segments.candidates();
    let kind = match candidates.first() {
        Some(CandidateBlock::Forecast(_)) => DocumentKind::Forecast,
        Some(CandidateBlock::ReviewRow(_)) => DocumentKind::Review,
        None => DocumentKind::Empty,
    };

    let mut records = Vec::new();
    let mut diagnostics = Vec::new();

    for candidate in &candidates {
        let outcome = match candidate {
            CandidateBlock::Forecast(block) => forecast_record(block, &segments, reference_date),
            CandidateBlock::ReviewRow(row) => review_record(row, reference_date),
        };
        match outcome {
            Ok(record) => records.push(record),
            Err((symbol, error)) => {
                let diagnostic = Diagnostic {
                    line: candidate.line(),
                    symbol,
                    error,
                };
                tracing::debug!("dropped block: {diagnostic}");
                diagnostics.push(diagnostic);
            }
        }
    }

    Extraction {
        reference_date: Some(reference_date),
        kind,
        records,
        diagnostics,
    }
}

type BlockResult = Result<PredictionRecord, (Option<String>, FieldError)>;

fn forecast_record(block: &ForecastBlock, segments: &Segments, date: NaiveDate) -> BlockResult {
    let (name, symbol) = fields::header(block.header).map_err(|e| (None, e))?;
    let tag = |e: FieldError| (Some(symbol.clone()), e);

    let direction = fields::direction(&block.body).map_err(tag)?;
    let target = fields::target(&block.body).map_err(tag)?;

    let mut record = PredictionRecord::new(symbol.clone(), name, date, direction).with_target(target);
    record.prev_close = fields::prev_close(&block.body, &symbol, &segments.table_rows);
    record.rationale = fields::rationale(&block.body);
    Ok(record)
}

fn review_record(row: &TableRow, date: NaiveDate) -> BlockResult {
    let (name, symbol) = fields::review_identity(row.cells[0]).map_err(|e| (None, e))?;
    let tag = |e: FieldError| (Some(symbol.clone()), e);

    let pct_range = fields::percent_range(row.cells[1]).map_err(tag)?;
    let observed = fields::observed_percent(row.cells[2]).map_err(tag)?;

    let mut record = PredictionRecord::new(symbol.clone(), name, date, pct_range.implied_direction())
        .with_pct_range(pct_range);
    record.observed_pct = Some(observed);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prediction::Direction;

    const FORECAST: &str = "\
# 盤前分析 2025-10-14

| 代號 | 名稱 | 收盤 |
|---|---|---|
| **2330** | 台積電 | 590 |

#### 預測1: 台積電 (2330) ★★★
**預測方向**: 看漲
**目標價**: 600 ~ 610 元
**理由**: 外資連買

#### 預測2: 聯電 (2303)
**預測方向**: 看跌
**目標價**: 44 ~ 45 元
**前收盤**: 46.2

#### 預測3: 鴻海 (2317)
**預測方向**: 看漲

#### 預測4: 廣達 (2382)
**預測方向**: 看漲
**目標價**: 300 ~ 290 元

#### 預測5: 無代號
**預測方向**: 震盪
**目標價**: 10 ~ 11 元
";

    #[test]
    fn forecast_document_extracts_valid_blocks() {
        let ex = extract(FORECAST);
        assert_eq!(ex.reference_date, NaiveDate::from_ymd_opt(2025, 10, 14));
        assert_eq!(ex.kind, DocumentKind::Forecast);
        assert_eq!(ex.records.len(), 2);

        let tsmc = &ex.records[0];
        assert_eq!(tsmc.symbol, "2330");
        assert_eq!(tsmc.name, "台積電");
        assert_eq!(tsmc.direction, Direction::Up);
        let t = tsmc.target.unwrap();
        assert_eq!((t.min(), t.max()), (600.0, 610.0));
        assert_eq!(tsmc.prev_close, Some(590.0));
        assert_eq!(tsmc.rationale, vec!["外資連買".to_string()]);

        let umc = &ex.records[1];
        assert_eq!(umc.direction, Direction::Down);
        assert_eq!(umc.prev_close, Some(46.2));
    }

    #[test]
    fn malformed_blocks_become_diagnostics() {
        let ex = extract(FORECAST);
        assert_eq!(ex.discarded(), 3);
        assert_eq!(ex.diagnostics[0].symbol.as_deref(), Some("2317"));
        assert_eq!(ex.diagnostics[0].error, FieldError::MissingTarget);
        assert!(matches!(
            ex.diagnostics[1].error,
            FieldError::InvertedRange { .. }
        ));
        assert_eq!(ex.diagnostics[2].symbol, None);
        assert_eq!(ex.diagnostics[2].error, FieldError::MissingSymbol);
    }

    #[test]
    fn review_table_defers_price_bounds() {
        let doc = "\
# 盤後分析 2025-10-14
| 股票 | 預測 | 實際 | 結果 | 說明 |
|---|---|---|---|---|
| **聯電 2303** | +2~4% | **-1.32%** | ❌ | **方向錯誤** |
| **台積電 2330** | -1~+1% | **+0.50%** | ✅ | 符合 |
| **鴻海 2317** | +1~3% | 停牌 | - | - |
";
        let ex = extract(doc);
        assert_eq!(ex.kind, DocumentKind::Review);
        assert_eq!(ex.records.len(), 2);
        assert_eq!(ex.discarded(), 1);

        let umc = &ex.records[0];
        assert_eq!(umc.symbol, "2303");
        assert_eq!(umc.direction, Direction::Up);
        assert!(umc.target.is_none());
        assert!(umc.prev_close.is_none());
        assert_eq!(umc.observed_pct, Some(-1.32));
        assert_eq!(ex.records[1].direction, Direction::Neutral);
    }

    #[test]
    fn pre_market_holdings_table_yields_nothing() {
        let doc = "\
# 盤前分析 2025-10-14

## 外資動向
| 股票 | 持股比例 | 收盤 |
|---|---|---|
| **台積電 2330** | 外資持股 72.5% | 1,045 |
| **聯電 2303** | +1.2% | 46.2 |
";
        let ex = extract(doc);
        assert_eq!(ex.kind, DocumentKind::Empty);
        assert!(ex.is_empty());
        assert_eq!(ex.discarded(), 0);
    }

    #[test]
    fn review_row_with_bad_cells_is_a_diagnostic() {
        let doc = "\
# 盤後分析 2025-10-14
| 股票 | 預測 | 實際 | 結果 |
|---|---|---|---|
| **聯電 2303** | +2-4% | **-1.32%** | ❌ |
| **台積電 2330** | +1~3% 以上 | **+0.50%** | ✅ |
| **鴻海 2317** | +1~3% | 1,045 | ✅ |
";
        let ex = extract(doc);
        assert_eq!(ex.records.len(), 1);
        let r = ex.records[0].pct_range.unwrap();
        assert_eq!((r.min_pct(), r.max_pct()), (2.0, 4.0));
        assert_eq!(ex.discarded(), 2);
        assert!(ex
            .diagnostics
            .iter()
            .all(|d| matches!(d.error, FieldError::MalformedNumber(_))));
    }

    #[test]
    fn missing_reference_date_yields_empty() {
        let ex = extract("#### 預測1: 台積電 (2330)\n**預測方向**: 看漲\n**目標價**: 1 ~ 2\n");
        assert!(ex.is_empty());
        assert_eq!(ex.kind, DocumentKind::Empty);
        assert_eq!(ex.diagnostics[0].error, FieldError::MissingReferenceDate);
    }

    #[test]
    fn garbage_input_never_panics() {
        for input in ["", "|", "# \n|||\n####", "#### 預測1:", "# 2025-10-14\n| a | % |"] {
            let ex = extract(input);
            assert!(ex.records.is_empty());
        }
    }

    #[test]
    fn document_without_blocks_is_empty_kind() {
        let ex = extract("# 盤前分析 2025-10-14\n\nnothing to see\n");
        assert_eq!(ex.kind, DocumentKind::Empty);
        assert_eq!(ex.discarded(), 0);
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic {
            line: 12,
            symbol: Some("2317".into()),
            error: FieldError::MissingTarget,
        };
        assert_eq!(d.to_string(), "line 12 (2317): no target price field");
    }
}
