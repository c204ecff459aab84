//! CSV closing-price adapter: one `<SYMBOL>.csv` per symbol.

use crate::domain::error::PredtrackError;
use crate::ports::price_port::{PricePort, Quote};
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// All `(date, close)` rows of a symbol, ascending. `None` if the symbol
    /// has no file.
    pub fn load_closes(&self, symbol: &str) -> Result<Option<Vec<(NaiveDate, f64)>>, PredtrackError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| PredtrackError::PriceData {
            symbol: symbol.to_string(),
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let err = |reason: String| PredtrackError::PriceData {
            symbol: symbol.to_string(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| err(format!("CSV header error: {}", e)))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| err(format!("missing {} column", name)))
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut closes = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| err(format!("CSV parse error: {}", e)))?;

            let date_str = record
                .get(date_col)
                .ok_or_else(|| err("missing date value".into()))?
                .trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(date_str, "%Y/%m/%d"))
                .map_err(|e| err(format!("invalid date '{}': {}", date_str, e)))?;

            let close_str = record
                .get(close_col)
                .ok_or_else(|| err("missing close value".into()))?
                .trim()
                .replace(',', "");
            let close: f64 = close_str
                .parse()
                .map_err(|e| err(format!("invalid close '{}': {}", close_str, e)))?;

            closes.push((date, close));
        }

        closes.sort_by_key(|(d, _)| *d);
        Ok(Some(closes))
    }
}

impl PricePort for CsvPriceAdapter {
    fn close(&self, symbol: &str, date: NaiveDate) -> Result<Quote, PredtrackError> {
        let Some(closes) = self.load_closes(symbol)? else {
            return Ok(Quote::Unavailable);
        };

        if let Ok(idx) = closes.binary_search_by_key(&date, |(d, _)| *d) {
            return Ok(Quote::Close(closes[idx].1));
        }
        match closes.last() {
            Some((last, _)) if date > *last => Ok(Quote::NotYetAvailable),
            None => Ok(Quote::NotYetAvailable),
            Some(_) => Ok(Quote::Unavailable),
        }
    }
}
