#![allow(dead_code)]

use chrono::NaiveDate;
use predtrack::domain::error::PredtrackError;
use predtrack::domain::prediction::{Direction, PredictionRecord, PredictionSet, PriceTarget};
use predtrack::ports::clock_port::Clock;
use predtrack::ports::price_port::{PricePort, Quote};
use predtrack::ports::store_port::PredictionStore;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub struct MockPricePort {
    pub closes: HashMap<(String, NaiveDate), f64>,
    pub errors: HashMap<String, String>,
    /// Dates strictly after this answer `NotYetAvailable`.
    pub latest: Option<NaiveDate>,
    pub calls: Cell<usize>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            closes: HashMap::new(),
            errors: HashMap::new(),
            latest: None,
            calls: Cell::new(0),
        }
    }

    pub fn with_close(mut self, symbol: &str, day: &str, close: f64) -> Self {
        self.closes.insert((symbol.to_string(), date(day)), close);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn with_latest(mut self, day: &str) -> Self {
        self.latest = Some(date(day));
        self
    }
}

impl PricePort for MockPricePort {
    fn close(&self, symbol: &str, day: NaiveDate) -> Result<Quote, PredtrackError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = self.errors.get(symbol) {
            return Err(PredtrackError::PriceData {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        if let Some(close) = self.closes.get(&(symbol.to_string(), day)) {
            return Ok(Quote::Close(*close));
        }
        match self.latest {
            Some(latest) if day <= latest => Ok(Quote::Unavailable),
            _ => Ok(Quote::NotYetAvailable),
        }
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub sets: BTreeMap<NaiveDate, PredictionSet>,
    pub puts: usize,
    pub fail_puts: bool,
}

impl PredictionStore for MemoryStore {
    fn get(&self, day: NaiveDate) -> Result<Option<PredictionSet>, PredtrackError> {
        Ok(self.sets.get(&day).cloned())
    }

    fn put(&mut self, set: &PredictionSet) -> Result<(), PredtrackError> {
        if self.fail_puts {
            return Err(PredtrackError::Store {
                reason: "disk full".into(),
            });
        }
        self.puts += 1;
        self.sets.insert(set.reference_date, set.clone());
        Ok(())
    }

    fn all_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError> {
        Ok(self.sets.keys().copied().collect())
    }
}

pub fn make_record(
    symbol: &str,
    day: &str,
    direction: Direction,
    target: (f64, f64),
    prev_close: Option<f64>,
) -> PredictionRecord {
    let mut record = PredictionRecord::new(symbol, symbol, date(day), direction)
        .with_target(PriceTarget::new(target.0, target.1).unwrap());
    record.prev_close = prev_close;
    record
}

pub const FORECAST_REPORT: &str = "\
# 盤前分析 2025-10-14

## 法人買超
| 代號 | 名稱 | 收盤 |
|------|------|------|
| 2330 | 台積電 | 590 |
| 2303 | 聯電 | 46.2 |

#### 預測1: 台積電 (2330) ★★★
**預測方向**: 看漲
**目標價**: 600 ~ 610 元
**理由**: 外資連續買超

#### 預測2: 聯電 (2303)
**預測方向**: 看跌
**目標價**: 44 ~ 45 元

#### 預測3: 鴻海 (2317)
**預測方向**: 看漲
";

pub const REVIEW_REPORT: &str = "\
# 盤後分析 2025-10-15
| 股票 | 預測 | 實際 | 結果 | 說明 |
|---|---|---|---|---|
| **聯電 2303** | +2~4% | **-1.32%** | ❌ | 方向錯誤 |
| **台積電 2330** | -1~+1% | **+0.50%** | ✅ | 符合 |
";
