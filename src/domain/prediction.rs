//! Prediction records, per-horizon verification state and date-keyed sets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Trading-day offset from the reference date at which a prediction is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Horizon {
    #[serde(rename = "T+0")]
    T0,
    #[serde(rename = "T+1")]
    T1,
    #[serde(rename = "T+3")]
    T3,
    #[serde(rename = "T+5")]
    T5,
}

impl Horizon {
    /// Processing order; T+0 is the comparison baseline.
    pub const ALL: [Horizon; 4] = [Horizon::T0, Horizon::T1, Horizon::T3, Horizon::T5];

    pub fn offset(self) -> u32 {
        match self {
            Horizon::T0 => 0,
            Horizon::T1 => 1,
            Horizon::T3 => 3,
            Horizon::T5 => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Horizon::T0 => "T+0",
            Horizon::T1 => "T+1",
            Horizon::T3 => "T+3",
            Horizon::T5 => "T+5",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed price band `[min, max]`. Construction rejects `min > max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct PriceTarget {
    min: f64,
    max: f64,
}

impl PriceTarget {
    pub fn new(min: f64, max: f64) -> Result<Self, FieldError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(FieldError::MalformedNumber(format!("{min}~{max}")));
        }
        if min > max {
            return Err(FieldError::InvertedRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

impl TryFrom<(f64, f64)> for PriceTarget {
    type Error = FieldError;

    fn try_from((min, max): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<PriceTarget> for (f64, f64) {
    fn from(t: PriceTarget) -> Self {
        (t.min, t.max)
    }
}

/// Predicted percentage move band, e.g. `+2~4%`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "(f64, f64)", into = "(f64, f64)")]
pub struct PercentRange {
    min_pct: f64,
    max_pct: f64,
}

impl PercentRange {
    pub fn new(min_pct: f64, max_pct: f64) -> Result<Self, FieldError> {
        if min_pct > max_pct {
            return Err(FieldError::InvertedRange {
                min: min_pct,
                max: max_pct,
            });
        }
        Ok(Self { min_pct, max_pct })
    }

    pub fn min_pct(&self) -> f64 {
        self.min_pct
    }

    pub fn max_pct(&self) -> f64 {
        self.max_pct
    }

    /// `min > 0` is bullish, `max < 0` bearish, anything straddling zero neutral.
    pub fn implied_direction(&self) -> Direction {
        if self.min_pct > 0.0 {
            Direction::Up
        } else if self.max_pct < 0.0 {
            Direction::Down
        } else {
            Direction::Neutral
        }
    }

    /// Price band relative to `prev_close`, rounded to cents.
    pub fn to_target(&self, prev_close: f64) -> Result<PriceTarget, FieldError> {
        PriceTarget::new(
            round2(prev_close * (1.0 + self.min_pct / 100.0)),
            round2(prev_close * (1.0 + self.max_pct / 100.0)),
        )
    }
}

impl TryFrom<(f64, f64)> for PercentRange {
    type Error = FieldError;

    fn try_from((min, max): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(min, max)
    }
}

impl From<PercentRange> for (f64, f64) {
    fn from(r: PercentRange) -> Self {
        (r.min_pct, r.max_pct)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Partial,
    Fail,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Pending
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Pending => "pending",
            Outcome::Success => "success",
            Outcome::Partial => "partial",
            Outcome::Fail => "fail",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_target_range: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_correct: Option<bool>,
    pub result: Outcome,
}

impl VerificationResult {
    pub fn pending() -> Self {
        Self {
            date: None,
            close_price: None,
            change_pct: None,
            in_target_range: None,
            direction_correct: None,
            result: Outcome::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.result == Outcome::Pending
    }
}

fn pending_verification() -> BTreeMap<Horizon, VerificationResult> {
    Horizon::ALL
        .iter()
        .map(|&h| (h, VerificationResult::pending()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub symbol: String,
    pub name: String,
    pub reference_date: NaiveDate,
    #[serde(default)]
    pub prev_close: Option<f64>,
    pub direction: Direction,
    #[serde(default)]
    pub target: Option<PriceTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pct_range: Option<PercentRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rationale: Vec<String>,
    #[serde(default = "pending_verification")]
    pub verification: BTreeMap<Horizon, VerificationResult>,
}

impl PredictionRecord {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        reference_date: NaiveDate,
        direction: Direction,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            reference_date,
            prev_close: None,
            direction,
            target: None,
            pct_range: None,
            observed_pct: None,
            rationale: Vec::new(),
            verification: pending_verification(),
        }
    }

    pub fn with_target(mut self, target: PriceTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_prev_close(mut self, prev_close: f64) -> Self {
        self.prev_close = Some(prev_close);
        self
    }

    pub fn with_pct_range(mut self, range: PercentRange) -> Self {
        self.pct_range = Some(range);
        self
    }

    /// Fill `target` from `pct_range` once a reference price is known.
    /// Returns true if the target changed.
    pub fn resolve_target(&mut self) -> bool {
        if self.target.is_some() {
            return false;
        }
        match (self.prev_close, self.pct_range) {
            (Some(prev), Some(range)) if prev > 0.0 => match range.to_target(prev) {
                Ok(target) => {
                    self.target = Some(target);
                    true
                }
                Err(_) => false,
            },
            _ => false,
        }
    }

    /// Both reference price and target band are known.
    pub fn is_resolved(&self) -> bool {
        self.prev_close.is_some_and(|p| p > 0.0) && self.target.is_some()
    }

    pub fn result(&self, horizon: Horizon) -> Outcome {
        self.verification
            .get(&horizon)
            .map(|v| v.result)
            .unwrap_or(Outcome::Pending)
    }

    /// Reset every horizon to pending.
    pub fn reset_verification(&mut self) {
        self.verification = pending_verification();
    }
}

/// Per-horizon totals for one reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonSummary {
    pub total: usize,
    pub verified: usize,
    pub success: usize,
    pub accuracy: Option<f64>,
}

/// All predictions made for one reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    pub reference_date: NaiveDate,
    pub predictions: Vec<PredictionRecord>,
    #[serde(default)]
    pub summary: BTreeMap<Horizon, HorizonSummary>,
}

impl PredictionSet {
    /// Fresh set: every horizon of every record starts pending.
    pub fn new(reference_date: NaiveDate, records: Vec<PredictionRecord>) -> Self {
        let predictions = records
            .into_iter()
            .map(|mut r| {
                r.reference_date = reference_date;
                r.reset_verification();
                r.resolve_target();
                r
            })
            .collect();
        let mut set = Self {
            reference_date,
            predictions,
            summary: BTreeMap::new(),
        };
        for horizon in Horizon::ALL {
            set.refresh_summary(horizon);
        }
        set
    }

    pub fn refresh_summary(&mut self, horizon: Horizon) {
        let summary = crate::domain::accuracy::summarize_horizon(&self.predictions, horizon);
        self.summary.insert(horizon, summary);
    }

    pub fn pending_count(&self, horizon: Horizon) -> usize {
        self.predictions
            .iter()
            .filter(|p| !p.result(horizon).is_terminal())
            .count()
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
