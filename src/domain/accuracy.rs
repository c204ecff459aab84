//! Accuracy statistics per horizon, derived purely from stored results.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::domain::prediction::{
    Horizon, HorizonSummary, Outcome, PredictionRecord, PredictionSet,
};

/// Summary of one horizon over one set of records. Pending results are
/// excluded from `verified`; `accuracy` is `None` until something verifies.
pub fn summarize_horizon(records: &[PredictionRecord], horizon: Horizon) -> HorizonSummary {
    let verified = records
        .iter()
        .filter(|r| r.result(horizon).is_terminal())
        .count();
    let success = records
        .iter()
        .filter(|r| r.result(horizon) == Outcome::Success)
        .count();
    HorizonSummary {
        total: records.len(),
        verified,
        success,
        accuracy: ratio(success, verified),
    }
}

/// Summaries for every horizon of one set.
pub fn summarize_set(set: &PredictionSet) -> BTreeMap<Horizon, HorizonSummary> {
    Horizon::ALL
        .iter()
        .map(|&h| (h, summarize_horizon(&set.predictions, h)))
        .collect()
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonAccuracy {
    pub horizon: Horizon,
    /// Verified (non-pending) results.
    pub samples: usize,
    pub successes: usize,
    pub partials: usize,
    pub failures: usize,
    pub direction_hits: usize,
    /// Reference dates contributing at least one verified result.
    pub days: usize,
    pub accuracy: Option<f64>,
    pub direction_accuracy: Option<f64>,
    /// Mean of each day's accuracy, weighting days equally.
    pub mean_daily_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    pub horizons: Vec<HorizonAccuracy>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Prediction sets considered.
    pub days: usize,
    /// Prediction records considered.
    pub records: usize,
}

impl AccuracyReport {
    pub fn horizon(&self, horizon: Horizon) -> Option<&HorizonAccuracy> {
        self.horizons.iter().find(|h| h.horizon == horizon)
    }

    /// Accuracy difference against T+0, when both are defined.
    pub fn delta_vs_base(&self, horizon: Horizon) -> Option<f64> {
        let base = self.horizon(Horizon::T0)?.accuracy?;
        let this = self.horizon(horizon)?.accuracy?;
        Some(this - base)
    }

    /// Horizon with the highest defined accuracy. Ties go to the shorter horizon.
    pub fn best_horizon(&self) -> Option<&HorizonAccuracy> {
        self.horizons
            .iter()
            .filter(|h| h.accuracy.is_some())
            .fold(None, |best: Option<&HorizonAccuracy>, h| match best {
                Some(b) if b.accuracy >= h.accuracy => Some(b),
                _ => Some(h),
            })
    }

    pub fn total_samples(&self) -> usize {
        self.horizons.iter().map(|h| h.samples).sum()
    }
}

/// Aggregate every record of every set, per horizon.
pub fn aggregate(sets: &[PredictionSet]) -> AccuracyReport {
    let horizons = Horizon::ALL
        .iter()
        .map(|&horizon| aggregate_horizon(sets, horizon))
        .collect();

    AccuracyReport {
        horizons,
        first_date: sets.iter().map(|s| s.reference_date).min(),
        last_date: sets.iter().map(|s| s.reference_date).max(),
        days: sets.len(),
        records: sets.iter().map(|s| s.predictions.len()).sum(),
    }
}

fn aggregate_horizon(sets: &[PredictionSet], horizon: Horizon) -> HorizonAccuracy {
    let mut acc = HorizonAccuracy {
        horizon,
        samples: 0,
        successes: 0,
        partials: 0,
        failures: 0,
        direction_hits: 0,
        days: 0,
        accuracy: None,
        direction_accuracy: None,
        mean_daily_accuracy: None,
    };
    let mut daily = Vec::new();

    for set in sets {
        let summary = summarize_horizon(&set.predictions, horizon);
        if let Some(day_accuracy) = summary.accuracy {
            daily.push(day_accuracy);
        }

        for record in &set.predictions {
            let Some(v) = record.verification.get(&horizon) else {
                continue;
            };
            match v.result {
                Outcome::Pending => continue,
                Outcome::Success => acc.successes += 1,
                Outcome::Partial => acc.partials += 1,
                Outcome::Fail => acc.failures += 1,
            }
            acc.samples += 1;
            if v.direction_correct == Some(true) {
                acc.direction_hits += 1;
            }
        }
    }

    acc.days = daily.len();
    acc.accuracy = ratio(acc.successes, acc.samples);
    acc.direction_accuracy = ratio(acc.direction_hits, acc.samples);
    if !daily.is_empty() {
        acc.mean_daily_accuracy = Some(daily.iter().sum::<f64>() / daily.len() as f64);
    }
    acc
}

/// Fold the summaries persisted with each set. Equal to [`aggregate`]'s
/// sample and success counts whenever the stored summaries are current.
pub fn combine_summaries(sets: &[PredictionSet]) -> BTreeMap<Horizon, HorizonSummary> {
    Horizon::ALL
        .iter()
        .map(|&horizon| {
            let (total, verified, success) = sets
                .iter()
                .filter_map(|s| s.summary.get(&horizon))
                .fold((0, 0, 0), |(t, v, s), h| (t + h.total, v + h.verified, s + h.success));
            (
                horizon,
                HorizonSummary {
                    total,
                    verified,
                    success,
                    accuracy: ratio(success, verified),
                },
            )
        })
        .collect()
}
