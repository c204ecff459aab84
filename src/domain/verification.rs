//! Multi-horizon verification of stored predictions.
//!
//! For an as-of date, each horizon maps back to the reference date whose
//! predictions mature on that day. Pending horizons are classified once a
//! close is available; anything the price source cannot answer stays pending
//! and is retried by the next run.

use chrono::NaiveDate;

use crate::domain::calendar::{add_trading_days, previous_trading_day, subtract_trading_days};
use crate::domain::error::PredtrackError;
use crate::domain::prediction::{
    round2, Direction, Horizon, Outcome, PredictionRecord, PriceTarget, VerificationResult,
};
use crate::ports::clock_port::Clock;
use crate::ports::price_port::{PricePort, Quote};
use crate::ports::store_port::PredictionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub in_target_range: bool,
    pub direction_correct: bool,
    pub outcome: Outcome,
}

/// success if the close lands in the target band, partial if only the
/// direction was right, fail otherwise. Neutral calls never miss on direction.
pub fn classify(
    direction: Direction,
    prev_close: f64,
    target: &PriceTarget,
    close: f64,
) -> Classification {
    let in_target_range = target.contains(close);
    let direction_correct = match direction {
        Direction::Up => close > prev_close,
        Direction::Down => close < prev_close,
        Direction::Neutral => true,
    };
    let outcome = if in_target_range {
        Outcome::Success
    } else if direction_correct {
        Outcome::Partial
    } else {
        Outcome::Fail
    };
    Classification {
        in_target_range,
        direction_correct,
        outcome,
    }
}

/// Percent change rounded to two decimals. `prev_close` must be positive.
pub fn change_pct(prev_close: f64, close: f64) -> f64 {
    round2((close - prev_close) / prev_close * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Processed,
    /// No prediction set exists for the source date.
    NoPredictions,
    /// The as-of date is after today; nothing can have closed yet.
    Deferred,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HorizonRun {
    pub horizon: Horizon,
    pub source_date: NaiveDate,
    pub as_of: NaiveDate,
    pub status: RunStatus,
    pub verified: usize,
    pub still_pending: usize,
    pub unresolved: usize,
    pub already_final: usize,
}

impl HorizonRun {
    fn new(horizon: Horizon, source_date: NaiveDate, as_of: NaiveDate, status: RunStatus) -> Self {
        Self {
            horizon,
            source_date,
            as_of,
            status,
            verified: 0,
            still_pending: 0,
            unresolved: 0,
            already_final: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    pub runs: Vec<HorizonRun>,
}

impl VerifyReport {
    pub fn total_verified(&self) -> usize {
        self.runs.iter().map(|r| r.verified).sum()
    }

    pub fn total_pending(&self) -> usize {
        self.runs.iter().map(|r| r.still_pending + r.unresolved).sum()
    }

    pub fn run(&self, horizon: Horizon) -> Option<&HorizonRun> {
        self.runs.iter().find(|r| r.horizon == horizon)
    }
}

enum RecordStep {
    AlreadyFinal,
    /// Reference price or target still unknown.
    Unresolved { changed: bool },
    /// Resolved, but no close for the as-of date yet.
    Pending { changed: bool },
    Verified,
}

pub struct VerificationEngine<'a> {
    prices: &'a dyn PricePort,
    clock: &'a dyn Clock,
}

impl<'a> VerificationEngine<'a> {
    pub fn new(prices: &'a dyn PricePort, clock: &'a dyn Clock) -> Self {
        Self { prices, clock }
    }

    pub fn verify_today(
        &self,
        store: &mut dyn PredictionStore,
    ) -> Result<VerifyReport, PredtrackError> {
        self.verify(store, self.clock.today())
    }

    /// Check every horizon whose predictions mature on `as_of`.
    ///
    /// Price lookups that fail leave the horizon pending; a store failure
    /// aborts the call.
    pub fn verify(
        &self,
        store: &mut dyn PredictionStore,
        as_of: NaiveDate,
    ) -> Result<VerifyReport, PredtrackError> {
        let today = self.clock.today();
        let mut report = VerifyReport::default();

        for horizon in Horizon::ALL {
            let source_date = subtract_trading_days(as_of, horizon.offset());
            if as_of > today {
                report
                    .runs
                    .push(HorizonRun::new(horizon, source_date, as_of, RunStatus::Deferred));
                continue;
            }
            let run = self.verify_horizon(store, source_date, horizon, as_of)?;
            report.runs.push(run);
        }

        if as_of > today {
            tracing::warn!("as-of date {as_of} is after today ({today}); nothing verified");
        } else {
            tracing::info!(
                "verified {} predictions as of {as_of} ({} still pending)",
                report.total_verified(),
                report.total_pending()
            );
        }
        Ok(report)
    }

    /// Check one reference date at each horizon's maturity date, skipping
    /// horizons that mature after today. Used when importing history.
    pub fn verify_forward(
        &self,
        store: &mut dyn PredictionStore,
        reference_date: NaiveDate,
    ) -> Result<VerifyReport, PredtrackError> {
        let today = self.clock.today();
        let mut report = VerifyReport::default();

        for horizon in Horizon::ALL {
            let as_of = add_trading_days(reference_date, horizon.offset());
            let run = if as_of > today {
                HorizonRun::new(horizon, reference_date, as_of, RunStatus::Deferred)
            } else {
                self.verify_horizon(store, reference_date, horizon, as_of)?
            };
            report.runs.push(run);
        }

        tracing::debug!(
            "forward verification of {reference_date}: {} verified",
            report.total_verified()
        );
        Ok(report)
    }

    fn verify_horizon(
        &self,
        store: &mut dyn PredictionStore,
        source_date: NaiveDate,
        horizon: Horizon,
        as_of: NaiveDate,
    ) -> Result<HorizonRun, PredtrackError> {
        let Some(mut set) = store.get(source_date)? else {
            tracing::debug!("{horizon}: no predictions for {source_date}");
            return Ok(HorizonRun::new(
                horizon,
                source_date,
                as_of,
                RunStatus::NoPredictions,
            ));
        };

        let mut run = HorizonRun::new(horizon, source_date, as_of, RunStatus::Processed);
        let mut changed = false;

        for record in set.predictions.iter_mut() {
            match self.verify_record(record, horizon, source_date, as_of) {
                RecordStep::AlreadyFinal => run.already_final += 1,
                RecordStep::Unresolved { changed: c } => {
                    run.unresolved += 1;
                    changed |= c;
                }
                RecordStep::Pending { changed: c } => {
                    run.still_pending += 1;
                    changed |= c;
                }
                RecordStep::Verified => {
                    run.verified += 1;
                    changed = true;
                }
            }
        }

        if run.verified > 0 {
            set.refresh_summary(horizon);
            tracing::info!(
                "{horizon}: verified {} of {} predictions from {source_date}",
                run.verified,
                set.predictions.len()
            );
        }
        if changed {
            store.put(&set)?;
        }
        Ok(run)
    }

    fn verify_record(
        &self,
        record: &mut PredictionRecord,
        horizon: Horizon,
        source_date: NaiveDate,
        as_of: NaiveDate,
    ) -> RecordStep {
        if record.result(horizon).is_terminal() {
            return RecordStep::AlreadyFinal;
        }

        let mut changed = false;
        if record.prev_close.is_none_or(|p| p <= 0.0) {
            let prev_date = previous_trading_day(source_date);
            match self.lookup(&record.symbol, prev_date) {
                Some(price) if price > 0.0 => {
                    record.prev_close = Some(price);
                    changed = true;
                }
                _ => return RecordStep::Unresolved { changed: false },
            }
        }
        changed |= record.resolve_target();

        let (Some(prev_close), Some(target)) = (record.prev_close, record.target) else {
            return RecordStep::Unresolved { changed };
        };
        let Some(close) = self.lookup(&record.symbol, as_of) else {
            return RecordStep::Pending { changed };
        };

        let c = classify(record.direction, prev_close, &target, close);
        tracing::debug!(
            "{} {horizon}: close {close} vs target {}~{} -> {}",
            record.symbol,
            target.min(),
            target.max(),
            c.outcome
        );
        record.verification.insert(
            horizon,
            VerificationResult {
                date: Some(as_of),
                close_price: Some(close),
                change_pct: Some(change_pct(prev_close, close)),
                in_target_range: Some(c.in_target_range),
                direction_correct: Some(c.direction_correct),
                result: c.outcome,
            },
        );
        RecordStep::Verified
    }

    fn lookup(&self, symbol: &str, date: NaiveDate) -> Option<f64> {
        match self.prices.close(symbol, date) {
            Ok(Quote::Close(price)) => Some(price),
            Ok(Quote::NotYetAvailable) => {
                tracing::debug!("{symbol}: close for {date} not yet available");
                None
            }
            Ok(Quote::Unavailable) => {
                tracing::debug!("{symbol}: no close for {date}");
                None
            }
            Err(e) => {
                tracing::warn!("{symbol}: price lookup for {date} failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn target(min: f64, max: f64) -> PriceTarget {
        PriceTarget::new(min, max).unwrap()
    }

    #[test]
    fn classify_up_prediction() {
        let t = target(102.0, 105.0);
        assert_eq!(classify(Direction::Up, 100.0, &t, 103.0).outcome, Outcome::Success);

        let partial = classify(Direction::Up, 100.0, &t, 108.0);
        assert_eq!(partial.outcome, Outcome::Partial);
        assert!(partial.direction_correct);
        assert!(!partial.in_target_range);

        let fail = classify(Direction::Up, 100.0, &t, 99.0);
        assert_eq!(fail.outcome, Outcome::Fail);
        assert!(!fail.direction_correct);
    }

    #[test]
    fn classify_down_prediction() {
        let t = target(90.0, 95.0);
        assert_eq!(classify(Direction::Down, 100.0, &t, 92.0).outcome, Outcome::Success);
        assert_eq!(classify(Direction::Down, 100.0, &t, 97.0).outcome, Outcome::Partial);
        assert_eq!(classify(Direction::Down, 100.0, &t, 101.0).outcome, Outcome::Fail);
        // unchanged close is not a correct down call
        assert!(!classify(Direction::Down, 100.0, &t, 100.0).direction_correct);
    }

    #[test]
    fn neutral_direction_always_correct() {
        let t = target(99.0, 101.0);
        for close in [50.0, 99.5, 100.0, 150.0] {
            assert!(classify(Direction::Neutral, 100.0, &t, close).direction_correct);
        }
        assert_eq!(classify(Direction::Neutral, 100.0, &t, 150.0).outcome, Outcome::Partial);
    }

    #[test]
    fn change_pct_rounds_to_cents() {
        assert_eq!(change_pct(590.0, 605.0), 2.54);
        assert_eq!(change_pct(100.0, 99.0), -1.0);
    }

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    #[derive(Default)]
    struct Prices(HashMap<(String, NaiveDate), f64>);

    impl PricePort for Prices {
        fn close(&self, symbol: &str, date: NaiveDate) -> Result<Quote, PredtrackError> {
            Ok(self
                .0
                .get(&(symbol.to_string(), date))
                .map(|p| Quote::Close(*p))
                .unwrap_or(Quote::NotYetAvailable))
        }
    }

    #[derive(Default)]
    struct Store(BTreeMap<NaiveDate, crate::domain::prediction::PredictionSet>);

    impl PredictionStore for Store {
        fn get(
            &self,
            date: NaiveDate,
        ) -> Result<Option<crate::domain::prediction::PredictionSet>, PredtrackError> {
            Ok(self.0.get(&date).cloned())
        }
        fn put(
            &mut self,
            set: &crate::domain::prediction::PredictionSet,
        ) -> Result<(), PredtrackError> {
            self.0.insert(set.reference_date, set.clone());
            Ok(())
        }
        fn all_dates(&self) -> Result<Vec<NaiveDate>, PredtrackError> {
            Ok(self.0.keys().copied().collect())
        }
    }

    fn tsmc(date: NaiveDate) -> PredictionRecord {
        PredictionRecord::new("2330", "TSMC", date, Direction::Up)
            .with_target(target(600.0, 610.0))
            .with_prev_close(590.0)
    }

    #[test]
    fn future_as_of_defers_everything() {
        let prices = Prices::default();
        let clock = FixedClock(d(2025, 10, 15));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();
        store.upsert(d(2025, 10, 16), vec![tsmc(d(2025, 10, 16))]).unwrap();

        let report = engine.verify(&mut store, d(2025, 10, 16)).unwrap();
        assert!(report.runs.iter().all(|r| r.status == RunStatus::Deferred));
        assert_eq!(report.total_verified(), 0);
    }

    #[test]
    fn missing_source_set_is_skipped() {
        let prices = Prices::default();
        let clock = FixedClock(d(2025, 10, 31));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();

        let report = engine.verify(&mut store, d(2025, 10, 15)).unwrap();
        assert_eq!(report.runs.len(), 4);
        assert!(report
            .runs
            .iter()
            .all(|r| r.status == RunStatus::NoPredictions));
    }

    #[test]
    fn horizons_map_to_source_dates() {
        let prices = Prices::default();
        let clock = FixedClock(d(2025, 10, 31));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();

        // 2025-10-21 is a Tuesday
        let report = engine.verify(&mut store, d(2025, 10, 21)).unwrap();
        let sources: Vec<_> = report.runs.iter().map(|r| r.source_date).collect();
        assert_eq!(
            sources,
            vec![d(2025, 10, 21), d(2025, 10, 20), d(2025, 10, 16), d(2025, 10, 14)]
        );
    }

    #[test]
    fn unavailable_prev_close_leaves_record_unresolved() {
        let mut prices = Prices::default();
        prices.0.insert(("2303".into(), d(2025, 10, 15)), 45.0);
        let clock = FixedClock(d(2025, 10, 31));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();
        let record = PredictionRecord::new("2303", "UMC", d(2025, 10, 14), Direction::Up)
            .with_target(target(44.0, 46.0));
        store.upsert(d(2025, 10, 14), vec![record]).unwrap();

        let report = engine.verify(&mut store, d(2025, 10, 15)).unwrap();
        assert_eq!(report.run(Horizon::T1).unwrap().unresolved, 1);
        let set = store.get(d(2025, 10, 14)).unwrap().unwrap();
        assert_eq!(set.predictions[0].result(Horizon::T1), Outcome::Pending);
        assert!(set.predictions[0].prev_close.is_none());
    }

    #[test]
    fn prev_close_backfill_resolves_percent_target() {
        let mut prices = Prices::default();
        // trading day before 2025-10-14 (Tue) is 2025-10-13
        prices.0.insert(("2303".into(), d(2025, 10, 13)), 50.0);
        prices.0.insert(("2303".into(), d(2025, 10, 15)), 51.5);
        let clock = FixedClock(d(2025, 10, 31));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();
        let record = PredictionRecord::new("2303", "UMC", d(2025, 10, 14), Direction::Up)
            .with_pct_range(crate::domain::prediction::PercentRange::new(2.0, 4.0).unwrap());
        store.upsert(d(2025, 10, 14), vec![record]).unwrap();

        engine.verify(&mut store, d(2025, 10, 15)).unwrap();

        let set = store.get(d(2025, 10, 14)).unwrap().unwrap();
        let r = &set.predictions[0];
        assert_eq!(r.prev_close, Some(50.0));
        let t = r.target.unwrap();
        assert_eq!((t.min(), t.max()), (51.0, 52.0));
        assert_eq!(r.result(Horizon::T1), Outcome::Success);
        assert_eq!(r.verification[&Horizon::T1].change_pct, Some(3.0));
    }

    #[test]
    fn backfilled_prev_close_is_persisted_even_without_close() {
        let mut prices = Prices::default();
        prices.0.insert(("2303".into(), d(2025, 10, 13)), 50.0);
        let clock = FixedClock(d(2025, 10, 31));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();
        let record = PredictionRecord::new("2303", "UMC", d(2025, 10, 14), Direction::Up)
            .with_target(target(51.0, 52.0));
        store.upsert(d(2025, 10, 14), vec![record]).unwrap();

        let report = engine.verify(&mut store, d(2025, 10, 15)).unwrap();
        assert_eq!(report.run(Horizon::T1).unwrap().still_pending, 1);
        let set = store.get(d(2025, 10, 14)).unwrap().unwrap();
        assert_eq!(set.predictions[0].prev_close, Some(50.0));
    }

    #[test]
    fn terminal_results_are_not_revisited() {
        let mut prices = Prices::default();
        prices.0.insert(("2330".into(), d(2025, 10, 15)), 605.0);
        let clock = FixedClock(d(2025, 10, 31));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();
        store.upsert(d(2025, 10, 14), vec![tsmc(d(2025, 10, 14))]).unwrap();

        engine.verify(&mut store, d(2025, 10, 15)).unwrap();
        prices_changed_second_run(&mut store, &clock);
    }

    fn prices_changed_second_run(store: &mut Store, clock: &FixedClock) {
        let mut revised = Prices::default();
        revised.0.insert(("2330".into(), d(2025, 10, 15)), 580.0);
        let engine = VerificationEngine::new(&revised, clock);
        let report = engine.verify(store, d(2025, 10, 15)).unwrap();
        assert_eq!(report.run(Horizon::T1).unwrap().already_final, 1);
        let set = store.get(d(2025, 10, 14)).unwrap().unwrap();
        let v = &set.predictions[0].verification[&Horizon::T1];
        assert_eq!(v.close_price, Some(605.0));
        assert_eq!(v.result, Outcome::Success);
    }

    #[test]
    fn verify_forward_stops_at_today() {
        let mut prices = Prices::default();
        prices.0.insert(("2330".into(), d(2025, 10, 14)), 598.0);
        prices.0.insert(("2330".into(), d(2025, 10, 15)), 605.0);
        let clock = FixedClock(d(2025, 10, 16));
        let engine = VerificationEngine::new(&prices, &clock);
        let mut store = Store::default();
        store.upsert(d(2025, 10, 14), vec![tsmc(d(2025, 10, 14))]).unwrap();

        let report = engine.verify_forward(&mut store, d(2025, 10, 14)).unwrap();
        assert_eq!(report.run(Horizon::T0).unwrap().status, RunStatus::Processed);
        assert_eq!(report.run(Horizon::T3).unwrap().status, RunStatus::Deferred);
        assert_eq!(report.run(Horizon::T5).unwrap().status, RunStatus::Deferred);

        let set = store.get(d(2025, 10, 14)).unwrap().unwrap();
        assert_eq!(set.predictions[0].result(Horizon::T0), Outcome::Partial);
        assert_eq!(set.predictions[0].result(Horizon::T1), Outcome::Success);
        assert_eq!(set.summary[&Horizon::T1].success, 1);
    }
}
