//! Trading-day calendar arithmetic.
//!
//! Counts Monday through Friday only. Exchange holidays are not modelled, so a
//! holiday inside a horizon window shifts the mapped dates by one day.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Step forward `n` trading days. `n == 0` returns `date` unchanged, even on
/// a weekend.
pub fn add_trading_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut counted = 0;
    while counted < n {
        current += Duration::days(1);
        if is_trading_day(current) {
            counted += 1;
        }
    }
    current
}

/// Step backward `n` trading days. `n == 0` returns `date` unchanged.
pub fn subtract_trading_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut counted = 0;
    while counted < n {
        current -= Duration::days(1);
        if is_trading_day(current) {
            counted += 1;
        }
    }
    current
}

/// The last trading day strictly before `date`.
pub fn previous_trading_day(date: NaiveDate) -> NaiveDate {
    subtract_trading_days(date, 1)
}

/// Number of trading days in the half-open interval `(from, to]`.
pub fn trading_days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut current = from;
    let mut counted = 0;
    while current < to {
        current += Duration::days(1);
        if is_trading_day(current) {
            counted += 1;
        }
    }
    counted
}
