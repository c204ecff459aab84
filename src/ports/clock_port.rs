//! Source of "today" for scheduling verification runs.

use chrono::NaiveDate;

pub trait Clock {
    fn today(&self) -> NaiveDate;
}
