//! Market data port: resolves a symbol and date to a closing price.

use crate::domain::error::PredtrackError;
use chrono::NaiveDate;

/// Answer from a [`PricePort`] lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quote {
    Close(f64),
    /// The date is beyond the provider's latest data (market not closed yet,
    /// or data not ingested yet). Worth retrying later.
    NotYetAvailable,
    /// No close will ever exist for this symbol/date (unknown or delisted
    /// symbol, suspended trading).
    Unavailable,
}

impl Quote {
    pub fn close(self) -> Option<f64> {
        match self {
            Quote::Close(price) => Some(price),
            _ => None,
        }
    }
}

/// Errors are reserved for provider failures (I/O, corrupt data); absence of
/// data is a [`Quote`] variant.
pub trait PricePort {
    fn close(&self, symbol: &str, date: NaiveDate) -> Result<Quote, PredtrackError>;
}
