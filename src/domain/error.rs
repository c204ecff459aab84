//! Domain error types.

/// Why a single candidate block was dropped during extraction.
///
/// These never escape the extractor; they are collected as diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("block header has no name/symbol")]
    MissingHeader,

    #[error("no symbol found")]
    MissingSymbol,

    #[error("no direction field")]
    MissingDirection,

    #[error("unrecognised direction '{0}'")]
    UnknownDirection(String),

    #[error("no target price field")]
    MissingTarget,

    #[error("no percentage range")]
    MissingPercentRange,

    #[error("malformed number '{0}'")]
    MalformedNumber(String),

    #[error("inverted range: min {min} > max {max}")]
    InvertedRange { min: f64, max: f64 },

    #[error("document has no reference date")]
    MissingReferenceDate,
}

/// Top-level error type for predtrack.
#[derive(Debug, thiserror::Error)]
pub enum PredtrackError {
    #[error("store error: {reason}")]
    Store { reason: String },

    #[error("store file {path} is corrupt: {reason}")]
    StoreCorrupt { path: String, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price data error for {symbol}: {reason}")]
    PriceData { symbol: String, reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&PredtrackError> for std::process::ExitCode {
    fn from(err: &PredtrackError) -> Self {
        let code: u8 = match err {
            PredtrackError::Io(_) => 1,
            PredtrackError::ConfigParse { .. }
            | PredtrackError::ConfigMissing { .. }
            | PredtrackError::ConfigInvalid { .. } => 2,
            PredtrackError::Store { .. }
            | PredtrackError::StoreCorrupt { .. }
            | PredtrackError::Database { .. }
            | PredtrackError::DatabaseQuery { .. } => 3,
            PredtrackError::PriceData { .. } => 5,
            PredtrackError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
