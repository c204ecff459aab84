//! Tracker configuration: validation and construction from a [`ConfigPort`].

use std::path::PathBuf;

use crate::domain::error::PredtrackError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_REPORT_OUTPUT: &str = "data/predictions/historical_analysis.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBackend {
    Csv,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub store_backend: StoreBackend,
    pub store_path: PathBuf,
    /// Indent the JSON store document.
    pub pretty_json: bool,
    pub price_backend: PriceBackend,
    pub price_path: PathBuf,
    pub report_output: PathBuf,
}

pub fn build_tracker_config(config: &dyn ConfigPort) -> Result<TrackerConfig, PredtrackError> {
    let store_backend = match backend(config, "store", "json")?.as_str() {
        "json" => StoreBackend::Json,
        "sqlite" => StoreBackend::Sqlite,
        other => return Err(unknown_backend("store", other)),
    };
    let price_backend = match backend(config, "prices", "csv")?.as_str() {
        "csv" => PriceBackend::Csv,
        "sqlite" => PriceBackend::Sqlite,
        other => return Err(unknown_backend("prices", other)),
    };

    Ok(TrackerConfig {
        store_backend,
        store_path: PathBuf::from(config.require_string("store", "path")?),
        pretty_json: config.get_bool("store", "pretty", true),
        price_backend,
        price_path: PathBuf::from(config.require_string("prices", "path")?),
        report_output: config
            .get_string("report", "output")
            .filter(|s| !s.trim().is_empty())
            .map(|s| PathBuf::from(s.trim()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_OUTPUT)),
    })
}

fn backend(config: &dyn ConfigPort, section: &str, default: &str) -> Result<String, PredtrackError> {
    let value = config
        .get_string(section, "backend")
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string());

    if value == "sqlite" && !cfg!(feature = "sqlite") {
        return Err(PredtrackError::ConfigInvalid {
            section: section.to_string(),
            key: "backend".to_string(),
            reason: "sqlite feature is required for backend = sqlite".to_string(),
        });
    }
    Ok(value)
}

fn unknown_backend(section: &str, value: &str) -> PredtrackError {
    let expected = if section == "store" {
        "json or sqlite"
    } else {
        "csv or sqlite"
    };
    PredtrackError::ConfigInvalid {
        section: section.to_string(),
        key: "backend".to_string(),
        reason: format!("unknown backend '{value}', expected {expected}"),
    }
}
