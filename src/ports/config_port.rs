//! Configuration access port trait.

use crate::domain::error::PredtrackError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Non-empty string value or `ConfigMissing`.
    fn require_string(&self, section: &str, key: &str) -> Result<String, PredtrackError> {
        self.get_string(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PredtrackError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }
}
