//! Concrete adapter implementations for ports.

pub mod clock_adapter;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_store_adapter;
pub mod markdown_report_adapter;
pub mod report_dir_adapter;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
