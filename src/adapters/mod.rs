//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_series_report;
pub mod file_config_adapter;
pub mod markdown_report;
pub mod price_reader;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
pub mod synthetic_adapter;
