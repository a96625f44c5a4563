//! Test Helper Utilities
//!
//! Shared utilities for testing pathways-import

pub mod legacy_csv_builder;
pub mod log_capture;

// Re-export commonly used items
pub use legacy_csv_builder::{LegacyCsvBuilder, LEGACY_HEADERS};
pub use log_capture::{capture_logs, LogCapture};
