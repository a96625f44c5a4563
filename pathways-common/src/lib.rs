//! # Pathways Common Library
//!
//! Shared code for the Pathways directory import tools:
//! - Error and result types
//! - TOML bootstrap configuration and config-file discovery
//! - Output folder resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
