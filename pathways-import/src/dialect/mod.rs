//! Source dialects
//!
//! Each dialect translates its own column headers (or tag paths) into the
//! canonical fields of the [`RecordBuilder`](crate::builder::RecordBuilder).
//! Header tables are immutable values built once per run and handed to the
//! mapper; nothing here is process-wide mutable state.
//!
//! - [`legacy_csv`]: flat one-row-per-bundle export
//! - [`xml_tree`]: hierarchical `Agency/Site/SiteService` export
//! - [`open_referral`]: normalized eight-file tabular set

pub mod legacy_csv;
pub mod open_referral;
pub mod xml_tree;

use crate::builder::Bundle;
use crate::error::{ImportError, ParseError, Result};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use std::fmt;
use std::str::FromStr;

/// Translates one raw source bundle into built records
pub trait BundleMapper {
    type Raw;

    fn map_bundle(&self, raw: &Self::Raw, context: &str) -> std::result::Result<Bundle, ParseError>;
}

/// Supported source shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    LegacyCsv,
    OpenReferral,
    XmlTree,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::LegacyCsv => "legacy-csv",
            Dialect::OpenReferral => "open-referral",
            Dialect::XmlTree => "xml",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy-csv" | "legacy" | "icarol" | "csv" => Ok(Dialect::LegacyCsv),
            "open-referral" | "openreferral" | "hsds" => Ok(Dialect::OpenReferral),
            "xml" | "xml-tree" | "tree" => Ok(Dialect::XmlTree),
            other => Err(ImportError::Config(format!(
                "Unknown dialect '{}' (expected legacy-csv, open-referral or xml)",
                other
            ))),
        }
    }
}

/// Header cell with a UTF-8 byte-order mark and surrounding space removed
pub fn clean_header(header: &str) -> &str {
    header.trim_start_matches('\u{feff}').trim()
}

/// Validated header row of a fixed-layout file
#[derive(Debug, Clone)]
pub struct HeaderTable {
    file: String,
    columns: Vec<String>,
    record: StringRecord,
}

impl HeaderTable {
    /// Require the header row to equal `expected` exactly, in order
    pub fn validate(file: &str, expected: &[&str], found: &StringRecord) -> Result<Self> {
        let columns: Vec<String> = found.iter().map(|h| clean_header(h).to_string()).collect();
        if columns.len() != expected.len() || columns.iter().zip(expected).any(|(c, e)| c != e) {
            return Err(ImportError::HeaderMismatch {
                file: file.to_string(),
                expected: expected.iter().map(|e| e.to_string()).collect(),
                found: columns,
            });
        }
        let record = StringRecord::from(columns.clone());
        Ok(Self {
            file: file.to_string(),
            columns,
            record,
        })
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    /// Column name at a position
    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Deserialize a row into a record keyed by the validated header
    pub fn deserialize<T: DeserializeOwned>(&self, row: &StringRecord) -> csv::Result<T> {
        row.deserialize(Some(&self.record))
    }

    /// Cell of a named column; empty when the row is short
    pub fn get<'r>(&self, row: &'r StringRecord, column: &str) -> &'r str {
        self.index(column)
            .and_then(|idx| row.get(idx))
            .unwrap_or_default()
    }

    /// Non-empty cell of a named column
    pub fn optional(&self, row: &StringRecord, column: &str) -> Option<String> {
        crate::parsers::values::non_empty(self.get(row, column))
    }

    /// Non-empty cell of a required column
    pub fn required(
        &self,
        row: &StringRecord,
        column: &str,
        context: &str,
    ) -> std::result::Result<String, ParseError> {
        self.optional(row, column)
            .ok_or_else(|| ParseError::missing(column, context))
    }
}
