//! Legacy CSV fixture builder
//!
//! Assembles legacy-dialect exports from `(header, value)` pairs so tests
//! only spell out the columns they care about.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Header row of a typical legacy export
pub const LEGACY_HEADERS: &[&str] = &[
    "ResourceAgencyNum",
    "ParentAgencyNum",
    "PublicName",
    "AlternateName",
    "AgencyDescription",
    "EmailAddressMain",
    "WebsiteAddress",
    "AgencyStatus",
    "Latitude",
    "Longitude",
    "MailingAddress1",
    "MailingAddress2",
    "MailingCity",
    "MailingStateProvince",
    "MailingPostalCode",
    "MailingCountry",
    "PhysicalAddress1",
    "PhysicalCity",
    "PhysicalStateProvince",
    "PhysicalCountry",
    "Phone1Number",
    "Phone1Type",
    "Phone1Name",
    "Phone2Number",
    "Phone2Type",
    "PhoneFax",
    "TaxonomyTerms",
    "TaxonomyCodes",
    "LastVerifiedOn",
];

/// Builder for legacy CSV text
#[derive(Debug, Clone)]
pub struct LegacyCsvBuilder {
    headers: Vec<String>,
    rows: Vec<HashMap<String, String>>,
}

impl LegacyCsvBuilder {
    /// Builder with [`LEGACY_HEADERS`]
    pub fn new() -> Self {
        Self::with_headers(LEGACY_HEADERS)
    }

    pub fn with_headers(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Add a row; unnamed columns stay empty
    pub fn row(mut self, fields: &[(&str, &str)]) -> Self {
        for (header, _) in fields {
            assert!(
                self.headers.iter().any(|h| h == header),
                "Unknown fixture header '{}'",
                header
            );
        }
        self.rows.push(
            fields
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    /// Add an entirely empty row
    pub fn blank_row(mut self) -> Self {
        self.rows.push(HashMap::new());
        self
    }

    /// Render the CSV text, header row first
    pub fn build(&self) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers).unwrap();
        for row in &self.rows {
            let record: Vec<&str> = self
                .headers
                .iter()
                .map(|h| row.get(h).map(String::as_str).unwrap_or(""))
                .collect();
            writer.write_record(&record).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    /// Write the CSV into `dir/name` and return the path
    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

impl Default for LegacyCsvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
