//! Legacy flat CSV dialect
//!
//! One row per organization or service bundle, with wide column groups for
//! the site, its addresses, phones and taxonomy terms. `ParentAgencyNum == "0"`
//! marks an organization row; any other value is the owning organization of
//! a service row.
//!
//! Unknown headers are ignored. The header row must carry
//! `ResourceAgencyNum` and `ParentAgencyNum`, otherwise the file is not in
//! this dialect and the run stops.

use super::{clean_header, BundleMapper};
use crate::builder::{Bundle, BundleSettings, RecordBuilder};
use crate::error::{ImportError, ParseError, Result};
use crate::models::AddressType;
use crate::parsers::address::{self, AddressPart};
use crate::parsers::phone::{self, PhonePart};
use csv::StringRecord;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub const OWN_ID_HEADER: &str = "ResourceAgencyNum";
pub const PARENT_ID_HEADER: &str = "ParentAgencyNum";

/// Headers that must be present for a file to be read as this dialect
pub const REQUIRED_HEADERS: &[&str] = &[OWN_ID_HEADER, PARENT_ID_HEADER];

/// Canonical organization/service/location field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyField {
    OwnId,
    ParentId,
    Name,
    AlternateName,
    Description,
    Email,
    Url,
    LastVerifiedOn,
    AgencyStatus,
    Latitude,
    Longitude,
    /// Free-text taxonomy terms (vocabulary inferred or configured)
    Taxonomy,
    /// AIRS code column
    TaxonomyCodes,
}

/// What one source column feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyColumn {
    Field(LegacyField),
    Address(AddressType, AddressPart),
    Phone(usize, PhonePart),
}

/// Header table of the legacy dialect
#[derive(Debug, Clone)]
pub struct LegacyCsvDialect {
    fields: HashMap<String, LegacyField>,
    synonyms: BTreeMap<String, String>,
}

impl Default for LegacyCsvDialect {
    fn default() -> Self {
        let fields = [
            (OWN_ID_HEADER, LegacyField::OwnId),
            (PARENT_ID_HEADER, LegacyField::ParentId),
            ("PublicName", LegacyField::Name),
            ("AlternateName", LegacyField::AlternateName),
            ("AgencyDescription", LegacyField::Description),
            ("EmailAddressMain", LegacyField::Email),
            ("WebsiteAddress", LegacyField::Url),
            ("LastVerifiedOn", LegacyField::LastVerifiedOn),
            ("AgencyStatus", LegacyField::AgencyStatus),
            ("Latitude", LegacyField::Latitude),
            ("Longitude", LegacyField::Longitude),
            ("TaxonomyTerm", LegacyField::Taxonomy),
            ("TaxonomyTerms", LegacyField::Taxonomy),
            ("TaxonomyTermsNotDeactivated", LegacyField::Taxonomy),
            ("TaxonomyCodes", LegacyField::TaxonomyCodes),
        ]
        .into_iter()
        .map(|(header, field)| (header.to_string(), field))
        .collect();

        Self {
            fields,
            synonyms: BTreeMap::new(),
        }
    }
}

impl LegacyCsvDialect {
    /// Extend the table with `source header → known header` synonyms
    pub fn with_synonyms(mut self, synonyms: BTreeMap<String, String>) -> Self {
        self.synonyms.extend(synonyms);
        self
    }

    /// Resolve one header to the column it feeds, if any
    pub fn classify(&self, header: &str) -> Option<LegacyColumn> {
        let header = clean_header(header);
        let header = self.synonyms.get(header).map(String::as_str).unwrap_or(header);

        if let Some(field) = self.fields.get(header) {
            return Some(LegacyColumn::Field(*field));
        }
        if let Some((address_type, part)) = address::classify_header(header) {
            return Some(LegacyColumn::Address(address_type, part));
        }
        phone::classify_header(header).map(|(slot, part)| LegacyColumn::Phone(slot, part))
    }

    /// Resolve a header row into a row mapper
    ///
    /// Fails with `HeaderMismatch` when a required header is absent.
    pub fn mapper(
        &self,
        headers: &StringRecord,
        settings: BundleSettings,
        source: &str,
    ) -> Result<LegacyRowMapper> {
        let columns: Vec<(String, Option<LegacyColumn>)> = headers
            .iter()
            .map(|h| (clean_header(h).to_string(), self.classify(h)))
            .collect();

        let has = |field: LegacyField| {
            columns
                .iter()
                .any(|(_, c)| *c == Some(LegacyColumn::Field(field)))
        };
        if !has(LegacyField::OwnId) || !has(LegacyField::ParentId) {
            return Err(ImportError::HeaderMismatch {
                file: source.to_string(),
                expected: REQUIRED_HEADERS.iter().map(|h| h.to_string()).collect(),
                found: columns.into_iter().map(|(h, _)| h).collect(),
            });
        }

        let ignored: Vec<&str> = columns
            .iter()
            .filter(|(_, c)| c.is_none())
            .map(|(h, _)| h.as_str())
            .collect();
        if !ignored.is_empty() {
            debug!(source, ignored = ?ignored, "Ignoring unmapped legacy columns");
        }

        Ok(LegacyRowMapper { columns, settings })
    }
}

/// Maps rows of one legacy file, built from its header row
#[derive(Debug, Clone)]
pub struct LegacyRowMapper {
    columns: Vec<(String, Option<LegacyColumn>)>,
    settings: BundleSettings,
}

impl BundleMapper for LegacyRowMapper {
    type Raw = StringRecord;

    fn map_bundle(&self, raw: &StringRecord, context: &str) -> std::result::Result<Bundle, ParseError> {
        let mut builder = RecordBuilder::new(&self.settings, context);

        for ((header, column), value) in self.columns.iter().zip(raw.iter()) {
            let Some(column) = column else {
                continue;
            };
            match *column {
                LegacyColumn::Field(field) => apply_field(&mut builder, field, header, value),
                LegacyColumn::Address(address_type, part) => {
                    builder.set_address(address_type, part, value)
                }
                LegacyColumn::Phone(slot, part) => builder.set_phone(slot, part, value),
            }
        }

        builder.build(OWN_ID_HEADER, PARENT_ID_HEADER)
    }
}

fn apply_field(builder: &mut RecordBuilder<'_>, field: LegacyField, header: &str, value: &str) {
    match field {
        LegacyField::OwnId => builder.set_own_id(value),
        LegacyField::ParentId => builder.set_parent_id(value),
        LegacyField::Name => builder.set_name(value),
        LegacyField::AlternateName => builder.set_alternate_name(value),
        LegacyField::Description => builder.set_description(value),
        LegacyField::Email => builder.set_email(value),
        LegacyField::Url => builder.set_url(value),
        LegacyField::LastVerifiedOn => builder.set_last_verified_on(header, value),
        LegacyField::AgencyStatus => builder.set_status(value),
        LegacyField::Latitude => builder.set_latitude(header, value),
        LegacyField::Longitude => builder.set_longitude(header, value),
        LegacyField::Taxonomy => builder.add_taxonomy(value, false),
        LegacyField::TaxonomyCodes => builder.add_taxonomy(value, true),
    }
}

/// Streams bundles from a legacy CSV source, one per non-empty row
pub struct LegacyCsvReader<R> {
    records: csv::StringRecordsIntoIter<R>,
    mapper: LegacyRowMapper,
}

impl LegacyCsvReader<File> {
    pub fn from_path(
        path: &Path,
        dialect: &LegacyCsvDialect,
        settings: BundleSettings,
    ) -> Result<Self> {
        if !path.exists() {
            return Err(ImportError::MissingFile(path.to_path_buf()));
        }
        info!(path = %path.display(), "Reading legacy CSV export");
        let file = File::open(path)?;
        Self::from_reader(file, dialect, settings, &path.display().to_string())
    }
}

impl<R: Read> LegacyCsvReader<R> {
    /// Read the header row and prepare the mapper
    pub fn from_reader(
        reader: R,
        dialect: &LegacyCsvDialect,
        settings: BundleSettings,
        source: &str,
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?.clone();
        let mapper = dialect.mapper(&headers, settings, source)?;
        Ok(Self {
            records: reader.into_records(),
            mapper,
        })
    }
}

impl<R: Read> Iterator for LegacyCsvReader<R> {
    type Item = Result<Bundle>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(ImportError::from_csv_record(e, None))),
            };
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }

            let context = match record.position() {
                Some(position) => format!("line {}", position.line()),
                None => "line ?".to_string(),
            };
            return Some(self.mapper.map_bundle(&record, &context).map_err(ImportError::from));
        }
    }
}
