//! Open Referral (normalized tabular) dialect
//!
//! Eight CSV files in one folder, one entity kind per file. Files are read
//! parents first (see [`EntityFile::ALL`]) and every header row must match
//! the Open Referral layout exactly. Ids are taken as given.
//!
//! Rows are forwarded to the same [`Sink`] and dedup state as the bundle
//! dialects. A row missing a required field is logged and skipped. With
//! `skip_inactive` set, inactive organizations, services and locations are
//! collected in [`InactiveRecords`] and the rows that depend on them are
//! dropped too.

use super::HeaderTable;
use crate::builder::BundleSettings;
use crate::error::{ImportError, ParseError, Result};
use crate::models::{
    Address, EntityFile, Location, Organization, PhoneNumber, Service, ServiceAtLocation,
    ServiceTaxonomyTerm, TaxonomyTerm,
};
use crate::parsers::values;
use crate::pipeline::ImportPipeline;
use crate::sink::Sink;
use csv::{ReaderBuilder, StringRecord};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Ids classified inactive during one Open Referral import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InactiveRecords {
    organizations: HashSet<String>,
    services: HashSet<String>,
    locations: HashSet<String>,
}

impl InactiveRecords {
    pub fn add_organization(&mut self, id: &str) {
        self.organizations.insert(id.to_string());
    }

    pub fn add_service(&mut self, id: &str) {
        self.services.insert(id.to_string());
    }

    pub fn add_location(&mut self, id: &str) {
        self.locations.insert(id.to_string());
    }

    pub fn has_organization(&self, id: Option<&str>) -> bool {
        id.map(|id| self.organizations.contains(id)).unwrap_or(false)
    }

    pub fn has_service(&self, id: Option<&str>) -> bool {
        id.map(|id| self.services.contains(id)).unwrap_or(false)
    }

    pub fn has_location(&self, id: Option<&str>) -> bool {
        id.map(|id| self.locations.contains(id)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.organizations.len() + self.services.len() + self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Imports one Open Referral folder
#[derive(Debug, Clone)]
pub struct OpenReferralImporter {
    folder: PathBuf,
    settings: BundleSettings,
}

/// Per-row outcome
enum Row {
    Written,
    Skipped,
}

impl OpenReferralImporter {
    pub fn new(folder: &Path, settings: BundleSettings) -> Self {
        Self {
            folder: folder.to_path_buf(),
            settings,
        }
    }

    pub fn path_of(&self, file: EntityFile) -> PathBuf {
        self.folder.join(file.file_name())
    }

    /// Import every file into the pipeline's sink
    ///
    /// Fails before writing anything if a file is missing or has the wrong
    /// header row.
    pub fn run<S: Sink>(&self, pipeline: &mut ImportPipeline<S>) -> Result<InactiveRecords> {
        for file in EntityFile::ALL {
            let path = self.path_of(file);
            if !path.exists() {
                error!(file = file.file_name(), "Missing {} file", file.file_name());
                return Err(ImportError::MissingFile(path));
            }
        }
        for file in EntityFile::ALL {
            let mut reader = ReaderBuilder::new().flexible(true).from_path(self.path_of(file))?;
            HeaderTable::validate(file.file_name(), file.columns(), reader.headers()?)?;
        }
        info!(folder = %self.folder.display(), "Reading Open Referral files");

        let skip = pipeline.options().skip_inactive;
        let mut inactive = InactiveRecords::default();

        self.read_file(pipeline, EntityFile::Organizations, |p, table, row, context| {
            self.organization(p, &mut inactive, skip, table, row, context)
        })?;
        self.read_file(pipeline, EntityFile::Services, |p, table, row, context| {
            self.service(p, &mut inactive, skip, table, row, context)
        })?;
        self.read_file(pipeline, EntityFile::Locations, |p, table, row, context| {
            self.location(p, &mut inactive, skip, table, row, context)
        })?;
        self.read_file(pipeline, EntityFile::ServicesAtLocation, |p, table, row, context| {
            for column in ["id", "service_id", "location_id"] {
                table.required(row, column, context)?;
            }
            let link: ServiceAtLocation = decode(table, row, context)?;
            if inactive.has_service(Some(&link.service_id))
                || inactive.has_location(Some(&link.location_id))
            {
                return Ok(Row::Skipped);
            }
            p.sink_mut().write_service_at_location(&link)?;
            p.statistics_mut().emitted.services_at_location += 1;
            Ok(Row::Written)
        })?;
        self.read_file(pipeline, EntityFile::Addresses, |p, table, row, context| {
            for column in ["id", "location_id"] {
                table.required(row, column, context)?;
            }
            let address: Address = decode(table, row, context)?;
            if inactive.has_location(Some(&address.location_id)) {
                return Ok(Row::Skipped);
            }
            p.sink_mut().write_address(&address)?;
            p.statistics_mut().emitted.addresses += 1;
            Ok(Row::Written)
        })?;
        self.read_file(pipeline, EntityFile::Phones, |p, table, row, context| {
            for column in ["id", "number"] {
                table.required(row, column, context)?;
            }
            let phone: PhoneNumber = decode(table, row, context)?;
            if inactive.has_location(phone.location_id.as_deref())
                || inactive.has_service(phone.service_id.as_deref())
                || inactive.has_organization(phone.organization_id.as_deref())
            {
                return Ok(Row::Skipped);
            }
            if !p
                .dedup_mut()
                .observe_phone(&phone.id, phone.location_id.as_deref())
                .is_unique()
            {
                p.statistics_mut().dedup.phones_deduplicated += 1;
                return Ok(Row::Written);
            }
            p.sink_mut().write_phone_number(&phone)?;
            p.statistics_mut().emitted.phone_numbers += 1;
            Ok(Row::Written)
        })?;
        self.read_file(pipeline, EntityFile::Taxonomy, |p, table, row, context| {
            for column in ["id", "name"] {
                table.required(row, column, context)?;
            }
            let term: TaxonomyTerm = decode(table, row, context)?;
            p.write_taxonomy_term(&term)?;
            Ok(Row::Written)
        })?;
        self.read_file(pipeline, EntityFile::ServicesTaxonomy, |p, table, row, context| {
            for column in ["id", "service_id", "taxonomy_id"] {
                table.required(row, column, context)?;
            }
            let link: ServiceTaxonomyTerm = decode(table, row, context)?;
            if inactive.has_service(Some(&link.service_id)) {
                return Ok(Row::Skipped);
            }
            p.sink_mut()
                .write_service_taxonomy_terms(std::slice::from_ref(&link))?;
            p.statistics_mut().emitted.service_taxonomy_terms += 1;
            Ok(Row::Written)
        })?;

        if !inactive.is_empty() {
            info!(ids = inactive.len(), "Skipped inactive records and their dependents");
        }
        Ok(inactive)
    }

    /// Stream one file through a row handler
    ///
    /// Recoverable row errors are logged through the pipeline; anything else
    /// stops the run.
    fn read_file<S, F>(&self, pipeline: &mut ImportPipeline<S>, file: EntityFile, mut handle: F) -> Result<()>
    where
        S: Sink,
        F: FnMut(&mut ImportPipeline<S>, &HeaderTable, &StringRecord, &str) -> Result<Row>,
    {
        let path = self.path_of(file);
        let mut reader = ReaderBuilder::new().flexible(true).from_path(&path)?;
        let table = HeaderTable::validate(file.file_name(), file.columns(), reader.headers()?)?;
        info!(file = file.file_name(), "Importing file");

        let mut record = StringRecord::new();
        let mut rows = 0usize;
        let mut skipped = 0usize;
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    let e = ImportError::from_csv_record(e, Some(file.file_name()));
                    if !e.is_recoverable() {
                        return Err(e);
                    }
                    pipeline.statistics_mut().bundles.read += 1;
                    pipeline.record_failure(&e);
                    continue;
                }
            }
            if record.iter().all(|v| v.trim().is_empty()) {
                continue;
            }
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            let context = format!("{} line {}", file.file_name(), line);
            pipeline.statistics_mut().bundles.read += 1;
            rows += 1;

            match handle(pipeline, &table, &record, &context) {
                Ok(Row::Written) => {
                    pipeline.mark_success(table.get(&record, "id").trim());
                }
                Ok(Row::Skipped) => {
                    skipped += 1;
                    pipeline.statistics_mut().bundles.skipped_inactive += 1;
                    debug!(context = %context, "Skipping row of an inactive record");
                }
                Err(e) if e.is_recoverable() => pipeline.record_failure(&e),
                Err(e) => return Err(e),
            }
        }

        debug!(file = file.file_name(), rows, skipped, "Finished file");
        Ok(())
    }

    fn organization<S: Sink>(
        &self,
        pipeline: &mut ImportPipeline<S>,
        inactive: &mut InactiveRecords,
        skip: bool,
        table: &HeaderTable,
        row: &StringRecord,
        context: &str,
    ) -> Result<Row> {
        for column in ["id", "name"] {
            table.required(row, column, context)?;
        }
        let mut organization: Organization = decode(table, row, context)?;
        organization.url = organization.url.as_deref().and_then(values::normalize_url);

        let classification =
            self.settings
                .classifier
                .classify(organization.description.as_deref(), &[], None);
        organization.description = classification.description;
        if classification.inactive {
            pipeline.statistics_mut().bundles.inactive += 1;
            if skip {
                inactive.add_organization(&organization.id);
                return Ok(Row::Skipped);
            }
        }

        pipeline.sink_mut().write_organization(&organization)?;
        pipeline.statistics_mut().emitted.organizations += 1;
        Ok(Row::Written)
    }

    fn service<S: Sink>(
        &self,
        pipeline: &mut ImportPipeline<S>,
        inactive: &mut InactiveRecords,
        skip: bool,
        table: &HeaderTable,
        row: &StringRecord,
        context: &str,
    ) -> Result<Row> {
        for column in ["id", "organization_id", "name"] {
            table.required(row, column, context)?;
        }
        let mut service: Service = decode(table, row, context)?;
        if inactive.has_organization(Some(&service.organization_id)) {
            inactive.add_service(&service.id);
            return Ok(Row::Skipped);
        }

        let classification = self.settings.classifier.classify(
            service.description.as_deref(),
            &[],
            service.status.as_deref(),
        );
        service.description = classification.description;
        if classification.inactive {
            pipeline.statistics_mut().bundles.inactive += 1;
            if skip {
                inactive.add_service(&service.id);
                return Ok(Row::Skipped);
            }
        }

        service.url = service.url.as_deref().and_then(values::normalize_url);
        service.last_verified_on = service
            .last_verified_on
            .as_deref()
            .and_then(|v| values::parse_iso_date("last_verified_on-x", v, context));

        pipeline.sink_mut().write_service_record(&service)?;
        pipeline.statistics_mut().emitted.services += 1;
        Ok(Row::Written)
    }

    fn location<S: Sink>(
        &self,
        pipeline: &mut ImportPipeline<S>,
        inactive: &mut InactiveRecords,
        skip: bool,
        table: &HeaderTable,
        row: &StringRecord,
        context: &str,
    ) -> Result<Row> {
        for column in ["id", "organization_id"] {
            table.required(row, column, context)?;
        }
        let location: Location = decode(table, row, context)?;
        for (column, value) in [("latitude", location.latitude), ("longitude", location.longitude)] {
            if value.is_none() {
                if let Some(text) = table.optional(row, column) {
                    warn!(context, field = column, value = %text, "Ignoring unparsable coordinate");
                }
            }
        }

        let description_inactive =
            crate::inactive::is_description_inactive(location.description.as_deref());
        if skip && (inactive.has_organization(Some(&location.organization_id)) || description_inactive) {
            inactive.add_location(&location.id);
            return Ok(Row::Skipped);
        }

        if !location.has_coordinates() {
            warn!(location_id = %location.id, "Location has no coordinates");
        }
        if pipeline.dedup_mut().observe_location(&location.id).is_unique() {
            pipeline.sink_mut().write_location(&location)?;
            pipeline.statistics_mut().emitted.locations += 1;
        } else {
            pipeline.statistics_mut().dedup.locations_merged += 1;
        }
        Ok(Row::Written)
    }
}

/// Deserialize a row, naming the offending column on failure
fn decode<T: DeserializeOwned>(
    table: &HeaderTable,
    row: &StringRecord,
    context: &str,
) -> std::result::Result<T, ParseError> {
    table.deserialize(row).map_err(|e| {
        let field = match e.kind() {
            csv::ErrorKind::Deserialize { err, .. } => err
                .field()
                .and_then(|index| table.column(index as usize))
                .unwrap_or("row")
                .to_string(),
            _ => "row".to_string(),
        };
        ParseError::invalid_shape(field, e.to_string(), context)
    })
}
