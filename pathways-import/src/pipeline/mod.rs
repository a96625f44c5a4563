//! Pipeline driver
//!
//! One driver for every bundle dialect. It consumes an iterator of built
//! [`Bundle`]s in source order and writes their records to a [`Sink`].
//!
//! # Per bundle
//! 1. Emit the Location unless its id was already emitted in this run
//! 2. Emit the Organization, or each Service with its site link
//! 3. Emit Addresses (never deduped), then PhoneNumbers and TaxonomyTerms
//!    through the [`DedupTracker`], then the service-taxonomy links
//!
//! # Error Handling
//! - A recoverable error fails only its bundle. It is logged with the id of
//!   the last bundle that imported successfully, and the run continues.
//! - Any other error (header mismatch, malformed document, sink failure)
//!   aborts the run.

pub mod city_coordinates;
pub mod dedup;
pub mod statistics;

pub use city_coordinates::{CityCoordinates, CityPoint};
pub use dedup::{DedupResult, DedupTracker, PhoneDedupScope};
pub use statistics::ImportStatistics;

use crate::builder::{Bundle, ServiceBundle, SiteBundle};
use crate::error::{ImportError, Result};
use crate::models::{ServiceTaxonomyTerm, TaxonomyTerm};
use crate::sink::Sink;
use std::fmt;
use tracing::{debug, error};

/// Driver options fixed for one run
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Drop inactive organizations and services and what hangs off them
    pub skip_inactive: bool,
    pub phone_dedup: PhoneDedupScope,
    /// Fallback coordinates for Locations without any
    pub city_coordinates: Option<CityCoordinates>,
}

/// Single-threaded import driver owning the sink and the dedup state
pub struct ImportPipeline<S: Sink> {
    sink: S,
    options: PipelineOptions,
    dedup: DedupTracker,
    statistics: ImportStatistics,
    last_good_id: Option<String>,
}

impl<S: Sink> ImportPipeline<S> {
    pub fn new(sink: S, options: PipelineOptions, dialect: impl fmt::Display) -> Self {
        Self {
            sink,
            dedup: DedupTracker::new(options.phone_dedup),
            statistics: ImportStatistics::new(dialect.to_string()),
            options,
            last_good_id: None,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn statistics(&self) -> &ImportStatistics {
        &self.statistics
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Id of the last bundle that imported successfully
    pub fn last_good_id(&self) -> Option<&str> {
        self.last_good_id.as_deref()
    }

    /// Drive a bundle stream to its end
    ///
    /// Returns early only on an unrecoverable error.
    pub fn run<I>(&mut self, bundles: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Bundle>>,
    {
        for item in bundles {
            match item {
                Ok(bundle) => {
                    self.statistics.bundles.read += 1;
                    self.process_bundle(bundle)?;
                }
                Err(e) if e.is_recoverable() => {
                    self.statistics.bundles.read += 1;
                    self.record_failure(&e);
                }
                Err(e) => {
                    error!(error = %e, "Import aborted");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Emit the records of one built bundle
    pub fn process_bundle(&mut self, bundle: Bundle) -> Result<()> {
        self.statistics.dedup.addresses_discarded += bundle.rejected.addresses;
        self.statistics.dedup.phones_discarded += bundle.rejected.phones;
        if bundle.is_inactive() {
            self.statistics.bundles.inactive += 1;
        }

        let Bundle {
            context,
            id,
            organization,
            sites,
            ..
        } = bundle;

        if self.options.skip_inactive && organization.as_ref().map(|o| o.inactive).unwrap_or(false) {
            debug!(record_id = %id, context = %context, "Skipping inactive organization");
            self.statistics.bundles.skipped_inactive += 1;
            self.last_good_id = Some(id);
            return Ok(());
        }

        let has_organization = organization.is_some();
        if let Some(org) = organization {
            self.sink.write_organization(&org.organization)?;
            self.statistics.emitted.organizations += 1;
            debug!(record_id = %org.organization.id, "Wrote organization");
            self.emit_taxonomy_terms(&org.taxonomy_terms)?;
        }

        let mut skipped_services = 0;
        for mut site in sites {
            if self.options.skip_inactive {
                let before = site.services.len();
                site.services.retain(|s| !s.inactive);
                skipped_services += before - site.services.len();
                if !has_organization && before > 0 && site.services.is_empty() {
                    debug!(record_id = %id, context = %context, "Skipping site of inactive services");
                    continue;
                }
            }
            self.emit_site(site)?;
        }
        if skipped_services > 0 {
            self.statistics.bundles.skipped_inactive += 1;
        }

        self.last_good_id = Some(id);
        Ok(())
    }

    fn emit_site(&mut self, site: SiteBundle) -> Result<()> {
        let city = site.physical_city().map(str::to_string);
        let SiteBundle {
            mut location,
            addresses,
            phones,
            services,
        } = site;
        let location_id = location.id.clone();

        if self.dedup.observe_location(&location_id).is_unique() {
            if let Some(table) = &self.options.city_coordinates {
                if table.fill(&mut location, city.as_deref()) {
                    self.statistics.dedup.coordinates_filled += 1;
                }
            }
            self.sink.write_location(&location)?;
            self.statistics.emitted.locations += 1;
            debug!(location_id = %location_id, "Wrote location");
        } else {
            self.statistics.dedup.locations_merged += 1;
            debug!(location_id = %location_id, "Merged location into an earlier one");
        }

        for service in &services {
            self.sink.write_service(&service.service, &location_id)?;
            self.statistics.emitted.services += 1;
            self.statistics.emitted.services_at_location += 1;
            debug!(record_id = %service.service.id, location_id = %location_id, "Wrote service");
        }

        for address in &addresses {
            self.sink.write_address(address)?;
            self.statistics.emitted.addresses += 1;
        }

        for phone in &phones {
            if self
                .dedup
                .observe_phone(&phone.id, phone.location_id.as_deref())
                .is_unique()
            {
                self.sink.write_phone_number(phone)?;
                self.statistics.emitted.phone_numbers += 1;
            } else {
                self.statistics.dedup.phones_deduplicated += 1;
                debug!(number = %phone.number, "Skipping duplicate phone number");
            }
        }

        for service in &services {
            self.emit_taxonomy_terms(&service.taxonomy_terms)?;
        }
        for service in &services {
            self.emit_service_links(service)?;
        }
        Ok(())
    }

    fn emit_service_links(&mut self, service: &ServiceBundle) -> Result<()> {
        let links: Vec<ServiceTaxonomyTerm> = service.taxonomy_links();
        if links.is_empty() {
            return Ok(());
        }
        self.sink.write_service_taxonomy_terms(&links)?;
        self.statistics.emitted.service_taxonomy_terms += links.len();
        Ok(())
    }

    fn emit_taxonomy_terms(&mut self, terms: &[TaxonomyTerm]) -> Result<()> {
        for term in terms {
            self.write_taxonomy_term(term)?;
        }
        Ok(())
    }

    /// Write a term unless the run already has it
    pub(crate) fn write_taxonomy_term(&mut self, term: &TaxonomyTerm) -> Result<()> {
        if self.dedup.observe_taxonomy_term(&term.id).is_unique() {
            self.sink.write_taxonomy_term(term)?;
            self.statistics.emitted.taxonomy_terms += 1;
        } else {
            self.statistics.dedup.taxonomy_terms_deduplicated += 1;
        }
        Ok(())
    }

    /// Log an isolated bundle failure
    pub(crate) fn record_failure(&mut self, error: &ImportError) {
        self.statistics.bundles.failed += 1;
        match &self.last_good_id {
            Some(id) => error!(
                last_good_id = %id,
                error = %error,
                "Failed to import the record immediately after the one with id \"{}\"",
                id
            ),
            None => error!(error = %error, "Failed to import the first record"),
        }
    }

    pub(crate) fn mark_success(&mut self, id: &str) {
        self.last_good_id = Some(id.to_string());
    }

    pub(crate) fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub(crate) fn dedup_mut(&mut self) -> &mut DedupTracker {
        &mut self.dedup
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut ImportStatistics {
        &mut self.statistics
    }

    /// Flush the sink, log the summary and hand back the parts
    pub fn finish(mut self) -> Result<(S, ImportStatistics)> {
        self.sink.finish()?;
        self.statistics.finish();
        self.statistics.log_summary();
        Ok((self.sink, self.statistics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BundleSettings, RecordBuilder};
    use crate::error::ParseError;
    use crate::models::AddressType;
    use crate::parsers::address::AddressPart;
    use crate::parsers::phone::PhonePart;
    use crate::sink::MemorySink;

    fn organization(settings: &BundleSettings, id: &str, phone: &str) -> Bundle {
        let mut builder = RecordBuilder::new(settings, "line 1");
        builder.set_own_id(id);
        builder.set_parent_id("0");
        builder.set_name("Helpers");
        builder.set_address(AddressType::Physical, AddressPart::Line(0), "1 Road");
        builder.set_address(AddressType::Physical, AddressPart::City, "Langley");
        builder.set_phone(0, PhonePart::Number, phone);
        builder.build("ResourceAgencyNum", "ParentAgencyNum").unwrap()
    }

    fn service(settings: &BundleSettings, id: &str, description: &str) -> Bundle {
        let mut builder = RecordBuilder::new(settings, "line 2");
        builder.set_own_id(id);
        builder.set_parent_id("100");
        builder.set_description(description);
        builder.set_phone(0, PhonePart::Number, "604-555-0199");
        builder.add_taxonomy("Health - Dental", false);
        builder.build("ResourceAgencyNum", "ParentAgencyNum").unwrap()
    }

    #[test]
    fn test_duplicate_location_is_merged() {
        let settings = BundleSettings::default();
        let mut pipeline = ImportPipeline::new(MemorySink::new(), PipelineOptions::default(), "test");
        pipeline
            .run(vec![
                Ok(organization(&settings, "100", "604-555-0100")),
                Ok(organization(&settings, "101", "604-555-0100")),
            ])
            .unwrap();

        let (sink, stats) = pipeline.finish().unwrap();
        assert!(sink.finished);
        assert_eq!(sink.organizations.len(), 2);
        assert_eq!(sink.locations.len(), 1);
        assert_eq!(stats.dedup.locations_merged, 1);
        assert_eq!(sink.phone_numbers.len(), 1);
        assert_eq!(stats.dedup.phones_deduplicated, 1);
    }

    #[test]
    fn test_recoverable_error_continues() {
        let settings = BundleSettings::default();
        let mut pipeline = ImportPipeline::new(MemorySink::new(), PipelineOptions::default(), "test");
        pipeline
            .run(vec![
                Ok(organization(&settings, "100", "604-555-0100")),
                Err(ParseError::missing("ResourceAgencyNum", "line 2").into()),
                Ok(service(&settings, "200", "Dental care")),
            ])
            .unwrap();

        assert_eq!(pipeline.last_good_id(), Some("200"));
        let (sink, stats) = pipeline.finish().unwrap();
        assert_eq!(stats.bundles.read, 3);
        assert_eq!(stats.bundles.failed, 1);
        assert_eq!(sink.organizations.len(), 1);
        assert_eq!(sink.services.len(), 1);
        assert_eq!(sink.service_taxonomy_terms.len(), 1);
    }

    #[test]
    fn test_fatal_error_aborts() {
        let mut pipeline = ImportPipeline::new(MemorySink::new(), PipelineOptions::default(), "test");
        let err = pipeline
            .run(vec![Err(ImportError::Xml("bad document".to_string()))])
            .unwrap_err();
        assert!(matches!(err, ImportError::Xml(_)));
    }

    #[test]
    fn test_skip_inactive_drops_service_site() {
        let settings = BundleSettings::default();
        let options = PipelineOptions {
            skip_inactive: true,
            ..Default::default()
        };
        let mut pipeline = ImportPipeline::new(MemorySink::new(), options, "test");
        pipeline
            .run(vec![
                Ok(service(&settings, "200", "DEL2 Closed")),
                Ok(service(&settings, "201", "Open")),
            ])
            .unwrap();

        let (sink, stats) = pipeline.finish().unwrap();
        assert_eq!(sink.services.len(), 1);
        assert_eq!(sink.services[0].id, "201");
        assert_eq!(stats.bundles.inactive, 1);
        assert_eq!(stats.bundles.skipped_inactive, 1);
    }

    #[test]
    fn test_city_fallback_after_identity() {
        let settings = BundleSettings::default();
        let mut table = CityCoordinates::default();
        table.insert(
            "Langley",
            CityPoint {
                longitude: -122.66,
                latitude: 49.10,
            },
        );
        let options = PipelineOptions {
            city_coordinates: Some(table),
            ..Default::default()
        };
        let bundle = organization(&settings, "100", "604-555-0100");
        let expected_id = bundle.sites[0].location.id.clone();

        let mut pipeline = ImportPipeline::new(MemorySink::new(), options, "test");
        pipeline.run(vec![Ok(bundle)]).unwrap();
        let (sink, stats) = pipeline.finish().unwrap();

        let location = &sink.locations[0];
        assert_eq!(location.id, expected_id);
        assert_eq!(location.latitude, Some(49.10));
        assert_eq!(stats.dedup.coordinates_filled, 1);
    }
}
