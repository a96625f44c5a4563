//! Open Referral CSV file sink
//!
//! Writes one file per entity kind into an output folder, each starting with
//! its header row. Writers are buffered; [`Sink::finish`] flushes them and
//! dropping the sink closes every handle.

use super::Sink;
use crate::error::Result;
use crate::models::{
    Address, EntityFile, Location, Organization, PhoneNumber, Service, ServiceAtLocation,
    ServiceTaxonomyTerm, TaxonomyTerm,
};
use csv::{Writer, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Sink writing the Open Referral file set
pub struct CsvFileSink {
    folder: PathBuf,
    organizations: Writer<File>,
    services: Writer<File>,
    locations: Writer<File>,
    services_at_location: Writer<File>,
    addresses: Writer<File>,
    phones: Writer<File>,
    taxonomy: Writer<File>,
    services_taxonomy: Writer<File>,
}

impl CsvFileSink {
    /// Create the folder if needed and truncate all eight files
    pub fn create(folder: &Path) -> Result<Self> {
        fs::create_dir_all(folder)?;
        info!(folder = %folder.display(), "Writing Open Referral files");

        Ok(Self {
            folder: folder.to_path_buf(),
            organizations: open_writer(folder, EntityFile::Organizations)?,
            services: open_writer(folder, EntityFile::Services)?,
            locations: open_writer(folder, EntityFile::Locations)?,
            services_at_location: open_writer(folder, EntityFile::ServicesAtLocation)?,
            addresses: open_writer(folder, EntityFile::Addresses)?,
            phones: open_writer(folder, EntityFile::Phones)?,
            taxonomy: open_writer(folder, EntityFile::Taxonomy)?,
            services_taxonomy: open_writer(folder, EntityFile::ServicesTaxonomy)?,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn writers(&mut self) -> [&mut Writer<File>; 8] {
        [
            &mut self.organizations,
            &mut self.services,
            &mut self.locations,
            &mut self.services_at_location,
            &mut self.addresses,
            &mut self.phones,
            &mut self.taxonomy,
            &mut self.services_taxonomy,
        ]
    }
}

fn open_writer(folder: &Path, file: EntityFile) -> Result<Writer<File>> {
    let path = folder.join(file.file_name());
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(file.columns())?;
    debug!(path = %path.display(), "Opened output file");
    Ok(writer)
}

fn write_row<T: Serialize>(writer: &mut Writer<File>, record: &T) -> Result<()> {
    writer.serialize(record)?;
    Ok(())
}

impl Sink for CsvFileSink {
    fn write_organization(&mut self, organization: &Organization) -> Result<()> {
        write_row(&mut self.organizations, organization)
    }

    fn write_service_record(&mut self, service: &Service) -> Result<()> {
        write_row(&mut self.services, service)
    }

    fn write_service_at_location(&mut self, link: &ServiceAtLocation) -> Result<()> {
        write_row(&mut self.services_at_location, link)
    }

    fn write_location(&mut self, location: &Location) -> Result<()> {
        write_row(&mut self.locations, location)
    }

    fn write_address(&mut self, address: &Address) -> Result<()> {
        write_row(&mut self.addresses, address)
    }

    fn write_phone_number(&mut self, phone: &PhoneNumber) -> Result<()> {
        write_row(&mut self.phones, phone)
    }

    fn write_taxonomy_term(&mut self, term: &TaxonomyTerm) -> Result<()> {
        write_row(&mut self.taxonomy, term)
    }

    fn write_service_taxonomy_terms(&mut self, links: &[ServiceTaxonomyTerm]) -> Result<()> {
        for link in links {
            write_row(&mut self.services_taxonomy, link)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for writer in self.writers() {
            writer.flush()?;
        }
        info!(folder = %self.folder.display(), "Flushed Open Referral files");
        Ok(())
    }
}
