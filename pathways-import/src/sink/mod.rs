//! Record sinks
//!
//! The pipeline depends on nothing but the [`Sink`] trait for output. A sink
//! receives fully built, identified records and owns the persistence format.
//!
//! - [`CsvFileSink`]: the Open Referral file set, one CSV per entity kind
//! - [`MemorySink`]: in-memory vectors, for callers that post-process records

pub mod csv_files;
pub mod memory;

pub use csv_files::CsvFileSink;
pub use memory::MemorySink;

use crate::error::Result;
use crate::models::{
    Address, Location, Organization, PhoneNumber, Service, ServiceAtLocation, ServiceTaxonomyTerm,
    TaxonomyTerm,
};

/// Write destination for normalized records
///
/// Any error is fatal for the run.
pub trait Sink {
    fn write_organization(&mut self, organization: &Organization) -> Result<()>;

    /// Service row only
    fn write_service_record(&mut self, service: &Service) -> Result<()>;

    fn write_service_at_location(&mut self, link: &ServiceAtLocation) -> Result<()>;

    /// Service row plus its derived link to `location_id`
    fn write_service(&mut self, service: &Service, location_id: &str) -> Result<()> {
        self.write_service_record(service)?;
        self.write_service_at_location(&ServiceAtLocation::link(&service.id, location_id))
    }

    fn write_location(&mut self, location: &Location) -> Result<()>;

    fn write_address(&mut self, address: &Address) -> Result<()>;

    fn write_phone_number(&mut self, phone: &PhoneNumber) -> Result<()>;

    fn write_taxonomy_term(&mut self, term: &TaxonomyTerm) -> Result<()>;

    fn write_service_taxonomy_terms(&mut self, links: &[ServiceTaxonomyTerm]) -> Result<()>;

    /// Flush buffered output at the end of a run
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_organization(&mut self, organization: &Organization) -> Result<()> {
        (**self).write_organization(organization)
    }

    fn write_service_record(&mut self, service: &Service) -> Result<()> {
        (**self).write_service_record(service)
    }

    fn write_service_at_location(&mut self, link: &ServiceAtLocation) -> Result<()> {
        (**self).write_service_at_location(link)
    }

    fn write_service(&mut self, service: &Service, location_id: &str) -> Result<()> {
        (**self).write_service(service, location_id)
    }

    fn write_location(&mut self, location: &Location) -> Result<()> {
        (**self).write_location(location)
    }

    fn write_address(&mut self, address: &Address) -> Result<()> {
        (**self).write_address(address)
    }

    fn write_phone_number(&mut self, phone: &PhoneNumber) -> Result<()> {
        (**self).write_phone_number(phone)
    }

    fn write_taxonomy_term(&mut self, term: &TaxonomyTerm) -> Result<()> {
        (**self).write_taxonomy_term(term)
    }

    fn write_service_taxonomy_terms(&mut self, links: &[ServiceTaxonomyTerm]) -> Result<()> {
        (**self).write_service_taxonomy_terms(links)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}
