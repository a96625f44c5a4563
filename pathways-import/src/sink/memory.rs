//! In-memory sink

use super::Sink;
use crate::error::Result;
use crate::models::{
    Address, Location, Organization, PhoneNumber, Service, ServiceAtLocation, ServiceTaxonomyTerm,
    TaxonomyTerm,
};

/// Collects every written record, in write order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySink {
    pub organizations: Vec<Organization>,
    pub services: Vec<Service>,
    pub services_at_location: Vec<ServiceAtLocation>,
    pub locations: Vec<Location>,
    pub addresses: Vec<Address>,
    pub phone_numbers: Vec<PhoneNumber>,
    pub taxonomy_terms: Vec<TaxonomyTerm>,
    pub service_taxonomy_terms: Vec<ServiceTaxonomyTerm>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records held
    pub fn record_count(&self) -> usize {
        self.organizations.len()
            + self.services.len()
            + self.services_at_location.len()
            + self.locations.len()
            + self.addresses.len()
            + self.phone_numbers.len()
            + self.taxonomy_terms.len()
            + self.service_taxonomy_terms.len()
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

impl Sink for MemorySink {
    fn write_organization(&mut self, organization: &Organization) -> Result<()> {
        self.organizations.push(organization.clone());
        Ok(())
    }

    fn write_service_record(&mut self, service: &Service) -> Result<()> {
        self.services.push(service.clone());
        Ok(())
    }

    fn write_service_at_location(&mut self, link: &ServiceAtLocation) -> Result<()> {
        self.services_at_location.push(link.clone());
        Ok(())
    }

    fn write_location(&mut self, location: &Location) -> Result<()> {
        self.locations.push(location.clone());
        Ok(())
    }

    fn write_address(&mut self, address: &Address) -> Result<()> {
        self.addresses.push(address.clone());
        Ok(())
    }

    fn write_phone_number(&mut self, phone: &PhoneNumber) -> Result<()> {
        self.phone_numbers.push(phone.clone());
        Ok(())
    }

    fn write_taxonomy_term(&mut self, term: &TaxonomyTerm) -> Result<()> {
        self.taxonomy_terms.push(term.clone());
        Ok(())
    }

    fn write_service_taxonomy_terms(&mut self, links: &[ServiceTaxonomyTerm]) -> Result<()> {
        self.service_taxonomy_terms.extend_from_slice(links);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_service_derives_link() {
        let mut sink = MemorySink::new();
        let service = Service {
            id: "svc".to_string(),
            organization_id: "org".to_string(),
            ..Default::default()
        };
        sink.write_service(&service, "loc").unwrap();

        assert_eq!(sink.services.len(), 1);
        assert_eq!(sink.services_at_location.len(), 1);
        let link = &sink.services_at_location[0];
        assert_eq!(link.service_id, "svc");
        assert_eq!(link.location_id, "loc");
        assert_eq!(link.id, crate::identity::service_at_location_id("svc", "loc"));
    }

    fn finish_owned<S: Sink>(mut sink: S) -> Result<()> {
        sink.finish()
    }

    #[test]
    fn test_finish_through_reference() {
        let mut sink = MemorySink::new();
        finish_owned(&mut sink).unwrap();
        assert!(sink.finished);
        assert_eq!(sink.record_count(), 0);
    }
}
