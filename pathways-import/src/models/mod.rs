//! Normalized directory records
//!
//! One struct per output entity. Field order matches the column order of the
//! corresponding Open Referral file, so the CSV sink can serialize a record
//! straight into a row under its `COLUMNS` header.

pub mod location;
pub mod organization;
pub mod taxonomy;

pub use location::{Address, AddressType, Location, PhoneNumber};
pub use organization::{Organization, Service, ServiceAtLocation};
pub use taxonomy::{ServiceTaxonomyTerm, TaxonomyTerm};

/// One file of the Open Referral data set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityFile {
    Organizations,
    Services,
    Locations,
    ServicesAtLocation,
    Addresses,
    Phones,
    Taxonomy,
    ServicesTaxonomy,
}

impl EntityFile {
    /// Every file, parents before the rows that reference them
    pub const ALL: [EntityFile; 8] = [
        EntityFile::Organizations,
        EntityFile::Services,
        EntityFile::Locations,
        EntityFile::ServicesAtLocation,
        EntityFile::Addresses,
        EntityFile::Phones,
        EntityFile::Taxonomy,
        EntityFile::ServicesTaxonomy,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            EntityFile::Organizations => "organizations.csv",
            EntityFile::Services => "services.csv",
            EntityFile::Locations => "locations.csv",
            EntityFile::ServicesAtLocation => "services_at_location.csv",
            EntityFile::Addresses => "addresses.csv",
            EntityFile::Phones => "phones.csv",
            EntityFile::Taxonomy => "taxonomy.csv",
            EntityFile::ServicesTaxonomy => "services_taxonomy.csv",
        }
    }

    /// Header row, in output column order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            EntityFile::Organizations => Organization::COLUMNS,
            EntityFile::Services => Service::COLUMNS,
            EntityFile::Locations => Location::COLUMNS,
            EntityFile::ServicesAtLocation => ServiceAtLocation::COLUMNS,
            EntityFile::Addresses => Address::COLUMNS,
            EntityFile::Phones => PhoneNumber::COLUMNS,
            EntityFile::Taxonomy => TaxonomyTerm::COLUMNS,
            EntityFile::ServicesTaxonomy => ServiceTaxonomyTerm::COLUMNS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_set_order() {
        let names: Vec<&str> = EntityFile::ALL.iter().map(|f| f.file_name()).collect();
        assert_eq!(names[0], "organizations.csv");
        assert_eq!(names[7], "services_taxonomy.csv");
        assert!(EntityFile::Services.columns().contains(&"last_verified_on-x"));
        assert_eq!(EntityFile::Addresses.columns()[1], "type");
    }
}
