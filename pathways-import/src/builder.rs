//! Record builder
//!
//! Turns the canonical fields of one source bundle into identified,
//! immutable records. Field setters accumulate values while a dialect walks
//! its row or node; [`RecordBuilder::build`] runs the inactive classifier,
//! computes every derived identifier and returns a [`Bundle`].
//!
//! # Bundle shape
//! A bundle is an optional organization plus one or more sites. Each site
//! carries its Location, Addresses and PhoneNumbers and the Services offered
//! there. A legacy row is either an organization with one site, or a single
//! service with one site. A tree `Agency` is an organization with one site
//! per `Site` node.

use crate::error::ParseError;
use crate::identity::{self, LocationKey};
use crate::inactive::{self, InactiveClassifier};
use crate::models::{
    Address, AddressType, Location, Organization, PhoneNumber, Service, ServiceTaxonomyTerm,
    TaxonomyTerm,
};
use crate::parsers::address::{AddressFields, AddressPart, AddressSet};
use crate::parsers::phone::{PhonePart, PhoneSlots};
use crate::parsers::{taxonomy, values};

/// Parent reference marking a top-level organization bundle
pub const ORGANIZATION_PARENT_ID: &str = "0";

/// Per-run settings every bundle mapper needs
#[derive(Debug, Clone, Default)]
pub struct BundleSettings {
    /// Explicit taxonomy vocabulary; disables inference
    pub vocabulary: Option<String>,
    pub classifier: InactiveClassifier,
}

/// Organization part of a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationBundle {
    pub organization: Organization,
    /// Terms to record; organizations get no link rows
    pub taxonomy_terms: Vec<TaxonomyTerm>,
    pub inactive: bool,
}

/// One service with its classification terms
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceBundle {
    pub service: Service,
    pub taxonomy_terms: Vec<TaxonomyTerm>,
    pub inactive: bool,
}

impl ServiceBundle {
    /// One link per requested term occurrence
    pub fn taxonomy_links(&self) -> Vec<ServiceTaxonomyTerm> {
        self.taxonomy_terms
            .iter()
            .map(|term| ServiceTaxonomyTerm::link(&self.service.id, &term.id))
            .collect()
    }
}

/// One site: a Location and everything attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct SiteBundle {
    pub location: Location,
    pub addresses: Vec<Address>,
    pub phones: Vec<PhoneNumber>,
    pub services: Vec<ServiceBundle>,
}

impl SiteBundle {
    /// City of the physical address, used for the coordinate fallback
    pub fn physical_city(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.address_type == AddressType::Physical)
            .and_then(|a| a.city.as_deref())
            .filter(|c| !c.trim().is_empty())
    }
}

/// Sub-entities dropped while building a bundle because they failed validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectedCounts {
    pub addresses: usize,
    pub phones: usize,
}

/// Fully built, identified records of one source bundle
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    /// Source position for log messages (`line 3`, `agency 1234`)
    pub context: String,
    /// The bundle's own key
    pub id: String,
    pub organization: Option<OrganizationBundle>,
    pub sites: Vec<SiteBundle>,
    pub rejected: RejectedCounts,
}

impl Bundle {
    pub fn is_inactive(&self) -> bool {
        self.organization.as_ref().map(|o| o.inactive).unwrap_or(false)
            || self
                .sites
                .iter()
                .flat_map(|s| s.services.iter())
                .any(|s| s.inactive)
    }
}

/// Canonical site fields, before identity
#[derive(Debug, Clone, Default)]
pub struct SiteDraft {
    pub organization_id: String,
    pub name: Option<String>,
    pub alternate_name: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phones: PhoneSlots,
}

impl SiteDraft {
    /// Compute the Location id and attach addresses, phones and services
    ///
    /// The description never takes part in the Location identity.
    pub fn assemble(
        self,
        addresses: Vec<(AddressType, AddressFields)>,
        services: Vec<ServiceBundle>,
    ) -> SiteBundle {
        let location_id = identity::location_id(&LocationKey {
            phone_numbers: self.phones.identity_numbers(),
            name: self.name.as_deref().unwrap_or_default(),
            alternate_name: self.alternate_name.as_deref().unwrap_or_default(),
            latitude: self.latitude,
            longitude: self.longitude,
        });

        let addresses = addresses
            .into_iter()
            .filter(|(_, fields)| !fields.is_blank())
            .map(|(address_type, fields)| fields.into_record(address_type, &location_id))
            .collect();

        let phones = self
            .phones
            .into_entries()
            .into_iter()
            .filter_map(|entry| {
                let number = entry.number?;
                Some(PhoneNumber {
                    id: identity::phone_number_id(&number),
                    location_id: Some(location_id.clone()),
                    number,
                    phone_type: entry.phone_type,
                    description: entry.description,
                    ..Default::default()
                })
            })
            .collect();

        SiteBundle {
            location: Location {
                id: location_id,
                organization_id: self.organization_id,
                name: self.name,
                alternate_name: self.alternate_name,
                description: self.description,
                transportation: None,
                latitude: self.latitude,
                longitude: self.longitude,
            },
            addresses,
            phones,
            services,
        }
    }
}

/// Accumulates the canonical fields of one flat bundle
#[derive(Debug)]
pub struct RecordBuilder<'a> {
    settings: &'a BundleSettings,
    context: String,
    own_id: Option<String>,
    parent_id: Option<String>,
    name: Option<String>,
    alternate_name: Option<String>,
    description: Option<String>,
    location_description: Option<String>,
    email: Option<String>,
    url: Option<String>,
    last_verified_on: Option<String>,
    status: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    addresses: AddressSet,
    phones: PhoneSlots,
    taxonomy_terms: Vec<TaxonomyTerm>,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(settings: &'a BundleSettings, context: impl Into<String>) -> Self {
        Self {
            settings,
            context: context.into(),
            own_id: None,
            parent_id: None,
            name: None,
            alternate_name: None,
            description: None,
            location_description: None,
            email: None,
            url: None,
            last_verified_on: None,
            status: None,
            latitude: None,
            longitude: None,
            addresses: AddressSet::default(),
            phones: PhoneSlots::default(),
            taxonomy_terms: Vec::new(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn set_own_id(&mut self, value: &str) {
        self.own_id = values::non_empty(value.trim());
    }

    pub fn set_parent_id(&mut self, value: &str) {
        self.parent_id = values::non_empty(value.trim());
    }

    pub fn set_name(&mut self, value: &str) {
        self.name = values::non_empty(value);
    }

    pub fn set_alternate_name(&mut self, value: &str) {
        self.alternate_name = values::non_empty(value);
    }

    /// Set the description, keeping an existing retirement marker
    pub fn set_description(&mut self, value: &str) {
        self.location_description = values::non_empty(value);
        if value.is_empty() && self.description.is_none() {
            return;
        }
        let description = inactive::transfer_marker(self.description.as_deref(), value);
        self.description = values::non_empty(&description);
    }

    pub fn set_email(&mut self, value: &str) {
        self.email = values::non_empty(value);
    }

    pub fn set_url(&mut self, value: &str) {
        self.url = values::non_empty(value);
    }

    pub fn set_last_verified_on(&mut self, field: &str, value: &str) {
        self.last_verified_on = values::parse_iso_date(field, value, &self.context);
    }

    pub fn set_status(&mut self, value: &str) {
        self.status = values::non_empty(value);
    }

    pub fn set_latitude(&mut self, field: &str, value: &str) {
        self.latitude = values::parse_coordinate(field, value, &self.context);
    }

    pub fn set_longitude(&mut self, field: &str, value: &str) {
        self.longitude = values::parse_coordinate(field, value, &self.context);
    }

    pub fn set_address(&mut self, address_type: AddressType, part: AddressPart, value: &str) {
        self.addresses.set(address_type, part, value);
    }

    pub fn set_phone(&mut self, slot: usize, part: PhonePart, value: &str) {
        self.phones.set(slot, part, value);
    }

    /// Add the terms of one taxonomy cell
    pub fn add_taxonomy(&mut self, value: &str, is_code_column: bool) {
        let vocabulary =
            taxonomy::resolve_vocabulary(self.settings.vocabulary.as_deref(), is_code_column, value);
        self.taxonomy_terms
            .extend(taxonomy::parse_terms(value, &vocabulary));
    }

    /// Build the bundle
    ///
    /// Fails only when the bundle's own key (or a service's parent
    /// reference) is missing.
    pub fn build(self, own_id_field: &str, parent_id_field: &str) -> Result<Bundle, ParseError> {
        let id = self
            .own_id
            .ok_or_else(|| ParseError::missing(own_id_field, self.context.clone()))?;
        let parent_id = self
            .parent_id
            .ok_or_else(|| ParseError::missing(parent_id_field, self.context.clone()))?;
        let is_organization = parent_id == ORGANIZATION_PARENT_ID;

        let classification = self.settings.classifier.classify(
            self.description.as_deref(),
            &self.addresses.regions(),
            self.status.as_deref(),
        );

        let organization_id = if is_organization {
            id.clone()
        } else {
            parent_id
        };

        let site = SiteDraft {
            organization_id: organization_id.clone(),
            name: self.name.clone(),
            alternate_name: self.alternate_name.clone(),
            description: self.location_description,
            latitude: self.latitude,
            longitude: self.longitude,
            phones: self.phones,
        };
        let addresses = self.addresses.into_non_blank();

        if is_organization {
            let organization = Organization {
                id: id.clone(),
                name: self.name,
                alternate_name: self.alternate_name,
                description: classification.description,
                email: self.email,
                url: self.url,
                ..Default::default()
            };
            return Ok(Bundle {
                context: self.context,
                id,
                organization: Some(OrganizationBundle {
                    organization,
                    taxonomy_terms: self.taxonomy_terms,
                    inactive: classification.inactive,
                }),
                sites: vec![site.assemble(addresses, Vec::new())],
                rejected: RejectedCounts::default(),
            });
        }

        let service = ServiceBundle {
            service: Service {
                id: id.clone(),
                organization_id,
                name: self.name,
                alternate_name: self.alternate_name,
                description: classification.description,
                url: self.url,
                email: self.email,
                last_verified_on: self.last_verified_on,
                ..Default::default()
            },
            taxonomy_terms: self.taxonomy_terms,
            inactive: classification.inactive,
        };
        Ok(Bundle {
            context: self.context,
            id,
            organization: None,
            sites: vec![site.assemble(addresses, vec![service])],
            rejected: RejectedCounts::default(),
        })
    }
}
