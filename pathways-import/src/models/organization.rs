//! Organizations, services and their site links

use serde::{Deserialize, Serialize};

/// Organization record (`organizations.csv`)
///
/// The id is the source's natural key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: Option<String>,
    pub alternate_name: Option<String>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub url: Option<String>,
    pub tax_status: Option<String>,
    pub tax_id: Option<String>,
    pub year_incorporated: Option<String>,
    pub legal_status: Option<String>,
}

impl Organization {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "alternate_name",
        "description",
        "email",
        "url",
        "tax_status",
        "tax_id",
        "year_incorporated",
        "legal_status",
    ];
}

/// Service record (`services.csv`)
///
/// Always belongs to exactly one organization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub organization_id: String,
    pub program_id: Option<String>,
    pub name: Option<String>,
    pub alternate_name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub interpretation_services: Option<String>,
    pub application_process: Option<String>,
    pub wait_time: Option<String>,
    pub fees: Option<String>,
    pub accreditations: Option<String>,
    pub licenses: Option<String>,
    pub taxonomy_ids: Option<String>,
    /// ISO date (`YYYY-MM-DD`)
    #[serde(rename = "last_verified_on-x")]
    pub last_verified_on: Option<String>,
}

impl Service {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "program_id",
        "name",
        "alternate_name",
        "description",
        "url",
        "email",
        "status",
        "interpretation_services",
        "application_process",
        "wait_time",
        "fees",
        "accreditations",
        "licenses",
        "taxonomy_ids",
        "last_verified_on-x",
    ];
}

/// Service-at-location link (`services_at_location.csv`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceAtLocation {
    pub id: String,
    pub service_id: String,
    pub location_id: String,
    pub description: Option<String>,
}

impl ServiceAtLocation {
    pub const COLUMNS: &'static [&'static str] = &["id", "service_id", "location_id", "description"];

    /// Link with its content-addressed id
    pub fn link(service_id: &str, location_id: &str) -> Self {
        Self {
            id: crate::identity::service_at_location_id(service_id, location_id),
            service_id: service_id.to_string(),
            location_id: location_id.to_string(),
            description: None,
        }
    }
}
