//! Sites and the contact data attached to them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location record (`locations.csv`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub organization_id: String,
    pub name: Option<String>,
    pub alternate_name: Option<String>,
    pub description: Option<String>,
    pub transportation: Option<String>,
    /// Unparsable text reads as absent
    #[serde(deserialize_with = "csv::invalid_option")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "csv::invalid_option")]
    pub longitude: Option<f64>,
}

impl Location {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "organization_id",
        "name",
        "alternate_name",
        "description",
        "transportation",
        "latitude",
        "longitude",
    ];

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Address type tag; every Address carries exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AddressType {
    #[serde(rename = "postal_address")]
    Postal,
    #[serde(rename = "physical_address")]
    Physical,
}

impl AddressType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressType::Postal => "postal_address",
            AddressType::Physical => "physical_address",
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address record (`addresses.csv`), owned by exactly one Location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: String,
    #[serde(rename = "type")]
    pub address_type: AddressType,
    pub location_id: String,
    pub attention: Option<String>,
    pub address_1: Option<String>,
    pub address_2: Option<String>,
    pub address_3: Option<String>,
    pub address_4: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl Address {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "type",
        "location_id",
        "attention",
        "address_1",
        "address_2",
        "address_3",
        "address_4",
        "city",
        "region",
        "state_province",
        "postal_code",
        "country",
    ];
}

/// Phone number record (`phones.csv`)
///
/// `number` is never empty: blank entries are dropped before identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: String,
    pub location_id: Option<String>,
    pub service_id: Option<String>,
    pub organization_id: Option<String>,
    pub contact_id: Option<String>,
    pub service_at_location_id: Option<String>,
    pub number: String,
    pub extension: Option<String>,
    #[serde(rename = "type")]
    pub phone_type: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub department: Option<String>,
}

impl PhoneNumber {
    pub const COLUMNS: &'static [&'static str] = &[
        "id",
        "location_id",
        "service_id",
        "organization_id",
        "contact_id",
        "service_at_location_id",
        "number",
        "extension",
        "type",
        "language",
        "description",
        "department",
    ];
}
