//! Address sub-parser
//!
//! Extracts up to two addresses per bundle: a postal one from the `Mailing*`
//! column group and a physical one from the `Physical*` group. Both groups
//! share the same suffixes (`Address1..4`, `City`, `StateProvince`,
//! `PostalCode`, `Country`).
//!
//! Tree addresses are stricter: see [`validate_tree_address`].

use crate::error::ParseError;
use crate::identity::{self, AddressKey};
use crate::models::{Address, AddressType};

const PHYSICAL_PREFIX: &str = "Physical";
const MAILING_PREFIX: &str = "Mailing";

/// Number of address lines kept per address
pub const MAX_ADDRESS_LINES: usize = 4;

/// One sub-field of an address column group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPart {
    /// Zero-based address line (0..=3)
    Line(usize),
    City,
    StateProvince,
    PostalCode,
    Country,
}

/// Attribute a legacy column to an address type and sub-field
///
/// `Physical*` columns are normalized onto the `Mailing*` suffix table and
/// tagged physical; everything else that matches is postal.
pub fn classify_header(header: &str) -> Option<(AddressType, AddressPart)> {
    let (address_type, suffix) = if let Some(rest) = header.strip_prefix(PHYSICAL_PREFIX) {
        (AddressType::Physical, rest)
    } else if let Some(rest) = header.strip_prefix(MAILING_PREFIX) {
        (AddressType::Postal, rest)
    } else {
        return None;
    };

    let part = match suffix {
        "Address1" => AddressPart::Line(0),
        "Address2" => AddressPart::Line(1),
        "Address3" => AddressPart::Line(2),
        "Address4" => AddressPart::Line(3),
        "City" => AddressPart::City,
        "StateProvince" => AddressPart::StateProvince,
        "PostalCode" => AddressPart::PostalCode,
        "Country" => AddressPart::Country,
        _ => return None,
    };
    Some((address_type, part))
}

/// Raw sub-fields of one address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    pub lines: [Option<String>; MAX_ADDRESS_LINES],
    pub city: Option<String>,
    pub state_province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

impl AddressFields {
    /// Set a sub-field; empty values are ignored
    pub fn set(&mut self, part: AddressPart, value: &str) {
        if value.is_empty() {
            return;
        }
        let value = Some(value.to_string());
        match part {
            AddressPart::Line(i) if i < MAX_ADDRESS_LINES => self.lines[i] = value,
            AddressPart::Line(_) => {}
            AddressPart::City => self.city = value,
            AddressPart::StateProvince => self.state_province = value,
            AddressPart::PostalCode => self.postal_code = value,
            AddressPart::Country => self.country = value,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.lines
            .iter()
            .chain([
                &self.city,
                &self.state_province,
                &self.postal_code,
                &self.country,
            ])
            .all(|v| v.as_deref().map(str::trim).unwrap_or_default().is_empty())
    }

    fn key(&self) -> AddressKey<'_> {
        fn text(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or_default()
        }
        AddressKey {
            lines: [
                text(&self.lines[0]),
                text(&self.lines[1]),
                text(&self.lines[2]),
                text(&self.lines[3]),
            ],
            city: text(&self.city),
            state_province: text(&self.state_province),
            postal_code: text(&self.postal_code),
            country: text(&self.country),
        }
    }

    /// Build the identified record owned by `location_id`
    pub fn into_record(self, address_type: AddressType, location_id: &str) -> Address {
        let id = identity::address_id(&self.key(), address_type, location_id);
        let [address_1, address_2, address_3, address_4] = self.lines;
        Address {
            id,
            address_type,
            location_id: location_id.to_string(),
            attention: None,
            address_1,
            address_2,
            address_3,
            address_4,
            city: self.city,
            region: None,
            state_province: self.state_province,
            postal_code: self.postal_code,
            country: self.country,
        }
    }
}

/// Postal and physical address accumulators for one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    postal: AddressFields,
    physical: AddressFields,
}

impl AddressSet {
    pub fn set(&mut self, address_type: AddressType, part: AddressPart, value: &str) {
        self.get_mut(address_type).set(part, value);
    }

    pub fn get(&self, address_type: AddressType) -> &AddressFields {
        match address_type {
            AddressType::Postal => &self.postal,
            AddressType::Physical => &self.physical,
        }
    }

    fn get_mut(&mut self, address_type: AddressType) -> &mut AddressFields {
        match address_type {
            AddressType::Postal => &mut self.postal,
            AddressType::Physical => &mut self.physical,
        }
    }

    /// Province/state values of both addresses
    pub fn regions(&self) -> Vec<&str> {
        [&self.postal, &self.physical]
            .iter()
            .filter_map(|a| a.state_province.as_deref())
            .collect()
    }

    /// Non-blank addresses, postal first
    pub fn into_non_blank(self) -> Vec<(AddressType, AddressFields)> {
        [
            (AddressType::Postal, self.postal),
            (AddressType::Physical, self.physical),
        ]
        .into_iter()
        .filter(|(_, fields)| !fields.is_blank())
        .collect()
    }
}

/// Normalize a country to its two-letter code
///
/// `Canada` → `CA`, `United States`/`USA` → `US`; anything else is
/// upper-cased as given.
pub fn normalize_country(value: &str) -> String {
    let trimmed = value.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "canada" => "CA".to_string(),
        "united states" | "united states of america" | "usa" => "US".to_string(),
        _ => trimmed.to_uppercase(),
    }
}

/// Apply the tree dialect's required-field and country rules
///
/// Returns `Ok(None)` for an address with an empty first line (no address of
/// that type). A non-blank address needs `City` and `Country`, and the
/// country must reduce to a two-letter code.
pub fn validate_tree_address(
    mut fields: AddressFields,
    address_type: AddressType,
    context: &str,
) -> Result<Option<AddressFields>, ParseError> {
    if fields.lines[0].as_deref().map(str::trim).unwrap_or_default().is_empty() {
        return Ok(None);
    }

    let context = format!("{} {}", context, address_type);
    if fields.city.as_deref().map(str::trim).unwrap_or_default().is_empty() {
        return Err(ParseError::missing("City", context));
    }
    let country = match fields.country.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => normalize_country(c),
        _ => return Err(ParseError::missing("Country", context)),
    };
    if country.chars().count() > 2 {
        return Err(ParseError::invalid_shape("Country", country, context));
    }
    fields.country = Some(country);
    Ok(Some(fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_header() {
        assert_eq!(
            classify_header("MailingAddress1"),
            Some((AddressType::Postal, AddressPart::Line(0)))
        );
        assert_eq!(
            classify_header("PhysicalCity"),
            Some((AddressType::Physical, AddressPart::City))
        );
        assert_eq!(
            classify_header("PhysicalStateProvince"),
            Some((AddressType::Physical, AddressPart::StateProvince))
        );
        assert_eq!(classify_header("MailingAttention"), None);
        assert_eq!(classify_header("PublicName"), None);
    }

    #[test]
    fn test_blank_addresses_are_dropped() {
        let mut set = AddressSet::default();
        set.set(AddressType::Postal, AddressPart::Line(0), "123 Main St");
        set.set(AddressType::Physical, AddressPart::City, "");

        let addresses = set.into_non_blank();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].0, AddressType::Postal);
    }

    #[test]
    fn test_into_record_links_location() {
        let mut fields = AddressFields::default();
        fields.set(AddressPart::Line(0), "123 Main St");
        fields.set(AddressPart::City, "Langley");

        let first = fields.clone().into_record(AddressType::Postal, "loc-a");
        let second = fields.into_record(AddressType::Postal, "loc-b");
        assert_eq!(first.location_id, "loc-a");
        assert_eq!(second.location_id, "loc-b");
        assert_ne!(first.id, second.id);
        assert_eq!(first.address_1.as_deref(), Some("123 Main St"));
    }

    #[test]
    fn test_text_moved_between_fields_changes_id() {
        let mut first = AddressFields::default();
        first.set(AddressPart::Line(0), "Unit 4");
        first.set(AddressPart::City, "Langley");

        let mut second = AddressFields::default();
        second.set(AddressPart::Line(1), "Unit 4");
        second.set(AddressPart::City, "Langley");

        let first = first.into_record(AddressType::Physical, "loc-a");
        let second = second.into_record(AddressType::Physical, "loc-a");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_country_normalization() {
        assert_eq!(normalize_country("Canada"), "CA");
        assert_eq!(normalize_country("USA"), "US");
        assert_eq!(normalize_country("United States"), "US");
        assert_eq!(normalize_country("ca"), "CA");
        assert_eq!(normalize_country("Mexico"), "MEXICO");
    }

    #[test]
    fn test_tree_address_rules() {
        let mut fields = AddressFields::default();
        fields.set(AddressPart::Line(0), "1 Road");
        fields.set(AddressPart::City, "Surrey");
        fields.set(AddressPart::Country, "Canada");
        let valid = validate_tree_address(fields.clone(), AddressType::Physical, "agency 1")
            .unwrap()
            .unwrap();
        assert_eq!(valid.country.as_deref(), Some("CA"));

        let mut no_city = fields.clone();
        no_city.city = None;
        let err = validate_tree_address(no_city, AddressType::Physical, "agency 1").unwrap_err();
        assert!(matches!(err, ParseError::MissingRequiredField { ref field, .. } if field == "City"));

        let mut long_country = fields.clone();
        long_country.country = Some("Atlantis".to_string());
        let err =
            validate_tree_address(long_country, AddressType::Physical, "agency 1").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFieldShape { .. }));

        let mut no_line = fields;
        no_line.lines[0] = None;
        assert_eq!(
            validate_tree_address(no_line, AddressType::Physical, "agency 1").unwrap(),
            None
        );
    }
}
