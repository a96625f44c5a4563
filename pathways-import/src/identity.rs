//! Content-addressed identifiers
//!
//! Every derived identifier is a SHA-256 digest over an ordered tuple of
//! string fields. Each field is encoded as its UTF-8 byte length in decimal,
//! a `:`, then the bytes themselves (`"ab"` → `2:ab`), so no two distinct
//! tuples share an encoding. An absent field contributes the empty string
//! (`0:`). The digest is rendered as 64 lower-case hex characters.
//!
//! # Field order
//! | Entity | Fields |
//! |---|---|
//! | Location | up to 6 phone numbers sorted ascending and padded with empties, name, alternate_name, latitude, longitude |
//! | Address | address_1..4, city, state_province, postal_code, country, type, location_id |
//! | PhoneNumber | number |
//! | TaxonomyTerm | name, vocabulary |
//! | ServiceAtLocation | service_id, location_id |
//! | ServiceTaxonomyTerm | service_id, taxonomy_id |

use crate::models::AddressType;
use sha2::{Digest, Sha256};

/// Number of phone slots folded into a Location identity
pub const LOCATION_PHONE_SLOTS: usize = 6;

/// Hash an ordered list of fields into a fixed-length hex digest
pub fn compute_hash<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for field in fields {
        let bytes = field.as_ref().as_bytes();
        hasher.update(format!("{}:", bytes.len()).as_bytes());
        hasher.update(bytes);
    }
    format!("{:x}", hasher.finalize())
}

/// Text form of a coordinate as folded into the Location identity
///
/// Absent coordinates hash as the empty string.
pub fn coordinate_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Identity fields of a Location (description is deliberately absent)
///
/// `phone_numbers` is taken as a set: order does not affect the id.
#[derive(Debug, Clone, Default)]
pub struct LocationKey<'a> {
    pub phone_numbers: [&'a str; LOCATION_PHONE_SLOTS],
    pub name: &'a str,
    pub alternate_name: &'a str,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub fn location_id(key: &LocationKey<'_>) -> String {
    let latitude = coordinate_text(key.latitude);
    let longitude = coordinate_text(key.longitude);

    // Non-empty numbers first in ascending order, empties padding the tail
    let mut phones: Vec<&str> = key
        .phone_numbers
        .iter()
        .copied()
        .filter(|n| !n.is_empty())
        .collect();
    phones.sort_unstable();
    phones.resize(LOCATION_PHONE_SLOTS, "");

    compute_hash(
        phones
            .into_iter()
            .chain([key.name, key.alternate_name, latitude.as_str(), longitude.as_str()]),
    )
}

/// Identity fields of an Address
#[derive(Debug, Clone, Default)]
pub struct AddressKey<'a> {
    pub lines: [&'a str; 4],
    pub city: &'a str,
    pub state_province: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
}

/// Address id, scoped to its owning Location
pub fn address_id(key: &AddressKey<'_>, address_type: AddressType, location_id: &str) -> String {
    compute_hash(key.lines.iter().copied().chain([
        key.city,
        key.state_province,
        key.postal_code,
        key.country,
        address_type.as_str(),
        location_id,
    ]))
}

pub fn phone_number_id(number: &str) -> String {
    compute_hash([number])
}

pub fn taxonomy_term_id(name: &str, vocabulary: &str) -> String {
    compute_hash([name, vocabulary])
}

pub fn service_at_location_id(service_id: &str, location_id: &str) -> String {
    compute_hash([service_id, location_id])
}

pub fn service_taxonomy_term_id(service_id: &str, taxonomy_id: &str) -> String {
    compute_hash([service_id, taxonomy_id])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key<'a>(phone: &'a str, name: &'a str) -> LocationKey<'a> {
        LocationKey {
            phone_numbers: [phone, "", "", "", "", ""],
            name,
            alternate_name: "",
            latitude: Some(49.1),
            longitude: Some(-122.6),
        }
    }

    #[test]
    fn test_hash_is_stable_hex() {
        let id = compute_hash(["a", "b"]);
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, compute_hash(["ab"]));
        // SHA-256("2:ab")
        assert_eq!(
            compute_hash(["ab"]),
            "d1ab1a7fbf5a9552f2d01c956d30855b34ed7335751d363bd6d45a01777c0811"
        );
    }

    #[test]
    fn test_field_boundaries_change_the_hash() {
        assert_ne!(compute_hash(["Food Bank", ""]), compute_hash(["Food", " Bank"]));
        assert_ne!(compute_hash(["", "x"]), compute_hash(["x", ""]));

        let mut whole = key("604-530-0311", "Food Bank");
        whole.alternate_name = "";
        let mut split = key("604-530-0311", "Food");
        split.alternate_name = " Bank";
        assert_ne!(location_id(&whole), location_id(&split));
    }

    #[test]
    fn test_phone_order_does_not_change_location_id() {
        let mut first = key("604-555-0100", "Langley Food Bank");
        first.phone_numbers[1] = "604-555-0200";
        let mut swapped = key("604-555-0200", "Langley Food Bank");
        swapped.phone_numbers[4] = "604-555-0100";
        assert_eq!(location_id(&first), location_id(&swapped));

        let mut other = key("604-555-0200", "Langley Food Bank");
        other.phone_numbers[1] = "604-555-0300";
        assert_ne!(location_id(&first), location_id(&other));
    }

    #[test]
    fn test_location_id_depends_on_identity_fields() {
        let base = location_id(&key("604-530-0311", "Langley Food Bank"));
        assert_eq!(base, location_id(&key("604-530-0311", "Langley Food Bank")));
        assert_ne!(base, location_id(&key("604-530-0312", "Langley Food Bank")));
        assert_ne!(base, location_id(&key("604-530-0311", "Langley Food Bank 2")));

        let mut moved = key("604-530-0311", "Langley Food Bank");
        moved.latitude = Some(49.2);
        assert_ne!(base, location_id(&moved));
    }

    #[test]
    fn test_address_id_folds_in_location() {
        let key = AddressKey {
            lines: ["123 Main St", "", "", ""],
            city: "Langley",
            ..Default::default()
        };
        let first = address_id(&key, AddressType::Postal, "loc-1");
        let second = address_id(&key, AddressType::Postal, "loc-2");
        let physical = address_id(&key, AddressType::Physical, "loc-1");
        assert_ne!(first, second);
        assert_ne!(first, physical);
    }

    #[test]
    fn test_absent_coordinate_hashes_as_empty() {
        assert_eq!(coordinate_text(None), "");
        assert_eq!(coordinate_text(Some(49.25)), "49.25");
    }
}
