//! Phone sub-parser
//!
//! Legacy columns carry a 1-based slot numeral (`Phone1Number`, `Phone2Type`,
//! `Phone3Name`). `PhoneFax` always lands in the fixed terminal slot.
//! Slots grow lazily to the highest referenced index; unused slots stay
//! empty and are dropped on output together with any entry whose number is
//! empty.
//!
//! The tree dialect validates numbers into international form with
//! [`normalize_international`].

use crate::error::ParseError;
use crate::identity::LOCATION_PHONE_SLOTS;

/// Zero-based slot the fax column is stored in
pub const FAX_SLOT: usize = 5;

pub const FAX_TYPE: &str = "Fax";

/// One sub-field of a phone column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhonePart {
    Number,
    Type,
    /// Free-text label, stored as the phone description
    Name,
    Fax,
}

/// Parse a legacy phone header into `(zero-based slot, part)`
pub fn classify_header(header: &str) -> Option<(usize, PhonePart)> {
    if header == "PhoneFax" {
        return Some((FAX_SLOT, PhonePart::Fax));
    }

    let rest = header.strip_prefix("Phone")?;
    let mut chars = rest.chars();
    let slot = chars.next()?.to_digit(10)? as usize;
    if slot == 0 {
        return None;
    }
    let part = match chars.as_str() {
        "Number" => PhonePart::Number,
        "Type" => PhonePart::Type,
        "Name" => PhonePart::Name,
        _ => return None,
    };
    Some((slot - 1, part))
}

/// Raw sub-fields of one phone slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneEntry {
    pub number: Option<String>,
    pub phone_type: Option<String>,
    pub description: Option<String>,
}

impl PhoneEntry {
    pub fn has_number(&self) -> bool {
        self.number.as_deref().map(|n| !n.trim().is_empty()).unwrap_or(false)
    }
}

/// Phone slots for one bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneSlots {
    entries: Vec<PhoneEntry>,
}

impl Default for PhoneSlots {
    fn default() -> Self {
        Self {
            entries: vec![PhoneEntry::default()],
        }
    }
}

impl PhoneSlots {
    pub fn set(&mut self, slot: usize, part: PhonePart, value: &str) {
        if self.entries.len() <= slot {
            self.entries.resize_with(slot + 1, PhoneEntry::default);
        }
        let entry = &mut self.entries[slot];

        match part {
            PhonePart::Number => entry.number = Some(value.to_string()),
            PhonePart::Type if value.is_empty() => {
                entry.phone_type = Some(format!("Phone {}", slot + 1));
            }
            PhonePart::Type => entry.phone_type = Some(value.to_string()),
            PhonePart::Name => entry.description = Some(value.to_string()),
            PhonePart::Fax => {
                entry.number = Some(value.to_string());
                if !value.is_empty() {
                    entry.phone_type = Some(FAX_TYPE.to_string());
                }
            }
        }
    }

    /// Number in a slot, empty when absent
    pub fn number_at(&self, slot: usize) -> &str {
        self.entries
            .get(slot)
            .and_then(|e| e.number.as_deref())
            .unwrap_or_default()
    }

    /// The numbers folded into the Location identity
    ///
    /// Non-empty numbers sorted ascending, padded with empties, so the same
    /// numbers in different columns identify the same Location.
    pub fn identity_numbers(&self) -> [&str; LOCATION_PHONE_SLOTS] {
        let mut numbers: Vec<&str> = (0..self.entries.len())
            .map(|slot| self.number_at(slot))
            .filter(|n| !n.is_empty())
            .collect();
        numbers.sort_unstable();
        std::array::from_fn(|i| numbers.get(i).copied().unwrap_or_default())
    }

    /// Entries with a non-empty number, in slot order
    pub fn into_entries(self) -> Vec<PhoneEntry> {
        self.entries.into_iter().filter(PhoneEntry::has_number).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|e| !e.has_number())
    }
}

/// Validate a tree-dialect number into `+1XXXXXXXXXX` form
///
/// Accepts ten digits (`2223334444`) or eleven starting with the country
/// code (`1-222-333-4444`). Common separators are ignored; any other
/// character fails validation.
pub fn normalize_international(value: &str, context: &str) -> Result<String, ParseError> {
    let stripped = value.trim().trim_start_matches('+');
    let mut digits = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        match c {
            '0'..='9' => digits.push(c),
            '-' | ' ' | '.' | '(' | ')' => {}
            _ => return Err(ParseError::invalid_phone(value, context)),
        }
    }

    match digits.len() {
        10 => Ok(format!("+1{}", digits)),
        11 if digits.starts_with('1') => Ok(format!("+{}", digits)),
        _ => Err(ParseError::invalid_phone(value, context)),
    }
}

/// Slug id for a phone type label (`"A phone TYPE"` → `a_phone_type`)
pub fn type_slug(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_header() {
        assert_eq!(classify_header("Phone1Number"), Some((0, PhonePart::Number)));
        assert_eq!(classify_header("Phone3Type"), Some((2, PhonePart::Type)));
        assert_eq!(classify_header("Phone2Name"), Some((1, PhonePart::Name)));
        assert_eq!(classify_header("PhoneFax"), Some((FAX_SLOT, PhonePart::Fax)));
        assert_eq!(classify_header("Phone1Description"), None);
        assert_eq!(classify_header("PhoneTollFree"), None);
    }

    #[test]
    fn test_slots_grow_lazily() {
        let mut slots = PhoneSlots::default();
        slots.set(3, PhonePart::Number, "604-555-0100");
        assert_eq!(slots.len(), 4);
        assert_eq!(slots.number_at(1), "");

        let entries = slots.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].number.as_deref(), Some("604-555-0100"));
    }

    #[test]
    fn test_empty_type_defaults_to_slot_label() {
        let mut slots = PhoneSlots::default();
        slots.set(1, PhonePart::Number, "604-555-0100");
        slots.set(1, PhonePart::Type, "");
        assert_eq!(
            slots.into_entries()[0].phone_type.as_deref(),
            Some("Phone 2")
        );
    }

    #[test]
    fn test_fax_overrides_type() {
        let mut slots = PhoneSlots::default();
        slots.set(FAX_SLOT, PhonePart::Fax, "604-555-0199");
        assert_eq!(slots.number_at(FAX_SLOT), "604-555-0199");

        let entry = &slots.into_entries()[0];
        assert_eq!(entry.phone_type.as_deref(), Some(FAX_TYPE));
    }

    #[test]
    fn test_empty_fax_is_dropped() {
        let mut slots = PhoneSlots::default();
        slots.set(FAX_SLOT, PhonePart::Fax, "");
        assert!(slots.is_empty());
        assert!(slots.into_entries().is_empty());
    }

    #[test]
    fn test_identity_numbers_ignore_slot_order() {
        let mut first = PhoneSlots::default();
        first.set(0, PhonePart::Number, "604-555-0200");
        first.set(1, PhonePart::Number, "604-555-0100");

        let mut second = PhoneSlots::default();
        second.set(0, PhonePart::Number, "604-555-0100");
        second.set(FAX_SLOT, PhonePart::Fax, "604-555-0200");

        let expected = ["604-555-0100", "604-555-0200", "", "", "", ""];
        assert_eq!(first.identity_numbers(), expected);
        assert_eq!(second.identity_numbers(), expected);
    }

    #[test]
    fn test_normalize_international() {
        assert_eq!(normalize_international("2223334444", "x").unwrap(), "+12223334444");
        assert_eq!(normalize_international("1-222-333-4444", "x").unwrap(), "+12223334444");
        assert_eq!(normalize_international("(604) 555-0100", "x").unwrap(), "+16045550100");
        assert!(normalize_international("1-800-FLOWERS", "x").is_err());
        assert!(normalize_international("555-0100", "x").is_err());
    }

    #[test]
    fn test_type_slug() {
        assert_eq!(type_slug("A phone TYPE"), "a_phone_type");
        assert_eq!(type_slug("Fax"), "fax");
    }
}
