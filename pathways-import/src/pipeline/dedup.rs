//! Run-scoped dedup tracker
//!
//! Three independent id sets: locations, phone numbers and taxonomy terms.
//! The first record with a given id wins; later ones are merged silently.
//! Addresses never pass through here because every Address id already
//! includes its owning Location id.

use crate::error::ImportError;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Outcome of observing one id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupResult {
    /// First occurrence; emit the record
    Unique,
    /// Already emitted in this run
    Duplicate,
}

impl DedupResult {
    pub fn is_unique(&self) -> bool {
        matches!(self, DedupResult::Unique)
    }
}

/// Reach of phone-number dedup
///
/// `Run` keeps one record per number for the whole run. `Location` keeps one
/// per number and Location, so a number shared by two sites is emitted for
/// each of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PhoneDedupScope {
    #[default]
    Run,
    Location,
}

impl PhoneDedupScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhoneDedupScope::Run => "run",
            PhoneDedupScope::Location => "location",
        }
    }
}

impl fmt::Display for PhoneDedupScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhoneDedupScope {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "run" => Ok(PhoneDedupScope::Run),
            "location" => Ok(PhoneDedupScope::Location),
            other => Err(ImportError::Config(format!(
                "Unknown phone dedup scope '{}' (expected run or location)",
                other
            ))),
        }
    }
}

/// Already-emitted ids of the current run
#[derive(Debug, Default)]
pub struct DedupTracker {
    phone_scope: PhoneDedupScope,
    locations: HashSet<String>,
    phones: HashSet<(String, Option<String>)>,
    taxonomy_terms: HashSet<String>,
}

impl DedupTracker {
    pub fn new(phone_scope: PhoneDedupScope) -> Self {
        Self {
            phone_scope,
            ..Default::default()
        }
    }

    pub fn phone_scope(&self) -> PhoneDedupScope {
        self.phone_scope
    }

    pub fn observe_location(&mut self, id: &str) -> DedupResult {
        observe(&mut self.locations, id.to_string())
    }

    pub fn observe_phone(&mut self, id: &str, location_id: Option<&str>) -> DedupResult {
        let scope = match self.phone_scope {
            PhoneDedupScope::Run => None,
            PhoneDedupScope::Location => location_id.map(str::to_string),
        };
        observe(&mut self.phones, (id.to_string(), scope))
    }

    pub fn observe_taxonomy_term(&mut self, id: &str) -> DedupResult {
        observe(&mut self.taxonomy_terms, id.to_string())
    }

    pub fn has_location(&self, id: &str) -> bool {
        self.locations.contains(id)
    }
}

fn observe<K: Eq + std::hash::Hash>(seen: &mut HashSet<K>, key: K) -> DedupResult {
    if seen.insert(key) {
        DedupResult::Unique
    } else {
        DedupResult::Duplicate
    }
}
