//! Inactive-record classification
//!
//! A record is retired by prefixing its description with the `DEL` marker
//! followed by a digit or whitespace (`"DEL16 ..."`, `"del 3..."`). A bundle
//! can also be forced inactive by its province/state code or, in the legacy
//! dialect, by `AgencyStatus == "Inactive"`. Forced records get the synthetic
//! `"DEL0 "` prefix unless they are already marked.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Prefix written onto descriptions of records forced inactive
pub const INACTIVE_MARKER: &str = "DEL0 ";

/// Region codes that force a bundle inactive unless configured otherwise
pub const DEFAULT_EXCLUDED_REGIONS: &[&str] = &["YT", "WA", "WI", "TX", "TN"];

/// `AgencyStatus` value that retires a legacy bundle
pub const INACTIVE_STATUS: &str = "Inactive";

static MARKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^DEL[0-9\s]").expect("static inactive marker pattern"));

/// True when the trimmed description starts with the retirement marker
pub fn is_marked_inactive(description: &str) -> bool {
    MARKER_PATTERN.is_match(description.trim())
}

pub fn is_description_inactive(description: Option<&str>) -> bool {
    description.map(is_marked_inactive).unwrap_or(false)
}

/// Prefix the marker unless already present (never double-marks)
pub fn mark_inactive(description: &str) -> String {
    if is_marked_inactive(description) {
        description.to_string()
    } else {
        format!("{}{}", INACTIVE_MARKER, description)
    }
}

/// Carry the marker from an overwritten description onto its replacement
pub fn transfer_marker(old: Option<&str>, new: &str) -> String {
    if is_description_inactive(old) && !is_marked_inactive(new) {
        mark_inactive(new)
    } else {
        new.to_string()
    }
}

/// Outcome of classifying one description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub description: Option<String>,
    pub inactive: bool,
}

/// Region- and status-aware classifier, configured once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactiveClassifier {
    excluded_regions: BTreeSet<String>,
}

impl Default for InactiveClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_REGIONS.iter().copied())
    }
}

impl InactiveClassifier {
    pub fn new<I, S>(excluded_regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            excluded_regions: excluded_regions
                .into_iter()
                .map(|r| r.as_ref().trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }

    pub fn is_excluded_region(&self, code: &str) -> bool {
        self.excluded_regions.contains(code.trim())
    }

    /// Classify a description, applying the forced-inactive rules
    ///
    /// `regions` are the bundle's province/state values (postal and physical).
    /// When a forced rule fires the marker is prepended before the
    /// description is used anywhere else.
    pub fn classify(
        &self,
        description: Option<&str>,
        regions: &[&str],
        status: Option<&str>,
    ) -> Classification {
        let forced = regions.iter().any(|r| self.is_excluded_region(r))
            || status.map(|s| s.trim() == INACTIVE_STATUS).unwrap_or(false);

        if forced {
            return Classification {
                description: Some(mark_inactive(description.unwrap_or_default())),
                inactive: true,
            };
        }

        Classification {
            description: description.map(str::to_string),
            inactive: is_description_inactive(description),
        }
    }
}
