//! Import run statistics
//!
//! Counters collected by the driver while it runs, logged as a summary when
//! the run ends and optionally printed as JSON by the binary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// **Bundle counters**
///
/// Display: "N bundles read, M failed, I inactive, S skipped as inactive"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleStats {
    /// Bundles (rows, agencies, Open Referral rows) read from the source
    pub read: usize,
    /// Bundles isolated by a parse error
    pub failed: usize,
    /// Bundles classified inactive
    pub inactive: usize,
    /// Bundles or rows dropped because of the inactive filter
    pub skipped_inactive: usize,
}

impl BundleStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} bundles read, {} failed, {} inactive, {} skipped as inactive",
            self.read, self.failed, self.inactive, self.skipped_inactive
        )
    }
}

/// **Emitted records per entity kind**
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedStats {
    pub organizations: usize,
    pub services: usize,
    pub locations: usize,
    pub services_at_location: usize,
    pub addresses: usize,
    pub phone_numbers: usize,
    pub taxonomy_terms: usize,
    pub service_taxonomy_terms: usize,
}

impl EmittedStats {
    pub fn total(&self) -> usize {
        self.organizations
            + self.services
            + self.locations
            + self.services_at_location
            + self.addresses
            + self.phone_numbers
            + self.taxonomy_terms
            + self.service_taxonomy_terms
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} organizations, {} services, {} locations, {} addresses, {} phones, {} taxonomy terms",
            self.organizations,
            self.services,
            self.locations,
            self.addresses,
            self.phone_numbers,
            self.taxonomy_terms
        )
    }
}

/// **Merged or discarded sub-entities**
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupStats {
    /// Locations merged into an earlier one with the same id
    pub locations_merged: usize,
    pub phones_deduplicated: usize,
    pub taxonomy_terms_deduplicated: usize,
    /// Addresses dropped as malformed
    pub addresses_discarded: usize,
    /// Phone numbers dropped as invalid
    pub phones_discarded: usize,
    /// Locations given coordinates from the city table
    pub coordinates_filled: usize,
}

impl DedupStats {
    pub fn display_string(&self) -> String {
        format!(
            "{} locations merged, {} phones and {} taxonomy terms deduplicated, {} addresses and {} phones discarded",
            self.locations_merged,
            self.phones_deduplicated,
            self.taxonomy_terms_deduplicated,
            self.addresses_discarded,
            self.phones_discarded
        )
    }
}

/// Summary of one import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStatistics {
    pub run_id: Uuid,
    pub dialect: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub bundles: BundleStats,
    pub emitted: EmittedStats,
    pub dedup: DedupStats,
}

impl ImportStatistics {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            dialect: dialect.into(),
            started_at: Utc::now(),
            finished_at: None,
            bundles: BundleStats::default(),
            emitted: EmittedStats::default(),
            dedup: DedupStats::default(),
        }
    }

    /// Stamp the end of the run
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Log the run summary at info level
    pub fn log_summary(&self) {
        info!(
            run_id = %self.run_id,
            dialect = %self.dialect,
            elapsed_ms = self.elapsed_ms().unwrap_or_default(),
            records = self.emitted.total(),
            "Import finished: {}; {}; {}",
            self.bundles.display_string(),
            self.emitted.display_string(),
            self.dedup.display_string()
        );
    }
}
