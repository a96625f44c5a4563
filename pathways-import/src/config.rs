//! Import settings resolution
//!
//! Combines the `[import]` table of the TOML file with command-line
//! overrides into one immutable [`ImportSettings`] value.
//!
//! **Priority:** CLI → TOML → built-in defaults

use crate::builder::BundleSettings;
use crate::dialect::legacy_csv::LegacyCsvDialect;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::inactive::{InactiveClassifier, DEFAULT_EXCLUDED_REGIONS};
use crate::pipeline::{CityCoordinates, PhoneDedupScope, PipelineOptions};
use pathways_common::config::ImportTomlConfig;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Values given on the command line; `None` defers to the TOML file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub dialect: Option<Dialect>,
    pub vocabulary: Option<String>,
    /// Only ever switches filtering on
    pub skip_inactive: bool,
    pub phone_dedup: Option<PhoneDedupScope>,
    pub city_coordinates: Option<PathBuf>,
}

/// Resolved settings for one import run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    pub dialect: Dialect,
    pub vocabulary: Option<String>,
    pub skip_inactive: bool,
    pub phone_dedup: PhoneDedupScope,
    pub excluded_regions: Vec<String>,
    pub city_coordinates: Option<PathBuf>,
    pub header_synonyms: BTreeMap<String, String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::LegacyCsv,
            vocabulary: None,
            skip_inactive: false,
            phone_dedup: default_phone_dedup(Dialect::LegacyCsv),
            excluded_regions: DEFAULT_EXCLUDED_REGIONS.iter().map(|r| r.to_string()).collect(),
            city_coordinates: None,
            header_synonyms: BTreeMap::new(),
        }
    }
}

/// Phone dedup scope used when none is configured
///
/// Tree phones belong to one site each, so the tree dialect keeps a number
/// once per Location. The flat dialects keep it once per run.
pub fn default_phone_dedup(dialect: Dialect) -> PhoneDedupScope {
    match dialect {
        Dialect::XmlTree => PhoneDedupScope::Location,
        Dialect::LegacyCsv | Dialect::OpenReferral => PhoneDedupScope::Run,
    }
}

/// Non-empty, non-whitespace text
pub fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

impl ImportSettings {
    /// Resolve CLI values over TOML values over defaults
    pub fn resolve(toml: &ImportTomlConfig, cli: &CliOverrides) -> Result<Self> {
        let dialect = match (cli.dialect, toml.dialect.as_deref().filter(|d| is_set(d))) {
            (Some(dialect), _) => {
                debug!(dialect = %dialect, "Dialect from command line");
                dialect
            }
            (None, Some(text)) => {
                let dialect = text.parse::<Dialect>()?;
                debug!(dialect = %dialect, "Dialect from TOML config");
                dialect
            }
            (None, None) => Dialect::LegacyCsv,
        };

        let vocabulary = cli
            .vocabulary
            .clone()
            .or_else(|| toml.vocabulary.clone())
            .filter(|v| is_set(v))
            .map(|v| v.trim().to_string());

        let phone_dedup = match (cli.phone_dedup, toml.phone_dedup.as_deref().filter(|d| is_set(d))) {
            (Some(scope), _) => scope,
            (None, Some(text)) => text.parse::<PhoneDedupScope>()?,
            (None, None) => default_phone_dedup(dialect),
        };

        let excluded_regions = match &toml.excluded_regions {
            Some(regions) => regions.iter().map(|r| r.trim().to_uppercase()).collect(),
            None => DEFAULT_EXCLUDED_REGIONS.iter().map(|r| r.to_string()).collect(),
        };

        let settings = Self {
            dialect,
            vocabulary,
            skip_inactive: cli.skip_inactive || toml.skip_inactive.unwrap_or(false),
            phone_dedup,
            excluded_regions,
            city_coordinates: cli
                .city_coordinates
                .clone()
                .or_else(|| toml.city_coordinates.clone()),
            header_synonyms: toml.header_synonyms.clone(),
        };

        info!(
            dialect = %settings.dialect,
            vocabulary = settings.vocabulary.as_deref().unwrap_or("inferred"),
            skip_inactive = settings.skip_inactive,
            phone_dedup = %settings.phone_dedup,
            "Resolved import settings"
        );
        Ok(settings)
    }

    /// Settings every bundle mapper receives
    pub fn bundle_settings(&self) -> BundleSettings {
        BundleSettings {
            vocabulary: self.vocabulary.clone(),
            classifier: InactiveClassifier::new(&self.excluded_regions),
        }
    }

    /// Legacy header table extended with the configured synonyms
    pub fn legacy_dialect(&self) -> LegacyCsvDialect {
        LegacyCsvDialect::default().with_synonyms(self.header_synonyms.clone())
    }

    /// Driver options, loading the city table when one is configured
    pub fn pipeline_options(&self) -> Result<PipelineOptions> {
        let city_coordinates = match &self.city_coordinates {
            Some(path) => Some(CityCoordinates::from_path(path)?),
            None => None,
        };
        Ok(PipelineOptions {
            skip_inactive: self.skip_inactive,
            phone_dedup: self.phone_dedup,
            city_coordinates,
        })
    }

    /// The `[import]` table that reproduces these settings
    pub fn to_toml(&self) -> ImportTomlConfig {
        ImportTomlConfig {
            dialect: Some(self.dialect.to_string()),
            vocabulary: self.vocabulary.clone(),
            skip_inactive: Some(self.skip_inactive),
            phone_dedup: Some(self.phone_dedup.to_string()),
            excluded_regions: Some(self.excluded_regions.clone()),
            city_coordinates: self.city_coordinates.clone(),
            header_synonyms: self.header_synonyms.clone(),
        }
    }
}
