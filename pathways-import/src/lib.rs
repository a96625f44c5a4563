//! pathways-import library interface
//!
//! Converts social-services directory exports into the normalized Open
//! Referral record set.
//!
//! # Components
//! - [`dialect`]: source shapes (legacy flat CSV, Open Referral CSV set, XML tree)
//! - [`parsers`]: address, phone, taxonomy and value sub-parsers
//! - [`builder`]: turns canonical fields into identified records
//! - [`identity`]: content-addressed identifiers
//! - [`inactive`]: retirement marker and forced-inactive rules
//! - [`pipeline`]: the driver, dedup tracker and run statistics
//! - [`sink`]: the output contract and its CSV/in-memory implementations

pub mod builder;
pub mod config;
pub mod dialect;
pub mod error;
pub mod identity;
pub mod inactive;
pub mod models;
pub mod parsers;
pub mod pipeline;
pub mod sink;

pub use crate::builder::{Bundle, BundleSettings};
pub use crate::config::{CliOverrides, ImportSettings};
pub use crate::dialect::Dialect;
pub use crate::error::{ImportError, ParseError, ParseErrorKind, Result};
pub use crate::pipeline::{ImportPipeline, ImportStatistics, PipelineOptions};
pub use crate::sink::{CsvFileSink, MemorySink, Sink};

use crate::dialect::legacy_csv::LegacyCsvReader;
use crate::dialect::open_referral::OpenReferralImporter;
use crate::dialect::xml_tree::XmlTreeReader;
use std::path::Path;

/// Import one source into a sink
///
/// `input` is a file for the bundle dialects and a folder for Open Referral.
/// Returns the sink together with the run statistics.
pub fn import_path<S: Sink>(input: &Path, settings: &ImportSettings, sink: S) -> Result<(S, ImportStatistics)> {
    let mut pipeline = ImportPipeline::new(sink, settings.pipeline_options()?, settings.dialect);
    let bundle_settings = settings.bundle_settings();

    match settings.dialect {
        Dialect::LegacyCsv => {
            let reader =
                LegacyCsvReader::from_path(input, &settings.legacy_dialect(), bundle_settings)?;
            pipeline.run(reader)?;
        }
        Dialect::XmlTree => {
            let reader = XmlTreeReader::from_path(input, bundle_settings)?;
            pipeline.run(reader)?;
        }
        Dialect::OpenReferral => {
            OpenReferralImporter::new(input, bundle_settings).run(&mut pipeline)?;
        }
    }

    pipeline.finish()
}
