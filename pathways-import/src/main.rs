//! pathways-import - Directory Export Importer
//!
//! Reads a social-services directory export (legacy flat CSV, Open Referral
//! CSV set or XML tree) and writes the normalized Open Referral file set.
//!
//! **Startup:**
//! 1. Parse the command line
//! 2. Locate and load the TOML config (CLI → `PATHWAYS_CONFIG` → OS config dir)
//! 3. Install logging (`RUST_LOG` → `[logging].level`)
//! 4. Resolve import settings and the output folder, then run

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pathways_common::config::{self, LoggingConfig, OutputFolderResolver, TomlConfig};
use pathways_import::dialect::Dialect;
use pathways_import::pipeline::PhoneDedupScope;
use pathways_import::{CliOverrides, CsvFileSink, ImportSettings};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for pathways-import
#[derive(Parser, Debug)]
#[command(name = "pathways-import")]
#[command(about = "Convert directory exports into Open Referral CSV files")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import one export
    Run(RunArgs),

    /// Write a config file holding the built-in defaults
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Source file (legacy CSV, XML) or folder (Open Referral)
    input: PathBuf,

    /// Source dialect: legacy-csv, open-referral or xml
    #[arg(short, long, value_parser = parse_dialect)]
    dialect: Option<Dialect>,

    /// Output folder for the Open Referral files
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Put every taxonomy term in this vocabulary
    #[arg(long)]
    vocabulary: Option<String>,

    /// Drop inactive organizations and services
    #[arg(long)]
    skip_inactive: bool,

    /// Phone dedup scope: run or location
    #[arg(long, value_parser = parse_phone_dedup)]
    phone_dedup: Option<PhoneDedupScope>,

    /// `city,longitude,latitude` table for locations without coordinates
    #[arg(long)]
    city_coordinates: Option<PathBuf>,

    /// Print the run statistics as JSON on stdout
    #[arg(long)]
    summary_json: bool,
}

fn parse_dialect(value: &str) -> std::result::Result<Dialect, String> {
    value.parse().map_err(|e: pathways_import::ImportError| e.to_string())
}

fn parse_phone_dedup(value: &str) -> std::result::Result<PhoneDedupScope, String> {
    value.parse().map_err(|e: pathways_import::ImportError| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let toml_config = config::load_or_default(config_path.as_deref()).with_context(|| {
        format!(
            "Failed to load config file {}",
            config_path.as_deref().unwrap_or(Path::new("?")).display()
        )
    })?;

    init_logging(&toml_config.logging).context("Failed to initialize logging")?;

    info!(
        "Starting pathways-import {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) if path.exists() => info!("Config: {}", path.display()),
        Some(path) => warn!("Config file {} not found, using built-in defaults", path.display()),
        None => warn!("No config file location could be determined, using built-in defaults"),
    }

    match args.command {
        Command::Run(run) => run_import(run, &toml_config),
        Command::InitConfig { force } => {
            let path = config_path.context("No config file location could be determined")?;
            init_config(&path, force)
        }
    }
}

/// Install the fmt subscriber; `RUST_LOG` wins over the TOML level
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("Invalid log level '{}'", logging.level))?,
    };
    let registry = tracing_subscriber::registry().with(filter);

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
    Ok(())
}

fn run_import(run: RunArgs, toml_config: &TomlConfig) -> Result<()> {
    let overrides = CliOverrides {
        dialect: run.dialect,
        vocabulary: run.vocabulary,
        skip_inactive: run.skip_inactive,
        phone_dedup: run.phone_dedup,
        city_coordinates: run.city_coordinates,
    };
    let settings = ImportSettings::resolve(&toml_config.import, &overrides)
        .context("Invalid import settings")?;

    let output = OutputFolderResolver::new(run.output, toml_config.output_folder.clone()).resolve();
    info!("Input: {}", run.input.display());
    info!("Output folder: {}", output.display());

    let sink = CsvFileSink::create(&output)
        .with_context(|| format!("Failed to create output files in {}", output.display()))?;
    let (_, statistics) = pathways_import::import_path(&run.input, &settings, sink)
        .with_context(|| format!("Import of {} failed", run.input.display()))?;

    if run.summary_json {
        let json = serde_json::to_string_pretty(&statistics)
            .context("Failed to serialize run statistics")?;
        println!("{}", json);
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("Config file {} already exists (use --force to replace it)", path.display());
    }

    let config = TomlConfig {
        output_folder: Some(config::default_output_folder()),
        logging: LoggingConfig::default(),
        import: ImportSettings::default().to_toml(),
    };
    config::write_toml_config(&config, path)
        .with_context(|| format!("Failed to write config file {}", path.display()))?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}
