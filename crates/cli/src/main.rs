// pvcat - PVDAQ capability catalog builder

mod classify;
mod config;
mod download;
mod exit_codes;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pvcat_catalog::{CatalogError, SystemId};
use pvcat_io::{DataLayout, IoError};
use pvcat_lake::{FetchOptions, LakeClient, LakeError};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use config::PvcatConfig;
use download::DownloadCommands;
use exit_codes::{EXIT_IDENTITY_MISMATCH, EXIT_IO, EXIT_REMOTE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "pvcat")]
#[command(about = "Catalog which PVDAQ systems carry irradiance, power and temperature data")]
#[command(long_version = long_version())]
#[command(version)]
#[command(after_help = "\
Configuration (pvcat.toml, every key optional):
  [paths]       data_dir = \"data\"
  [lake]        endpoint, timeout_secs, max_retries, backoff_ms
  [reconcile]   known_orphans = [2045]
  [first_year]  horizon = 2024, scope = \"irradiance\" | \"all\" | \"none\"
  [[prize.systems]]  id = 7333, name = \"7333_5_min\"

Logging goes to stderr; RUST_LOG overrides -v.")]
struct Cli {
    /// Config file
    #[arg(long, global = true, env = "PVCAT_CONFIG")]
    config: Option<PathBuf>,

    /// Local data directory (overrides paths.data_dir)
    #[arg(long, global = true, env = "PVCAT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the reference index, catalog tables and metadata documents
    #[command(after_help = "\
Examples:
  pvcat sync
  pvcat sync --with-pdf --data-dir /srv/pvdaq")]
    Sync {
        /// Also fetch the PDF data sheets next to the CSV metadata documents
        #[arg(long)]
        with_pdf: bool,
    },

    /// Build the enriched record set from the synced sources
    #[command(after_help = "\
Examples:
  pvcat classify
  pvcat classify --no-probe --json
  pvcat classify --output systems_cleaned.csv")]
    Classify {
        /// Do not correct first years against the data lake
        #[arg(long)]
        no_probe: bool,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Record set destination (default: <data_dir>/core/systems_cleaned.csv)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Bulk time-series downloads
    #[command(subcommand)]
    Download(DownloadCommands),

    /// Fetch every object under a prefix into a local directory
    #[command(after_help = "\
Examples:
  pvcat fetch data/raw/ pvdaq/csv/systems_20250729.csv
  pvcat fetch data/raw/csv-metadata/ pvdaq/csv/system_metadata/ --suffix .json")]
    Fetch {
        /// Destination directory; must end in a path separator
        local_dir: String,

        /// Remote key prefix
        prefix: String,

        /// Only objects whose key ends with this
        #[arg(long)]
        suffix: Option<String>,

        /// Inventory description for the downloaded files
        #[arg(long)]
        description: Option<String>,
    },

    /// Ask the data lake whether a system has time series for a year
    Probe {
        system_id: SystemId,
        year: i32,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ncatalog: pvcat-catalog ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = Context::new(cli.config, cli.data_dir).and_then(|ctx| match cli.command {
        Commands::Sync { with_pdf } => sync::cmd_sync(&ctx, with_pdf),
        Commands::Classify { no_probe, json, output } => classify::cmd_classify(&ctx, no_probe, json, output),
        Commands::Download(cmd) => download::cmd_download(&ctx, cmd),
        Commands::Fetch {
            local_dir,
            prefix,
            suffix,
            description,
        } => sync::cmd_fetch(&ctx, &local_dir, &prefix, suffix, description),
        Commands::Probe { system_id, year } => cmd_probe(&ctx, system_id, year),
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Shared state
// ============================================================================

pub struct Context {
    pub config: PvcatConfig,
    pub layout: DataLayout,
}

impl Context {
    fn new(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => PvcatConfig::load(&path, true)?,
            None => PvcatConfig::load(&PathBuf::from("pvcat.toml"), false)?,
        };
        let root = data_dir.unwrap_or_else(|| config.paths.data_dir.clone());
        Ok(Context {
            layout: DataLayout::new(root),
            config,
        })
    }

    pub fn client(&self) -> Result<LakeClient, CliError> {
        Ok(LakeClient::new(&self.config.lake)?)
    }

    /// Fetch options logging to this data directory's access log and inventory.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions::new(self.layout.access_log(), self.layout.data_inventory())
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::IdentityMismatch { .. } => CliError {
                code: EXIT_IDENTITY_MISMATCH,
                message: err.to_string(),
                hint: Some(
                    "inspect the new systems; if they are expected, add them to reconcile.known_orphans".into(),
                ),
            },
            CatalogError::ConfigParse(_) | CatalogError::ConfigValidation(_) => CliError {
                code: exit_codes::EXIT_CONFIG,
                message: err.to_string(),
                hint: None,
            },
            _ => CliError::io(err.to_string()),
        }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        let hint = match &err {
            IoError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                Some("run `pvcat sync` first, or point --data-dir at a synced directory".to_string())
            }
            _ => None,
        };
        CliError { code: EXIT_IO, message: err.to_string(), hint }
    }
}

impl From<LakeError> for CliError {
    fn from(err: LakeError) -> Self {
        match err {
            LakeError::LocalPathNotDirectory(_) => {
                CliError::usage(err.to_string()).with_hint("add a trailing '/' to the local directory")
            }
            LakeError::Io { .. } | LakeError::Csv(_) | LakeError::UnexpectedDirectory(_) => {
                CliError::io(err.to_string())
            }
            _ => CliError {
                code: EXIT_REMOTE,
                message: err.to_string(),
                hint: None,
            },
        }
    }
}

// ============================================================================
// probe
// ============================================================================

fn cmd_probe(ctx: &Context, system_id: SystemId, year: i32) -> Result<(), CliError> {
    use pvcat_catalog::ExistenceProbe;

    let client = ctx.client()?;
    let present = pvcat_lake::LakeProbe::new(&client)
        .has_data(system_id, year)
        .map_err(|e| CliError {
            code: EXIT_REMOTE,
            message: e.to_string(),
            hint: None,
        })?;

    println!(
        "system {system_id}, year {year}: {}",
        if present { "data present" } else { "no data" }
    );
    Ok(())
}
