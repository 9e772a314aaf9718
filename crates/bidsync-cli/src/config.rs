use bidsync_core::{DbConfig, FileConfig, SyncConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "bidsync")]
#[command(
    author,
    version,
    about = "Synchronizes the legacy bid database into the bidding platform"
)]
#[command(after_help = "Examples:
  bidsync run                      # Sync every SYNC_INTERVAL_MINUTES until Ctrl-C
  bidsync once                     # Run a single batch and exit
  bidsync once --json > run.json   # Print the batch summary as JSON
  bidsync --config ./bidsync.toml run")]
pub struct Config {
    /// Legacy source database connection URL
    #[arg(long, env = "SOURCE_DATABASE_URL")]
    pub source_database_url: String,

    /// Bidding platform database connection URL
    #[arg(long, env = "DESTINATION_DATABASE_URL")]
    pub destination_database_url: String,

    /// Root directory under which project upload folders are created
    #[arg(long, env = "UPLOAD_ROOT", value_name = "PATH")]
    pub upload_root: PathBuf,

    /// Minutes between batch starts (overrides the config file)
    #[arg(long, env = "SYNC_INTERVAL_MINUTES", value_name = "MINUTES")]
    pub sync_interval_minutes: Option<u64>,

    /// Base URL of the bidding platform identity API
    #[arg(long, env = "IDENTITY_API_URL")]
    pub identity_api_url: String,

    /// API key for the identity API
    #[arg(long, env = "IDENTITY_API_KEY", hide_env_values = true)]
    pub identity_api_key: String,

    /// Custom path to bidsync.toml configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run batches on the configured interval until interrupted
    #[command(after_help = "Example: SYNC_INTERVAL_MINUTES=10 bidsync run --skip-initial")]
    Run {
        /// Wait one interval before the first batch
        #[arg(long)]
        skip_initial: bool,
    },
    /// Run a single batch and exit
    Once {
        /// Print the batch summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

impl Config {
    /// Layers the config file and then the CLI/env values over the defaults.
    pub fn resolve(&self, file: &FileConfig) -> (SyncConfig, DbConfig) {
        let mut sync = SyncConfig::default();
        let mut db = DbConfig::default();
        file.apply(&mut sync, &mut db);

        if let Some(minutes) = self.sync_interval_minutes {
            sync.interval = Duration::from_secs(minutes.max(1) * 60);
        }
        if let Command::Run { skip_initial: true } = self.command {
            sync.run_on_start = false;
        }

        (sync, db)
    }
}
