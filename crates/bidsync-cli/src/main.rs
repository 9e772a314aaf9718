use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use bidsync_cli::{Command, Config};
use bidsync_client::IdentityClient;
use bidsync_core::{
    default_config_path, load_file_config, BatchRunner, BatchSummary, DbConfig, FileConfig,
    ReconciliationEngine, UploadFolders,
};
use bidsync_db::{DestinationRepository, SourceRepository};

type Runner = BatchRunner<SourceRepository, DestinationRepository, UploadFolders, IdentityClient>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Parse command line arguments
    let config = Config::parse();

    // Setup logging (stderr to keep stdout clean for JSON summaries)
    let level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    let file_config = load_config_file(&config)?;
    let (sync_config, db_config) = config.resolve(&file_config);

    // Database connections, one pool per store
    info!("Connecting to source database...");
    let source_pool = connect(&config.source_database_url, &db_config)
        .await
        .context("Failed to connect to source database")?;
    info!("Connecting to destination database...");
    let destination_pool = connect(&config.destination_database_url, &db_config)
        .await
        .context("Failed to connect to destination database")?;

    // Initialize services
    let identity = IdentityClient::new(&config.identity_api_url, &config.identity_api_key)
        .context("Invalid identity API configuration")?;
    let engine = ReconciliationEngine::new(
        SourceRepository::new(source_pool),
        DestinationRepository::new(destination_pool),
        UploadFolders::new(config.upload_root.clone()),
        identity,
        sync_config,
    );
    let runner = BatchRunner::new(engine);

    // Execute command
    match config.command {
        Command::Run { .. } => run(&runner).await,
        Command::Once { json } => once(&runner, json).await,
    }
}

fn load_config_file(config: &Config) -> anyhow::Result<FileConfig> {
    let path = match config.config.clone().or_else(default_config_path) {
        Some(path) => path,
        None => return Ok(FileConfig::default()),
    };

    let file = load_file_config(&path)
        .with_context(|| format!("Failed to load config file {}", path.display()))?;
    info!("Using config file: {}", path.display());
    Ok(file)
}

async fn connect(url: &str, db: &DbConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(db.max_connections)
        .connect(url)
        .await?;
    Ok(pool)
}

/// Runs batches until Ctrl-C. The in-flight row is allowed to finish.
async fn run(runner: &Runner) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested, finishing current row..."),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        on_signal.cancel();
    });

    let batches = runner.run_scheduled(cancel).await;
    info!("Stopped after {} batch(es)", batches);
    Ok(())
}

async fn once(runner: &Runner, json: bool) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let summary = runner
        .run_once(&cancel)
        .await
        .context("A sync batch is already running")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.failed_kinds() > 0 {
        anyhow::bail!(
            "{} entity kind(s) could not be queried",
            summary.failed_kinds()
        );
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!("\nSync Summary");
    println!("════════════════════════════════════════════════════════");
    println!(
        "  {:<18} {:>8} {:>8} {:>8} {:>8}",
        "Kind", "Created", "Updated", "Skipped", "Failed"
    );
    for result in &summary.results {
        match &result.error {
            None => println!(
                "  {:<18} {:>8} {:>8} {:>8} {:>8}",
                result.kind.as_str(),
                result.stats.created,
                result.stats.updated,
                result.stats.skipped,
                result.stats.failed
            ),
            Some(e) => println!("  {:<18} query failed: {}", result.kind.as_str(), e),
        }
    }
    let totals = summary.totals();
    println!("────────────────────────────────────────────────────────");
    println!(
        "  {:<18} {:>8} {:>8} {:>8} {:>8}",
        "Total", totals.created, totals.updated, totals.skipped, totals.failed
    );
    if summary.cancelled {
        println!("  (batch cancelled before completion)");
    }
}
