//! # cadence-agent
//!
//! Cadence service binary. `serve` runs the view refresher until Ctrl-C;
//! the other subcommands are one-shot operator tools over the same
//! database.

#![deny(unsafe_code)]

mod metrics;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cadence_cache::{MemoryCache, TypedCache};
use cadence_context::{AssemblerConfig, ContextAssembler, SqliteViewQuery, format_for_ai};
use cadence_core::{ContractorId, SystemClock};
use cadence_refresh::{
    RefresherConfig, SqliteNotificationSource, SqliteViewRebuilder, ViewRefresher,
};
use cadence_settings::{CadenceSettings, LogFormat};
use cadence_store::{ConnectionConfig, ConnectionPool};
use clap::{Parser, Subcommand};

/// Upper bound on a graceful shutdown before the process exits anyway.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Cadence event context service.
#[derive(Parser, Debug)]
#[command(name = "cadence-agent", about = "Cadence event context service", version)]
struct Cli {
    /// Settings file (defaults to `~/.cadence/settings.json`).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// `SQLite` database path (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Listen for schedule changes and keep the views fresh until Ctrl-C.
    Serve {
        /// Print Prometheus metrics text on exit.
        #[arg(long)]
        print_metrics: bool,
    },
    /// Rebuild both views now.
    Refresh,
    /// Report whether the views lag the schedule.
    Freshness,
    /// Print the event context for one contractor.
    Context {
        /// Contractor ID.
        contractor: i64,
        /// Emit the JSON bundle instead of prompt text.
        #[arg(long)]
        json: bool,
    },
    /// Print aggregate view counts.
    Stats,
}

fn load_settings(cli: &Cli) -> Result<CadenceSettings> {
    let mut settings = match &cli.settings {
        Some(path) => cadence_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => cadence_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(db_path) = &cli.db_path {
        settings.database.path = db_path.to_string_lossy().into_owned();
    }
    Ok(settings)
}

fn init_logging(settings: &CadenceSettings) {
    match settings.logging.format {
        LogFormat::Compact => cadence_core::logging::init_subscriber(&settings.logging.level),
        LogFormat::Json => cadence_core::logging::init_json_subscriber(&settings.logging.level),
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Open the pool and bring the schema up to date.
fn open_database(settings: &CadenceSettings) -> Result<ConnectionPool> {
    let db = &settings.database;
    ensure_parent_dir(Path::new(&db.path))?;
    let config = ConnectionConfig {
        pool_size: db.pool_size,
        busy_timeout_ms: db.busy_timeout_ms,
    };
    let pool = cadence_store::new_file(&db.path, &config).context("Failed to open database")?;
    let conn = pool.get().context("Failed to get DB connection")?;
    let pragmas = cadence_store::verify_pragmas(&conn).context("Failed to read pragmas")?;
    if pragmas.journal_mode != "wal" || !pragmas.foreign_keys_enabled {
        tracing::warn!(?pragmas, "database pragmas not applied as configured");
    }
    let applied = cadence_store::run_migrations(&conn).context("Failed to run migrations")?;
    if applied > 0 {
        tracing::info!(applied, path = %db.path, "schema migrations applied");
    }
    Ok(pool)
}

fn build_refresher(settings: &CadenceSettings, pool: &ConnectionPool) -> ViewRefresher {
    let source = SqliteNotificationSource::new(
        settings.database.path.clone(),
        settings.database.busy_timeout_ms,
        settings.refresher.poll_interval(),
    );
    ViewRefresher::new(
        Arc::new(source),
        Arc::new(SqliteViewRebuilder::new(pool.clone())),
        Arc::new(SystemClock),
        RefresherConfig::from(&settings.refresher),
    )
}

fn build_assembler(settings: &CadenceSettings, pool: &ConnectionPool) -> ContextAssembler {
    ContextAssembler::new(
        Arc::new(SqliteViewQuery::new(pool.clone())),
        TypedCache::new(Arc::new(MemoryCache::new())),
        Arc::new(SystemClock),
        AssemblerConfig::from(settings),
    )
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{text}");
    Ok(())
}

async fn serve(settings: &CadenceSettings, pool: &ConnectionPool, print_metrics: bool) -> Result<()> {
    let handle = metrics::install_recorder()?;
    let refresher = build_refresher(settings, pool);
    refresher
        .initialize()
        .await
        .context("Failed to start view refresher")?;

    // Views may be stale from before this process started.
    if let Err(error) = refresher.manual_refresh().await {
        tracing::warn!(%error, "initial view refresh failed");
    }

    tracing::info!(
        db = %settings.database.path,
        channel = %settings.refresher.channel,
        debounce_ms = settings.refresher.debounce_ms,
        "cadence view refresher running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("shutdown signal received");

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, refresher.shutdown())
        .await
        .is_err()
    {
        tracing::warn!("shutdown timed out after {SHUTDOWN_TIMEOUT:?}");
    }

    let snapshot = refresher.metrics();
    tracing::info!(
        total_refreshes = snapshot.total_refreshes,
        errors = snapshot.errors,
        "view refresher stopped"
    );
    if print_metrics {
        print!("{}", handle.render());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings);
    let pool = open_database(&settings)?;

    match cli.command {
        Command::Serve { print_metrics } => serve(&settings, &pool, print_metrics).await,
        Command::Refresh => {
            let outcome = build_refresher(&settings, &pool)
                .manual_refresh()
                .await
                .context("View refresh failed")?;
            print_json(&outcome)
        }
        Command::Freshness => {
            let freshness = build_refresher(&settings, &pool)
                .check_freshness()
                .await
                .context("Freshness check failed")?;
            print_json(&freshness)
        }
        Command::Context { contractor, json } => {
            let context = build_assembler(&settings, &pool)
                .get_event_context(ContractorId::new(contractor))
                .await
                .with_context(|| format!("Failed to assemble context for contractor {contractor}"))?;
            if json {
                print_json(&context)
            } else {
                println!("{}", format_for_ai(&context));
                Ok(())
            }
        }
        Command::Stats => {
            let stats = build_assembler(&settings, &pool)
                .get_context_stats()
                .await
                .context("Failed to read view stats")?;
            print_json(&stats)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
