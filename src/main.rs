use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clinic_sync::application::ports::{DEFAULT_RETENTION_DAYS, MutationQueue, SyncStatusStore};
use clinic_sync::application::services::{OfflineServiceTrait, SyncEvent, SyncOutcome};
use clinic_sync::domain::value_objects::MutationType;
use clinic_sync::infrastructure::remote::ReachabilityMonitor;
use clinic_sync::{AppConfig, AppState};
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "clinic-sync")]
#[command(about = "ClinicConnect offline sync agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite database URL
    #[arg(long, env = "CLINIC_SYNC_DATABASE_URL")]
    database_url: Option<String>,

    /// Base URL of the clinic API
    #[arg(long, env = "CLINIC_SYNC_API_BASE_URL")]
    api_base_url: Option<String>,

    /// Log filter (e.g. info, clinic_sync=trace)
    #[arg(short, long, default_value = "clinic_sync=debug,info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Start in the offline state until the clinic API answers
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sync manager until interrupted
    Run,
    /// Run a single sync pass and print its report
    Sync,
    /// Pull server changes for every collection
    Refresh,
    /// Show queue and sync status
    Status,
    /// Queue a raw mutation
    Enqueue {
        /// create, update or delete
        #[arg(long = "type")]
        mutation_type: String,
        /// Target collection (patients, visits, prescriptions, labResults)
        #[arg(long)]
        entity: String,
        /// JSON payload
        #[arg(long)]
        data: String,
    },
    /// Drop queue entries older than the retention window
    Purge {
        #[arg(
            long,
            default_value_t = DEFAULT_RETENTION_DAYS,
            value_parser = clap::value_parser!(i64).range(1..=365)
        )]
        days: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.json_logs)?;

    let config = build_config(&cli);
    let state = AppState::initialize(&config)
        .await
        .context("failed to initialize clinic sync")?;

    let result = match cli.command {
        Commands::Run => run(&state, &config).await,
        Commands::Sync => sync_once(&state).await,
        Commands::Refresh => refresh(&state).await,
        Commands::Status => print_status(&state).await,
        Commands::Enqueue {
            mutation_type,
            entity,
            data,
        } => enqueue(&state, &mutation_type, &entity, &data).await,
        Commands::Purge { days } => purge(&state, days).await,
    };

    state.shutdown().await;
    result
}

fn build_config(cli: &Cli) -> AppConfig {
    let mut config = AppConfig::from_env();
    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(base_url) = &cli.api_base_url {
        config.remote.base_url = base_url.trim_end_matches('/').to_string();
    }
    if cli.offline {
        config.sync.start_online = false;
    }
    config
}

async fn run(state: &AppState, config: &AppConfig) -> Result<()> {
    info!("Starting clinic sync v{}", env!("CARGO_PKG_VERSION"));

    let mut events = state.sync_manager.subscribe();
    let reporter = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SyncEvent::EntryRejected(rejected) => warn!(
                    entry_id = %rejected.entry_id,
                    entity = %rejected.entity,
                    "mutation rejected: {}",
                    rejected.message
                ),
                SyncEvent::EntriesDiscarded(ids) => {
                    warn!(count = ids.len(), "stale mutations discarded")
                }
                SyncEvent::Failed(message) => warn!("sync pass failed: {}", message),
                SyncEvent::StateChanged(_)
                | SyncEvent::Completed(_)
                | SyncEvent::Refreshed(_) => {}
            }
        }
    });

    state.sync_manager.start().await;
    if state.connectivity.is_online() {
        state.sync_manager.request_sync();
    }

    let (monitor_shutdown, monitor_shutdown_rx) = watch::channel(false);
    let monitor = if config.remote.probe_interval > 0 {
        let monitor = ReachabilityMonitor::new(&config.remote, state.connectivity.clone())?;
        Some(monitor.spawn(monitor_shutdown_rx))
    } else {
        None
    };

    info!("Sync manager is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down sync manager...");

    let _ = monitor_shutdown.send(true);
    if let Some(handle) = monitor {
        if let Err(err) = handle.await {
            warn!("reachability monitor ended abnormally: {}", err);
        }
    }
    state.sync_manager.stop().await;
    reporter.abort();
    Ok(())
}

async fn sync_once(state: &AppState) -> Result<()> {
    match state.sync_manager.sync_now().await? {
        SyncOutcome::Completed(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SyncOutcome::NothingToSync => println!("queue empty; nothing to sync"),
        SyncOutcome::Skipped => println!("sync already in progress"),
        SyncOutcome::Offline => println!("offline; nothing attempted"),
    }
    Ok(())
}

async fn refresh(state: &AppState) -> Result<()> {
    let refreshed = state.sync_manager.refresh().await;
    println!("{}", serde_json::to_string_pretty(&refreshed)?);
    Ok(())
}

async fn print_status(state: &AppState) -> Result<()> {
    let pending = state.queue.len().await?;
    let rejected = state.queue.list_rejected().await?;
    let statuses = state.statuses.list_statuses().await?;

    let summary = serde_json::json!({
        "pending": pending,
        "rejected": rejected,
        "collections": statuses,
        "degraded": state.store.is_degraded(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn enqueue(state: &AppState, mutation_type: &str, entity: &str, data: &str) -> Result<()> {
    let mutation_type = MutationType::parse(mutation_type).map_err(anyhow::Error::msg)?;
    let data: serde_json::Value = serde_json::from_str(data).context("--data must be JSON")?;

    let entry_id = state
        .offline_service
        .enqueue(mutation_type, entity, data)
        .await?;
    println!("{entry_id}");
    Ok(())
}

async fn purge(state: &AppState, days: i64) -> Result<()> {
    let report = state.queue.purge_stale(days).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_logging(level: &str, json: bool) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let fmt_layer = if json {
        fmt::layer().json().with_current_span(false).boxed()
    } else {
        fmt::layer()
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
