// File: manager/src/main.rs
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use gis_stats_manager::constants::cleanup;
use gis_stats_manager::scheduler::StatsScheduler;
use gis_stats_manager::web::{start_web_server, AppState};
use gis_stats_manager::{
    AlertService, Config, ConfigManager, Database, Job, JobRunner, RunTracker,
};

#[derive(Parser)]
#[command(name = "gis-stats-manager", version, about = "Usage statistics, service status and clean up jobs for a GIS server deployment")]
struct Cli {
    /// Directory holding main.toml, secrets.toml and one <server>.toml per GIS server
    #[arg(long, env = "GIS_STATS_CONFIG", default_value = "config")]
    config_dir: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the cron scheduler and the HTTP API (default)
    Serve,
    /// Run one job once and exit
    Run {
        /// usage-stats, service-status or clean-up
        job: Job,
        /// Only run against this server; defaults to every enabled server
        #[arg(long)]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with reduced verbosity
    let env_filter = EnvFilter::from_default_env()
        .add_directive("gis_stats_manager=info".parse()?)
        .add_directive("tower_http=warn".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // Load configuration
    let config_manager = ConfigManager::new(&cli.config_dir).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded from {}: {} servers ({})",
        cli.config_dir,
        config.servers.len(),
        config.server_names().join(", ")
    );

    // Initialize database
    let database = Arc::new(Database::new(&config.database_path).await?);
    info!("Database initialized");

    let alert_service = Arc::new(AlertService::new(config.alarm_webhook_url.clone())?);
    if alert_service.is_enabled() {
        info!(
            "Alert service enabled with webhook: {}",
            alert_service.webhook_url()
        );
    } else {
        warn!("Alert service disabled: no alarm_webhook_url configured in main.toml");
    }

    let run_tracker = RunTracker::new();
    let job_runner = Arc::new(JobRunner::new(
        config.clone(),
        database.clone(),
        alert_service,
        run_tracker.clone(),
    )?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, database, job_runner, run_tracker).await,
        Command::Run { job, server } => run_once(&job_runner, job, server.as_deref()).await,
    }
}

async fn serve(
    config: Arc<Config>,
    database: Arc<Database>,
    job_runner: Arc<JobRunner>,
    run_tracker: RunTracker,
) -> Result<()> {
    info!("Starting GIS stats manager service");

    let mut scheduler = StatsScheduler::new(config.clone(), job_runner.clone()).await?;
    scheduler.start().await?;

    // Start periodic cleanup of runs that never released their target
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            cleanup::CLEANUP_INTERVAL_SECONDS,
        ));
        loop {
            interval.tick().await;
            let cleaned = run_tracker.cleanup_stale(cleanup::STALE_RUN_HOURS).await;
            if cleaned > 0 {
                warn!(
                    "Cleaned up {} stuck runs older than {} hours",
                    cleaned,
                    cleanup::STALE_RUN_HOURS
                );
            }
        }
    });

    if config.web_enabled {
        let state = AppState::new(config.clone(), database, job_runner);
        tokio::select! {
            result = start_web_server(state) => {
                if let Err(e) = result {
                    error!("Web server stopped: {}", e);
                    scheduler.shutdown().await?;
                    return Err(e);
                }
            }
            _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
        }
    } else {
        info!("Web API disabled, running scheduler only");
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
    }

    scheduler.shutdown().await?;
    info!("GIS stats manager stopped");
    Ok(())
}

async fn run_once(job_runner: &JobRunner, job: Job, server: Option<&str>) -> Result<()> {
    let targets = match server {
        Some(name) => vec![name.to_string()],
        None => job_runner.default_targets(job),
    };

    if targets.is_empty() {
        warn!("No servers have {} enabled, nothing to run", job);
        return Ok(());
    }

    let mut failed = 0;
    for target in &targets {
        let server = job.is_per_server().then_some(target.as_str());
        match job_runner.run(job, server).await {
            Ok(report) => info!("{} for {} done (run_id: {})", job, target, report.run_id),
            Err(e) => {
                error!("{} for {} failed: {}", job, target, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} {} runs failed", failed, targets.len(), job);
    }
    Ok(())
}
