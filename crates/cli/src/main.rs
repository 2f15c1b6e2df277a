mod logfile;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use datacrawl_core::{
    load_config, metrics, operational_now, validate_config, Collaborators, Config, DataCrawler,
    EmailNotifier, HttpProviderResolver, JiraClient, Notifier, ProviderResolver, QueryService,
    QuboleClient, SanitizedConfig, TicketSink, TicketSource,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        eprintln!("datacrawl: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("DATACRAWL_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;
    validate_config(&config).context("Configuration validation failed")?;

    let started = operational_now(config.schedule.timezone_offset_hours);
    fs::create_dir_all(&config.logging.path)
        .with_context(|| format!("Failed to create log directory {:?}", config.logging.path))?;

    // One log file per run; an existing file means this run already happened.
    let log_path =
        logfile::log_file_path(&config.logging.path, &config.logging.app_name, &started);
    let log_file = match OpenOptions::new()
        .append(true)
        .create_new(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            eprintln!(
                "datacrawl: log file {} already exists, skipping duplicate run",
                log_path.display()
            );
            return Ok(());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to create log file {:?}", log_path))
        }
    };

    init_tracing(log_file, config.logging.console);

    info!(version = VERSION, log_file = ?log_path, "Starting data crawl");
    info!(
        config = %serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default(),
        "Configuration loaded"
    );

    let crawler = build_crawler(&config)?;
    let result = crawler.run(started.date_naive()).await;

    if let Some(path) = &config.metrics.textfile_path {
        if let Err(e) = write_metrics(path) {
            warn!(path = ?path, error = %e, "Failed to write metrics textfile");
        }
    }

    match logfile::purge_files(
        &config.logging.path,
        logfile::retention(config.logging.retention_days),
        SystemTime::now(),
    ) {
        Ok(removed) => info!(removed, "Purged old log files"),
        Err(e) => warn!(error = %e, "Failed to purge old log files"),
    }

    let summary = result.context("Crawl aborted")?;
    info!(
        summary = %serde_json::to_string(&summary).unwrap_or_default(),
        "Data crawl finished"
    );
    Ok(())
}

/// Log to the run file, and to stderr when `console` is set.
///
/// Workers log concurrently; the file writer is serialized behind a mutex.
fn init_tracing(log_file: fs::File, console: bool) {
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));
    let console_layer = console.then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".into()),
        )
        .with(file_layer)
        .with(console_layer)
        .init();
}

fn build_crawler(config: &Config) -> Result<DataCrawler> {
    let jira = Arc::new(
        JiraClient::new(config.tracker.clone()).context("Failed to create tracker client")?,
    );
    let resolver: Arc<dyn ProviderResolver> = Arc::new(
        HttpProviderResolver::new(config.resolver.clone())
            .context("Failed to create provider resolver")?,
    );
    let query_service: Arc<dyn QueryService> = Arc::new(
        QuboleClient::new(config.query_service.clone())
            .context("Failed to create query service client")?,
    );
    let notifier: Arc<dyn Notifier> = Arc::new(
        EmailNotifier::from_config(&config.email).context("Failed to create email notifier")?,
    );
    info!(channel = notifier.channel_name(), "Notifier initialized");

    Ok(DataCrawler::from_config(
        config,
        Collaborators {
            source: Arc::clone(&jira) as Arc<dyn TicketSource>,
            sink: jira as Arc<dyn TicketSink>,
            resolver,
            query_service,
            notifier,
        },
    ))
}

fn write_metrics(path: &Path) -> Result<()> {
    let text = metrics::render_text().context("Failed to render metrics")?;
    fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
    info!(path = ?path, "Metrics written");
    Ok(())
}
