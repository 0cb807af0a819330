use anyhow::{Context, Result};
use clap::Parser;
use covidlake::{
    cloud::{
        aws,
        memory::{MemoryCatalog, MemoryQueryEngine, MemoryStore},
    },
    Pipeline, PipelineConfig,
};
use reqwest::Client;
use std::{fs, path::PathBuf, sync::Arc};
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Load the daily COVID-19 report into S3 and expose it through Glue/Athena.
#[derive(Parser, Debug)]
struct Args {
    /// TOML file overriding the built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Use in-memory storage, catalog and query engine instead of AWS
    #[arg(long)]
    dry_run: bool,

    /// Where to write the JSON run report
    #[arg(long, default_value = "run-report.json")]
    report: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    config.validate().context("invalid configuration")?;
    fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("creating work dir {}", config.work_dir.display()))?;
    info!(
        region = %config.region,
        database = %config.catalog.database,
        dry_run = args.dry_run,
        "configured"
    );

    // ─── 3) run against the chosen backends ──────────────────────────
    let client = Client::new();
    let start = Instant::now();
    let report = if args.dry_run {
        let store = Arc::new(MemoryStore::new());
        let catalog = Arc::new(MemoryCatalog::new());
        let query = MemoryQueryEngine::new(store.clone(), catalog.clone());
        Pipeline::new(&config, store.as_ref(), catalog.as_ref(), &query)
            .run(&client)
            .await?
    } else {
        let backends = aws::connect(&config).await?;
        Pipeline::new(&config, &backends.store, &backends.catalog, &backends.query)
            .run(&client)
            .await?
    };

    // ─── 4) report ───────────────────────────────────────────────────
    report.write(&args.report)?;
    info!(
        retained = report.rows_retained,
        confirmed = report.totals.confirmed,
        letality = report.totals.letality,
        elapsed = ?start.elapsed(),
        report = %args.report.display(),
        "all done"
    );
    Ok(())
}
