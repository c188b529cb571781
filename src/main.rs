//! Stockboard - stock and ledger reports for a multi-location inventory
//!
//! A CLI tool that fetches the current stock snapshot and the transaction
//! ledger from a hosted data store (or local JSON files) and renders
//! headline KPIs, pivoted stock tables, and movement views.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, file access, etc.)
//!   2 - --strict findings (anomalies, rejected rows, unbalanced stock)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod store;

use analysis::{aggregate_snapshot, analyze_ledger, compute_kpis, recent_transactions, KpiOptions};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use models::{Report, ReportMetadata};
use std::time::{Duration, Instant};
use store::{DataSource, Dataset, FetchCache, FileStore, RestStore, RestStoreConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Stockboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .stockboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to set the store URL, roster, and report options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the report workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let window = args.window();
    if window.is_inverted() {
        warn!("--to is before --from; windowed views will be empty");
    }

    let source = build_source(&args, &config)?;

    if let Some(interval) = args.watch {
        return run_watch(&args, &config, &source, interval).await;
    }

    let started = Instant::now();
    let dataset = source.fetch(!args.quiet).await?;
    let report = build_report(&dataset, &config, &args, source.describe(), started);

    emit_report(&report, &args, &config)?;
    print_summary(&report, &args);

    Ok(strict_exit_code(&report, &args, &config))
}

/// Re-render the report every `interval` seconds until Ctrl-C.
///
/// Rows are reused for `cache.ttl_seconds`; a failed refresh is logged and
/// the loop keeps going. With --strict, findings are logged on every refresh.
async fn run_watch(args: &Args, config: &Config, source: &DataSource, interval: u64) -> Result<i32> {
    let mut cache: FetchCache<Dataset> =
        FetchCache::new(Duration::from_secs(config.cache.ttl_seconds));
    let mut ticker = tokio::time::interval(Duration::from_secs(interval));

    println!(
        "👀 Watching {} every {}s (rows cached for {}s). Press Ctrl-C to stop.",
        source.describe(),
        interval,
        config.cache.ttl_seconds
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let started = Instant::now();
                let fetched = cache
                    .get_or_fetch(started, || source.fetch(false))
                    .await;

                match fetched {
                    Ok(dataset) => {
                        let report =
                            build_report(&dataset, config, args, source.describe(), started);
                        if let Err(e) = emit_report(&report, args, config) {
                            warn!("Failed to write report: {:#}", e);
                        }
                        print_summary(&report, args);

                        // Watch never exits on findings; they are reported per refresh.
                        if args.strict {
                            let findings = strict_findings(&report, config);
                            if !findings.is_empty() {
                                warn!("Strict check failed: {}", findings.join(", "));
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Refresh failed: {:#}", e);
                        cache.invalidate();
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping watch");
                return Ok(0);
            }
        }
    }
}

/// Pick local files or the hosted store.
fn build_source(args: &Args, config: &Config) -> Result<DataSource> {
    if let (Some(stock), Some(ledger)) = (&args.stock_file, &args.ledger_file) {
        info!("Reading rows from local files");
        return Ok(DataSource::Local(FileStore::new(stock.clone(), ledger.clone())));
    }

    let url = match config.store.url {
        Some(ref url) => url.clone(),
        None => bail!(
            "No data source: pass --url (or set STOCKBOARD_URL / [store] url) or --stock-file with --ledger-file"
        ),
    };
    let api_key = match config.store.api_key {
        Some(ref key) => key.clone(),
        None => bail!("No API key: pass --api-key or set STOCKBOARD_API_KEY"),
    };

    let store = RestStore::new(RestStoreConfig {
        url,
        api_key,
        stock_table: config.store.stock_table.clone(),
        ledger_table: config.store.ledger_table.clone(),
        ledger_limit: config.store.ledger_limit,
        timeout_seconds: config.store.timeout_seconds,
    })?;

    Ok(DataSource::Remote(store))
}

/// Derive every view from the fetched rows.
fn build_report(
    dataset: &Dataset,
    config: &Config,
    args: &Args,
    source: String,
    started: Instant,
) -> Report {
    let roster = config.roster.clone();
    let window = args.window();

    let snapshot = aggregate_snapshot(&dataset.stock, &roster);
    let ledger = analyze_ledger(&dataset.ledger, window);
    let kpis = compute_kpis(
        &snapshot,
        &ledger,
        &roster,
        KpiOptions {
            consumed: config.report.consumed,
            windowed: config.report.windowed_totals,
        },
    );

    let top_reasons = ledger.top_reasons(config.report.top_reasons);

    let filter = args.transaction_filter();
    let recent = recent_transactions(
        &dataset.ledger,
        &filter,
        config.report.recent_transactions,
    )
    .into_iter()
    .cloned()
    .collect();

    Report {
        metadata: ReportMetadata {
            source,
            generated_at: Utc::now(),
            window,
            stock_rows: dataset.stock.len(),
            ledger_rows: dataset.ledger.len(),
            rejected_rows: dataset.rejected_rows,
            duration_seconds: started.elapsed().as_secs_f64(),
        },
        roster,
        kpis,
        snapshot,
        ledger,
        top_reasons,
        recent_transactions: recent,
    }
}

/// Write the report to the configured file, or print it.
fn emit_report(report: &Report, args: &Args, config: &Config) -> Result<()> {
    let format = config.general.format;

    if args.stdout {
        println!("{}", report::render(report, format)?);
        return Ok(());
    }

    let path = std::path::Path::new(&config.general.output);
    report::write_report(report, format, path)?;
    info!("Report written to {}", path.display());
    Ok(())
}

/// Print the headline numbers to the terminal.
fn print_summary(report: &Report, args: &Args) {
    if args.quiet || args.stdout {
        return;
    }

    let kpis = &report.kpis;
    println!("\n📊 Stock Summary:");
    println!(
        "   Purchased: {} | Consumed: {} | Remaining: {}",
        kpis.purchased, kpis.consumed, kpis.remaining
    );
    println!(
        "   Ledger ({}): {} in / {} out",
        report.ledger.window,
        report.ledger.windowed_in(),
        report.ledger.windowed_out()
    );

    if let Some(ref org) = args.organization {
        println!(
            "   {} holds {} units",
            org,
            report.snapshot.per_organization_grand_total(org)
        );
    }

    if kpis.reconciliation.drift != 0 {
        println!("   ⚠️  Reconciliation drift: {:+}", kpis.reconciliation.drift);
    }
    if !report.snapshot.anomalies.is_empty() {
        println!("   ⚠️  Unknown organizations or categories in stock data");
    }
}

/// Everything --strict fails on.
fn strict_findings(report: &Report, config: &Config) -> Vec<&'static str> {
    let mut findings = Vec::new();
    if !report.snapshot.anomalies.is_empty() {
        findings.push("unknown organizations or categories");
    }
    if report.metadata.rejected_rows > 0 {
        findings.push("rejected ledger rows");
    }
    if !report
        .kpis
        .reconciliation
        .is_balanced(config.report.drift_tolerance)
    {
        findings.push("reconciliation drift above tolerance");
    }
    findings
}

/// Exit code for --strict: 2 when anything needs attention.
fn strict_exit_code(report: &Report, args: &Args, config: &Config) -> i32 {
    if !args.strict {
        return 0;
    }

    let findings = strict_findings(report, config);
    if findings.is_empty() {
        0
    } else {
        eprintln!("\n⛔ Strict mode: {}. Failing (exit code 2).", findings.join(", "));
        2
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
