//! Funding-rate scanner entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use funding_scanner::api::{create_router, AppState};
use funding_scanner::config::Config;
use funding_scanner::exchange::{FundingSource, MockExchange, Platform};
use funding_scanner::metrics;
use funding_scanner::scanner::Scanner;
use funding_scanner::screener::QueryParams;
use funding_scanner::utils::{format_compact_usd, shutdown_signal};

/// Cross-exchange perpetual funding-rate scanner.
#[derive(Parser, Debug)]
#[command(name = "funding-scanner")]
#[command(about = "Scans perpetual funding rates across exchanges for carry spreads")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scanner with the HTTP API (default).
    Run {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// One-shot scan: refresh every source and print the widest spreads.
    Scan {
        /// Keep only spreads at or above this APR percentage.
        #[arg(long)]
        min_apr_pct: Option<f64>,

        /// Number of rows to print.
        #[arg(long, default_value = "15")]
        top: usize,

        /// Print the page as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("funding_scanner=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let json_logs = std::env::var("LOG_JSON")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Scan {
            min_apr_pct,
            top,
            json,
        }) => cmd_scan(min_apr_pct, top, json).await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(args.port).await,
    }
}

/// The bundled per-platform demo feeds.
fn demo_sources() -> Vec<Arc<dyn FundingSource>> {
    Platform::ALL
        .into_iter()
        .map(|platform| Arc::new(MockExchange::with_fixtures(platform)) as Arc<dyn FundingSource>)
        .collect()
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("FUNDING SCANNER - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Refresh Interval: {}s", config.refresh_interval_secs);
    println!(
        "  Fallback Funding Interval: {}h",
        config.fallback_interval_hours
    );
    println!("  Resolver Workers: {}", config.resolver_workers);
    println!("  Default Page Size: {}", config.default_page_size);
    println!("  Interval Cache: {}", config.interval_cache_path);
    println!("  Favorites: {}", config.favorites_path);
    println!("  HTTP Port: {}", config.port);
    println!("  Log Filter: {}", config.rust_log);
    println!("  JSON Logs: {}", config.log_json);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// One-shot scan over every source.
async fn cmd_scan(min_apr_pct: Option<f64>, top: usize, json: bool) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let scanner = Arc::new(Scanner::from_config(&config, demo_sources()));

    // First pass seeds the interval cache; the second prices the resolved
    // per-symbol intervals in.
    scanner.refresh_all().await;
    scanner.settle_enrichment().await;
    scanner.refresh_all().await;

    let params = QueryParams {
        min_apr_pct,
        page_size: Some(top.max(1)),
        ..QueryParams::default()
    };
    let page = scanner.page(&params).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("======================================================================");
    println!("FUNDING SCANNER - WIDEST SPREADS");
    println!("======================================================================");
    println!(
        "{:<8} {:>11} {:>11} {:>9} {:<12} {:<12} {:>9}",
        "ASSET", "MAX %/H", "MIN %/H", "APR %", "SHORT ON", "LONG ON", "MAX OI"
    );
    println!("----------------------------------------------------------------------");
    for row in &page.rows {
        println!(
            "{:<8} {:>11.6} {:>11.6} {:>9.2} {:<12} {:<12} {:>9}",
            row.asset,
            row.max_rate * 100.0,
            row.min_rate * 100.0,
            row.apr_percent(),
            row.short_platform.to_string(),
            row.long_platform.to_string(),
            format_compact_usd(row.open_interest),
        );
    }
    println!("----------------------------------------------------------------------");
    println!(
        "{} assets visible, showing page 1 of {}",
        page.total_count, page.total_pages
    );
    println!("======================================================================");

    Ok(())
}

/// Run the scanner and its HTTP API until shutdown.
async fn cmd_run(port_override: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Refresh interval: {}s", config.refresh_interval_secs);
    info!(
        "Fallback funding interval: {}h",
        config.fallback_interval_hours
    );
    info!("Resolver workers: {}", config.resolver_workers);

    // Install the Prometheus exporter before describing metrics
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    metrics::init_metrics();

    // Build the scanner over the bundled demo feeds
    let scanner = Arc::new(Scanner::from_config(&config, demo_sources()));
    info!("Scanning {} platforms", scanner.platforms().len());

    // Start HTTP server
    let app_state = AppState::new(Arc::clone(&scanner)).with_metrics(metrics_handle);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Per-source refresh loops
    let refresh_handles = Arc::clone(&scanner).spawn_refresh_loops();
    info!("Started {} refresh loops", refresh_handles.len());

    // Run until the server is told to shut down
    server.await??;

    for handle in refresh_handles {
        handle.abort();
    }
    info!("Scanner stopped");

    Ok(())
}
