use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use ledger_aggregator::{
    workers_from_env, AggregatorConfig, LedgerAggregator, RankLimits, RunStats,
    DEFAULT_TOP_PRODUCTS, DEFAULT_TOP_REGIONS,
};
use ledger_protocol::Insights;
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

mod http_api;

pub const DATA_ENV: &str = "LEDGER_DATA";
pub const ADDR_ENV: &str = "LEDGER_ADDR";
const DEFAULT_DATA: &str = "data/transactions.csv";
const DEFAULT_ADDR: &str = "127.0.0.1:8090";

/// Write `value` as one JSON document to stdout; a closed pipe is not an error.
fn write_json_stdout<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let mut stdout = io::stdout().lock();
    let written = if pretty {
        serde_json::to_writer_pretty(&mut stdout, value)
    } else {
        serde_json::to_writer(&mut stdout, value)
    }
    .map_err(io::Error::from)
    .and_then(|()| writeln!(stdout))
    .and_then(|()| stdout.flush());

    match written {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("Failed to write report to stdout"),
    }
}

#[derive(Parser)]
#[command(name = "ledger-insights")]
#[command(about = "Revenue, product, monthly and regional rollups over a transaction ledger", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the ledger once, then serve the rollups over HTTP
    Serve(ServeArgs),

    /// Aggregate the ledger and print the snapshot as JSON
    Report(ReportArgs),
}

#[derive(Args, Clone)]
struct LedgerArgs {
    /// Path to the transactions CSV (overrides LEDGER_DATA)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Worker count; non-positive values use available parallelism (overrides LEDGER_WORKERS)
    #[arg(long, allow_negative_numbers = true)]
    workers: Option<i64>,

    /// Bounded queue capacity (default: 2 x workers)
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Maximum entries in the top products rollup
    #[arg(long, default_value_t = DEFAULT_TOP_PRODUCTS)]
    top_products: usize,

    /// Maximum entries in the top regions rollup
    #[arg(long, default_value_t = DEFAULT_TOP_REGIONS)]
    top_regions: usize,
}

#[derive(Args)]
struct ServeArgs {
    #[command(flatten)]
    ledger: LedgerArgs,

    /// HTTP listen address (overrides LEDGER_ADDR)
    #[arg(long)]
    addr: Option<String>,

    /// Allow binding to a non-loopback address
    #[arg(long)]
    public: bool,
}

#[derive(Args)]
struct ReportArgs {
    #[command(flatten)]
    ledger: LedgerArgs,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    stats: &'a RunStats,
    insights: &'a Insights,
}

impl LedgerArgs {
    fn data_path(&self) -> PathBuf {
        self.data
            .clone()
            .or_else(|| env::var_os(DATA_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA))
    }

    fn config(&self) -> AggregatorConfig {
        let workers = match self.workers {
            Some(workers) => workers,
            None => i64::try_from(workers_from_env()).unwrap_or(0),
        };
        let mut config = AggregatorConfig::default()
            .with_workers(workers)
            .with_limits(RankLimits {
                top_products: self.top_products,
                top_regions: self.top_regions,
            });
        if let Some(capacity) = self.queue_capacity {
            config = config.with_queue_capacity(capacity);
        }
        config
    }
}

async fn aggregate(args: &LedgerArgs) -> Result<(Insights, RunStats)> {
    let path = args.data_path();
    let aggregator = LedgerAggregator::new(&path, args.config());
    aggregator
        .run_with_stats()
        .await
        .with_context(|| format!("Failed to aggregate ledger {}", path.display()))
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    // Report writes JSON to stdout; keep the log stream to warnings.
    if matches!(cli.command, Commands::Report(_)) && !cli.verbose {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::Report(args) => report(args).await?,
    }

    Ok(())
}

async fn report(args: ReportArgs) -> Result<()> {
    let (insights, stats) = aggregate(&args.ledger).await?;
    let output = ReportOutput {
        stats: &stats,
        insights: &insights,
    };
    write_json_stdout(&output, args.pretty)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let bind = args
        .addr
        .clone()
        .or_else(|| env::var(ADDR_ENV).ok())
        .unwrap_or_else(|| DEFAULT_ADDR.to_string());
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&bind)
        .await
        .with_context(|| format!("Failed to resolve listen address {bind}"))?
        .collect();
    ensure_loopback(&addrs, args.public)?;
    let listener = tokio::net::TcpListener::bind(addrs.as_slice())
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let addr = listener.local_addr()?;

    let (insights, stats) = aggregate(&args.ledger).await?;
    let state = Arc::new(http_api::ApiState { insights, stats });
    let app = http_api::router(state);

    log::info!("Serving ledger insights on http://{addr}/api");
    axum::serve(listener, app).await?;
    Ok(())
}

/// The API is unauthenticated; anything but loopback needs an explicit `--public`.
fn ensure_loopback(addrs: &[SocketAddr], public: bool) -> Result<()> {
    if public {
        return Ok(());
    }
    if let Some(addr) = addrs.iter().find(|addr| !addr.ip().is_loopback()) {
        anyhow::bail!(
            "Refusing to bind to non-loopback address {addr} without --public: the insights API has no authentication"
        );
    }
    Ok(())
}
