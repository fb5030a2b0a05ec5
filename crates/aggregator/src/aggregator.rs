use crate::config::AggregatorConfig;
use crate::error::{AggregatorError, Result};
use crate::merge::MergedState;
use crate::pool::{feed, WorkerPool};
use crate::rank::rank;
use crate::source::RecordSource;
use crate::stats::{RunStats, SourceCounts};
use ledger_protocol::Insights;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Computes the four ledger rollups from one CSV file.
pub struct LedgerAggregator {
    path: PathBuf,
    config: AggregatorConfig,
}

impl LedgerAggregator {
    pub fn new(path: impl AsRef<Path>, config: AggregatorConfig) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run the full pass and return the snapshot.
    pub async fn run(&self) -> Result<Insights> {
        self.run_with_stats().await.map(|(insights, _)| insights)
    }

    pub async fn run_with_stats(&self) -> Result<(Insights, RunStats)> {
        log::info!("Aggregating ledger at {}", self.path.display());
        // Open and header failures surface here, before any worker exists.
        let source = RecordSource::open(&self.path)?;
        aggregate_source(source, &self.config).await
    }
}

/// Stream an already-opened source through the worker pool, merge, and rank.
pub async fn aggregate_source<R>(
    source: RecordSource<R>,
    config: &AggregatorConfig,
) -> Result<(Insights, RunStats)>
where
    R: Read + Send + 'static,
{
    let start = Instant::now();
    let workers = config.effective_workers();
    let mut stats = RunStats::new(workers);

    let (pool, tx) = WorkerPool::start(workers, config.effective_queue_capacity());
    let producer = tokio::task::spawn_blocking(move || {
        let mut source = source;
        feed(source.by_ref(), tx);
        source.counts()
    });

    let partials = pool.join().await?;
    let counts: SourceCounts = producer
        .await
        .map_err(|e| AggregatorError::WorkerFailed(format!("record source: {e}")))?;
    stats.absorb_source(counts);

    let merged = MergedState::from_partials(partials);
    debug_assert_eq!(merged.rows, stats.rows_read);
    let insights = rank(merged, &config.limits);

    stats.time_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    if stats.rows_skipped > 0 {
        log::warn!("Skipped {} malformed ledger rows", stats.rows_skipped);
    }
    if stats.read_errors > 0 {
        log::warn!("Hit {} read errors on the ledger handle", stats.read_errors);
    }
    if counts.read_failed {
        log::warn!("Ledger stream ended on a read error; results cover the rows read so far");
    }
    log::info!(
        "Aggregated {} rows with {} workers in {} ms",
        stats.rows_read,
        stats.workers,
        stats.time_ms
    );

    Ok((insights, stats))
}
