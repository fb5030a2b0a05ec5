//! # Ledger Aggregator
//!
//! Concurrent streaming aggregation over a CSV transaction ledger.
//!
//! ## Pipeline
//!
//! ```text
//! ledger.csv
//!     │
//!     ├──> Record Source (single sequential reader)
//!     │      └─> RawRecord
//!     │
//!     ├──> Bounded queue ──> Worker Pool (N private PartialStates)
//!     │
//!     ├──> Barrier (join every worker)
//!     │
//!     ├──> Merge Reducer
//!     │      └─> MergedState
//!     │
//!     └──> Ranker (sort, then cap)
//!            └─> Insights
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use ledger_aggregator::{AggregatorConfig, LedgerAggregator};
//!
//! #[tokio::main]
//! async fn main() -> ledger_aggregator::Result<()> {
//!     let aggregator = LedgerAggregator::new("data/ledger.csv", AggregatorConfig::default());
//!     let (insights, stats) = aggregator.run_with_stats().await?;
//!
//!     println!(
//!         "{} rows, {} country/product pairs",
//!         stats.rows_read,
//!         insights.country_revenue.len()
//!     );
//!     Ok(())
//! }
//! ```

mod aggregator;
mod config;
mod error;
mod merge;
mod partial;
mod pool;
mod rank;
mod record;
mod source;
mod stats;

pub use aggregator::{aggregate_source, LedgerAggregator};
pub use config::{
    default_workers, parse_workers, workers_from_env, AggregatorConfig, RankLimits,
    DEFAULT_TOP_PRODUCTS, DEFAULT_TOP_REGIONS, MAX_WORKERS, WORKERS_ENV,
};
pub use error::{AggregatorError, Result};
pub use merge::MergedState;
pub use partial::{
    CountryProductKey, CountryProductTotals, PartialState, ProductTotals, RegionTotals,
};
pub use pool::{feed, WorkerPool};
pub use rank::rank;
pub use record::{Column, RawRecord, COLUMN_COUNT};
pub use source::{RecordSource, MAX_CONSECUTIVE_IO_ERRORS};
pub use stats::{RunStats, SourceCounts};

pub use ledger_protocol::Insights;
