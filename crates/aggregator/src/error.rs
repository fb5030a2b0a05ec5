use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AggregatorError>;

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("ledger source unavailable at {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ledger header missing: {0}")]
    HeaderMissing(String),

    #[error("aggregation worker failed: {0}")]
    WorkerFailed(String),
}
