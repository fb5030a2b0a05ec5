use crate::error::{AggregatorError, Result};
use crate::partial::PartialState;
use crate::record::RawRecord;
use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;

/// Fixed set of blocking workers draining one bounded queue.
///
/// Each worker owns a private [`PartialState`]; nothing is shared on the per-record path.
pub struct WorkerPool {
    handles: Vec<JoinHandle<PartialState>>,
}

impl WorkerPool {
    /// Spawn `workers` consumers and return the queue's only producer handle.
    ///
    /// The queue closes when the returned sender (and any clones) are dropped.
    pub fn start(workers: usize, queue_capacity: usize) -> (Self, Sender<RawRecord>) {
        let workers = workers.max(1);
        let (tx, rx) = async_channel::bounded(queue_capacity.max(1));

        let handles = (0..workers)
            .map(|idx| {
                let rx = rx.clone();
                tokio::task::spawn_blocking(move || drain(idx, rx))
            })
            .collect();

        (Self { handles }, tx)
    }

    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Barrier: resolves only after every worker has seen the queue closed and exited.
    ///
    /// All workers are awaited even when one fails, so no partial state is still being
    /// written when this returns.
    pub async fn join(self) -> Result<Vec<PartialState>> {
        let mut partials = Vec::with_capacity(self.handles.len());
        let mut failure = None;

        for (idx, handle) in self.handles.into_iter().enumerate() {
            match handle.await {
                Ok(partial) => partials.push(partial),
                Err(err) => {
                    log::error!("Aggregation worker {idx} did not finish: {err}");
                    failure.get_or_insert_with(|| format!("worker {idx}: {err}"));
                }
            }
        }

        match failure {
            Some(message) => Err(AggregatorError::WorkerFailed(message)),
            None => Ok(partials),
        }
    }
}

fn drain(idx: usize, rx: Receiver<RawRecord>) -> PartialState {
    let mut state = PartialState::new();
    while let Ok(record) = rx.recv_blocking() {
        state.fold(&record);
    }
    log::debug!("Worker {idx} drained {} rows", state.rows());
    state
}

/// Push every record into the queue, then close it by dropping the sender.
///
/// Returns the number of records delivered. Stops early only if every worker is gone.
pub fn feed<I>(records: I, tx: Sender<RawRecord>) -> u64
where
    I: IntoIterator<Item = RawRecord>,
{
    let mut sent = 0u64;
    for record in records {
        if tx.send_blocking(record).is_err() {
            log::warn!("All aggregation workers exited; stopping feed after {sent} rows");
            break;
        }
        sent += 1;
    }
    sent
}
