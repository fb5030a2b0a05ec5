use std::num::NonZeroUsize;

pub const WORKERS_ENV: &str = "LEDGER_WORKERS";
pub const MAX_WORKERS: usize = 256;
pub const QUEUE_SLOTS_PER_WORKER: usize = 2;
pub const DEFAULT_TOP_PRODUCTS: usize = 20;
pub const DEFAULT_TOP_REGIONS: usize = 30;

/// Output caps applied after sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankLimits {
    pub top_products: usize,
    pub top_regions: usize,
}

impl Default for RankLimits {
    fn default() -> Self {
        Self {
            top_products: DEFAULT_TOP_PRODUCTS,
            top_regions: DEFAULT_TOP_REGIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Requested worker count; `0` means "use available parallelism".
    pub workers: usize,

    /// Bounded queue capacity; `None` sizes it from the worker count.
    pub queue_capacity: Option<usize>,

    pub limits: RankLimits,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: None,
            limits: RankLimits::default(),
        }
    }
}

impl AggregatorConfig {
    /// Non-positive counts fall back to the hardware default.
    #[must_use]
    pub fn with_workers(mut self, workers: i64) -> Self {
        self.workers = usize::try_from(workers).unwrap_or(0);
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: RankLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            default_workers()
        } else {
            self.workers.min(MAX_WORKERS)
        }
    }

    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| self.effective_workers() * QUEUE_SLOTS_PER_WORKER)
            .max(1)
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .min(MAX_WORKERS)
}

pub fn parse_workers(raw: Option<&str>, default_value: usize) -> usize {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default_value)
        .clamp(1, MAX_WORKERS)
}

pub fn workers_from_env() -> usize {
    let raw = std::env::var(WORKERS_ENV).ok();
    parse_workers(raw.as_deref(), default_workers())
}
