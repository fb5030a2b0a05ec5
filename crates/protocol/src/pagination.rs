use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Raw `limit`/`offset` query parameters.
///
/// Values are kept as strings so that garbage input degrades to the defaults instead of
/// rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub limit: Option<String>,
    #[serde(default)]
    pub offset: Option<String>,
}

impl PageQuery {
    pub fn new(limit: Option<&str>, offset: Option<&str>) -> Self {
        Self {
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
        }
    }

    /// Limit must be at least 1, otherwise [`DEFAULT_PAGE_LIMIT`].
    pub fn limit(&self) -> usize {
        parse_signed(self.limit.as_deref())
            .filter(|v| *v >= 1)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    /// Negative or invalid offsets start at the beginning.
    pub fn offset(&self) -> usize {
        parse_signed(self.offset.as_deref())
            .filter(|v| *v >= 0)
            .and_then(|v| usize::try_from(v).ok())
            .unwrap_or(0)
    }
}

fn parse_signed(raw: Option<&str>) -> Option<i64> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<i64>().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: usize,
    pub data: Vec<T>,
}

/// Slice one page out of an already-ordered sequence.
pub fn paginate<T: Clone>(items: &[T], query: &PageQuery) -> Page<T> {
    let total = items.len();
    let start = query.offset().min(total);
    let end = start.saturating_add(query.limit()).min(total);
    Page {
        total,
        data: items[start..end].to_vec(),
    }
}
