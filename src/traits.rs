use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One indexed filesystem object, file or directory.
///
/// `path` is the primary key and keeps its original case; `name` and
/// `parent` are stored lowercased so indexed lookups are case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub path: String,
    pub name: String,
    pub parent: String,
    pub size: u64,
    pub modified_time: f64,
}

/// Which stored field a query prefilters against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryField {
    Name,
    Path,
}

/// One search invocation as handed to the query engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub pattern: String,
    /// Match the pattern against the full path instead of the base name.
    pub match_full_path: bool,
    /// Case-insensitive substring restriction on the parent directory.
    pub parent_filter: Option<String>,
    pub limit: usize,
    /// Monotonic sequence number assigned by the live search controller.
    pub generation: u64,
}

/// The outcome of one query, tagged with the generation that produced it.
///
/// A failed query carries `error` and no entries; it is still delivered so
/// the caller can show an explicit "search failed" state.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub entries: Vec<Entry>,
    pub generation: u64,
    pub error: Option<String>,
}

/// Terminal outcome of a crawl. Cancellation is a normal result, not an
/// error; `total` counts only entries that were actually committed.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlStatus {
    Completed { total: u64, elapsed: Duration },
    Cancelled { total: u64 },
}

/// Trait for the durable mapping from path to [`Entry`].
///
/// Implementations must let one writer and many concurrent readers share the
/// same on-disk index, with readers seeing a consistent snapshot while a
/// writer batch is mid-transaction.
pub trait IndexStore {
    /// Insert or update a batch of entries in one transaction. A failure
    /// drops the whole batch; the caller may continue with later batches.
    fn upsert_batch(&mut self, entries: &[Entry]) -> anyhow::Result<usize>;

    /// Coarse prefilter: entries whose `field` contains `contains`
    /// (case-insensitive, everything if empty), optionally restricted to
    /// parents containing `parent`. Returns up to `limit` rows in no
    /// particular order.
    fn query_by_field(
        &self,
        field: QueryField,
        contains: &str,
        parent: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<Entry>>;

    /// Total number of indexed entries.
    fn count(&self) -> anyhow::Result<i64>;
}
