use crate::traits::{CrawlStatus, Entry, IndexStore};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, UNIX_EPOCH};
use walkdir::WalkDir;

/// Default number of entries accumulated before a batch is committed.
pub const DEFAULT_BATCH_SIZE: usize = 5_000;

/// Progress snapshot delivered after every committed batch and once more on
/// completion (`done = true`, with the elapsed wall time).
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    pub count: u64,
    pub done: bool,
    pub elapsed: Option<Duration>,
}

/// Cloneable handle used to request cooperative cancellation of a crawl.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Walks root directories and feeds their entries into an [`IndexStore`] in
/// bounded batches.
///
/// Each crawler owns its cancellation flag and counters; nothing here is
/// process-wide. Cancellation is checked at directory boundaries and never
/// discards an accumulated batch: partial progress is flushed before the
/// crawl reports [`CrawlStatus::Cancelled`].
pub struct Crawler {
    batch_size: usize,
    cancel: CancelToken,
}

impl Crawler {
    pub fn new(batch_size: usize) -> Self {
        Crawler {
            batch_size: batch_size.max(1),
            cancel: CancelToken::new(),
        }
    }

    /// Handle for requesting cancellation from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Crawls `roots` into `store`, reporting progress after every committed
    /// batch. Per-entry stat failures and unreadable directories are skipped;
    /// a store failure drops that batch and the crawl carries on best-effort.
    pub fn run<S, F>(&self, store: &mut S, roots: &[PathBuf], mut on_progress: F) -> CrawlStatus
    where
        S: IndexStore,
        F: FnMut(CrawlProgress),
    {
        // A fresh run clears any cancellation left over from the previous
        // one, so crawls can be restarted immediately.
        self.cancel.reset();
        let started = Instant::now();
        let mut batch: Vec<Entry> = Vec::with_capacity(self.batch_size);
        let mut total: u64 = 0;

        for root in roots {
            let root = std::path::absolute(root).unwrap_or_else(|_| root.clone());
            info!("Crawling root: {}", root.display());

            for item in WalkDir::new(&root).min_depth(1).follow_links(false) {
                let dent = match item {
                    Ok(dent) => dent,
                    Err(e) => {
                        // Unreadable entry or directory; walkdir already
                        // continues with the remaining siblings.
                        debug!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                };

                if dent.file_type().is_dir() && self.cancel.is_cancelled() {
                    total += flush(store, &mut batch);
                    info!("Crawl cancelled after {} entries.", total);
                    return CrawlStatus::Cancelled { total };
                }

                let metadata = match dent.metadata() {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        debug!("Skipping {}: stat failed: {}", dent.path().display(), e);
                        continue;
                    }
                };

                let path = dent.path();
                let size = if metadata.is_dir() { 0 } else { metadata.len() };
                let modified_time = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs_f64())
                    .unwrap_or(0.0);

                batch.push(Entry {
                    path: path.to_string_lossy().into_owned(),
                    name: dent.file_name().to_string_lossy().to_lowercase(),
                    parent: path
                        .parent()
                        .map(|p| p.to_string_lossy().to_lowercase())
                        .unwrap_or_default(),
                    size,
                    modified_time,
                });

                if batch.len() >= self.batch_size {
                    total += flush(store, &mut batch);
                    on_progress(CrawlProgress {
                        count: total,
                        done: false,
                        elapsed: None,
                    });
                }
            }
        }

        total += flush(store, &mut batch);
        let elapsed = started.elapsed();
        info!(
            "Crawl complete: {} entries in {:.1}s",
            total,
            elapsed.as_secs_f64()
        );
        on_progress(CrawlProgress {
            count: total,
            done: true,
            elapsed: Some(elapsed),
        });
        CrawlStatus::Completed { total, elapsed }
    }
}

/// Commits the accumulated batch; on store failure the batch is dropped and
/// not counted, so `total` only ever reflects committed rows.
fn flush<S: IndexStore>(store: &mut S, batch: &mut Vec<Entry>) -> u64 {
    if batch.is_empty() {
        return 0;
    }
    let written = match store.upsert_batch(batch) {
        Ok(written) => written as u64,
        Err(e) => {
            warn!("Dropping batch of {} entries: {}", batch.len(), e);
            0
        }
    };
    batch.clear();
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::SqliteIndexStore;
    use crate::traits::QueryField;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_store(temp_dir: &TempDir) -> SqliteIndexStore {
        let db_path = temp_dir.path().join("index.db");
        let store = SqliteIndexStore::open(db_path.to_str().unwrap())
            .expect("Failed to create test store");
        store.create_table().expect("Failed to create tables");
        store
    }

    /// root/sub_0 .. sub_{dirs-1}, each holding `files_per_dir` small files.
    fn build_tree(temp_dir: &TempDir, dirs: usize, files_per_dir: usize) -> PathBuf {
        let root = temp_dir.path().join("tree");
        for d in 0..dirs {
            let dir = root.join(format!("sub_{}", d));
            fs::create_dir_all(&dir).unwrap();
            for f in 0..files_per_dir {
                fs::write(dir.join(format!("file_{}.txt", f)), b"0123456789").unwrap();
            }
        }
        root
    }

    #[test]
    fn test_crawl_indexes_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = create_test_store(&temp_dir);
        let root = build_tree(&temp_dir, 3, 4);

        let crawler = Crawler::new(DEFAULT_BATCH_SIZE);
        let status = crawler.run(&mut store, &[root.clone()], |_| {});

        // 3 directories + 12 files, directories indexed as entries too.
        assert!(matches!(status, CrawlStatus::Completed { total: 15, .. }));
        assert_eq!(store.count().unwrap(), 15);

        // Directories are findable by name and carry no meaningful size.
        let dirs = store
            .query_by_field(QueryField::Name, "sub_1", None, 10)
            .unwrap();
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].size, 0);

        let files = store
            .query_by_field(QueryField::Name, "file_0.txt", None, 10)
            .unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|e| e.size == 10));
    }

    #[test]
    fn test_recrawl_does_not_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = create_test_store(&temp_dir);
        let root = build_tree(&temp_dir, 2, 3);

        let crawler = Crawler::new(DEFAULT_BATCH_SIZE);
        crawler.run(&mut store, &[root.clone()], |_| {});
        let first = store.count().unwrap();
        crawler.run(&mut store, &[root], |_| {});
        assert_eq!(store.count().unwrap(), first);
    }

    #[test]
    fn test_progress_reports_running_totals_and_completion() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = create_test_store(&temp_dir);
        let root = build_tree(&temp_dir, 2, 10);

        let mut snapshots: Vec<CrawlProgress> = Vec::new();
        let crawler = Crawler::new(5);
        crawler.run(&mut store, &[root], |p| snapshots.push(p));

        let last = snapshots.last().expect("completion snapshot");
        assert!(last.done);
        assert_eq!(last.count, 22);
        assert!(last.elapsed.is_some());
        // Intermediate snapshots carry running totals in batch-size steps.
        assert!(snapshots[..snapshots.len() - 1].iter().all(|p| !p.done));
        assert!(snapshots.iter().map(|p| p.count).is_sorted());
    }

    #[test]
    fn test_cancellation_preserves_flushed_batches() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = create_test_store(&temp_dir);
        let root = build_tree(&temp_dir, 30, 5);

        let crawler = Crawler::new(10);
        let token = crawler.cancel_token();
        let status = crawler.run(&mut store, &[root.clone()], |p| {
            // Ask for cancellation as soon as the first batch lands.
            if p.count >= 10 {
                token.cancel();
            }
        });

        let total = match status {
            CrawlStatus::Cancelled { total } => total,
            other => panic!("expected cancellation, got {:?}", other),
        };
        assert!(total >= 10);
        assert!(total < 180);
        // Only flushed batches are visible in the store.
        assert_eq!(store.count().unwrap(), total as i64);

        // A subsequent crawl starts cleanly and reaches full coverage.
        let status = crawler.run(&mut store, &[root], |_| {});
        assert!(matches!(status, CrawlStatus::Completed { .. }));
        assert_eq!(store.count().unwrap(), 180);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = create_test_store(&temp_dir);

        let crawler = Crawler::new(DEFAULT_BATCH_SIZE);
        let status = crawler.run(
            &mut store,
            &[temp_dir.path().join("does-not-exist")],
            |_| {},
        );
        assert!(matches!(status, CrawlStatus::Completed { total: 0, .. }));
        assert_eq!(store.count().unwrap(), 0);
    }
}
