use crate::engines::SqliteIndexStore;
use crate::query;
use crate::traits::{ResultSet, SearchRequest};
use log::{debug, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Quiet window a burst of parameter edits must outlast before a query runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(120);

/// The user-editable search parameters, minus the generation number the
/// controller assigns at dispatch time.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub pattern: String,
    pub match_full_path: bool,
    pub parent_filter: Option<String>,
    pub limit: usize,
}

type Executor = dyn Fn(&SearchRequest) -> ResultSet + Send + Sync;
type ResultSink = dyn Fn(ResultSet) + Send + Sync;

struct Inner {
    /// Bumped on every parameter change; a pending debounce sleeper whose
    /// epoch is no longer current was superseded and stands down.
    epoch: AtomicU64,
    /// Assigned when a debounce window closes uncontested.
    generation: AtomicU64,
    /// Highest generation whose result has been published.
    applied: Mutex<u64>,
    params: Mutex<SearchParams>,
    execute: Box<Executor>,
    publish: Box<ResultSink>,
}

/// Turns a stream of user-edited search parameters into a bounded rate of
/// query executions, and keeps only the freshest result visible.
///
/// Every [`update`](LiveSearch::update) restarts the debounce window. When a
/// window closes uncontested the controller assigns the next generation and
/// runs the query on its own thread; queries already in flight are never
/// interrupted, but a completion is published only if it still carries the
/// newest generation, so a slow stale query can never overwrite a fresher
/// result.
pub struct LiveSearch {
    inner: Arc<Inner>,
    debounce: Duration,
}

impl LiveSearch {
    /// Builds a controller around an arbitrary query executor. The seam
    /// exists so the dispatch discipline can be exercised without a store.
    pub fn new(
        execute: impl Fn(&SearchRequest) -> ResultSet + Send + Sync + 'static,
        publish: impl Fn(ResultSet) + Send + Sync + 'static,
        debounce: Duration,
    ) -> Self {
        LiveSearch {
            inner: Arc::new(Inner {
                epoch: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                applied: Mutex::new(0),
                params: Mutex::new(SearchParams::default()),
                execute: Box::new(execute),
                publish: Box::new(publish),
            }),
            debounce,
        }
    }

    /// Production wiring: each dispatched query opens its own store handle
    /// on `db_path`, so searches run concurrently with a crawling writer.
    pub fn with_store_path(
        db_path: impl Into<String>,
        publish: impl Fn(ResultSet) + Send + Sync + 'static,
        debounce: Duration,
    ) -> Self {
        let db_path = db_path.into();
        Self::new(
            move |request| match SqliteIndexStore::open(&db_path) {
                Ok(store) => query::execute(&store, request),
                Err(e) => {
                    warn!("Failed to open index for search: {}", e);
                    ResultSet {
                        entries: Vec::new(),
                        generation: request.generation,
                        error: Some(e.to_string()),
                    }
                }
            },
            publish,
            debounce,
        )
    }

    /// Records changed parameters and (re)starts the quiet-window timer.
    /// Safe to call at any rate; bursts collapse into one dispatch.
    pub fn update(&self, params: SearchParams) {
        *self.inner.params.lock().unwrap() = params;
        let epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let debounce = self.debounce;

        thread::spawn(move || {
            thread::sleep(debounce);
            if inner.epoch.load(Ordering::SeqCst) != epoch {
                // A newer edit restarted the window; this timer was
                // effectively cancelled.
                return;
            }

            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            let params = inner.params.lock().unwrap().clone();
            let request = SearchRequest {
                pattern: params.pattern,
                match_full_path: params.match_full_path,
                parent_filter: params.parent_filter,
                limit: params.limit,
                generation,
            };
            debug!("Dispatching search generation {}.", generation);

            let result = (inner.execute)(&request);

            // Publish only if this is still the newest generation: a result
            // overtaken by a later dispatch is stale even when it is the
            // first to arrive.
            let mut applied = inner.applied.lock().unwrap();
            let latest = inner.generation.load(Ordering::SeqCst);
            if result.generation == latest && result.generation > *applied {
                *applied = result.generation;
                (inner.publish)(result);
            } else {
                debug!(
                    "Discarding stale result for generation {} (latest dispatched: {}).",
                    result.generation, latest
                );
            }
        });
    }

    /// Highest generation published so far; 0 before the first result.
    pub fn applied_generation(&self) -> u64 {
        *self.inner.applied.lock().unwrap()
    }
}
