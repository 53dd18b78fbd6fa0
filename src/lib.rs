//! # Findex
//!
//! A fast, local filesystem indexer and live search engine built in Rust with
//! SQLite storage.
//!
//! ## Features
//!
//! - Persistent filesystem index with batched, cancellable crawls
//! - Glob and regex search, always case-insensitive
//! - Coarse storage-level prefilter plus exact in-memory matching
//! - Debounced live search with stale-result discard
//! - Both library and CLI interfaces
//! - Configurable database location using system directories
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use findex::{Crawler, FindexDirs, IndexStore, SearchRequest, SqliteIndexStore, query};
//! use std::path::PathBuf;
//!
//! # fn main() -> anyhow::Result<()> {
//! // Open (or create) the index database
//! let dirs = FindexDirs::new();
//! dirs.ensure_db_dir()?;
//! let db_path = dirs.default_db_path();
//! let mut store = SqliteIndexStore::open(&db_path.to_string_lossy())?;
//! store.create_table()?;
//!
//! // Crawl a subtree into the index
//! let crawler = Crawler::new(findex::DEFAULT_BATCH_SIZE);
//! let status = crawler.run(&mut store, &[PathBuf::from("/home/me/docs")], |progress| {
//!     println!("indexed {} entries", progress.count);
//! });
//! println!("{:?}, {} entries total", status, store.count()?);
//!
//! // Search it
//! let request = SearchRequest {
//!     pattern: "*.txt".to_string(),
//!     match_full_path: false,
//!     parent_filter: None,
//!     limit: 50,
//!     generation: 0,
//! };
//! let results = query::execute(&store, &request);
//! for entry in &results.entries {
//!     println!("{}", entry.path);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! For interactive use, wrap the query path in a [`LiveSearch`] controller:
//! it debounces bursts of parameter edits and discards out-of-order
//! completions so only the freshest result is ever published.

pub mod traits;
pub use traits::{CrawlStatus, Entry, IndexStore, QueryField, ResultSet, SearchRequest};

pub mod config;
pub use config::FindexDirs;

pub mod pattern;
pub use pattern::CompiledPattern;

pub mod crawler;
pub use crawler::{CancelToken, CrawlProgress, Crawler, DEFAULT_BATCH_SIZE};

pub mod query;
pub use query::PREFILTER_OVERSAMPLE;

pub mod live;
pub use live::{DEFAULT_DEBOUNCE, LiveSearch, SearchParams};

pub mod engines;
pub use engines::SqliteIndexStore;
