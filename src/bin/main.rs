use clap::{Parser, Subcommand};
use colored::Colorize;
use findex::{
    Crawler, DEFAULT_BATCH_SIZE, FindexDirs, IndexStore, SearchRequest, SqliteIndexStore, query,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "findex")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[clap(flatten)]
    verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl directories into the index
    Index {
        /// Root directories to crawl (default: your home directory)
        roots: Vec<PathBuf>,
        /// Index database path (default: the per-user data directory)
        #[clap(long, help = "Path to the SQLite index database file.")]
        db: Option<PathBuf>,
        /// Entries committed per batch
        #[clap(
            long,
            default_value_t = DEFAULT_BATCH_SIZE,
            help = "Number of entries accumulated before each batch commit."
        )]
        batch_size: usize,
    },
    /// Search the index
    Search {
        /// Pattern: empty matches all, /…/ is a regex, otherwise a glob with * and ?
        pattern: String,
        /// Index database path (default: the per-user data directory)
        #[clap(long, help = "Path to the SQLite index database file.")]
        db: Option<PathBuf>,
        /// Match the pattern against the full path instead of the base name
        #[clap(long)]
        in_path: bool,
        /// Only return entries whose parent directory contains this substring
        #[clap(long)]
        parent: Option<String>,
        /// Maximum number of results to return
        #[clap(
            long,
            default_value = "5000",
            help = "Maximum number of search results to return."
        )]
        limit: usize,
        /// Output results as pretty format instead of json text
        #[clap(
            long,
            help = "Output search results in pretty format instead of json text."
        )]
        pretty: bool,
    },
    /// Show how many entries the index holds
    Stats {
        /// Index database path (default: the per-user data directory)
        #[clap(long, help = "Path to the SQLite index database file.")]
        db: Option<PathBuf>,
    },
}

fn resolve_db_path(db: Option<PathBuf>, create_dir: bool) -> anyhow::Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => {
            let dirs = FindexDirs::new();
            if create_dir {
                dirs.ensure_db_dir()?;
            }
            Ok(dirs.default_db_path())
        }
    }
}

fn validate_db_presence(db_path: &PathBuf) -> anyhow::Result<()> {
    if !db_path.exists() {
        return Err(anyhow::anyhow!(
            "Index database '{}' does not exist. Please run the 'index' command first to create and populate it.",
            db_path.display()
        ));
    }
    Ok(())
}

/// Size rendered in KB with thousands separators, floor but never 0;
/// directories (size 0) render empty.
fn format_size(size: u64) -> String {
    if size == 0 {
        return String::new();
    }
    let kb = (size / 1024).max(1).to_string();
    let mut out = String::with_capacity(kb.len() + kb.len() / 3 + 3);
    for (i, ch) in kb.chars().enumerate() {
        if i > 0 && (kb.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.push_str(" KB");
    out
}

fn format_mtime(epoch_seconds: f64) -> String {
    use chrono::TimeZone;
    if epoch_seconds <= 0.0 {
        return String::new();
    }
    chrono::Local
        .timestamp_opt(epoch_seconds as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .init();

    match cli.command {
        Commands::Index {
            roots,
            db,
            batch_size,
        } => {
            let db_path = resolve_db_path(db, true)?;
            let roots = if roots.is_empty() {
                let home = directories::UserDirs::new()
                    .map(|dirs| dirs.home_dir().to_path_buf())
                    .ok_or_else(|| anyhow::anyhow!("Could not determine the home directory"))?;
                vec![home]
            } else {
                roots
            };

            let mut store = SqliteIndexStore::open(&db_path.to_string_lossy())?;
            store.create_table()?;
            let existing = store.count()?;
            if existing > 0 {
                println!("Index currently holds {} entries; refreshing.", existing);
            }
            println!(
                "Indexing {} root(s) into {}",
                roots.len(),
                db_path.display()
            );

            let crawler = Crawler::new(batch_size);
            let status = crawler.run(&mut store, &roots, |progress| {
                if progress.done {
                    let seconds = progress
                        .elapsed
                        .map(|e| e.as_secs_f64())
                        .unwrap_or_default();
                    println!("Indexed {} entries in {:.1}s", progress.count, seconds);
                } else {
                    println!("Indexed {} entries…", progress.count);
                }
            });
            if let findex::CrawlStatus::Cancelled { total } = status {
                println!("Crawl cancelled after {} entries.", total);
            }
            println!("Total entries in the index: {}", store.count()?);
        }
        Commands::Search {
            pattern,
            db,
            in_path,
            parent,
            limit,
            pretty,
        } => {
            let db_path = resolve_db_path(db, false)?;
            validate_db_presence(&db_path)?;
            let store = SqliteIndexStore::open(&db_path.to_string_lossy())?;

            let request = SearchRequest {
                pattern: pattern.clone(),
                match_full_path: in_path,
                parent_filter: parent,
                limit,
                generation: 0,
            };
            let results = query::execute(&store, &request);
            if let Some(err) = results.error {
                return Err(anyhow::anyhow!("Search failed: {}", err));
            }

            if !pretty {
                let json_output = serde_json::json!({
                    "pattern": pattern,
                    "results_count": results.entries.len(),
                    "results": results.entries,
                });
                println!("{}", serde_json::to_string_pretty(&json_output)?);
                return Ok(());
            }

            if results.entries.is_empty() {
                println!("No results found.");
                return Ok(());
            }

            println!("Found {} results:", results.entries.len());
            println!();
            for entry in &results.entries {
                let name = entry
                    .path
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(entry.path.as_str());
                println!(
                    "{}  {}  {}",
                    name.bold(),
                    format_size(entry.size).dimmed(),
                    format_mtime(entry.modified_time).dimmed()
                );
                println!("   {}", entry.path.cyan());
            }
        }
        Commands::Stats { db } => {
            let db_path = resolve_db_path(db, false)?;
            validate_db_presence(&db_path)?;
            let store = SqliteIndexStore::open(&db_path.to_string_lossy())?;
            println!("{} entries indexed in {}", store.count()?, db_path.display());
        }
    }
    Ok(())
}
