use crate::traits::{Entry, IndexStore, QueryField};
use anyhow::anyhow;
use log::{debug, info};
use rusqlite::Connection;

/// SQLite-backed index store.
///
/// One `SqliteIndexStore` wraps one connection and is meant to be owned by a
/// single worker; concurrent crawl and query workers each open their own
/// store on the same path. WAL journaling keeps readers unblocked while a
/// writer batch is in flight.
pub struct SqliteIndexStore {
    conn: Connection,
}

impl SqliteIndexStore {
    /// Opens (creating if needed) the index database at the given path.
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        info!("Opening index store at: {}", db_path);
        let conn =
            Connection::open(db_path).map_err(|e| anyhow!("Failed to open database: {}", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| anyhow!("Failed to enable WAL mode: {}", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;
        conn.pragma_update(None, "temp_store", "MEMORY")
            .map_err(|e| anyhow!("Failed to set temp_store: {}", e))?;
        Ok(SqliteIndexStore { conn })
    }

    /// Creates the files table and its secondary indexes.
    ///
    /// The indexes on `name` and `parent` are what keep selective prefilter
    /// queries sub-linear in total entry count.
    pub fn create_table(&self) -> anyhow::Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS files (
                    path TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    parent TEXT NOT NULL,
                    size INTEGER,
                    mtime REAL
                )",
                [],
            )
            .map_err(|e| anyhow!("Failed to create files table: {}", e))?;
        debug!("Created files table if it did not exist.");

        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_files_name ON files(name)",
                [],
            )
            .map_err(|e| anyhow!("Failed to create name index: {}", e))?;
        self.conn
            .execute(
                "CREATE INDEX IF NOT EXISTS idx_files_parent ON files(parent)",
                [],
            )
            .map_err(|e| anyhow!("Failed to create parent index: {}", e))?;
        debug!("Created secondary indexes on name and parent.");
        Ok(())
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        path: row.get(0)?,
        name: row.get(1)?,
        parent: row.get(2)?,
        size: row.get::<_, i64>(3)?.max(0) as u64,
        modified_time: row.get(4)?,
    })
}

impl IndexStore for SqliteIndexStore {
    /// Upserts a batch of entries in a single transaction. Re-indexing an
    /// already-seen path overwrites its metadata, never adds a row.
    fn upsert_batch(&mut self, entries: &[Entry]) -> anyhow::Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }
        let tx = self
            .conn
            .transaction()
            .map_err(|e| anyhow!("Failed to begin batch transaction: {}", e))?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO files(path, name, parent, size, mtime)
                     VALUES(?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(path) DO UPDATE SET
                         name=excluded.name,
                         parent=excluded.parent,
                         size=excluded.size,
                         mtime=excluded.mtime",
                )
                .map_err(|e| anyhow!("Failed to prepare upsert: {}", e))?;
            for entry in entries {
                stmt.execute(rusqlite::params![
                    entry.path,
                    entry.name,
                    entry.parent,
                    entry.size as i64,
                    entry.modified_time,
                ])
                .map_err(|e| anyhow!("Failed to upsert entry {}: {}", entry.path, e))?;
            }
        }
        tx.commit()
            .map_err(|e| anyhow!("Failed to commit batch: {}", e))?;
        debug!("Committed batch of {} entries.", entries.len());
        Ok(entries.len())
    }

    fn query_by_field(
        &self,
        field: QueryField,
        contains: &str,
        parent: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<Entry>> {
        let column = match field {
            QueryField::Name => "name",
            QueryField::Path => "path",
        };
        // name/parent are stored lowercased; path relies on LIKE being
        // ASCII-case-insensitive, same discipline as the on-disk layout.
        let needle = format!("%{}%", contains.to_lowercase());

        let rows = match parent {
            Some(parent) => {
                let sql = format!(
                    "SELECT path, name, parent, size, mtime FROM files
                     WHERE {} LIKE ?1 AND parent LIKE ?2 LIMIT ?3",
                    column
                );
                let mut stmt = self
                    .conn
                    .prepare(&sql)
                    .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;
                let parent_needle = format!("%{}%", parent.to_lowercase());
                let iter = stmt
                    .query_map(
                        rusqlite::params![needle, parent_needle, limit as i64],
                        row_to_entry,
                    )
                    .map_err(|e| anyhow!("Failed to run query: {}", e))?;
                iter.collect::<rusqlite::Result<Vec<Entry>>>()
            }
            None => {
                let sql = format!(
                    "SELECT path, name, parent, size, mtime FROM files
                     WHERE {} LIKE ?1 LIMIT ?2",
                    column
                );
                let mut stmt = self
                    .conn
                    .prepare(&sql)
                    .map_err(|e| anyhow!("Failed to prepare query: {}", e))?;
                let iter = stmt
                    .query_map(rusqlite::params![needle, limit as i64], row_to_entry)
                    .map_err(|e| anyhow!("Failed to run query: {}", e))?;
                iter.collect::<rusqlite::Result<Vec<Entry>>>()
            }
        }
        .map_err(|e| anyhow!("Failed to read query rows: {}", e))?;

        debug!(
            "Prefilter on {} for '{}' returned {} rows.",
            column,
            contains,
            rows.len()
        );
        Ok(rows)
    }

    fn count(&self) -> anyhow::Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to count entries: {}", e))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteIndexStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let store = SqliteIndexStore::open(db_path.to_str().unwrap())
            .expect("Failed to create test store");
        store.create_table().expect("Failed to create tables");
        (store, temp_dir)
    }

    fn test_entry(path: &str, size: u64) -> Entry {
        let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
        let parent = path
            .rsplit_once('/')
            .map(|(dir, _)| dir.to_lowercase())
            .unwrap_or_default();
        Entry {
            path: path.to_string(),
            name,
            parent,
            size,
            modified_time: 1_700_000_000.0,
        }
    }

    #[test]
    fn test_store_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let store = SqliteIndexStore::open(db_path.to_str().unwrap());
        assert!(store.is_ok());

        let store = store.unwrap();
        assert!(store.create_table().is_ok());
        // Schema creation is idempotent.
        assert!(store.create_table().is_ok());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_batch_upsert() {
        let (mut store, _temp_dir) = create_test_store();

        let batch = vec![
            test_entry("/home/user/Report.TXT", 10),
            test_entry("/home/user/notes.md", 20),
        ];
        let written = store.upsert_batch(&batch).unwrap();
        assert_eq!(written, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let (mut store, _temp_dir) = create_test_store();

        store
            .upsert_batch(&[test_entry("/home/user/a.txt", 10)])
            .unwrap();
        // Same path with new metadata must update in place, not duplicate.
        let mut updated = test_entry("/home/user/a.txt", 999);
        updated.modified_time = 1_800_000_000.0;
        store.upsert_batch(&[updated]).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        let rows = store
            .query_by_field(QueryField::Name, "a.txt", None, 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].size, 999);
        assert_eq!(rows[0].modified_time, 1_800_000_000.0);
    }

    #[test]
    fn test_query_by_name_is_case_insensitive() {
        let (mut store, _temp_dir) = create_test_store();
        store
            .upsert_batch(&[test_entry("/home/user/Report.TXT", 10)])
            .unwrap();

        let rows = store
            .query_by_field(QueryField::Name, "REPORT", None, 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/home/user/Report.TXT");
    }

    #[test]
    fn test_query_empty_substring_matches_all() {
        let (mut store, _temp_dir) = create_test_store();
        store
            .upsert_batch(&[
                test_entry("/a/one.txt", 1),
                test_entry("/b/two.log", 2),
                test_entry("/c/three.md", 3),
            ])
            .unwrap();

        let rows = store.query_by_field(QueryField::Name, "", None, 10).unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_query_parent_filter() {
        let (mut store, _temp_dir) = create_test_store();
        store
            .upsert_batch(&[
                test_entry("/root/a/file1.txt", 10),
                test_entry("/root/b/file1.log", 20),
            ])
            .unwrap();

        let rows = store
            .query_by_field(QueryField::Name, "file1", Some("b"), 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/root/b/file1.log");
    }

    #[test]
    fn test_query_respects_limit() {
        let (mut store, _temp_dir) = create_test_store();
        let batch: Vec<Entry> = (0..100)
            .map(|i| test_entry(&format!("/data/file{}.txt", i), i))
            .collect();
        store.upsert_batch(&batch).unwrap();

        let rows = store
            .query_by_field(QueryField::Name, "file", None, 25)
            .unwrap();
        assert_eq!(rows.len(), 25);
    }

    #[test]
    fn test_query_by_path_field() {
        let (mut store, _temp_dir) = create_test_store();
        store
            .upsert_batch(&[
                test_entry("/projects/alpha/readme.md", 1),
                test_entry("/scratch/beta/readme.md", 1),
            ])
            .unwrap();

        let rows = store
            .query_by_field(QueryField::Path, "alpha", None, 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "/projects/alpha/readme.md");
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let (mut store, _temp_dir) = create_test_store();
        assert_eq!(store.upsert_batch(&[]).unwrap(), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_reader_sees_committed_batches() {
        let (mut writer, temp_dir) = create_test_store();
        let db_path = temp_dir.path().join("test.db");
        let reader = SqliteIndexStore::open(db_path.to_str().unwrap()).unwrap();

        writer
            .upsert_batch(&[test_entry("/root/a/file1.txt", 10)])
            .unwrap();
        assert_eq!(reader.count().unwrap(), 1);

        writer
            .upsert_batch(&[test_entry("/root/b/file1.log", 20)])
            .unwrap();
        assert_eq!(reader.count().unwrap(), 2);
    }
}
