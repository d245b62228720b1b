//! SQLite storage engine
//!
//! Owns the single connection to the queue database and executes the four
//! statements the queue needs: create, insert, select-oldest, delete-oldest.
//!
//! ## Failure handling
//!
//! - No open connection: reopen with the last token, then carry on. If the
//!   reopen had to recreate the database, the operation still runs against
//!   the fresh tables.
//! - A failed write (create/insert/delete): log the SQLite error, then
//!   [`StorageEngine::recreate`] the whole database. Every category loses its
//!   rows; the store is usable again afterwards.
//! - A failed read: log and return the error. Reads never recreate.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, error, info, warn};

use super::error::{Operation, StorageError, StorageResult};
use super::schema;
use crate::config::Config;
use crate::models::{Category, ProjectToken};

/// Row limit that matches every row in a table
pub const UNBOUNDED: usize = usize::MAX;

/// Side files SQLite may leave next to the database
const SIDE_FILE_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// Storage engine over one SQLite database file
///
/// Holds at most one connection at a time. The connection is closed on
/// [`close`](Self::close) or when the engine is dropped.
pub struct StorageEngine {
    path: PathBuf,
    conn: Option<Connection>,
    token: Option<ProjectToken>,
}

impl StorageEngine {
    /// Create a closed engine for the database at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            conn: None,
            token: None,
        }
    }

    /// Create a closed engine for the configured database location
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.database_path())
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Token recorded by the last [`open`](Self::open)
    pub fn token(&self) -> Option<&ProjectToken> {
        self.token.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Borrow the open connection, if any, without reconnecting
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    /// Open the database and make sure every category table exists
    ///
    /// The token is recorded before anything else, so a failed open still
    /// lets later operations reconnect.
    pub fn open(&mut self, token: ProjectToken) -> StorageResult<()> {
        self.token = Some(token);
        self.connect()?;
        self.create_all_tables()
    }

    /// Close the connection. Safe to call when already closed.
    pub fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            match conn.close() {
                Ok(()) => info!("Connection to database closed"),
                Err((_, e)) => error!("Error while closing database connection: {}", e),
            }
        }
    }

    /// Create the table for `category` if it is absent
    pub fn create_table(&mut self, category: Category) -> StorageResult<()> {
        let table = self.table(category)?;
        let result = self
            .live_connection()?
            .execute(&schema::create_table_sql(&table), []);

        match result {
            Ok(_) => {
                info!("{} table ready", table);
                Ok(())
            }
            Err(source) => Err(self.recover(Operation::CreateTable, table, source)),
        }
    }

    /// Append a payload stamped with the current wall-clock time
    pub fn insert_row(&mut self, category: Category, payload: &[u8]) -> StorageResult<()> {
        self.insert_row_at(category, payload, epoch_seconds_now())
    }

    pub(crate) fn insert_row_at(
        &mut self,
        category: Category,
        payload: &[u8],
        time: f64,
    ) -> StorageResult<()> {
        let table = self.table(category)?;
        let result = self
            .live_connection()?
            .execute(&schema::insert_sql(&table), params![payload, time]);

        match result {
            Ok(_) => {
                debug!("Inserted row into table {}", table);
                Ok(())
            }
            Err(source) => Err(self.recover(Operation::Insert, table, source)),
        }
    }

    /// Delete the `limit` oldest rows, returning how many were removed
    ///
    /// Pass [`UNBOUNDED`] to empty the table.
    pub fn delete_rows(&mut self, category: Category, limit: usize) -> StorageResult<usize> {
        let table = self.table(category)?;
        let result = self
            .live_connection()?
            .execute(&schema::delete_oldest_sql(&table), params![sql_limit(limit)]);

        match result {
            Ok(deleted) => {
                debug!("Deleted {} rows from table {}", deleted, table);
                Ok(deleted)
            }
            Err(source) => Err(self.recover(Operation::Delete, table, source)),
        }
    }

    /// Payloads of the `limit` oldest rows, oldest first
    ///
    /// Rows whose payload is missing or not a blob are skipped.
    pub fn read_rows(&mut self, category: Category, limit: usize) -> StorageResult<Vec<Vec<u8>>> {
        self.read_rows_counted(category, limit)
            .map(|(payloads, _)| payloads)
    }

    /// Like [`read_rows`](Self::read_rows), plus the number of rows scanned
    ///
    /// The count includes skipped rows, so deleting that many oldest rows
    /// removes exactly the rows this read looked at.
    pub fn read_rows_counted(
        &mut self,
        category: Category,
        limit: usize,
    ) -> StorageResult<(Vec<Vec<u8>>, usize)> {
        let table = self.table(category)?;
        let conn = self.live_connection()?;

        match query_payloads(conn, &table, limit) {
            Ok((payloads, scanned)) => {
                debug!(
                    "Read {} of {} rows from table {}",
                    payloads.len(),
                    scanned,
                    table
                );
                Ok((payloads, scanned))
            }
            Err(source) => {
                error!("SELECT on table {} failed: {}", table, source);
                Err(StorageError::Statement {
                    operation: Operation::Read,
                    table,
                    source,
                })
            }
        }
    }

    /// Number of rows queued for `category`
    pub fn count_rows(&mut self, category: Category) -> StorageResult<usize> {
        let table = self.table(category)?;
        let result = self
            .live_connection()?
            .query_row(&schema::count_sql(&table), [], |row| row.get::<_, i64>(0));

        match result {
            Ok(count) => Ok(usize::try_from(count).unwrap_or(0)),
            Err(source) => {
                error!("COUNT on table {} failed: {}", table, source);
                Err(StorageError::Statement {
                    operation: Operation::Count,
                    table,
                    source,
                })
            }
        }
    }

    /// Destroy the database file and rebuild every table
    ///
    /// This is the only corruption-recovery path. All queued rows, for every
    /// token and category in the file, are lost.
    pub fn recreate(&mut self) -> StorageResult<()> {
        warn!(
            "Recreating database at {:?}; all queued rows will be discarded",
            self.path
        );
        self.close();
        remove_database_files(&self.path)?;

        if self.token.is_none() {
            return Err(StorageError::NoToken);
        }
        self.connect()?;
        self.ensure_tables()?;

        info!("Database at {:?} recreated", self.path);
        Ok(())
    }

    fn connect(&mut self) -> StorageResult<()> {
        self.close();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| {
                    error!("Failed to create directory {:?}: {}", parent, source);
                    StorageError::CreateDirectory {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        match Connection::open_with_flags(&self.path, flags) {
            Ok(conn) => {
                info!("Opened connection to database at {:?}", self.path);
                self.conn = Some(conn);
                Ok(())
            }
            Err(source) => {
                error!("Error opening database at {:?}: {}", self.path, source);
                Err(StorageError::Open {
                    path: self.path.clone(),
                    source,
                })
            }
        }
    }

    /// Open connection, reopening with the recorded token if needed
    fn live_connection(&mut self) -> StorageResult<&Connection> {
        if self.conn.is_none() {
            self.reconnect()?;
        }
        self.conn.as_ref().ok_or(StorageError::NoToken)
    }

    fn reconnect(&mut self) -> StorageResult<()> {
        if self.token.is_none() {
            warn!("No database connection and no project token; call open() first");
            return Err(StorageError::NoToken);
        }

        warn!("No database connection found, reopening {:?}", self.path);
        self.connect()?;
        match self.create_all_tables() {
            Err(e) if e.data_discarded() => {
                warn!("Database was recreated while reconnecting: {}", e);
                Ok(())
            }
            result => result,
        }
    }

    /// Create every table, recreating the database on failure
    fn create_all_tables(&mut self) -> StorageResult<()> {
        for category in Category::ALL {
            self.create_table(category)?;
        }
        Ok(())
    }

    /// Create every table on the current connection without recovery
    fn ensure_tables(&self) -> StorageResult<()> {
        let token = self.token.as_ref().ok_or(StorageError::NoToken)?;
        let conn = self.conn.as_ref().ok_or(StorageError::NoToken)?;

        for category in Category::ALL {
            let table = schema::table_name(token, category);
            conn.execute(&schema::create_table_sql(&table), [])
                .map_err(|source| {
                    error!("CREATE TABLE on {} failed after recreate: {}", table, source);
                    StorageError::Statement {
                        operation: Operation::CreateTable,
                        table,
                        source,
                    }
                })?;
        }
        Ok(())
    }

    /// Log a failed write and rebuild the database
    fn recover(
        &mut self,
        operation: Operation,
        table: String,
        source: rusqlite::Error,
    ) -> StorageError {
        error!("{} on table {} failed: {}", operation, table, source);
        let cause = StorageError::Statement {
            operation,
            table,
            source,
        };

        match self.recreate() {
            Ok(()) => StorageError::Recreated {
                cause: Box::new(cause),
            },
            Err(e) => {
                error!("Unable to recreate database after failure ({}): {}", cause, e);
                e
            }
        }
    }

    fn table(&self, category: Category) -> StorageResult<String> {
        self.token
            .as_ref()
            .map(|token| schema::table_name(token, category))
            .ok_or(StorageError::NoToken)
    }
}

impl Drop for StorageEngine {
    fn drop(&mut self) {
        self.close();
    }
}

/// Blob payloads of the oldest rows, and how many rows were scanned
fn query_payloads(
    conn: &Connection,
    table: &str,
    limit: usize,
) -> rusqlite::Result<(Vec<Vec<u8>>, usize)> {
    let mut stmt = conn.prepare(&schema::select_oldest_sql(table))?;
    let mut rows = stmt.query(params![sql_limit(limit)])?;

    let mut payloads = Vec::new();
    let mut scanned = 0;
    while let Some(row) = rows.next()? {
        scanned += 1;
        match row.get_ref(0)? {
            ValueRef::Blob(bytes) => payloads.push(bytes.to_vec()),
            other => warn!(
                "No blob found in data column for row in {} (found {})",
                table,
                other.data_type()
            ),
        }
    }
    Ok((payloads, scanned))
}

/// SQLite LIMIT takes a signed 64-bit value
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn epoch_seconds_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

fn remove_database_files(path: &Path) -> StorageResult<()> {
    let side_files = SIDE_FILE_SUFFIXES.iter().map(|suffix| {
        let mut name = OsString::from(path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    });

    for file in std::iter::once(path.to_path_buf()).chain(side_files) {
        match fs::remove_file(&file) {
            Ok(()) => info!("Deleted database file at {:?}", file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                error!("Unable to remove database file at {:?}: {}", file, source);
                return Err(StorageError::RemoveFile { path: file, source });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn token(s: &str) -> ProjectToken {
        ProjectToken::new(s).unwrap()
    }

    fn open_engine(temp_dir: &TempDir) -> StorageEngine {
        let mut engine = StorageEngine::new(temp_dir.path().join("queue.sqlite"));
        engine.open(token("tok")).unwrap();
        engine
    }

    /// Unquoted table name for the test token
    fn ident(category: Category) -> String {
        schema::table_ident(&token("tok"), category)
    }

    fn payloads(items: &[&str]) -> Vec<Vec<u8>> {
        items.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_open_creates_all_tables() {
        let temp_dir = TempDir::new().unwrap();
        let engine = open_engine(&temp_dir);
        assert!(engine.is_open());
        assert!(engine.path().exists());

        let tables: Vec<String> = engine
            .connection()
            .unwrap()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name LIKE 'telequeue%' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        let mut expected: Vec<String> = Category::ALL.iter().map(|c| ident(*c)).collect();
        expected.sort();
        assert_eq!(tables, expected);
    }

    #[test]
    fn test_reads_are_fifo() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        for item in ["a", "b", "c", "d"] {
            engine.insert_row(Category::Events, item.as_bytes()).unwrap();
        }

        for k in 0..=4 {
            let rows = engine.read_rows(Category::Events, k).unwrap();
            assert_eq!(rows, payloads(&["a", "b", "c", "d"][..k]));
        }

        // Reading never deletes
        assert_eq!(engine.count_rows(Category::Events).unwrap(), 4);
    }

    #[test]
    fn test_order_follows_time_not_id() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        engine.insert_row_at(Category::Events, b"late", 200.0).unwrap();
        engine.insert_row_at(Category::Events, b"early", 100.0).unwrap();
        engine.insert_row_at(Category::Events, b"tie-first", 150.0).unwrap();
        engine.insert_row_at(Category::Events, b"tie-second", 150.0).unwrap();

        let rows = engine.read_rows(Category::Events, UNBOUNDED).unwrap();
        assert_eq!(rows, payloads(&["early", "tie-first", "tie-second", "late"]));

        engine.delete_rows(Category::Events, 1).unwrap();
        let rows = engine.read_rows(Category::Events, 1).unwrap();
        assert_eq!(rows, payloads(&["tie-first"]));
    }

    #[test]
    fn test_delete_then_read_next() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        for item in ["1", "2", "3", "4", "5"] {
            engine.insert_row(Category::People, item.as_bytes()).unwrap();
        }

        assert_eq!(engine.read_rows(Category::People, 2).unwrap(), payloads(&["1", "2"]));
        assert_eq!(engine.delete_rows(Category::People, 2).unwrap(), 2);
        assert_eq!(engine.read_rows(Category::People, 2).unwrap(), payloads(&["3", "4"]));
        assert_eq!(engine.delete_rows(Category::People, 2).unwrap(), 2);
        assert_eq!(engine.read_rows(Category::People, 2).unwrap(), payloads(&["5"]));
        assert_eq!(engine.delete_rows(Category::People, 2).unwrap(), 1);
        assert!(engine.read_rows(Category::People, 2).unwrap().is_empty());
    }

    #[test]
    fn test_unbounded_delete_empties_table() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        for i in 0..20 {
            engine
                .insert_row(Category::Groups, format!("g{i}").as_bytes())
                .unwrap();
        }
        assert_eq!(engine.delete_rows(Category::Groups, UNBOUNDED).unwrap(), 20);
        assert!(engine.read_rows(Category::Groups, 1).unwrap().is_empty());
    }

    #[test]
    fn test_categories_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        engine.insert_row(Category::Events, b"event").unwrap();
        engine.insert_row(Category::Properties, b"prop").unwrap();
        engine.delete_rows(Category::Events, UNBOUNDED).unwrap();

        assert_eq!(engine.count_rows(Category::Events).unwrap(), 0);
        assert_eq!(
            engine.read_rows(Category::Properties, 10).unwrap(),
            payloads(&["prop"])
        );
    }

    #[test]
    fn test_tokens_share_file_but_not_tables() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.sqlite");

        let mut first = StorageEngine::new(&path);
        first.open(token("first")).unwrap();
        first.insert_row(Category::Events, b"one").unwrap();
        first.close();

        let mut second = StorageEngine::new(&path);
        second.open(token("second")).unwrap();
        assert!(second.read_rows(Category::Events, 10).unwrap().is_empty());
        second.close();

        first.open(token("first")).unwrap();
        assert_eq!(first.read_rows(Category::Events, 10).unwrap(), payloads(&["one"]));
    }

    #[test]
    fn test_rows_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut engine = open_engine(&temp_dir);
            engine.insert_row(Category::Events, b"persisted").unwrap();
        }

        let mut engine = open_engine(&temp_dir);
        assert_eq!(
            engine.read_rows(Category::Events, 1).unwrap(),
            payloads(&["persisted"])
        );
    }

    #[test]
    fn test_non_blob_rows_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        engine.insert_row(Category::Events, b"first").unwrap();
        engine
            .connection()
            .unwrap()
            .execute_batch(&format!(
                "INSERT INTO \"{0}\" (data, time) VALUES (NULL, 1e12);
                 INSERT INTO \"{0}\" (data, time) VALUES ('text', 2e12);",
                ident(Category::Events)
            ))
            .unwrap();
        engine.insert_row_at(Category::Events, b"last", 3e12).unwrap();

        let rows = engine.read_rows(Category::Events, 10).unwrap();
        assert_eq!(rows, payloads(&["first", "last"]));
    }

    #[test]
    fn test_scanned_count_includes_skipped_rows() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        engine
            .connection()
            .unwrap()
            .execute(
                &format!(
                    "INSERT INTO \"{}\" (data, time) VALUES (NULL, 1.0)",
                    ident(Category::Events)
                ),
                [],
            )
            .unwrap();
        engine.insert_row_at(Category::Events, b"a", 2.0).unwrap();
        engine.insert_row_at(Category::Events, b"b", 3.0).unwrap();

        let (rows, scanned) = engine.read_rows_counted(Category::Events, 2).unwrap();
        assert_eq!(rows, payloads(&["a"]));
        assert_eq!(scanned, 2);

        // Deleting the scanned count leaves exactly the unread row
        assert_eq!(engine.delete_rows(Category::Events, scanned).unwrap(), 2);
        assert_eq!(engine.read_rows(Category::Events, 10).unwrap(), payloads(&["b"]));
    }

    #[test]
    fn test_tokens_differing_in_case_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.sqlite");

        let mut upper = StorageEngine::new(&path);
        upper.open(token("ABC")).unwrap();
        upper.insert_row(Category::Events, b"from-ABC").unwrap();
        upper.close();

        let mut lower = StorageEngine::new(&path);
        lower.open(token("abc")).unwrap();
        assert!(lower.read_rows(Category::Events, 10).unwrap().is_empty());
        lower.insert_row(Category::Events, b"from-abc").unwrap();
        lower.delete_rows(Category::Events, UNBOUNDED).unwrap();
        lower.close();

        upper.open(token("ABC")).unwrap();
        assert_eq!(
            upper.read_rows(Category::Events, 10).unwrap(),
            payloads(&["from-ABC"])
        );
    }

    #[test]
    fn test_operations_without_token_fail() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = StorageEngine::new(temp_dir.path().join("queue.sqlite"));

        assert!(matches!(
            engine.insert_row(Category::Events, b"x"),
            Err(StorageError::NoToken)
        ));
        assert!(matches!(
            engine.read_rows(Category::Events, 1),
            Err(StorageError::NoToken)
        ));
        assert!(!engine.is_open());
    }

    #[test]
    fn test_reconnects_after_close() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        engine.insert_row(Category::Events, b"before").unwrap();
        engine.close();
        assert!(!engine.is_open());

        engine.insert_row(Category::Events, b"after").unwrap();
        assert!(engine.is_open());
        assert_eq!(
            engine.read_rows(Category::Events, 10).unwrap(),
            payloads(&["before", "after"])
        );
    }

    #[test]
    fn test_write_runs_after_reconnect_recreates() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);
        engine.insert_row(Category::Events, b"old").unwrap();
        engine.close();

        {
            // Break the file so the reconnect's CREATE TABLE fails
            let conn = Connection::open(engine.path()).unwrap();
            conn.execute_batch(&format!(
                "DROP TABLE \"{0}\";
                 CREATE TABLE other (x INTEGER);
                 CREATE INDEX \"{0}\" ON other (x);",
                ident(Category::Events)
            ))
            .unwrap();
        }

        engine.insert_row(Category::Events, b"new").unwrap();
        assert!(engine.is_open());
        assert_eq!(
            engine.read_rows(Category::Events, 10).unwrap(),
            payloads(&["new"])
        );
    }

    #[test]
    fn test_failed_open_records_token_for_reconnect() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut engine = StorageEngine::new(blocker.join("queue.sqlite"));
        let err = engine.open(token("tok")).unwrap_err();
        assert!(matches!(err, StorageError::CreateDirectory { .. }));
        assert!(!err.is_recoverable());
        assert!(!engine.is_open());
        assert_eq!(engine.token().map(|t| t.as_str()), Some("tok"));

        // Once the directory can be created the next call reconnects
        fs::remove_file(&blocker).unwrap();
        engine.insert_row(Category::Events, b"x").unwrap();
        assert_eq!(engine.count_rows(Category::Events).unwrap(), 1);
    }

    #[test]
    fn test_insert_failure_recreates_database() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = open_engine(&temp_dir);

        engine.insert_row(Category::Events, b"event").unwrap();
        engine.insert_row(Category::People, b"person").unwrap();

        engine
            .connection()
            .unwrap()
            .execute_batch(&format!("DROP TABLE \"{}\"", ident(Category::Events)))
            .unwrap();

        let err = engine.insert_row(Category::Events, b"lost").unwrap_err();
        assert!(err.data_discarded());
        assert!(err.is_recoverable());
        assert!(engine.is_open());

        // Every category was wiped, and every category accepts writes again
        for category in Category::ALL {
            assert_eq!(engine.count_rows(category).unwrap(), 0);
            engine.insert_row(category, b"fresh").unwrap();
            assert_eq!(engine.read_rows(category, 1).unwrap(), payloads(&["fresh"]));
        }
    }

    #[test]
    fn test_malformed_existing_table_recovers_on_insert() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(&format!(
                "CREATE TABLE \"{}\" (id INTEGER PRIMARY KEY, payload BLOB)",
                ident(Category::Events)
            ))
            .unwrap();
        }

        let mut engine = StorageEngine::new(&path);
        // The wrong-shaped table already exists, so creation is a no-op
        engine.open(token("tok")).unwrap();

        let err = engine.insert_row(Category::Events, b"x").unwrap_err();
        assert!(matches!(err, StorageError::Recreated { .. }));

        engine.insert_row(Category::Events, b"y").unwrap();
        assert_eq!(engine.read_rows(Category::Events, 5).unwrap(), payloads(&["y"]));
    }

    #[test]
    fn test_create_table_failure_recreates_database() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.sqlite");
        {
            // An index squatting on the table name makes CREATE TABLE fail
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(&format!(
                "CREATE TABLE other (x INTEGER);
                 CREATE INDEX \"{}\" ON other (x);",
                ident(Category::Events)
            ))
            .unwrap();
        }

        let mut engine = StorageEngine::new(&path);
        let err = engine.open(token("tok")).unwrap_err();
        assert!(err.data_discarded());

        let leftover: i64 = engine
            .connection()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'other'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(leftover, 0);

        engine.insert_row(Category::Events, b"ok").unwrap();
        assert_eq!(engine.count_rows(Category::Events).unwrap(), 1);
    }

    #[test]
    fn test_explicit_recreate_wipes_every_token() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.sqlite");

        let mut other = StorageEngine::new(&path);
        other.open(token("other")).unwrap();
        other.insert_row(Category::Events, b"theirs").unwrap();
        other.close();

        let mut engine = StorageEngine::new(&path);
        engine.open(token("tok")).unwrap();
        engine.insert_row(Category::Events, b"mine").unwrap();
        engine.recreate().unwrap();

        assert!(engine.is_open());
        assert_eq!(engine.count_rows(Category::Events).unwrap(), 0);

        let others: i64 = engine
            .connection()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
                [schema::table_ident(&token("other"), Category::Events)],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(others, 0);
    }

    #[test]
    fn test_recreate_without_token() {
        let temp_dir = TempDir::new().unwrap();
        let mut engine = StorageEngine::new(temp_dir.path().join("queue.sqlite"));
        assert!(matches!(engine.recreate(), Err(StorageError::NoToken)));
    }

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(0), 0);
        assert_eq!(sql_limit(50), 50);
        assert_eq!(sql_limit(UNBOUNDED), i64::MAX);
    }
}
