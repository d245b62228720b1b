//! Category-typed queue over the storage engine
//!
//! The `QueueManager` is what the rest of an SDK talks to. It encodes records
//! on the way in, decodes them on the way out, and never surfaces storage
//! failures: everything is logged and the queue stays best-effort.
//!
//! ## Draining
//!
//! ```ignore
//! let batch = queue.load_entities_in_batch(50, Category::Events);
//! upload(&batch)?;                                     // network, elsewhere
//! queue.remove_entities_in_batch(50, Category::Events); // only after success
//! ```
//!
//! Deletion targets the *current* oldest rows, not the ids that were loaded,
//! so one caller must own the load/upload/remove cycle for a category.
//! A crash between upload and remove re-sends the batch (at-least-once).
//! [`QueueManager::drain_batch`] packages one such cycle.

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::codec::{JsonCodec, RecordCodec};
use crate::config::{Config, DEFAULT_BATCH_SIZE};
use crate::models::{Category, ProjectToken, Record};
use crate::storage::{StorageEngine, StorageError, UNBOUNDED};

/// Key of the single record kept in the opt-out category
pub const OPT_OUT_KEY: &str = "optOutStatus";

/// Durable per-category queue of records
pub struct QueueManager<C = JsonCodec> {
    engine: StorageEngine,
    codec: C,
    batch_size: usize,
}

impl QueueManager<JsonCodec> {
    /// Queue over an engine, storing records as JSON
    pub fn new(engine: StorageEngine) -> Self {
        Self::with_codec(engine, JsonCodec)
    }

    /// Open the configured database for `token`
    ///
    /// A failed open is logged, not returned; the first queue operation
    /// retries the connection.
    pub fn open(config: &Config, token: ProjectToken) -> Self {
        let mut engine = StorageEngine::from_config(config);
        if let Err(e) = engine.open(token) {
            log_storage_error("open queue database", &e);
        }
        Self::new(engine).with_batch_size(config.batch_size)
    }
}

impl<C: RecordCodec> QueueManager<C> {
    /// Queue over an engine with a custom record codec
    pub fn with_codec(engine: StorageEngine, codec: C) -> Self {
        Self {
            engine,
            codec,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size used by [`load_entities`](Self::load_entities)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn engine(&self) -> &StorageEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut StorageEngine {
        &mut self.engine
    }

    pub fn into_engine(self) -> StorageEngine {
        self.engine
    }

    // ==================== Writes ====================

    /// Append one record. Records that cannot be encoded are dropped.
    pub fn save_entity(&mut self, record: &Record, category: Category) {
        let payload = match self.codec.encode(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping {} record that could not be encoded: {}", category, e);
                return;
            }
        };

        if let Err(e) = self.engine.insert_row(category, &payload) {
            log_storage_error(&format!("save {} record", category), &e);
        }
    }

    /// Append records in order; that order becomes read order
    pub fn save_entities(&mut self, records: &[Record], category: Category) {
        for record in records {
            self.save_entity(record, category);
        }
    }

    // ==================== Reads ====================

    /// Oldest record in `category`, if any
    pub fn load_entity(&mut self, category: Category) -> Option<Record> {
        self.load_entities_in_batch(1, category).into_iter().next()
    }

    /// Oldest records using the configured batch size
    pub fn load_entities(&mut self, category: Category) -> Vec<Record> {
        self.load_entities_in_batch(self.batch_size, category)
    }

    /// Up to `batch_size` oldest records, oldest first
    ///
    /// Rows that fail to decode are left out of the result.
    pub fn load_entities_in_batch(&mut self, batch_size: usize, category: Category) -> Vec<Record> {
        self.read_batch(batch_size, category).0
    }

    /// Number of rows queued in `category` (0 if storage is unreadable)
    pub fn count(&mut self, category: Category) -> usize {
        self.engine.count_rows(category).unwrap_or_else(|e| {
            log_storage_error(&format!("count {} rows", category), &e);
            0
        })
    }

    // ==================== Removal ====================

    /// Remove the `batch_size` oldest rows in `category`
    pub fn remove_entities_in_batch(&mut self, batch_size: usize, category: Category) {
        if let Err(e) = self.engine.delete_rows(category, batch_size) {
            log_storage_error(&format!("remove {} rows", category), &e);
        }
    }

    /// Empty one category
    pub fn reset_category(&mut self, category: Category) {
        self.remove_entities_in_batch(UNBOUNDED, category);
    }

    /// Empty every category for this project
    pub fn reset_entities(&mut self) {
        for category in Category::ALL {
            self.reset_category(category);
        }
    }

    // ==================== Opt-out flag ====================

    /// Replace the stored opt-out flag
    pub fn save_opt_out_status(&mut self, opted_out: bool) {
        let mut record = Record::new();
        record.insert(OPT_OUT_KEY.to_string(), Value::Bool(opted_out));

        self.reset_category(Category::OptOutStatus);
        self.save_entity(&record, Category::OptOutStatus);
    }

    /// Stored opt-out flag, or `None` if never saved
    pub fn load_opt_out_status(&mut self) -> Option<bool> {
        self.load_entity(Category::OptOutStatus)?
            .get(OPT_OUT_KEY)
            .and_then(Value::as_bool)
    }

    // ==================== Drain ====================

    /// Run one load/upload/remove cycle for `category`
    ///
    /// Returns the number of records handed to `upload`. Rows are removed
    /// only when `upload` succeeds; the count removed is the number of rows
    /// scanned, so undecodable and non-blob rows are cleared along with the
    /// batch.
    pub fn drain_batch<F, E>(
        &mut self,
        category: Category,
        batch_size: usize,
        upload: F,
    ) -> Result<usize, E>
    where
        F: FnOnce(&[Record]) -> Result<(), E>,
    {
        let (records, scanned) = self.read_batch(batch_size, category);
        if scanned == 0 {
            return Ok(0);
        }

        upload(&records)?;

        self.remove_entities_in_batch(scanned, category);
        debug!(
            "Drained {} {} records ({} rows)",
            records.len(),
            category,
            scanned
        );
        Ok(records.len())
    }

    /// Decoded records plus the number of raw rows scanned to find them
    fn read_batch(&mut self, batch_size: usize, category: Category) -> (Vec<Record>, usize) {
        let (rows, scanned) = match self.engine.read_rows_counted(category, batch_size) {
            Ok(read) => read,
            Err(e) => {
                log_storage_error(&format!("load {} rows", category), &e);
                return (Vec::new(), 0);
            }
        };

        let records = rows
            .iter()
            .filter_map(|payload| match self.codec.decode(payload) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping undecodable {} row: {}", category, e);
                    None
                }
            })
            .collect();

        (records, scanned)
    }
}

fn log_storage_error(action: &str, err: &StorageError) {
    if err.data_discarded() {
        warn!("Failed to {}: {}", action, err);
    } else {
        error!("Failed to {}: {}", action, err);
    }
}
