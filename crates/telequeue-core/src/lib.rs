//! telequeue core library
//!
//! A durable, on-device queue for telemetry records waiting to be uploaded.
//! Records are appended per category, survive process restarts, and are
//! drained oldest-first in batches.
//!
//! # Architecture
//!
//! - **StorageEngine**: one SQLite connection, one table per
//!   (project token, category), destructive self-healing on write failures
//! - **QueueManager**: category-typed save/load/remove/reset over the engine,
//!   encoding records with a [`RecordCodec`]
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut queue = QueueManager::open(&config, ProjectToken::new("my-token")?);
//!
//! queue.save_entity(&record, Category::Events);
//!
//! let batch = queue.load_entities_in_batch(50, Category::Events);
//! // ... upload ...
//! queue.remove_entities_in_batch(50, Category::Events);
//! ```
//!
//! # Modules
//!
//! - `queue`: Queue manager (main entry point)
//! - `storage`: SQLite engine, schema and errors
//! - `models`: Categories, project tokens and records
//! - `codec`: Record encoding
//! - `config`: Queue configuration

pub mod codec;
pub mod config;
pub mod models;
pub mod queue;
pub mod storage;

pub use codec::{CodecError, JsonCodec, RecordCodec};
pub use config::Config;
pub use models::{Category, ProjectToken, Record, UnknownCategory};
pub use queue::QueueManager;
pub use storage::{StorageEngine, StorageError, StorageResult, UNBOUNDED};
