//! Storage layer
//!
//! Persists encoded records in a single SQLite file.
//!
//! ## Layout
//!
//! - **schema**: table naming and the statements run against each table
//! - **engine**: connection lifecycle, row operations, destructive recovery
//! - **error**: typed failures with a recoverable/fatal split

pub mod engine;
pub mod error;
pub mod schema;

pub use engine::{StorageEngine, UNBOUNDED};
pub use error::{Operation, StorageError, StorageResult};
pub use schema::table_name;
