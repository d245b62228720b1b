//! SQLite schema for queue tables
//!
//! One table per (project token, category) pair, all sharing the same
//! three-column row layout:
//!
//! - `id`: auto-incrementing primary key, strictly increasing in insert order
//! - `data`: the encoded record
//! - `time`: seconds since the Unix epoch at insert time
//!
//! Rows are consumed oldest-first by `time`, with `id` breaking ties.

use crate::models::{Category, ProjectToken};

/// Prefix shared by every queue table
pub const TABLE_PREFIX: &str = "telequeue";

/// Bare table identifier for a token/category pair
///
/// The token is hex-encoded: SQLite compares identifiers without regard to
/// ASCII case, so `ABC` and `abc` must not map to the same table. Hex digits
/// contain no `_`, which keeps the token and category parts unambiguous.
pub fn table_ident(token: &ProjectToken, category: Category) -> String {
    format!(
        "{}_{}_{}",
        TABLE_PREFIX,
        hex::encode(token.as_str()),
        category.as_str()
    )
}

/// Quoted table name for a token/category pair
///
/// This is the only place identifiers are built for statements.
pub fn table_name(token: &ProjectToken, category: Category) -> String {
    format!("\"{}\"", table_ident(token, category))
}

pub fn create_table_sql(table: &str) -> String {
    format!("CREATE TABLE IF NOT EXISTS {table} (id INTEGER PRIMARY KEY AUTOINCREMENT, data BLOB, time REAL)")
}

pub fn insert_sql(table: &str) -> String {
    format!("INSERT INTO {table} (data, time) VALUES (?1, ?2)")
}

pub fn select_oldest_sql(table: &str) -> String {
    format!("SELECT data FROM {table} ORDER BY time, id LIMIT ?1")
}

pub fn delete_oldest_sql(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id IN (SELECT id FROM {table} ORDER BY time, id LIMIT ?1)")
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}
