//! Storage error handling
//!
//! Provides typed errors for storage operations with descriptive messages
//! and recovery suggestions.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Statement kind that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateTable,
    Insert,
    Delete,
    Read,
    Count,
}

impl Operation {
    /// Whether a failure of this statement may leave the store wedged
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::CreateTable | Operation::Insert | Operation::Delete
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateTable => "CREATE TABLE",
            Operation::Insert => "INSERT",
            Operation::Delete => "DELETE",
            Operation::Read => "SELECT",
            Operation::Count => "COUNT",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No connection is open and no token was ever recorded to reopen with
    #[error("No database connection and no project token to reconnect with. Call open() first.")]
    NoToken,

    /// Project token cannot be used in a table name
    #[error("Invalid project token '{token}': {reason}")]
    InvalidToken { token: String, reason: &'static str },

    /// Failed to create the directory holding the database
    #[error("Failed to create storage directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to open the database file
    #[error("Failed to open database at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement could not be prepared or executed
    #[error("{operation} on table {table} failed: {source}")]
    Statement {
        operation: Operation,
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to delete the database file during recreate
    #[error("Failed to remove database file '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A write failed and the store was destroyed and rebuilt
    #[error("{cause}; the database was recreated and all queued rows were discarded")]
    Recreated {
        #[source]
        cause: Box<StorageError>,
    },
}

impl StorageError {
    /// Check if the store is still usable after this error
    ///
    /// Recreated stores are healthy (but empty); failed reads can simply be
    /// retried later.
    pub fn is_recoverable(&self) -> bool {
        match self {
            StorageError::Recreated { .. } => true,
            StorageError::Statement { operation, .. } => !operation.is_write(),
            _ => false,
        }
    }

    /// Whether queued data was lost as part of handling this error
    pub fn data_discarded(&self) -> bool {
        matches!(self, StorageError::Recreated { .. })
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StorageError::NoToken => Some("Open the store with a project token before queueing."),
            StorageError::InvalidToken { .. } => {
                Some("Use a token made of ASCII letters, digits, '_' or '-'.")
            }
            StorageError::CreateDirectory { .. } | StorageError::Open { .. } => {
                Some("Check that the cache directory exists and is writable.")
            }
            StorageError::RemoveFile { .. } => {
                Some("Remove the database file manually; it will be rebuilt on next open.")
            }
            _ => None,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn statement_error(operation: Operation) -> StorageError {
        StorageError::Statement {
            operation,
            table: "\"telequeue_616263_events\"".to_string(),
            source: rusqlite::Error::InvalidQuery,
        }
    }

    #[test]
    fn test_read_failures_are_recoverable() {
        assert!(statement_error(Operation::Read).is_recoverable());
        assert!(statement_error(Operation::Count).is_recoverable());
        assert!(!statement_error(Operation::Insert).is_recoverable());
    }

    #[test]
    fn test_recreated_is_recoverable_but_lossy() {
        let err = StorageError::Recreated {
            cause: Box::new(statement_error(Operation::Insert)),
        };
        assert!(err.is_recoverable());
        assert!(err.data_discarded());

        let msg = err.to_string();
        assert!(msg.contains("INSERT"));
        assert!(msg.contains("recreated"));
    }

    #[test]
    fn test_open_failure_is_fatal() {
        let err = StorageError::Open {
            path: PathBuf::from("/nope/queue.sqlite"),
            source: rusqlite::Error::InvalidPath(PathBuf::from("/nope/queue.sqlite")),
        };
        assert!(!err.is_recoverable());
        assert!(!err.data_discarded());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("/nope/queue.sqlite"));
    }

    #[test]
    fn test_no_token_display() {
        let msg = StorageError::NoToken.to_string();
        assert!(msg.contains("open()"));
    }
}
