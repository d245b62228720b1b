//! Data models for the queue
//!
//! Defines the closed set of queue categories, the validated project token
//! used to namespace tables, and the record type callers enqueue.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// A queued telemetry item: string keys to arbitrary JSON values
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Longest accepted project token
pub const MAX_TOKEN_LEN: usize = 128;

/// Logical queue a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Analytics events
    #[serde(rename = "events")]
    Events,
    /// People profile updates
    #[serde(rename = "people")]
    People,
    /// Group profile updates
    #[serde(rename = "groups")]
    Groups,
    /// Super property deltas
    #[serde(rename = "properties")]
    Properties,
    /// Tracking opt-out flag
    #[serde(rename = "optOutStatus")]
    OptOutStatus,
}

impl Category {
    /// Every category, in declaration order
    pub const ALL: [Category; 5] = [
        Category::Events,
        Category::People,
        Category::Groups,
        Category::Properties,
        Category::OptOutStatus,
    ];

    /// Stable name used in table names
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Events => "events",
            Category::People => "people",
            Category::Groups => "groups",
            Category::Properties => "properties",
            Category::OptOutStatus => "optOutStatus",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown category '{}' (expected one of: events, people, groups, properties, opt-out-status)",
            self.0
        )
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "events" => Ok(Category::Events),
            "people" => Ok(Category::People),
            "groups" => Ok(Category::Groups),
            "properties" => Ok(Category::Properties),
            "optOutStatus" | "opt-out-status" | "opt_out_status" => Ok(Category::OptOutStatus),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Project token, checked to be safe inside an SQL identifier
///
/// Tokens are external input and end up in table names, so only ASCII
/// alphanumerics, `_` and `-` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectToken(String);

impl ProjectToken {
    /// Validate and wrap a token
    pub fn new(token: impl Into<String>) -> Result<Self, StorageError> {
        let token = token.into();

        let reason = if token.is_empty() {
            Some("token is empty")
        } else if token.len() > MAX_TOKEN_LEN {
            Some("token is longer than 128 characters")
        } else if !token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Some("only ASCII letters, digits, '_' and '-' are allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(StorageError::InvalidToken { token, reason }),
            None => Ok(Self(token)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectToken {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
