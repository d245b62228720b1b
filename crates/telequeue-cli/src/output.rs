//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use telequeue_core::{Category, Record};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Snapshot of a queue database for `status`
#[derive(Debug, Serialize)]
pub struct QueueStatus {
    pub database: PathBuf,
    pub size_bytes: u64,
    pub token: String,
    pub counts: BTreeMap<String, usize>,
}

impl QueueStatus {
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print queued records, oldest first
    pub fn print_records(&self, category: Category, records: &[Record]) {
        match self.format {
            OutputFormat::Human => {
                if records.is_empty() {
                    println!("No {} records queued.", category);
                    return;
                }
                for (i, record) in records.iter().enumerate() {
                    println!("{:>4} | {}", i + 1, truncate(&compact(record), 100));
                }
                println!("\n{} {} record(s)", records.len(), category);
            }
            OutputFormat::Json => {
                println!("{}", pretty(&records));
            }
            OutputFormat::Quiet => {
                for record in records {
                    println!("{}", compact(record));
                }
            }
        }
    }

    /// Print database location and per-category counts
    pub fn print_status(&self, status: &QueueStatus) {
        match self.format {
            OutputFormat::Human => {
                println!("Queue Status");
                println!("============");
                println!();
                println!("Database: {}", status.database.display());
                println!("Size:     {}", format_size(status.size_bytes));
                println!("Token:    {}", status.token);
                println!();
                println!("Queued:");
                for (category, count) in &status.counts {
                    println!("  {:<14}{}", category, count);
                }
                println!("  {:<14}{}", "total", status.total());
            }
            OutputFormat::Json => {
                println!("{}", pretty(status));
            }
            OutputFormat::Quiet => {
                println!("{}", status.total());
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn compact(record: &Record) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| "<unprintable>".to_string())
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte size
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
