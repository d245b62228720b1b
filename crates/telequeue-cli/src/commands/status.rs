//! Status command handler

use std::collections::BTreeMap;

use anyhow::Result;

use telequeue_core::{Category, QueueManager};

use crate::output::{Output, QueueStatus};

/// Show database location and queued row counts
pub fn show(queue: &mut QueueManager, output: &Output) -> Result<()> {
    let status = collect(queue);
    output.print_status(&status);
    Ok(())
}

fn collect(queue: &mut QueueManager) -> QueueStatus {
    let counts: BTreeMap<String, usize> = Category::ALL
        .iter()
        .map(|&category| (category.to_string(), queue.count(category)))
        .collect();

    let engine = queue.engine();
    let database = engine.path().to_path_buf();
    let size_bytes = std::fs::metadata(&database).map(|m| m.len()).unwrap_or(0);
    let token = engine
        .token()
        .map(|t| t.to_string())
        .unwrap_or_default();

    QueueStatus {
        database,
        size_bytes,
        token,
        counts,
    }
}
