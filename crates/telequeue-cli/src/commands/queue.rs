//! Queue command handlers

use anyhow::{bail, Context, Result};
use serde_json::Value;

use telequeue_core::{Category, QueueManager, Record};

use crate::output::Output;

/// Queue records given as JSON objects
pub fn push(
    queue: &mut QueueManager,
    category: Category,
    raw_records: &[String],
    output: &Output,
) -> Result<()> {
    let records = raw_records
        .iter()
        .map(|raw| parse_record(raw))
        .collect::<Result<Vec<_>>>()?;

    let before = queue.count(category);
    queue.save_entities(&records, category);
    let stored = queue.count(category).saturating_sub(before);

    if stored < records.len() {
        bail!(
            "Only {} of {} record(s) were queued in {}; see the log for details",
            stored,
            records.len(),
            category
        );
    }

    output.success(&format!("Queued {} {} record(s)", stored, category));
    Ok(())
}

/// Show the oldest records without removing them
pub fn peek(
    queue: &mut QueueManager,
    category: Category,
    batch: Option<usize>,
    output: &Output,
) -> Result<()> {
    check_batch(batch)?;
    let records = match batch {
        Some(size) => queue.load_entities_in_batch(size, category),
        None => queue.load_entities(category),
    };
    output.print_records(category, &records);
    Ok(())
}

/// Print the oldest records, then remove them
pub fn pop(
    queue: &mut QueueManager,
    category: Category,
    batch: Option<usize>,
    output: &Output,
) -> Result<()> {
    check_batch(batch)?;
    let size = batch.unwrap_or_else(|| queue.batch_size());
    let before = queue.count(category);

    queue.drain_batch(category, size, |records| {
        output.print_records(category, records);
        Ok::<_, anyhow::Error>(())
    })?;

    let removed = before.saturating_sub(queue.count(category));
    if removed == 0 && before > 0 {
        bail!("No {} rows were removed; see the log for details", category);
    }
    if before == 0 {
        output.print_records(category, &[]);
    }
    Ok(())
}

/// Empty one category, or all of them
pub fn reset(queue: &mut QueueManager, category: Option<Category>, output: &Output) -> Result<()> {
    match category {
        Some(category) => {
            queue.reset_category(category);
            output.success(&format!("Cleared {} queue", category));
        }
        None => {
            queue.reset_entities();
            output.success("Cleared all queues");
        }
    }
    Ok(())
}

/// Show or set the opt-out flag
pub fn opt_out(queue: &mut QueueManager, set: Option<bool>, output: &Output) -> Result<()> {
    if let Some(opted_out) = set {
        queue.save_opt_out_status(opted_out);
        output.success(&format!("Opt-out status set to {}", opted_out));
        return Ok(());
    }

    match queue.load_opt_out_status() {
        Some(opted_out) => output.message(&format!("Opt-out status: {}", opted_out)),
        None => output.message("Opt-out status: (not set)"),
    }
    Ok(())
}

fn check_batch(batch: Option<usize>) -> Result<()> {
    if batch == Some(0) {
        bail!("--batch must be at least 1");
    }
    Ok(())
}

/// Parse one command-line argument as a JSON object
fn parse_record(raw: &str) -> Result<Record> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("Invalid JSON: {}", raw))?;
    match value {
        Value::Object(record) => Ok(record),
        _ => bail!("Records must be JSON objects, got: {}", raw),
    }
}
