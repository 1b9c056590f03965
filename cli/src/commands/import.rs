use std::path::Path;
use std::process;

use anyhow::{Context, Result};

use tdee_core::db::Database;
use tdee_core::models::ImportSummary;
use tdee_core::service::Tracker;

pub(crate) fn cmd_import_csv(tracker: &mut Tracker<Database>, path: &Path, json: bool) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let summary = tracker.import_csv(file)?;
    report(&summary, json)
}

pub(crate) fn cmd_import_json(
    tracker: &mut Tracker<Database>,
    path: &Path,
    json: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    let summary = tracker.import_json(&text)?;
    report(&summary, json)
}

fn report(summary: &ImportSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        println!("  Rows read:  {}", summary.rows_read);
        println!("  Inserted:   {}", summary.inserted);
        println!("  Replaced:   {}", summary.replaced);
        println!("  Skipped:    {}", summary.skipped.len());
        for row in &summary.skipped {
            println!("    line {}: {}", row.line, row.reason);
        }
        if summary.settings_updated {
            println!("  Settings updated");
        }
        if let Some(reason) = &summary.settings_rejected {
            println!("  Settings not applied: {reason}");
        }
    }

    if summary.is_empty() {
        if !json {
            eprintln!("\nNothing imported: no valid rows found.");
        }
        process::exit(2);
    }

    Ok(())
}
