use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::ValueEnum;
use serde_json::json;

use tdee_core::db::Database;
use tdee_core::service::Tracker;

#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum ExportFormat {
    Csv,
    Json,
}

fn write_export<W: Write>(tracker: &Tracker<Database>, format: ExportFormat, mut out: W) -> Result<()> {
    match format {
        ExportFormat::Csv => tracker.export_csv(out),
        ExportFormat::Json => {
            let data = tracker.export_json(Utc::now());
            serde_json::to_writer_pretty(&mut out, &data)?;
            writeln!(out)?;
            out.flush()?;
            Ok(())
        }
    }
}

/// Without `output` the export itself goes to stdout and `json` has no effect.
pub(crate) fn cmd_export(
    tracker: &Tracker<Database>,
    format: ExportFormat,
    output: Option<&Path>,
    json: bool,
) -> Result<()> {
    let Some(path) = output else {
        return write_export(tracker, format, io::stdout().lock());
    };

    let file =
        File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    write_export(tracker, format, io::BufWriter::new(file))?;

    let count = tracker.len();
    if json {
        println!(
            "{}",
            json!({ "written": path.display().to_string(), "entries": count })
        );
    } else {
        println!("Exported {count} entries to {}", path.display());
    }

    Ok(())
}
