use anyhow::{Result, bail};
use serde_json::json;
use std::process;

use tdee_core::db::Database;
use tdee_core::models::{Entry, Upsert};
use tdee_core::service::Tracker;

use super::helpers::{json_error, parse_date};

pub(crate) fn cmd_log(
    tracker: &mut Tracker<Database>,
    weight: f64,
    calories: f64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let entry = Entry::new(date, weight, calories)?;
    let outcome = tracker.upsert_entry(entry.clone())?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "entry": entry, "result": outcome }))?
        );
    } else {
        let verb = match outcome {
            Upsert::Inserted => "Logged",
            Upsert::Replaced => "Updated",
        };
        println!(
            "{verb} {:.1} kg, {:.0} kcal for {}",
            entry.weight(),
            entry.calories(),
            entry.date().format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub(crate) fn cmd_delete(tracker: &mut Tracker<Database>, date: String, json: bool) -> Result<()> {
    let date = parse_date(Some(date))?;
    let date_str = date.format("%Y-%m-%d");

    if !tracker.delete_entry(date)? {
        if json {
            println!("{}", json_error(&format!("No entry for {date_str}")));
        } else {
            eprintln!("No entry for {date_str}");
        }
        process::exit(2);
    }

    if json {
        println!("{}", json!({ "deleted": date }));
    } else {
        println!("Deleted entry for {date_str}");
    }

    Ok(())
}

pub(crate) fn cmd_clear(tracker: &mut Tracker<Database>, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("This erases every entry and resets settings. Re-run with --yes to confirm");
    }

    let removed = tracker.len();
    tracker.reset()?;

    if json {
        println!("{}", json!({ "cleared": removed }));
    } else {
        println!("Cleared {removed} entries and restored default settings");
    }

    Ok(())
}
