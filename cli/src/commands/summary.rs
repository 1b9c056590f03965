use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tdee_core::db::Database;
use tdee_core::engine::{goal_delta_per_day, round_kcal};
use tdee_core::models::{Entry, SeriesPoint};
use tdee_core::service::Tracker;

use super::helpers::{format_kcal, format_signed_kcal, json_error, no_neg_zero};

const NO_ENTRIES: &str = "No entries yet. Use `tdee log <weight> <calories>` to add one.";

pub(crate) fn cmd_status(tracker: &Tracker<Database>, json: bool) -> Result<()> {
    let Some(summary) = tracker.summary() else {
        if json {
            println!("{}", json_error("No entries logged"));
        } else {
            eprintln!("{NO_ENTRIES}");
        }
        process::exit(2);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let settings = tracker.settings();
    let as_of = summary.as_of.format("%Y-%m-%d");
    let window = summary.window_size;
    println!("=== {as_of} ({window}-day window) ===\n");
    println!("  TDEE:         {} kcal/day", format_kcal(summary.tdee));
    println!(
        "  RECOMMENDED:  {} kcal/day",
        format_kcal(summary.recommended_intake)
    );
    println!(
        "  LAST LOGGED:  {:.0} kcal",
        no_neg_zero(summary.last_logged_intake)
    );
    println!("  DELTA:        {} kcal", format_signed_kcal(summary.delta));
    println!(
        "  GOAL:         {:+.2} kg/week ({:+.0} kcal/day)",
        settings.goal_rate(),
        goal_delta_per_day(settings.goal_rate())
    );

    Ok(())
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Avg intake")]
    avg_intake: String,
    #[tabled(rename = "TDEE")]
    tdee: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Entries")]
    window_count: usize,
}

impl From<&SeriesPoint> for SeriesRow {
    fn from(p: &SeriesPoint) -> Self {
        SeriesRow {
            date: p.date.format("%Y-%m-%d").to_string(),
            avg_intake: format_kcal(round_kcal(p.avg_intake)),
            tdee: format_kcal(round_kcal(p.tdee)),
            target: format_kcal(round_kcal(p.target)),
            window_count: p.window_count,
        }
    }
}

pub(crate) fn cmd_series(tracker: &Tracker<Database>, json: bool) -> Result<()> {
    let series = tracker.series();

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
        return Ok(());
    }

    if series.is_empty() {
        eprintln!("{NO_ENTRIES}");
        process::exit(2);
    }

    let rows: Vec<SeriesRow> = series.iter().map(SeriesRow::from).collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}

/// Entries newest first, optionally limited to the `days` calendar days
/// ending at `today`.
fn recent_entries(entries: Vec<Entry>, today: NaiveDate, days: Option<u32>) -> Vec<Entry> {
    let cutoff = days.map(|d| {
        today
            .checked_sub_days(Days::new(u64::from(d)))
            .unwrap_or(NaiveDate::MIN)
    });
    let mut recent: Vec<Entry> = entries
        .into_iter()
        .filter(|e| cutoff.is_none_or(|c| e.date() > c))
        .collect();
    recent.reverse();
    recent
}

pub(crate) fn cmd_history(tracker: &Tracker<Database>, days: Option<u32>, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Weight (kg)")]
        weight: String,
        #[tabled(rename = "Calories")]
        calories: String,
    }

    let entries = recent_entries(tracker.entries(), Local::now().date_naive(), days);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        match days {
            Some(d) => eprintln!("No entries in the last {d} days"),
            None => eprintln!("{NO_ENTRIES}"),
        }
        process::exit(2);
    }

    let rows: Vec<HistoryRow> = entries
        .iter()
        .map(|e| HistoryRow {
            date: e.date().format("%Y-%m-%d").to_string(),
            weight: format!("{:.1}", no_neg_zero(e.weight())),
            calories: format!("{:.0}", no_neg_zero(e.calories())),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
