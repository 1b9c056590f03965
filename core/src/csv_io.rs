use std::io::{Read, Write};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::models::{Entry, EntryError, SkippedRow, parse_iso_date};

pub const CSV_HEADER: [&str; 3] = ["date", "weight_kg", "calories_kcal"];

const WEIGHT_COLUMNS: &[&str] = &["weight_kg", "weight"];
const CALORIE_COLUMNS: &[&str] = &["calories_kcal", "calories"];

static DATE_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date pattern"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(?:\d+\.?\d*|\.\d+)").expect("valid number pattern"));

/// Rows pulled out of a tabular import, with every rejected row accounted for.
#[derive(Debug, Clone, Default)]
pub struct ParsedCsv {
    pub rows_read: usize,
    pub entries: Vec<Entry>,
    pub skipped: Vec<SkippedRow>,
}

/// Parse a `date,weight_kg,calories_kcal` CSV from any reader.
///
/// Header names are matched case-insensitively; `weight` and `calories` are
/// accepted as aliases. A missing required column fails the whole batch, a
/// malformed row only skips that row.
pub fn parse_entries_csv<R: Read>(reader: R) -> Result<ParsedCsv> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(str::to_lowercase)
        .collect();

    let col = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
    let (Some(idx_date), Some(idx_weight), Some(idx_cal)) =
        (col(&["date"]), col(WEIGHT_COLUMNS), col(CALORIE_COLUMNS))
    else {
        bail!(
            "Missing required column(s). Expected headers: {}",
            CSV_HEADER.join(", ")
        );
    };

    let mut parsed = ParsedCsv::default();

    for (n, result) in rdr.records().enumerate() {
        parsed.rows_read += 1;
        let fallback_line = n + 2;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                skip(&mut parsed, fallback_line, e.to_string());
                continue;
            }
        };
        let line = record
            .position()
            .map_or(fallback_line, |p| usize::try_from(p.line()).unwrap_or(fallback_line));

        if record.len() < 3 {
            skip(
                &mut parsed,
                line,
                format!("expected at least 3 fields, found {}", record.len()),
            );
            continue;
        }

        let field = |i: usize| record.get(i).unwrap_or("");
        match parse_row(field(idx_date), field(idx_weight), field(idx_cal)) {
            Ok(entry) => parsed.entries.push(entry),
            Err(e) => skip(&mut parsed, line, e.to_string()),
        }
    }

    Ok(parsed)
}

fn skip(parsed: &mut ParsedCsv, line: usize, reason: String) {
    tracing::debug!(line, %reason, "skipping CSV row");
    parsed.skipped.push(SkippedRow { line, reason });
}

fn parse_row(date: &str, weight: &str, calories: &str) -> Result<Entry, EntryError> {
    let date_text = DATE_IN_TEXT
        .find(date)
        .ok_or_else(|| EntryError::InvalidDate(date.to_string()))?;
    let date = parse_iso_date(date_text.as_str())?;
    let weight =
        parse_loose_number(weight).ok_or_else(|| EntryError::InvalidWeight(weight.to_string()))?;
    let calories = parse_loose_number(calories)
        .ok_or_else(|| EntryError::InvalidCalories(calories.to_string()))?;
    Entry::new(date, weight, calories)
}

/// Parse a number out of free text such as `"80.5 kg"` or `"2,100"`: drop
/// everything except digits, `.` and `-`, then read the longest leading
/// decimal literal.
#[must_use]
pub fn parse_loose_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    LEADING_NUMBER
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Write entries as CSV in chronological order. Numbers use the shortest
/// decimal form that reads back to the same value.
pub fn write_entries_csv<W: Write>(entries: &[Entry], writer: W) -> Result<()> {
    let mut sorted: Vec<&Entry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date());

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for e in sorted {
        wtr.write_record([
            e.date().format("%Y-%m-%d").to_string(),
            e.weight().to_string(),
            e.calories().to_string(),
        ])?;
    }
    wtr.flush().context("Failed to write CSV")?;
    Ok(())
}
