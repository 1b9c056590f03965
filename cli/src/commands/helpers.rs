use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use tdee_core::models::parse_iso_date;

const UNAVAILABLE: &str = "—";

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => parse_iso_date(&s).with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Whole kcal, or a dash when the value could not be computed.
pub(crate) fn format_kcal(v: Option<i64>) -> String {
    v.map_or_else(|| UNAVAILABLE.to_string(), |v| v.to_string())
}

/// Like [`format_kcal`] but always carries a sign.
pub(crate) fn format_signed_kcal(v: Option<i64>) -> String {
    v.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:+}"))
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}
