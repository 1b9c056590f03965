use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_GOAL_RATE: f64 = -0.5;
pub const DEFAULT_WINDOW_SIZE: u32 = 7;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

/// Why a candidate entry was rejected at the construction boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntryError {
    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),
    #[error("weight must be a finite number of kilograms (got '{0}')")]
    InvalidWeight(String),
    #[error("calories must be a finite number of kcal (got '{0}')")]
    InvalidCalories(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("goal rate must be a finite number of kg/week (got '{0}')")]
    InvalidGoalRate(String),
    #[error("window size must be a positive whole number of days (got '{0}')")]
    InvalidWindowSize(String),
}

/// Parse a strict, zero-padded `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, EntryError> {
    if !ISO_DATE.is_match(s) {
        return Err(EntryError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| EntryError::InvalidDate(s.to_string()))
}

// --- Entry ---

/// One daily observation. At most one per date in a collection.
///
/// Fields are private: `Entry::new`, `Entry::parse` and deserialization are the
/// only ways to build one, and all of them reject non-finite numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry")]
pub struct Entry {
    date: NaiveDate,
    weight: f64,
    calories: f64,
}

#[derive(Deserialize)]
struct RawEntry {
    date: String,
    weight: f64,
    calories: f64,
}

impl TryFrom<RawEntry> for Entry {
    type Error = EntryError;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        Entry::parse(&raw.date, raw.weight, raw.calories)
    }
}

impl Entry {
    pub fn new(date: NaiveDate, weight: f64, calories: f64) -> Result<Self, EntryError> {
        if !weight.is_finite() {
            return Err(EntryError::InvalidWeight(weight.to_string()));
        }
        if !calories.is_finite() {
            return Err(EntryError::InvalidCalories(calories.to_string()));
        }
        Ok(Self {
            date,
            weight,
            calories,
        })
    }

    pub fn parse(date: &str, weight: f64, calories: f64) -> Result<Self, EntryError> {
        let date = parse_iso_date(date.trim())?;
        Self::new(date, weight, calories)
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Body weight in kilograms.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Intake in kilocalories.
    #[must_use]
    pub fn calories(&self) -> f64 {
        self.calories
    }
}

// --- Settings ---

/// The single active configuration: goal rate (kg/week, negative = loss) and
/// trailing window length in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SettingsPatch")]
pub struct Settings {
    goal_rate: f64,
    window_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            goal_rate: DEFAULT_GOAL_RATE,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl Settings {
    pub fn new(goal_rate: f64, window_size: i64) -> Result<Self, SettingsError> {
        if !goal_rate.is_finite() {
            return Err(SettingsError::InvalidGoalRate(goal_rate.to_string()));
        }
        let window_size = u32::try_from(window_size)
            .ok()
            .filter(|w| *w >= 1)
            .ok_or_else(|| SettingsError::InvalidWindowSize(window_size.to_string()))?;
        Ok(Self {
            goal_rate,
            window_size,
        })
    }

    #[must_use]
    pub fn goal_rate(&self) -> f64 {
        self.goal_rate
    }

    #[must_use]
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Apply the fields present in `patch` on top of `self`. The patch is
    /// validated as a whole: one bad field rejects it entirely.
    pub fn merged(&self, patch: &SettingsPatch) -> Result<Self, SettingsError> {
        let goal_rate = match &patch.goal_rate {
            Some(v) => goal_rate_from_json(v)?,
            None => self.goal_rate,
        };
        let window_size = match &patch.window_size {
            Some(v) => window_size_from_json(v)?,
            None => i64::from(self.window_size),
        };
        Self::new(goal_rate, window_size)
    }
}

/// Partial settings as found in JSON imports and persisted state. Accepts the
/// legacy `goalKgPerWeek` / `windowDays` names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, alias = "goalKgPerWeek")]
    pub goal_rate: Option<Value>,
    #[serde(default, alias = "windowDays")]
    pub window_size: Option<Value>,
}

impl SettingsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goal_rate.is_none() && self.window_size.is_none()
    }
}

impl TryFrom<SettingsPatch> for Settings {
    type Error = SettingsError;

    fn try_from(patch: SettingsPatch) -> Result<Self, Self::Error> {
        Settings::default().merged(&patch)
    }
}

fn goal_rate_from_json(v: &Value) -> Result<f64, SettingsError> {
    v.as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| SettingsError::InvalidGoalRate(v.to_string()))
}

fn window_size_from_json(v: &Value) -> Result<i64, SettingsError> {
    if let Some(n) = v.as_i64() {
        return Ok(n);
    }
    match v.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= 1.0 && f <= f64::from(u32::MAX) => Ok(f as i64),
        _ => Err(SettingsError::InvalidWindowSize(v.to_string())),
    }
}

// --- Engine output ---

/// One row of derived output, one per entry, in chronological order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub tdee: f64,
    pub target: f64,
    pub avg_intake: f64,
    pub window_count: usize,
}

/// Latest status. `None` in a kcal field means the value is unavailable
/// (degenerate input produced a non-finite number).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub as_of: NaiveDate,
    pub tdee: Option<i64>,
    pub recommended_intake: Option<i64>,
    pub delta: Option<i64>,
    pub last_logged_intake: f64,
    pub window_size: u32,
}

// --- Store mutations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Upsert {
    Inserted,
    Replaced,
}

// --- Export / Import types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub entries: Vec<Entry>,
    pub settings: Settings,
    #[serde(alias = "exportedAt")]
    pub export_timestamp: String,
}

/// Loosely-typed JSON import document; every record is validated individually.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportPayload {
    #[serde(default)]
    pub entries: Option<Value>,
    #[serde(default)]
    pub settings: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    /// 1-based line for CSV input, 1-based record index for JSON input.
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: Vec<SkippedRow>,
    pub settings_updated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_rejected: Option<String>,
}

impl ImportSummary {
    #[must_use]
    pub fn accepted(&self) -> usize {
        self.inserted + self.replaced
    }

    /// True when the import changed nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accepted() == 0 && !self.settings_updated
    }
}
