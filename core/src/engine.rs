//! TDEE estimation from logged weight and intake.
//!
//! For every entry, a trailing window `[date - window_size days, date]`
//! (inclusive on both ends) is averaged for intake, and the weight change
//! between the first and last entry of the window is converted to kcal/day
//! with [`KCAL_PER_KG`].

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};

use crate::models::{Entry, SeriesPoint, Settings, Summary};

/// Energy equivalent of one kilogram of body-mass change.
pub const KCAL_PER_KG: f64 = 7700.0;

/// Convert a weekly goal rate (kg/week) to kcal/day. Negative for a deficit.
#[must_use]
pub fn goal_delta_per_day(goal_rate: f64) -> f64 {
    (goal_rate / 7.0) * KCAL_PER_KG
}

/// Round to the nearest whole kcal, halves towards positive infinity.
/// Non-finite values are unavailable.
#[must_use]
pub fn round_kcal(value: f64) -> Option<i64> {
    if value.is_finite() {
        Some((value + 0.5).floor() as i64)
    } else {
        None
    }
}

/// Sort by date and keep one entry per date (the last one seen wins, same as
/// an upsert).
fn dedup_sorted(entries: &[Entry]) -> Vec<&Entry> {
    let mut by_date: BTreeMap<NaiveDate, &Entry> = BTreeMap::new();
    for e in entries {
        by_date.insert(e.date(), e);
    }
    by_date.into_values().collect()
}

/// Derive one [`SeriesPoint`] per distinct date, in chronological order.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn compute_series(entries: &[Entry], goal_rate: f64, window_size: u32) -> Vec<SeriesPoint> {
    if entries.is_empty() {
        return Vec::new();
    }

    let sorted = dedup_sorted(entries);
    let goal_delta = goal_delta_per_day(goal_rate);
    let mut series = Vec::with_capacity(sorted.len());

    // `start` only moves forward: window starts are non-decreasing as `cur` advances.
    let mut start = 0;
    for (i, cur) in sorted.iter().enumerate() {
        let window_start = cur
            .date()
            .checked_sub_days(Days::new(u64::from(window_size)))
            .unwrap_or(NaiveDate::MIN);
        while sorted[start].date() < window_start {
            start += 1;
        }
        let window = &sorted[start..=i];

        let count = window.len();
        let total: f64 = window.iter().map(|e| e.calories()).sum();
        let avg_intake = total / count.max(1) as f64;

        let tdee = match (window.first(), window.last()) {
            (Some(first), Some(last)) if count >= 2 => {
                let days = (last.date() - first.date()).num_days().max(1) as f64;
                let d_weight_per_day = (last.weight() - first.weight()) / days;
                avg_intake + d_weight_per_day * KCAL_PER_KG
            }
            _ => avg_intake,
        };

        series.push(SeriesPoint {
            date: cur.date(),
            tdee,
            target: avg_intake - goal_delta,
            avg_intake,
            window_count: count,
        });
    }

    series
}

/// Current status from the latest series point, or `None` when there is no data.
#[must_use]
pub fn compute_summary(entries: &[Entry], settings: &Settings) -> Option<Summary> {
    if entries.is_empty() {
        return None;
    }
    let series = compute_series(entries, settings.goal_rate(), settings.window_size());
    let last_point = series.last()?;
    let last_entry = dedup_sorted(entries).pop()?;

    let recommended = last_point.tdee + goal_delta_per_day(settings.goal_rate());
    let delta = recommended - last_entry.calories();

    Some(Summary {
        as_of: last_point.date,
        tdee: round_kcal(last_point.tdee),
        recommended_intake: round_kcal(recommended),
        delta: round_kcal(delta),
        last_logged_intake: last_entry.calories(),
        window_size: settings.window_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(date: &str, weight: f64, calories: f64) -> Entry {
        Entry::parse(date, weight, calories).unwrap()
    }

    #[test]
    fn test_empty_series() {
        assert!(compute_series(&[], -0.5, 7).is_empty());
    }

    #[test]
    fn test_single_entry() {
        let series = compute_series(&[entry("2024-01-01", 80.0, 2000.0)], -0.5, 7);
        assert_eq!(series.len(), 1);
        assert!((series[0].tdee - 2000.0).abs() < 1e-9);
        assert!((series[0].avg_intake - 2000.0).abs() < 1e-9);
        assert_eq!(series[0].window_count, 1);
    }

    #[test]
    fn test_two_entry_weight_loss() {
        let entries = vec![
            entry("2024-01-01", 80.0, 2000.0),
            entry("2024-01-08", 79.0, 2000.0),
        ];
        let series = compute_series(&entries, -0.5, 7);
        assert_eq!(series.len(), 2);
        let p = &series[1];
        assert_eq!(p.window_count, 2);
        assert!((p.avg_intake - 2000.0).abs() < 1e-9);
        // (79 - 80) / 7 * 7700 = -1100
        assert!((p.tdee - 900.0).abs() < 1e-6);
    }

    #[test]
    fn test_target_from_goal_rate() {
        assert!((goal_delta_per_day(-0.5) - -550.0).abs() < 1e-9);
        let series = compute_series(&[entry("2024-01-01", 80.0, 2000.0)], -0.5, 7);
        assert!((series[0].target - 2550.0).abs() < 1e-9);
    }

    #[test]
    fn test_weight_gain_adds_to_tdee() {
        let entries = vec![
            entry("2024-01-01", 80.0, 2500.0),
            entry("2024-01-08", 81.0, 2500.0),
        ];
        let series = compute_series(&entries, 0.0, 7);
        assert!((series[1].tdee - 3600.0).abs() < 1e-6);
        assert!((series[1].target - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_boundary_inclusive() {
        let entries = vec![
            entry("2024-01-01", 81.0, 1000.0),
            entry("2024-01-02", 80.0, 2000.0),
            entry("2024-01-09", 79.0, 3000.0),
        ];
        let series = compute_series(&entries, -0.5, 7);
        // 2024-01-02 is exactly 7 days back (included); 2024-01-01 is 8 (excluded).
        assert_eq!(series[2].window_count, 2);
        assert!((series[2].avg_intake - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_logging_fills_window_plus_one() {
        let entries: Vec<Entry> = (1..=10)
            .map(|d| entry(&format!("2024-03-{d:02}"), 80.0, 2000.0))
            .collect();
        let series = compute_series(&entries, -0.5, 7);
        assert_eq!(series[9].window_count, 8);
        assert_eq!(series[0].window_count, 1);
        assert_eq!(series[3].window_count, 4);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let entries = vec![
            entry("2024-01-08", 79.0, 2000.0),
            entry("2024-01-01", 80.0, 2000.0),
        ];
        let series = compute_series(&entries, -0.5, 7);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!((series[1].tdee - 900.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_dates_collapse() {
        let entries = vec![
            entry("2024-01-01", 80.0, 1500.0),
            entry("2024-01-01", 80.0, 2000.0),
            entry("2024-01-02", 80.0, 2000.0),
        ];
        let series = compute_series(&entries, -0.5, 7);
        assert_eq!(series.len(), 2);
        // Last occurrence wins.
        assert!((series[0].avg_intake - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_series_is_deterministic() {
        let entries = vec![
            entry("2024-01-03", 79.4, 2200.0),
            entry("2024-01-01", 80.0, 1900.0),
            entry("2024-01-05", 79.1, 2050.0),
        ];
        assert_eq!(
            compute_series(&entries, -0.25, 5),
            compute_series(&entries, -0.25, 5)
        );
    }

    #[test]
    fn test_window_of_one_day() {
        let entries = vec![
            entry("2024-01-01", 80.0, 2000.0),
            entry("2024-01-02", 79.9, 2000.0),
            entry("2024-01-03", 79.8, 2000.0),
        ];
        let series = compute_series(&entries, 0.0, 1);
        assert_eq!(series[2].window_count, 2);
        // -0.1 kg/day * 7700
        assert!((series[2].tdee - 1230.0).abs() < 1e-6);
    }

    #[test]
    fn test_summary_empty() {
        assert!(compute_summary(&[], &Settings::default()).is_none());
    }

    #[test]
    fn test_summary_two_entries() {
        let entries = vec![
            entry("2024-01-01", 80.0, 2000.0),
            entry("2024-01-08", 79.0, 1800.0),
        ];
        let summary = compute_summary(&entries, &Settings::default()).unwrap();
        // avg 1900, tdee = 1900 - 1100 = 800, recommended = 800 - 550 = 250
        assert_eq!(summary.as_of, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(summary.tdee, Some(800));
        assert_eq!(summary.recommended_intake, Some(250));
        assert_eq!(summary.delta, Some(250 - 1800));
        assert_eq!(summary.window_size, 7);
        assert!((summary.last_logged_intake - 1800.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_single_entry() {
        let entries = vec![entry("2024-01-01", 80.0, 2000.0)];
        let settings = Settings::new(0.5, 7).unwrap();
        let summary = compute_summary(&entries, &settings).unwrap();
        assert_eq!(summary.tdee, Some(2000));
        assert_eq!(summary.recommended_intake, Some(2550));
        assert_eq!(summary.delta, Some(550));
    }

    #[test]
    fn test_summary_overflow_is_unavailable() {
        let entries = vec![
            entry("2024-01-01", -f64::MAX, 0.0),
            entry("2024-01-02", f64::MAX, 0.0),
        ];
        let summary = compute_summary(&entries, &Settings::default()).unwrap();
        assert_eq!(summary.tdee, None);
        assert_eq!(summary.recommended_intake, None);
        assert_eq!(summary.delta, None);
    }

    #[test]
    fn test_round_kcal() {
        assert_eq!(round_kcal(899.5), Some(900));
        assert_eq!(round_kcal(-2.5), Some(-2));
        assert_eq!(round_kcal(-2.6), Some(-3));
        assert_eq!(round_kcal(f64::NAN), None);
        assert_eq!(round_kcal(f64::NEG_INFINITY), None);
    }
}
