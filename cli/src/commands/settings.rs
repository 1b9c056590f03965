use anyhow::{Result, bail};

use tdee_core::db::Database;
use tdee_core::engine::goal_delta_per_day;
use tdee_core::models::Settings;
use tdee_core::service::Tracker;

fn print_settings(settings: Settings, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        let rate = settings.goal_rate();
        let per_day = goal_delta_per_day(rate);
        println!("Goal rate:   {rate:+.2} kg/week ({per_day:+.0} kcal/day)");
        println!("Window size: {} days", settings.window_size());
    }
    Ok(())
}

pub(crate) fn cmd_settings_show(tracker: &Tracker<Database>, json: bool) -> Result<()> {
    print_settings(tracker.settings(), json)
}

pub(crate) fn cmd_settings_set(
    tracker: &mut Tracker<Database>,
    goal: Option<f64>,
    window: Option<i64>,
    json: bool,
) -> Result<()> {
    if goal.is_none() && window.is_none() {
        bail!("Nothing to change. Pass --goal and/or --window");
    }

    let current = tracker.settings();
    let settings = Settings::new(
        goal.unwrap_or(current.goal_rate()),
        window.unwrap_or_else(|| i64::from(current.window_size())),
    )?;
    tracker.update_settings(settings)?;

    print_settings(settings, json)
}

pub(crate) fn cmd_settings_reset(tracker: &mut Tracker<Database>, json: bool) -> Result<()> {
    tracker.update_settings(Settings::default())?;
    print_settings(tracker.settings(), json)
}
