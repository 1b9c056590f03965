mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ExportFormat, cmd_clear, cmd_delete, cmd_export, cmd_history, cmd_import_csv,
    cmd_import_json, cmd_log, cmd_series, cmd_settings_reset, cmd_settings_set,
    cmd_settings_show, cmd_status,
};
use crate::config::Config;
use tdee_core::service::Tracker;

#[derive(Parser)]
#[command(
    name = "tdee",
    version,
    about = "Estimate your TDEE from daily weight and calorie logs"
)]
struct Cli {
    /// Directory holding tdee.db (default: platform data directory)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log weight and calories for a day, replacing any entry already there
    Log {
        /// Body weight in kg
        #[arg(allow_negative_numbers = true)]
        weight: f64,
        /// Calories eaten (kcal)
        #[arg(allow_negative_numbers = true)]
        calories: f64,
        /// Date to log for (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete the entry for a date
    Delete {
        /// Date of the entry (YYYY-MM-DD, today, yesterday)
        date: String,
        #[arg(long)]
        json: bool,
    },
    /// List logged entries, newest first
    History {
        /// Only show the last N days
        #[arg(short, long)]
        days: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Show current TDEE, recommended intake and delta
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Show the derived TDEE series, one row per entry
    Series {
        #[arg(long)]
        json: bool,
    },
    /// View or change goal rate and window size
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Import entries from a file
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Export all entries (and settings, for JSON)
    Export {
        #[arg(value_enum)]
        format: ExportFormat,
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Erase all entries and restore default settings
    Clear {
        /// Confirm erasing everything
        #[arg(long)]
        yes: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show the active settings
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Change one or both settings
    Set {
        /// Goal rate in kg/week (negative to lose weight)
        #[arg(long, allow_negative_numbers = true)]
        goal: Option<f64>,
        /// Trailing window in days
        #[arg(long)]
        window: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Restore the default settings
    Reset {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import a CSV with date, weight_kg and calories_kcal columns
    Csv {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Import a JSON export (entries and optional settings)
    Json {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.data_dir)?;
    tracing::debug!(path = %config.db_path.display(), "opening store");
    let mut tracker = Tracker::open_path(&config.db_path)?;

    match cli.command {
        Commands::Log {
            weight,
            calories,
            date,
            json,
        } => cmd_log(&mut tracker, weight, calories, date, json),
        Commands::Delete { date, json } => cmd_delete(&mut tracker, date, json),
        Commands::History { days, json } => cmd_history(&tracker, days, json),
        Commands::Status { json } => cmd_status(&tracker, json),
        Commands::Series { json } => cmd_series(&tracker, json),
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&tracker, json),
            SettingsCommands::Set { goal, window, json } => {
                cmd_settings_set(&mut tracker, goal, window, json)
            }
            SettingsCommands::Reset { json } => cmd_settings_reset(&mut tracker, json),
        },
        Commands::Import { command } => match command {
            ImportCommands::Csv { file, json } => cmd_import_csv(&mut tracker, &file, json),
            ImportCommands::Json { file, json } => cmd_import_json(&mut tracker, &file, json),
        },
        Commands::Export {
            format,
            output,
            json,
        } => cmd_export(&tracker, format, output.as_deref(), json),
        Commands::Clear { yes, json } => cmd_clear(&mut tracker, yes, json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_goal() {
        let cli = Cli::try_parse_from(["tdee", "settings", "set", "--goal", "-0.5"]).unwrap();
        match cli.command {
            Commands::Settings {
                command: SettingsCommands::Set { goal, window, .. },
            } => {
                assert_eq!(goal, Some(-0.5));
                assert_eq!(window, None);
            }
            _ => panic!("expected settings set"),
        }
    }

    #[test]
    fn test_parse_global_data_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["tdee", "log", "80.5", "2100", "--data-dir", "/tmp/x"])
            .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::Log { weight, .. } if (weight - 80.5).abs() < f64::EPSILON));
    }
}
