use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, params};

use crate::models::{Entry, Settings};
use crate::service::Storage;

const GOAL_RATE_KEY: &str = "goal_rate_kg_per_week";
const WINDOW_SIZE_KEY: &str = "window_size_days";
const CLEAR_ALL_SQL: &str = "DELETE FROM entries; DELETE FROM user_settings;";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS entries (
                    date TEXT PRIMARY KEY,
                    weight_kg REAL NOT NULL,
                    calories_kcal REAL NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- User Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO user_settings (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )?;
        Ok(())
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM user_settings WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    fn write_settings(&self, settings: &Settings) -> Result<()> {
        self.set_setting(GOAL_RATE_KEY, &settings.goal_rate().to_string())?;
        self.set_setting(WINDOW_SIZE_KEY, &settings.window_size().to_string())
    }
}

impl Storage for Database {
    /// Rows that fail to decode or validate are dropped with a warning.
    fn load_entries(&self) -> Result<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, weight_kg, calories_kcal FROM entries ORDER BY date")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            match row {
                Ok((date, weight, calories)) => match Entry::parse(&date, weight, calories) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => tracing::warn!(%date, error = %e, "dropping invalid stored entry"),
                },
                Err(e) => tracing::warn!(error = %e, "dropping unreadable stored entry"),
            }
        }
        Ok(entries)
    }

    fn save_entries(&self, entries: &[Entry]) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (date, weight_kg, calories_kcal, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(date) DO UPDATE SET
                    weight_kg = excluded.weight_kg,
                    calories_kcal = excluded.calories_kcal,
                    updated_at = excluded.updated_at",
            )?;
            for e in entries {
                stmt.execute(params![
                    e.date().format("%Y-%m-%d").to_string(),
                    e.weight(),
                    e.calories(),
                    now
                ])?;
            }
        }
        tx.commit().context("Failed to save entries")?;
        Ok(())
    }

    /// Missing or corrupt values fall back to the defaults one field at a time.
    fn load_settings(&self) -> Result<Settings> {
        let mut settings = Settings::default();

        if let Some(raw) = self.get_setting(GOAL_RATE_KEY)? {
            match raw
                .parse::<f64>()
                .ok()
                .and_then(|g| Settings::new(g, i64::from(settings.window_size())).ok())
            {
                Some(s) => settings = s,
                None => tracing::warn!(value = %raw, "ignoring corrupt stored goal rate"),
            }
        }

        if let Some(raw) = self.get_setting(WINDOW_SIZE_KEY)? {
            match raw
                .parse::<i64>()
                .ok()
                .and_then(|w| Settings::new(settings.goal_rate(), w).ok())
            {
                Some(s) => settings = s,
                None => tracing::warn!(value = %raw, "ignoring corrupt stored window size"),
            }
        }

        Ok(settings)
    }

    fn save_settings(&self, settings: &Settings) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.write_settings(settings)?;
        tx.commit().context("Failed to save settings")?;
        Ok(())
    }

    fn clear_all(&self) -> Result<()> {
        self.conn.execute_batch(CLEAR_ALL_SQL)?;
        Ok(())
    }

    /// Clear and rewrite settings in one transaction; a failure rolls back both.
    fn reset(&self, defaults: &Settings) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute_batch(CLEAR_ALL_SQL)?;
        self.write_settings(defaults)?;
        tx.commit().context("Failed to reset store")?;
        Ok(())
    }
}
