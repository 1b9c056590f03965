use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

use crate::csv_io::{self, ParsedCsv};
use crate::db::Database;
use crate::engine;
use crate::models::{
    Entry, ExportData, ImportPayload, ImportSummary, SeriesPoint, Settings, SettingsPatch,
    SkippedRow, Summary, Upsert,
};

/// Durable storage for the entry collection and settings.
///
/// Both are read and written whole; a save replaces everything previously
/// stored. Implemented by [`Database`]; tests substitute their own.
pub trait Storage {
    fn load_entries(&self) -> Result<Vec<Entry>>;
    fn save_entries(&self, entries: &[Entry]) -> Result<()>;
    fn load_settings(&self) -> Result<Settings>;
    fn save_settings(&self, settings: &Settings) -> Result<()>;
    fn clear_all(&self) -> Result<()>;

    /// Erase everything and store `defaults`. Implementations that can do
    /// this atomically should override it.
    fn reset(&self, defaults: &Settings) -> Result<()> {
        self.clear_all()?;
        self.save_settings(defaults)
    }
}

/// The single source of truth for a session: entries keyed by date plus the
/// active settings. Every mutation is persisted before it becomes visible.
pub struct Tracker<S: Storage> {
    storage: S,
    entries: BTreeMap<NaiveDate, Entry>,
    settings: Settings,
}

impl Tracker<Database> {
    /// Open the database at `db_path`. A file that cannot be opened as a
    /// database is moved aside to `<name>.corrupt` and a fresh one is created.
    pub fn open_path(db_path: &Path) -> Result<Self> {
        let db = match Database::open(db_path) {
            Ok(db) => db,
            Err(e) if db_path.exists() => {
                let aside = corrupt_path(db_path);
                tracing::warn!(
                    error = %e,
                    moved_to = %aside.display(),
                    "database unreadable, starting fresh"
                );
                std::fs::rename(db_path, &aside).with_context(|| {
                    format!("Failed to move unreadable database to {}", aside.display())
                })?;
                Database::open(db_path)?
            }
            Err(e) => return Err(e),
        };
        Ok(Self::open(db))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::open(Database::open_in_memory()?))
    }
}

fn corrupt_path(db_path: &Path) -> PathBuf {
    let mut name = db_path.file_name().unwrap_or_default().to_os_string();
    name.push(".corrupt");
    db_path.with_file_name(name)
}

impl<S: Storage> Tracker<S> {
    /// Load persisted state. Unreadable state is replaced with an empty
    /// collection / default settings rather than failing.
    pub fn open(storage: S) -> Self {
        let entries = storage.load_entries().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored entries unreadable, starting empty");
            Vec::new()
        });
        let settings = storage.load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored settings unreadable, using defaults");
            Settings::default()
        });
        let entries = entries.into_iter().map(|e| (e.date(), e)).collect();
        Self {
            storage,
            entries,
            settings,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Chronological snapshot of the collection.
    pub fn entries(&self) -> Vec<Entry> {
        self.entries.values().cloned().collect()
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&Entry> {
        self.entries.get(&date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    // --- Mutations ---

    fn commit_entries(&mut self, next: BTreeMap<NaiveDate, Entry>) -> Result<()> {
        let snapshot: Vec<Entry> = next.values().cloned().collect();
        self.storage.save_entries(&snapshot)?;
        self.entries = next;
        Ok(())
    }

    /// Insert or replace the entry for its date.
    pub fn upsert_entry(&mut self, entry: Entry) -> Result<Upsert> {
        let mut next = self.entries.clone();
        let outcome = match next.insert(entry.date(), entry) {
            Some(_) => Upsert::Replaced,
            None => Upsert::Inserted,
        };
        self.commit_entries(next)?;
        Ok(outcome)
    }

    pub fn delete_entry(&mut self, date: NaiveDate) -> Result<bool> {
        if !self.entries.contains_key(&date) {
            return Ok(false);
        }
        let mut next = self.entries.clone();
        next.remove(&date);
        self.commit_entries(next)?;
        Ok(true)
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<()> {
        self.storage.save_settings(&settings)?;
        self.settings = settings;
        Ok(())
    }

    /// Erase everything and persist the default settings.
    pub fn reset(&mut self) -> Result<()> {
        let defaults = Settings::default();
        self.storage.reset(&defaults)?;
        self.entries.clear();
        self.settings = defaults;
        tracing::info!("all data cleared");
        Ok(())
    }

    // --- Import ---

    /// Upsert validated entries in one persisted write. Returns (inserted, replaced).
    fn merge_entries(&mut self, incoming: Vec<Entry>) -> Result<(usize, usize)> {
        if incoming.is_empty() {
            return Ok((0, 0));
        }
        let mut next = self.entries.clone();
        let (mut inserted, mut replaced) = (0, 0);
        for entry in incoming {
            match next.insert(entry.date(), entry) {
                Some(_) => replaced += 1,
                None => inserted += 1,
            }
        }
        self.commit_entries(next)?;
        Ok((inserted, replaced))
    }

    pub fn import_csv<R: Read>(&mut self, reader: R) -> Result<ImportSummary> {
        let ParsedCsv {
            rows_read,
            entries,
            skipped,
        } = csv_io::parse_entries_csv(reader)?;

        let (inserted, replaced) = self.merge_entries(entries)?;
        tracing::info!(rows_read, inserted, replaced, skipped = skipped.len(), "CSV import");
        Ok(ImportSummary {
            rows_read,
            inserted,
            replaced,
            skipped,
            ..ImportSummary::default()
        })
    }

    /// Import a JSON document with optional `entries` and `settings`. Each
    /// entry is validated on its own; settings are merged field by field.
    pub fn import_json(&mut self, text: &str) -> Result<ImportSummary> {
        let payload: ImportPayload = serde_json::from_str(text).context("Invalid JSON")?;
        let mut summary = ImportSummary::default();

        let records = match payload.entries {
            Some(Value::Array(records)) => records,
            Some(other) => {
                tracing::warn!(found = %other, "ignoring non-array entries");
                Vec::new()
            }
            None => Vec::new(),
        };

        let mut valid = Vec::new();
        for (i, value) in records.into_iter().enumerate() {
            summary.rows_read += 1;
            match serde_json::from_value::<Entry>(value) {
                Ok(entry) => valid.push(entry),
                Err(e) => {
                    tracing::debug!(record = i + 1, error = %e, "skipping JSON entry");
                    summary.skipped.push(SkippedRow {
                        line: i + 1,
                        reason: e.to_string(),
                    });
                }
            }
        }
        let (inserted, replaced) = self.merge_entries(valid)?;
        summary.inserted = inserted;
        summary.replaced = replaced;

        let patch = match payload.settings {
            Some(value @ Value::Object(_)) => serde_json::from_value::<SettingsPatch>(value).ok(),
            Some(other) => {
                tracing::warn!(found = %other, "ignoring non-object settings");
                None
            }
            None => None,
        };
        if let Some(patch) = patch.filter(|p| !p.is_empty()) {
            match self.settings.merged(&patch) {
                Ok(settings) => {
                    self.update_settings(settings)?;
                    summary.settings_updated = true;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting imported settings");
                    summary.settings_rejected = Some(e.to_string());
                }
            }
        }

        tracing::info!(
            rows_read = summary.rows_read,
            inserted,
            replaced,
            skipped = summary.skipped.len(),
            settings_updated = summary.settings_updated,
            "JSON import"
        );
        Ok(summary)
    }

    // --- Export ---

    pub fn export_json(&self, now: DateTime<Utc>) -> ExportData {
        ExportData {
            entries: self.entries(),
            settings: self.settings,
            export_timestamp: now.to_rfc3339(),
        }
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        csv_io::write_entries_csv(&self.entries(), writer)
    }

    // --- Engine ---

    pub fn series(&self) -> Vec<SeriesPoint> {
        engine::compute_series(
            &self.entries(),
            self.settings.goal_rate(),
            self.settings.window_size(),
        )
    }

    pub fn summary(&self) -> Option<Summary> {
        engine::compute_summary(&self.entries(), &self.settings)
    }
}
