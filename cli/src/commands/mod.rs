mod entry;
mod export;
mod helpers;
mod import;
mod settings;
mod summary;

pub(crate) use entry::{cmd_clear, cmd_delete, cmd_log};
pub(crate) use export::{ExportFormat, cmd_export};
pub(crate) use import::{cmd_import_csv, cmd_import_json};
pub(crate) use settings::{cmd_settings_reset, cmd_settings_set, cmd_settings_show};
pub(crate) use summary::{cmd_history, cmd_series, cmd_status};
