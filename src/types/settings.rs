use serde::{Deserialize, Serialize};

use super::errors::SettingsError;
use super::search::SearchOptions;

/// Default ceiling for legacy HTML imports: 3 MiB.
pub const DEFAULT_MAX_HTML_BYTES: u64 = 3 * 1024 * 1024;

/// Number of random picks remembered by default.
pub const DEFAULT_PICK_HISTORY: usize = 100;

/// Top-level application settings container.
///
/// Every section, and every field inside one, falls back to its default when
/// absent, so a settings file only needs the values it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppSettings {
    pub library: LibrarySettings,
    pub interchange: InterchangeSettings,
    pub search: SearchOptions,
    pub backup: BackupSettings,
    pub random_pick: RandomPickSettings,
    pub logging: LoggingSettings,
}

impl AppSettings {
    /// Checks the values serde cannot: sizes, counts and folder names.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |key: &str, reason: &str| {
            Err(SettingsError::InvalidValue(format!("{} {}", key, reason)))
        };

        if self.interchange.max_html_bytes == 0 {
            return invalid("interchange.max_html_bytes", "must be greater than 0");
        }
        if self.interchange.html_import_folder.trim().is_empty() {
            return invalid("interchange.html_import_folder", "cannot be empty");
        }
        if self.interchange.json_import_folder.trim().is_empty() {
            return invalid("interchange.json_import_folder", "cannot be empty");
        }
        if self.search.max_results == Some(0) {
            return invalid("search.max_results", "must be greater than 0 or null");
        }
        if self.backup.keep == 0 {
            return invalid("backup.keep", "must be at least 1");
        }
        if self.backup.min_interval_secs < 0 {
            return invalid("backup.min_interval_secs", "cannot be negative");
        }
        if self.random_pick.max_history == 0 {
            return invalid("random_pick.max_history", "must be at least 1");
        }
        if self.logging.filter.trim().is_empty() {
            return invalid("logging.filter", "cannot be empty");
        }
        Ok(())
    }
}

/// Where the bookmark library lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LibrarySettings {
    /// Explicit data file; `None` uses `<data dir>/bookmarks.json`.
    pub data_file: Option<String>,
}

/// Import/export behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InterchangeSettings {
    pub max_html_bytes: u64,
    /// Base name of the top-level folder wrapping each HTML import.
    pub html_import_folder: String,
    /// Base name of the top-level folder wrapping each JSON import.
    pub json_import_folder: String,
}

impl Default for InterchangeSettings {
    fn default() -> Self {
        Self {
            max_html_bytes: DEFAULT_MAX_HTML_BYTES,
            html_import_folder: "Imported (HTML)".to_string(),
            json_import_folder: "Imported (JSON)".to_string(),
        }
    }
}

/// Backup retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackupSettings {
    /// Explicit backup directory; `None` uses `<data dir>/backups`.
    pub directory: Option<String>,
    /// Number of backup sets kept by pruning.
    pub keep: usize,
    /// A new backup is skipped if the newest one is younger than this.
    pub min_interval_secs: i64,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: None,
            keep: 10,
            min_interval_secs: 24 * 60 * 60,
        }
    }
}

/// The random bookmark picker's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RandomPickSettings {
    /// Explicit history file; `None` uses `<data dir>/pick_history.json`.
    pub history_file: Option<String>,
    pub max_history: usize,
}

impl Default for RandomPickSettings {
    fn default() -> Self {
        Self {
            history_file: None,
            max_history: DEFAULT_PICK_HISTORY,
        }
    }
}

/// Log output configuration for the RPC binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
