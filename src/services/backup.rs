//! Timestamped library backups.
//!
//! Each backup is a pair of files sharing a Unix timestamp:
//! `<secs>_bookmarks.json` and `<secs>_bookmarks.html`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::codecs::{html, json_codec};
use crate::platform;
use crate::types::errors::BackupError;
use crate::types::node::{now, Folder};
use crate::types::settings::BackupSettings;

const SUFFIX: &str = "_bookmarks";

/// One backup, identified by its timestamp. Either file may be missing if it
/// was removed by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupSet {
    pub timestamp: i64,
    pub json_path: Option<PathBuf>,
    pub html_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(BackupSet),
    /// The newest backup is recent enough.
    Skipped { newest: i64 },
}

/// Trait defining the backup interface.
pub trait BackupServiceTrait {
    fn create_backup(
        &self,
        root: &Folder,
        dir: &Path,
        force: bool,
    ) -> Result<BackupOutcome, BackupError>;
    fn list_backups(&self, dir: &Path) -> Result<Vec<BackupSet>, BackupError>;
    fn prune(&self, dir: &Path, keep: usize) -> Result<usize, BackupError>;
}

pub struct BackupService {
    settings: BackupSettings,
}

impl BackupService {
    pub fn new(settings: BackupSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BackupSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: BackupSettings) {
        self.settings = settings;
    }

    /// The configured backup directory, or the platform default.
    pub fn directory(&self) -> PathBuf {
        match &self.settings.directory {
            Some(dir) => PathBuf::from(dir),
            None => platform::default_backup_dir(),
        }
    }
}

fn io_error(path: &Path, err: std::io::Error) -> BackupError {
    BackupError::IoError(format!("{}: {}", path.display(), err))
}

/// Splits `<secs>_bookmarks.<ext>` into its timestamp and extension.
fn parse_file_name(name: &str) -> Option<(i64, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let secs = stem.strip_suffix(SUFFIX)?;
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((secs.parse().ok()?, ext))
}

impl BackupServiceTrait for BackupService {
    /// Writes a JSON and an HTML copy of `root` into `dir` unless the newest
    /// backup is younger than the configured interval and `force` is false.
    fn create_backup(
        &self,
        root: &Folder,
        dir: &Path,
        force: bool,
    ) -> Result<BackupOutcome, BackupError> {
        let stamp = now();
        if !force {
            if let Some(newest) = self.list_backups(dir)?.first() {
                if stamp - newest.timestamp < self.settings.min_interval_secs {
                    debug!(newest = newest.timestamp, "recent backup exists, skipping");
                    return Ok(BackupOutcome::Skipped {
                        newest: newest.timestamp,
                    });
                }
            }
        }

        fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

        let json = json_codec::encode(root).map_err(|e| BackupError::EncodeError(e.to_string()))?;
        let json_path = dir.join(format!("{}{}.json", stamp, SUFFIX));
        fs::write(&json_path, json).map_err(|e| io_error(&json_path, e))?;

        let html_path = dir.join(format!("{}{}.html", stamp, SUFFIX));
        fs::write(&html_path, html::encode(root)).map_err(|e| io_error(&html_path, e))?;

        info!(dir = %dir.display(), timestamp = stamp, "backup written");
        Ok(BackupOutcome::Created(BackupSet {
            timestamp: stamp,
            json_path: Some(json_path),
            html_path: Some(html_path),
        }))
    }

    /// Backups found in `dir`, newest first. A missing directory has none.
    fn list_backups(&self, dir: &Path) -> Result<Vec<BackupSet>, BackupError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(dir).map_err(|e| io_error(dir, e))?;

        let mut sets: Vec<BackupSet> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_error(dir, e))?;
            let file_name = entry.file_name();
            let Some((timestamp, ext)) = file_name.to_str().and_then(parse_file_name) else {
                continue;
            };
            let index = match sets.iter().position(|s| s.timestamp == timestamp) {
                Some(i) => i,
                None => {
                    sets.push(BackupSet {
                        timestamp,
                        json_path: None,
                        html_path: None,
                    });
                    sets.len() - 1
                }
            };
            match ext {
                "json" => sets[index].json_path = Some(entry.path()),
                "html" => sets[index].html_path = Some(entry.path()),
                _ => {}
            }
        }

        sets.retain(|s| s.json_path.is_some() || s.html_path.is_some());
        sets.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(sets)
    }

    /// Deletes every backup beyond the newest `keep`. Returns how many sets
    /// were removed.
    fn prune(&self, dir: &Path, keep: usize) -> Result<usize, BackupError> {
        let sets = self.list_backups(dir)?;
        let mut removed = 0;
        for set in sets.iter().skip(keep) {
            for path in [&set.json_path, &set.html_path].into_iter().flatten() {
                fs::remove_file(path).map_err(|e| io_error(path, e))?;
            }
            removed += 1;
        }
        if removed > 0 {
            info!(removed, keep, "old backups pruned");
        }
        Ok(removed)
    }
}
