//! Random bookmark picks ("blind box") and the history of past picks.
//!
//! Picks are drawn from every bookmark at or below a folder. Each recorded
//! pick goes to the front of the history, which keeps at most
//! `max_history` entries and is saved as JSON after every change.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::MutexGuard;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::managers::tree_store::{SharedTree, TreeStore};
use crate::platform;
use crate::types::errors::PickError;
use crate::types::node::now;
use crate::types::settings::RandomPickSettings;
use crate::types::url::UrlEntry;

/// One remembered pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRecord {
    pub url: String,
    pub name: String,
    pub path: Vec<String>,
    #[serde(default)]
    pub icon: String,
    /// Unix seconds. Picks drawn together share it.
    pub timestamp: i64,
}

/// Draws `count` entries without repeats. Asking for at least as many as
/// there are returns all of them, shuffled.
pub fn pick<R: Rng + ?Sized>(mut entries: Vec<UrlEntry>, count: usize, rng: &mut R) -> Vec<UrlEntry> {
    if count >= entries.len() {
        entries.shuffle(rng);
        return entries;
    }
    entries.choose_multiple(rng, count).cloned().collect()
}

/// Trait defining the random pick interface.
pub trait RandomPickServiceTrait {
    fn collect_all_urls<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec<UrlEntry>, PickError>;
    fn get_random_urls<S: AsRef<str>>(
        &self,
        path: &[S],
        count: usize,
    ) -> Result<Vec<UrlEntry>, PickError>;
    fn record(&mut self, picks: &[UrlEntry]) -> Result<(), PickError>;
    fn history(&self) -> &[PickRecord];
    fn remove_history_item(&mut self, index: usize) -> Result<PickRecord, PickError>;
    fn clear_history(&mut self) -> Result<(), PickError>;
}

pub struct RandomPickService {
    tree: SharedTree,
    settings: RandomPickSettings,
    history: Vec<PickRecord>,
}

impl RandomPickService {
    /// Creates the service with an empty history. Call `load_history` to
    /// read the saved one.
    pub fn new(tree: SharedTree, settings: RandomPickSettings) -> Self {
        Self {
            tree,
            settings,
            history: Vec::new(),
        }
    }

    /// Applies new settings. The history is reloaded when its file moved
    /// and trimmed when the limit shrank.
    pub fn update_settings(&mut self, settings: RandomPickSettings) {
        let moved = settings.history_file != self.settings.history_file;
        self.settings = settings;
        if moved {
            self.load_history();
        } else {
            self.history.truncate(self.settings.max_history);
        }
    }

    /// The configured history file, or the platform default.
    pub fn history_path(&self) -> PathBuf {
        match &self.settings.history_file {
            Some(file) => PathBuf::from(file),
            None => platform::default_pick_history_path(),
        }
    }

    /// Reads the saved history and returns how many entries it holds. A
    /// missing file is an empty history; an unreadable one is logged and
    /// treated as empty.
    pub fn load_history(&mut self) -> usize {
        let path = self.history_path();
        self.history = match read_history(&path) {
            Ok(history) => history,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "pick history unreadable, starting empty");
                Vec::new()
            }
        };
        self.history.truncate(self.settings.max_history);
        debug!(path = %path.display(), count = self.history.len(), "pick history loaded");
        self.history.len()
    }

    fn lock(&self) -> Result<MutexGuard<'_, TreeStore>, PickError> {
        self.tree
            .lock()
            .map_err(|_| PickError::IoError("the bookmark tree is unavailable".to_string()))
    }

    fn save_history(&self) -> Result<(), PickError> {
        let path = self.history_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let json = serde_json::to_string_pretty(&self.history)
            .map_err(|e| PickError::SerializationError(e.to_string()))?;
        fs::write(&path, json).map_err(|e| io_error(&path, e))
    }
}

fn io_error(path: &Path, err: std::io::Error) -> PickError {
    PickError::IoError(format!("{}: {}", path.display(), err))
}

fn read_history(path: &Path) -> Result<Vec<PickRecord>, PickError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&content).map_err(|e| PickError::SerializationError(e.to_string()))
}

impl RandomPickServiceTrait for RandomPickService {
    fn collect_all_urls<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec<UrlEntry>, PickError> {
        Ok(self.lock()?.collect_urls(path)?)
    }

    /// Picks from every bookmark at or below `path`. An empty folder gives an
    /// empty list.
    fn get_random_urls<S: AsRef<str>>(
        &self,
        path: &[S],
        count: usize,
    ) -> Result<Vec<UrlEntry>, PickError> {
        let entries = self.collect_all_urls(path)?;
        let available = entries.len();
        let picks = pick(entries, count, &mut rand::thread_rng());
        debug!(available, picked = picks.len(), "random bookmarks drawn");
        Ok(picks)
    }

    /// Puts `picks` at the front of the history, newest first, and saves it.
    /// Entries without a URL are not remembered.
    fn record(&mut self, picks: &[UrlEntry]) -> Result<(), PickError> {
        let timestamp = now();
        let records: Vec<PickRecord> = picks
            .iter()
            .rev()
            .filter(|entry| !entry.url.is_empty())
            .map(|entry| PickRecord {
                url: entry.url.clone(),
                name: entry.name.clone(),
                path: entry.path.clone(),
                icon: entry.icon.clone(),
                timestamp,
            })
            .collect();
        if records.is_empty() {
            return Ok(());
        }
        self.history.splice(0..0, records);
        self.history.truncate(self.settings.max_history);
        self.save_history()?;
        info!(count = picks.len(), kept = self.history.len(), "picks recorded");
        Ok(())
    }

    fn history(&self) -> &[PickRecord] {
        &self.history
    }

    fn remove_history_item(&mut self, index: usize) -> Result<PickRecord, PickError> {
        if index >= self.history.len() {
            return Err(PickError::NoSuchEntry(index));
        }
        let removed = self.history.remove(index);
        self.save_history()?;
        Ok(removed)
    }

    fn clear_history(&mut self) -> Result<(), PickError> {
        self.history.clear();
        self.save_history()
    }
}
