//! App Core for urlnav.
//!
//! Central struct holding the bookmark tree and the services around it,
//! managing application lifecycle.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::managers::tree_store::{SharedTree, TreeStore};
use crate::platform;
use crate::services::backup::BackupService;
use crate::services::interchange::{InterchangeService, LibraryLoad};
use crate::services::random_pick::RandomPickService;
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::errors::CodecError;

/// Central application struct holding the tree and all services.
///
/// The tree is shared with the interchange service; every other component
/// reaches it through `tree`.
pub struct App {
    pub settings_engine: SettingsEngine,
    pub tree: SharedTree,
    pub interchange: InterchangeService,
    pub backup: BackupService,
    pub picker: RandomPickService,
}

impl App {
    /// Creates a new App around an empty tree, configured from whatever the
    /// engine currently holds. Call `startup` to load settings and the library.
    pub fn new(settings_engine: SettingsEngine) -> Self {
        let settings = settings_engine.get_settings().clone();
        let tree = TreeStore::new().into_shared();
        let interchange = InterchangeService::new(tree.clone(), settings.interchange);
        let backup = BackupService::new(settings.backup);
        let picker = RandomPickService::new(tree.clone(), settings.random_pick);

        Self {
            settings_engine,
            tree,
            interchange,
            backup,
            picker,
        }
    }

    /// Startup sequence: load settings, configure services, load the library
    /// and the pick history.
    pub fn startup(&mut self) -> Result<LibraryLoad, CodecError> {
        if let Err(e) = self.settings_engine.load() {
            warn!(error = %e, "settings unreadable, using defaults");
        }
        self.apply_settings();
        self.picker.load_history();

        let path = self.library_path();
        let outcome = self.interchange.load_library(&path)?;
        info!(path = %path.display(), outcome = ?outcome, "library ready");
        Ok(outcome)
    }

    /// Shutdown sequence: write the library back to disk.
    pub fn shutdown(&mut self) -> Result<usize, CodecError> {
        let path = self.library_path();
        self.interchange.save_library(&path)
    }

    /// Pushes the engine's current settings into the services.
    pub fn apply_settings(&mut self) {
        let settings = self.settings_engine.get_settings().clone();
        self.interchange.update_settings(settings.interchange);
        self.backup.update_settings(settings.backup);
        self.picker.update_settings(settings.random_pick);
    }

    /// The library data file: the configured one, or the platform default.
    pub fn library_path(&self) -> PathBuf {
        match &self.settings_engine.get_settings().library.data_file {
            Some(file) => PathBuf::from(file),
            None => platform::default_library_path(),
        }
    }
}
