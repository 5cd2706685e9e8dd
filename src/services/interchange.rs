// urlnav Interchange Service
// Moves bookmarks between the shared tree and files on disk: HTML and JSON
// import/export, whole-library load/save, progress reporting and cancellation.

use std::fs;
use std::path::Path;
use std::sync::MutexGuard;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::codecs::html::{self, DecodeStage, HtmlDecodeOptions};
use crate::codecs::json_codec;
use crate::events::{CancellationFlag, Observers, Operation, ProgressEvent, SubscriptionId};
use crate::managers::tree_store::{SharedTree, TreeStore};
use crate::types::errors::CodecError;
use crate::types::node::Folder;
use crate::types::settings::InterchangeSettings;

/// What an import or export moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReport {
    /// Folders and bookmarks transferred. Import wrappers are not counted.
    pub count: usize,
    /// Top-level folder an import landed in.
    pub folder_name: Option<String>,
    /// Decode strategy that recovered an HTML import.
    pub stage: Option<DecodeStage>,
}

/// Result of reading the library file at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryLoad {
    Loaded,
    /// No file yet; the default library is in use.
    Missing,
    /// The file could not be used; the default library is in use.
    Recovered(String),
}

pub struct InterchangeService {
    tree: SharedTree,
    settings: InterchangeSettings,
    progress: Observers<ProgressEvent>,
    cancel: CancellationFlag,
}

impl InterchangeService {
    pub fn new(tree: SharedTree, settings: InterchangeSettings) -> Self {
        Self {
            tree,
            settings,
            progress: Observers::new(),
            cancel: CancellationFlag::new(),
        }
    }

    pub fn settings(&self) -> &InterchangeSettings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: InterchangeSettings) {
        self.settings = settings;
    }

    pub fn subscribe_progress<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.progress.subscribe(callback)
    }

    pub fn unsubscribe_progress(&mut self, id: SubscriptionId) -> bool {
        self.progress.unsubscribe(id)
    }

    /// Asks a running (or the next) import to stop.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle other threads can use to cancel imports.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    // ─── Counting surface ───

    /// Imports a Netscape bookmark file. Returns the number of items added, 0 on failure.
    pub fn import_html(&self, path: impl AsRef<Path>) -> usize {
        let result = self.try_import_html(path);
        self.finish(Operation::Import, result)
    }

    pub fn import_json(&self, path: impl AsRef<Path>) -> usize {
        let result = self.try_import_json(path);
        self.finish(Operation::Import, result)
    }

    pub fn export_html(&self, path: impl AsRef<Path>) -> usize {
        let result = self.try_export_html(path);
        self.finish(Operation::Export, result)
    }

    pub fn export_json(&self, path: impl AsRef<Path>) -> usize {
        let result = self.try_export_json(path);
        self.finish(Operation::Export, result)
    }

    pub fn export_subtree_html<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        subtree_path: &[S],
    ) -> usize {
        let result = self.try_export_subtree_html(path, subtree_path);
        self.finish(Operation::Export, result)
    }

    pub fn export_subtree_json<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        subtree_path: &[S],
    ) -> usize {
        let result = self.try_export_subtree_json(path, subtree_path);
        self.finish(Operation::Export, result)
    }

    // ─── Reporting surface ───
    //
    // The try_* variants do not emit the final 100% event; callers that want
    // it go through `complete`.

    pub fn try_import_html(&self, path: impl AsRef<Path>) -> Result<TransferReport, CodecError> {
        let path = path.as_ref();
        self.report(Operation::Import, 0, "Checking file");
        let size = fs::metadata(path).map_err(|e| io_error(path, e))?.len();
        if size > self.settings.max_html_bytes {
            return Err(CodecError::UnsupportedFile(format!(
                "the file is {} bytes, over the {} byte limit",
                size, self.settings.max_html_bytes
            )));
        }

        self.report(Operation::Import, 10, "Reading file");
        let bytes = fs::read(path).map_err(|e| io_error(path, e))?;

        self.report(Operation::Import, 30, "Parsing bookmarks");
        let options = HtmlDecodeOptions {
            max_bytes: self.settings.max_html_bytes,
        };
        let import = html::decode(&bytes, &options, &self.cancel)?;
        info!(
            path = %path.display(),
            stage = import.stage.label(),
            encoding = import.encoding.label(),
            "bookmark file decoded"
        );

        self.report(Operation::Import, 80, "Merging into library");
        let count = import.root.item_count();
        let folder_name = self
            .lock()?
            .merge_import(&self.settings.html_import_folder, import.root);
        Ok(TransferReport {
            count,
            folder_name: Some(folder_name),
            stage: Some(import.stage),
        })
    }

    pub fn try_import_json(&self, path: impl AsRef<Path>) -> Result<TransferReport, CodecError> {
        let path = path.as_ref();
        self.report(Operation::Import, 0, "Reading file");
        let bytes = fs::read(path).map_err(|e| io_error(path, e))?;

        self.report(Operation::Import, 30, "Parsing bookmarks");
        let root = json_codec::decode(&bytes)?;
        if root.children.is_empty() {
            return Err(CodecError::DecodeError(
                "the document holds no bookmarks or folders".to_string(),
            ));
        }
        if self.cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }

        self.report(Operation::Import, 80, "Merging into library");
        let count = root.item_count();
        let folder_name = self
            .lock()?
            .merge_import(&self.settings.json_import_folder, root);
        Ok(TransferReport {
            count,
            folder_name: Some(folder_name),
            stage: None,
        })
    }

    pub fn try_export_html(&self, path: impl AsRef<Path>) -> Result<TransferReport, CodecError> {
        let root = self.snapshot(&[] as &[&str])?;
        let count = root.item_count();
        self.write_html(path.as_ref(), &root, count)
    }

    pub fn try_export_json(&self, path: impl AsRef<Path>) -> Result<TransferReport, CodecError> {
        let root = self.snapshot(&[] as &[&str])?;
        let count = root.item_count();
        self.write_json(path.as_ref(), &root, count)
    }

    pub fn try_export_subtree_html<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        subtree_path: &[S],
    ) -> Result<TransferReport, CodecError> {
        let (document, count) = self.subtree_document(subtree_path)?;
        self.write_html(path.as_ref(), &document, count)
    }

    pub fn try_export_subtree_json<S: AsRef<str>>(
        &self,
        path: impl AsRef<Path>,
        subtree_path: &[S],
    ) -> Result<TransferReport, CodecError> {
        let (document, count) = self.subtree_document(subtree_path)?;
        self.write_json(path.as_ref(), &document, count)
    }

    /// Emits the closing progress event for a `try_*` result and clears any
    /// pending cancellation.
    pub fn complete(
        &self,
        operation: Operation,
        result: &Result<TransferReport, CodecError>,
    ) {
        self.cancel.reset();
        let verb = match operation {
            Operation::Import => "Import",
            Operation::Export => "Export",
        };
        let phase = match result {
            Ok(report) => match &report.folder_name {
                Some(folder) => format!("Imported {} items into '{}'", report.count, folder),
                None => format!("Exported {} items", report.count),
            },
            Err(e) => {
                warn!(error = %e, "{} failed", verb.to_lowercase());
                format!("{} failed: {}", verb, e)
            }
        };
        self.report(operation, 100, &phase);
    }

    // ─── Library file ───

    /// Replaces the tree with the library stored at `path`. Anything short of a
    /// valid document falls back to the default library.
    pub fn load_library(&self, path: impl AsRef<Path>) -> Result<LibraryLoad, CodecError> {
        let path = path.as_ref();
        let (root, outcome) = if !path.exists() {
            info!(path = %path.display(), "no library file, starting from defaults");
            (Folder::default_library(), LibraryLoad::Missing)
        } else {
            match fs::read(path)
                .map_err(|e| io_error(path, e))
                .and_then(|bytes| json_codec::decode(&bytes))
            {
                Ok(root) => (root, LibraryLoad::Loaded),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "library unusable, using defaults");
                    (Folder::default_library(), LibraryLoad::Recovered(e.to_string()))
                }
            }
        };
        self.lock()?.replace_root(root);
        Ok(outcome)
    }

    /// Writes the whole tree to `path` as JSON. Returns the number of items saved.
    pub fn save_library(&self, path: impl AsRef<Path>) -> Result<usize, CodecError> {
        let path = path.as_ref();
        let root = self.lock()?.root().clone();
        let bytes = json_codec::encode(&root)?;
        write_file(path, &bytes)?;
        let count = root.item_count();
        debug!(path = %path.display(), count, "library saved");
        Ok(count)
    }

    // ─── Helpers ───

    fn finish(&self, operation: Operation, result: Result<TransferReport, CodecError>) -> usize {
        self.complete(operation, &result);
        result.map(|report| report.count).unwrap_or(0)
    }

    fn report(&self, operation: Operation, percent: u8, phase: &str) {
        self.progress.emit(&ProgressEvent {
            operation,
            percent,
            phase: phase.to_string(),
        });
    }

    fn lock(&self) -> Result<MutexGuard<'_, TreeStore>, CodecError> {
        self.tree
            .lock()
            .map_err(|_| CodecError::IoError("the bookmark tree is unavailable".to_string()))
    }

    fn snapshot<S: AsRef<str>>(&self, path: &[S]) -> Result<Folder, CodecError> {
        self.report(Operation::Export, 0, "Collecting bookmarks");
        Ok(self.lock()?.subtree(path)?)
    }

    /// Wraps the folder at `subtree_path` in a document root so the folder
    /// itself is part of the export.
    fn subtree_document<S: AsRef<str>>(
        &self,
        subtree_path: &[S],
    ) -> Result<(Folder, usize), CodecError> {
        let folder = self.snapshot(subtree_path)?;
        let Some(last) = subtree_path.last() else {
            let count = folder.item_count();
            return Ok((folder, count));
        };
        let count = 1 + folder.item_count();
        let mut document = Folder::new("");
        document
            .children
            .insert(last.as_ref().to_string(), folder.into());
        Ok((document, count))
    }

    fn write_html(
        &self,
        path: &Path,
        document: &Folder,
        count: usize,
    ) -> Result<TransferReport, CodecError> {
        self.report(Operation::Export, 40, "Encoding bookmarks");
        let text = html::encode(document);
        self.report(Operation::Export, 70, "Writing file");
        write_file(path, text.as_bytes())?;
        info!(path = %path.display(), count, "HTML export written");
        Ok(TransferReport {
            count,
            folder_name: None,
            stage: None,
        })
    }

    fn write_json(
        &self,
        path: &Path,
        document: &Folder,
        count: usize,
    ) -> Result<TransferReport, CodecError> {
        self.report(Operation::Export, 40, "Encoding bookmarks");
        let bytes = json_codec::encode(document)?;
        self.report(Operation::Export, 70, "Writing file");
        write_file(path, &bytes)?;
        info!(path = %path.display(), count, "JSON export written");
        Ok(TransferReport {
            count,
            folder_name: None,
            stage: None,
        })
    }
}

fn io_error(path: &Path, err: std::io::Error) -> CodecError {
    CodecError::IoError(format!("{}: {}", path.display(), err))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), CodecError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
    }
    fs::write(path, bytes).map_err(|e| io_error(path, e))
}
