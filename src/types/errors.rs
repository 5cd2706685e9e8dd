use std::fmt;

use crate::types::node::MAX_FOLDER_DEPTH;

// === TreeError ===

/// Errors returned by path-addressed tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A path segment is missing, or names a bookmark where a folder is needed.
    NotFound(String),
    /// A sibling with the same name already exists.
    NameConflict(String),
    /// The move would place a folder inside itself.
    CycleError(String),
    /// The change would nest folders deeper than `MAX_FOLDER_DEPTH`.
    DepthLimit(String),
    /// A bookmark URL is empty, malformed or uses a blocked scheme.
    InvalidUrl(String),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::NotFound(path) => write!(f, "Item not found: {}", path),
            TreeError::NameConflict(name) => {
                write!(f, "An item with this name already exists: {}", name)
            }
            TreeError::CycleError(path) => {
                write!(f, "Cannot move a folder into itself: {}", path)
            }
            TreeError::DepthLimit(path) => write!(
                f,
                "Folders cannot be nested more than {} levels deep: {}",
                MAX_FOLDER_DEPTH, path
            ),
            TreeError::InvalidUrl(reason) => write!(f, "Invalid URL: {}", reason),
        }
    }
}

impl std::error::Error for TreeError {}

// === CodecError ===

/// Errors raised while reading, decoding, encoding or writing bookmark documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The JSON document is malformed or fails validation.
    DecodeError(String),
    /// The bookmark HTML file is too large, empty, or has no recoverable links.
    UnsupportedFile(String),
    /// A file system operation failed.
    IoError(String),
    /// The operation was cancelled by the caller.
    Cancelled,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::DecodeError(msg) => write!(f, "Invalid bookmark data: {}", msg),
            CodecError::UnsupportedFile(msg) => {
                write!(f, "Unsupported bookmark file: {}", msg)
            }
            CodecError::IoError(msg) => write!(f, "File error: {}", msg),
            CodecError::Cancelled => write!(f, "Operation cancelled"),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<TreeError> for CodecError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NotFound(path) => {
                CodecError::IoError(format!("Folder not found: {}", path))
            }
            other => CodecError::IoError(other.to_string()),
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    IoError(String),
    /// Failed to serialize or deserialize settings.
    SerializationError(String),
    /// The provided settings key is invalid.
    InvalidKey(String),
    /// The provided settings value is invalid.
    InvalidValue(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::IoError(msg) => write!(f, "Settings I/O error: {}", msg),
            SettingsError::SerializationError(msg) => {
                write!(f, "Settings serialization error: {}", msg)
            }
            SettingsError::InvalidKey(key) => write!(f, "Invalid settings key: {}", key),
            SettingsError::InvalidValue(msg) => {
                write!(f, "Invalid settings value: {}", msg)
            }
        }
    }
}

impl std::error::Error for SettingsError {}

// === BackupError ===

/// Errors related to writing and pruning library backups.
#[derive(Debug)]
pub enum BackupError {
    /// A file system operation failed.
    IoError(String),
    /// The library could not be encoded for the backup.
    EncodeError(String),
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::IoError(msg) => write!(f, "Backup I/O error: {}", msg),
            BackupError::EncodeError(msg) => write!(f, "Backup encoding error: {}", msg),
        }
    }
}

impl std::error::Error for BackupError {}

// === PickError ===

/// Errors from random picks and the pick history file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    /// The folder to pick from could not be read.
    Tree(TreeError),
    /// The history file could not be read or written.
    IoError(String),
    /// The history file holds something other than a pick list.
    SerializationError(String),
    /// No history entry at this index.
    NoSuchEntry(usize),
}

impl fmt::Display for PickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickError::Tree(err) => write!(f, "{}", err),
            PickError::IoError(msg) => write!(f, "Pick history I/O error: {}", msg),
            PickError::SerializationError(msg) => {
                write!(f, "Pick history serialization error: {}", msg)
            }
            PickError::NoSuchEntry(index) => write!(f, "No history entry at index {}", index),
        }
    }
}

impl std::error::Error for PickError {}

impl From<TreeError> for PickError {
    fn from(err: TreeError) -> Self {
        PickError::Tree(err)
    }
}
