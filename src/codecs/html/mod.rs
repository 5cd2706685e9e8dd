//! Netscape bookmark file codec.
//!
//! Decoding runs an ordered chain of strategies and stops at the first one that
//! recovers at least one bookmark:
//!
//! 1. size and emptiness guard
//! 2. encoding detection
//! 3. structured parse (recursive walk, then flat-then-rebuild)
//! 4. regex extraction, for files without any list markup
//! 5. streaming line scan, for list markup the structured parse could not read
//!
//! Encoding always produces a file that the structured parse reads back fully.

mod decode;
pub mod dom;
mod encode;
mod streaming;
pub mod text;

use serde::Serialize;

use crate::types::node::Folder;
use crate::types::settings::DEFAULT_MAX_HTML_BYTES;

pub use decode::decode;
pub use encode::encode;
pub use text::TextEncoding;

/// Name of the folder that collects links found by regex extraction.
pub const UNCATEGORIZED_FOLDER: &str = "Uncategorized Links";

/// Which decode strategy produced an import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStage {
    Structured,
    FlatRebuild,
    Regex,
    Streaming,
}

impl DecodeStage {
    pub fn label(&self) -> &'static str {
        match self {
            DecodeStage::Structured => "structured parse",
            DecodeStage::FlatRebuild => "flat rebuild",
            DecodeStage::Regex => "link extraction",
            DecodeStage::Streaming => "streaming scan",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlDecodeOptions {
    /// Files larger than this are rejected before any decoding.
    pub max_bytes: u64,
}

impl Default for HtmlDecodeOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_HTML_BYTES,
        }
    }
}

/// A decoded bookmark file, not yet merged into any tree.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlImport {
    pub root: Folder,
    pub stage: DecodeStage,
    pub encoding: TextEncoding,
}
