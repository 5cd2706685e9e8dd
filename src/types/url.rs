//! Bookmark URL checks and the flattened URL listing used by random picks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::TreeError;

/// Schemes that are never stored, whatever their case.
const BLOCKED_SCHEMES: &[&str] = &["javascript", "data", "vbscript", "file"];

/// Checks a user-supplied bookmark URL and returns the form to store.
///
/// Surrounding whitespace is trimmed and a URL without a scheme gets
/// `https://`. Script and local-file schemes are rejected. Web URLs need a
/// dotted host; other schemes (`ftp://`, `chrome://`) are accepted as given.
pub fn validate_url(raw: &str) -> Result<String, TreeError> {
    let url = raw.trim();
    if url.is_empty() {
        return Err(TreeError::InvalidUrl("the URL is empty".to_string()));
    }

    if let Some((prefix, _)) = url.split_once(':') {
        let prefix = prefix.to_ascii_lowercase();
        if BLOCKED_SCHEMES.contains(&prefix.as_str()) {
            return Err(TreeError::InvalidUrl(format!("unsafe scheme '{}'", prefix)));
        }
    }
    let Some((scheme, rest)) = url.split_once("://") else {
        return validate_url(&format!("https://{}", url));
    };
    let scheme = scheme.to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        debug!(scheme = %scheme, "accepting non-web URL scheme");
        return Ok(url.to_string());
    }

    let host = rest.split('/').next().unwrap_or("");
    if !host.contains('.') {
        return Err(TreeError::InvalidUrl(format!("'{}' has no valid host", url)));
    }
    Ok(format!("{}://{}", scheme, rest))
}

/// A bookmark found below some folder: where it lives and what it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlEntry {
    pub url: String,
    /// The bookmark's key inside its folder.
    pub name: String,
    /// Path of the folder holding the bookmark.
    pub path: Vec<String>,
    #[serde(default)]
    pub icon: String,
}
