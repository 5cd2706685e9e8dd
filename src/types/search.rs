use serde::{Deserialize, Serialize};

use super::node::Node;

/// Controls which fields a tree search inspects.
///
/// Names are always matched; the remaining fields are opt-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub match_urls: bool,
    pub match_descriptions: bool,
    pub match_tags: bool,
    /// Also yield folders whose name (or description) matches.
    pub include_folders: bool,
    /// Stop after this many hits. `None` means unbounded.
    pub max_results: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            match_urls: true,
            match_descriptions: true,
            match_tags: true,
            include_folders: true,
            max_results: None,
        }
    }
}

/// One search result: the full path of the node and a borrow of it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<'a> {
    pub path: Vec<String>,
    pub node: &'a Node,
}
