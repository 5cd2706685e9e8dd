//! Lazy depth-first search over a bookmark tree.

use indexmap::map::Iter;

use crate::types::node::{Folder, Node};
use crate::types::search::{SearchHit, SearchOptions};

/// One-shot pre-order iterator over the nodes matching a query.
///
/// Borrows the tree for its whole lifetime, so every hit comes from the same
/// snapshot.
pub struct SearchResults<'a> {
    needle: String,
    options: SearchOptions,
    stack: Vec<(Vec<String>, Iter<'a, String, Node>)>,
    yielded: usize,
}

impl<'a> SearchResults<'a> {
    pub fn new(root: &'a Folder, query: &str, options: &SearchOptions) -> Self {
        let needle = if options.case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };
        // An empty query matches nothing.
        let stack = if needle.is_empty() {
            Vec::new()
        } else {
            vec![(Vec::new(), root.children.iter())]
        };
        Self {
            needle,
            options: options.clone(),
            stack,
            yielded: 0,
        }
    }

    fn contains(&self, haystack: &str) -> bool {
        if self.options.case_sensitive {
            haystack.contains(&self.needle)
        } else {
            haystack.to_lowercase().contains(&self.needle)
        }
    }

    fn matches(&self, key: &str, node: &Node) -> bool {
        match node {
            Node::Bookmark(b) => {
                self.contains(key)
                    || self.contains(&b.name)
                    || (self.options.match_urls && self.contains(&b.url))
                    || (self.options.match_descriptions && self.contains(&b.description))
                    || (self.options.match_tags && b.tags.iter().any(|t| self.contains(t)))
            }
            Node::Folder(f) => {
                self.options.include_folders
                    && (self.contains(key)
                        || (self.options.match_descriptions && self.contains(&f.description)))
            }
        }
    }
}

impl<'a> Iterator for SearchResults<'a> {
    type Item = SearchHit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(limit) = self.options.max_results {
                if self.yielded >= limit {
                    self.stack.clear();
                    return None;
                }
            }

            let (path, key, node) = {
                let (prefix, iter) = self.stack.last_mut()?;
                match iter.next() {
                    Some((key, node)) => {
                        let mut path = prefix.clone();
                        path.push(key.clone());
                        (path, key, node)
                    }
                    None => {
                        self.stack.pop();
                        continue;
                    }
                }
            };

            let hit = self.matches(key, node);
            if let Node::Folder(folder) = node {
                self.stack.push((path.clone(), folder.children.iter()));
            }
            if hit {
                self.yielded += 1;
                return Some(SearchHit { path, node });
            }
        }
    }
}
