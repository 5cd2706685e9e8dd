//! Tree Store for urlnav.
//!
//! Implements `TreeStoreTrait`: path-addressed reads and mutations over the
//! in-memory bookmark tree, plus change notification for collaborators.

use std::sync::{Arc, Mutex};

use serde::Deserialize;
use tracing::{debug, info};

use crate::events::{Observers, SubscriptionId, TreeChange};
use crate::managers::tree_search::SearchResults;
use crate::types::errors::TreeError;
use crate::types::node::{display_path, now, Bookmark, Folder, Node, MAX_FOLDER_DEPTH};
use crate::types::search::SearchOptions;
use crate::types::url::{validate_url, UrlEntry};

/// A store shared between the services and the RPC surface.
pub type SharedTree = Arc<Mutex<TreeStore>>;

/// Partial update applied by [`TreeStoreTrait::update_bookmark`].
/// `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BookmarkUpdate {
    pub url: Option<String>,
    pub icon: Option<String>,
    pub tags: Option<Vec<String>>,
    pub description: Option<String>,
}

/// Trait defining bookmark tree operations.
///
/// Every operation addresses nodes by path; the empty path is the root folder.
pub trait TreeStoreTrait {
    fn get<S: AsRef<str>>(&self, path: &[S]) -> Result<&Node, TreeError>;
    fn add_bookmark<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
        url: &str,
        icon: &str,
    ) -> Result<(), TreeError>;
    fn add_folder<S: AsRef<str>>(&mut self, parent: &[S], name: &str) -> Result<(), TreeError>;
    fn rename<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        old_name: &str,
        new_name: &str,
    ) -> Result<(), TreeError>;
    fn update_bookmark<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
        update: BookmarkUpdate,
    ) -> Result<(), TreeError>;
    fn delete<S: AsRef<str>>(&mut self, parent: &[S], name: &str) -> Result<(), TreeError>;
    fn move_node<S: AsRef<str>, D: AsRef<str>>(
        &mut self,
        src_parent: &[S],
        name: &str,
        dst_parent: &[D],
    ) -> Result<(), TreeError>;
    fn record_visit<S: AsRef<str>>(&mut self, parent: &[S], name: &str) -> Result<(), TreeError>;
    fn search(&self, query: &str, options: &SearchOptions) -> SearchResults<'_>;
}

/// The in-memory bookmark tree and its subscribers.
pub struct TreeStore {
    /// Always a `Node::Folder`, so `get(ROOT)` can hand out a node.
    root: Node,
    observers: Observers<TreeChange>,
}

fn owned<S: AsRef<str>>(path: &[S]) -> Vec<String> {
    path.iter().map(|s| s.as_ref().to_string()).collect()
}

fn child_path<S: AsRef<str>>(parent: &[S], name: &str) -> String {
    let mut path = owned(parent);
    path.push(name.to_string());
    display_path(&path)
}

impl TreeStore {
    /// Creates a store holding an empty root folder.
    pub fn new() -> Self {
        Self::with_root(Folder::new(""))
    }

    pub fn with_root(root: Folder) -> Self {
        Self {
            root: root.into(),
            observers: Observers::new(),
        }
    }

    pub fn into_shared(self) -> SharedTree {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> &Folder {
        match &self.root {
            Node::Folder(folder) => folder,
            Node::Bookmark(_) => unreachable!("the root is always a folder"),
        }
    }

    fn root_mut(&mut self) -> &mut Folder {
        match &mut self.root {
            Node::Folder(folder) => folder,
            Node::Bookmark(_) => unreachable!("the root is always a folder"),
        }
    }

    /// Swaps in a whole new tree, e.g. after loading the library file.
    pub fn replace_root(&mut self, root: Folder) {
        self.root = root.into();
        info!(items = self.root().item_count(), "bookmark tree replaced");
        self.observers.emit(&TreeChange::Replaced);
    }

    /// Returns an owned copy of the folder at `path` (the root for `[]`).
    pub fn subtree<S: AsRef<str>>(&self, path: &[S]) -> Result<Folder, TreeError> {
        self.folder_at(path).cloned()
    }

    /// Attaches `imported` as a new top-level folder named `base_name`,
    /// suffixed if that name is taken. Returns the name actually used.
    ///
    /// Folders that would end up deeper than [`MAX_FOLDER_DEPTH`] are
    /// dissolved into their deepest allowed ancestor.
    pub fn merge_import(&mut self, base_name: &str, mut imported: Folder) -> String {
        if imported.nesting_depth() >= MAX_FOLDER_DEPTH {
            imported.flatten_below(MAX_FOLDER_DEPTH - 1);
            debug!(limit = MAX_FOLDER_DEPTH, "deep import flattened");
        }
        let count = imported.item_count();
        let root = self.root_mut();
        let name = root.insert_unique(base_name, imported.into());
        root.touch();
        info!(folder = %name, count, "import merged into tree");
        self.observers.emit(&TreeChange::Imported {
            name: name.clone(),
            count,
        });
        name
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&TreeChange) + Send + Sync + 'static,
    {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Every bookmark at or below the folder at `path`, in pre-order.
    pub fn collect_urls<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec<UrlEntry>, TreeError> {
        let start = self.folder_at(path)?;
        let mut entries = Vec::new();
        let mut stack = vec![(owned(path), start.children.iter())];
        while let Some((folder_path, iter)) = stack.last_mut() {
            let Some((key, node)) = iter.next() else {
                stack.pop();
                continue;
            };
            match node {
                Node::Bookmark(bookmark) => entries.push(UrlEntry {
                    url: bookmark.url.clone(),
                    name: key.clone(),
                    path: folder_path.clone(),
                    icon: bookmark.icon.clone(),
                }),
                Node::Folder(folder) => {
                    let mut sub_path = folder_path.clone();
                    sub_path.push(key.clone());
                    stack.push((sub_path, folder.children.iter()));
                }
            }
        }
        Ok(entries)
    }

    /// Walks `path` through folders only.
    fn folder_at<S: AsRef<str>>(&self, path: &[S]) -> Result<&Folder, TreeError> {
        let mut current = self.root();
        for (depth, segment) in path.iter().enumerate() {
            current = match current.children.get(segment.as_ref()) {
                Some(Node::Folder(folder)) => folder,
                _ => return Err(TreeError::NotFound(display_path(&path[..=depth]))),
            };
        }
        Ok(current)
    }

    fn folder_at_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Result<&mut Folder, TreeError> {
        let mut current = self.root_mut();
        for (depth, segment) in path.iter().enumerate() {
            current = match current.children.get_mut(segment.as_ref()) {
                Some(Node::Folder(folder)) => folder,
                _ => return Err(TreeError::NotFound(display_path(&path[..=depth]))),
            };
        }
        Ok(current)
    }

    fn bookmark_at_mut<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
    ) -> Result<&mut Bookmark, TreeError> {
        let folder = self.folder_at_mut(parent)?;
        match folder.children.get_mut(name) {
            Some(Node::Bookmark(bookmark)) => Ok(bookmark),
            _ => Err(TreeError::NotFound(child_path(parent, name))),
        }
    }

    /// Inserts a freshly built node, rejecting duplicate sibling names.
    fn insert_child<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
        node: Node,
    ) -> Result<(), TreeError> {
        let folder = self.folder_at_mut(parent)?;
        if folder.children.contains_key(name) {
            return Err(TreeError::NameConflict(name.to_string()));
        }
        folder.children.insert(name.to_string(), node);
        folder.touch();
        debug!(path = %child_path(parent, name), "node added");
        self.observers.emit(&TreeChange::Added {
            parent: owned(parent),
            name: name.to_string(),
        });
        Ok(())
    }
}

impl Default for TreeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeStoreTrait for TreeStore {
    fn get<S: AsRef<str>>(&self, path: &[S]) -> Result<&Node, TreeError> {
        let Some((last, parent)) = path.split_last() else {
            return Ok(&self.root);
        };
        self.folder_at(parent)?
            .children
            .get(last.as_ref())
            .ok_or_else(|| TreeError::NotFound(display_path(path)))
    }

    fn add_bookmark<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
        url: &str,
        icon: &str,
    ) -> Result<(), TreeError> {
        let url = validate_url(url)?;
        self.insert_child(parent, name, Bookmark::new(name, &url, icon).into())
    }

    fn add_folder<S: AsRef<str>>(&mut self, parent: &[S], name: &str) -> Result<(), TreeError> {
        if parent.len() >= MAX_FOLDER_DEPTH {
            return Err(TreeError::DepthLimit(child_path(parent, name)));
        }
        self.insert_child(parent, name, Folder::new(name).into())
    }

    /// Renames a child in place, keeping its position among its siblings.
    fn rename<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        old_name: &str,
        new_name: &str,
    ) -> Result<(), TreeError> {
        let folder = self.folder_at_mut(parent)?;
        let index = folder
            .children
            .get_index_of(old_name)
            .ok_or_else(|| TreeError::NotFound(child_path(parent, old_name)))?;
        if old_name == new_name {
            return Ok(());
        }
        if folder.children.contains_key(new_name) {
            return Err(TreeError::NameConflict(new_name.to_string()));
        }

        if let Some((_, mut node)) = folder.children.shift_remove_index(index) {
            node.set_name(new_name);
            node.touch();
            folder.children.shift_insert(index, new_name.to_string(), node);
        }
        folder.touch();

        debug!(from = %child_path(parent, old_name), to = new_name, "node renamed");
        self.observers.emit(&TreeChange::Renamed {
            parent: owned(parent),
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
        Ok(())
    }

    fn update_bookmark<S: AsRef<str>>(
        &mut self,
        parent: &[S],
        name: &str,
        update: BookmarkUpdate,
    ) -> Result<(), TreeError> {
        let url = update.url.as_deref().map(validate_url).transpose()?;
        let bookmark = self.bookmark_at_mut(parent, name)?;
        if let Some(url) = url {
            bookmark.url = url;
        }
        if let Some(icon) = update.icon {
            bookmark.icon = icon;
        }
        if let Some(tags) = update.tags {
            bookmark.tags = tags;
        }
        if let Some(description) = update.description {
            bookmark.description = description;
        }
        bookmark.modified = now();

        self.observers.emit(&TreeChange::Updated {
            parent: owned(parent),
            name: name.to_string(),
        });
        Ok(())
    }

    /// Removes a child together with its whole subtree.
    fn delete<S: AsRef<str>>(&mut self, parent: &[S], name: &str) -> Result<(), TreeError> {
        let folder = self.folder_at_mut(parent)?;
        let removed = folder
            .children
            .shift_remove(name)
            .ok_or_else(|| TreeError::NotFound(child_path(parent, name)))?;
        folder.touch();

        info!(path = %child_path(parent, name), items = removed.item_count(), "node deleted");
        self.observers.emit(&TreeChange::Deleted {
            parent: owned(parent),
            name: name.to_string(),
        });
        Ok(())
    }

    /// Moves a child to the end of another folder.
    fn move_node<S: AsRef<str>, D: AsRef<str>>(
        &mut self,
        src_parent: &[S],
        name: &str,
        dst_parent: &[D],
    ) -> Result<(), TreeError> {
        if !self.folder_at(src_parent)?.children.contains_key(name) {
            return Err(TreeError::NotFound(child_path(src_parent, name)));
        }

        // Reject when the destination is the node itself or lies beneath it.
        let moved_path = {
            let mut path = owned(src_parent);
            path.push(name.to_string());
            path
        };
        let inside_moved = dst_parent.len() >= moved_path.len()
            && moved_path
                .iter()
                .zip(dst_parent)
                .all(|(a, b)| a.as_str() == b.as_ref());
        if inside_moved {
            return Err(TreeError::CycleError(display_path(&moved_path)));
        }

        let same_parent = src_parent.len() == dst_parent.len()
            && src_parent
                .iter()
                .zip(dst_parent)
                .all(|(a, b)| a.as_ref() == b.as_ref());
        if same_parent {
            return Ok(());
        }

        if self.folder_at(dst_parent)?.children.contains_key(name) {
            return Err(TreeError::NameConflict(name.to_string()));
        }
        let levels = self.folder_at(src_parent)?
            .children
            .get(name)
            .map_or(0, Node::nesting_depth);
        if dst_parent.len() + levels > MAX_FOLDER_DEPTH {
            return Err(TreeError::DepthLimit(child_path(dst_parent, name)));
        }

        let source = self.folder_at_mut(src_parent)?;
        let node = source
            .children
            .shift_remove(name)
            .ok_or_else(|| TreeError::NotFound(display_path(&moved_path)))?;
        source.touch();

        let destination = self.folder_at_mut(dst_parent)?;
        destination.children.insert(name.to_string(), node);
        destination.touch();

        debug!(
            from = %display_path(&moved_path),
            to = %display_path(dst_parent),
            "node moved"
        );
        self.observers.emit(&TreeChange::Moved {
            from: owned(src_parent),
            name: name.to_string(),
            to: owned(dst_parent),
        });
        Ok(())
    }

    fn record_visit<S: AsRef<str>>(&mut self, parent: &[S], name: &str) -> Result<(), TreeError> {
        self.bookmark_at_mut(parent, name)?.record_visit();
        self.observers.emit(&TreeChange::Visited {
            parent: owned(parent),
            name: name.to_string(),
        });
        Ok(())
    }

    fn search(&self, query: &str, options: &SearchOptions) -> SearchResults<'_> {
        SearchResults::new(self.root(), query, options)
    }
}
