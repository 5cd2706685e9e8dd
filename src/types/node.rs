//! Bookmark tree node model.
//!
//! A tree is a root [`Folder`] whose `children` map path segments to [`Node`]s.
//! Nodes are plain values; every on-disk representation lives in the codecs.

use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

/// Insertion-ordered child mapping of a folder, keyed by path segment.
pub type Children = IndexMap<String, Node>;

/// The empty path, addressing the root folder.
pub const ROOT: &[&str] = &[];

/// Deepest folder nesting a tree may hold, counted from the root's children
/// (level 1). Both document codecs read back every tree within this limit.
pub const MAX_FOLDER_DEPTH: usize = 48;

/// Returns the current UNIX timestamp in seconds.
pub fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Renders a path as `a/b/c` for messages and logs (`/` for the root).
pub fn display_path<S: AsRef<str>>(path: &[S]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join("/")
}

/// A saved web reference. Always a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Display title. Equal to the path segment unless decoded from a document
    /// that stores a different title.
    pub name: String,
    pub url: String,
    pub icon: String,
    pub tags: Vec<String>,
    pub description: String,
    pub created: i64,
    pub modified: i64,
    pub visit_count: u64,
    pub last_visit: Option<i64>,
}

impl Bookmark {
    pub fn new(name: &str, url: &str, icon: &str) -> Self {
        let now = now();
        Self {
            name: name.to_string(),
            url: url.to_string(),
            icon: icon.to_string(),
            tags: Vec::new(),
            description: String::new(),
            created: now,
            modified: now,
            visit_count: 0,
            last_visit: None,
        }
    }

    /// Counts one visit and stamps `last_visit`.
    pub fn record_visit(&mut self) {
        let now = now();
        self.visit_count += 1;
        self.last_visit = Some(now);
        self.modified = now;
    }
}

/// A named container owning an ordered set of uniquely named children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    pub description: String,
    pub created: i64,
    pub modified: i64,
    pub children: Children,
}

impl Folder {
    pub fn new(name: &str) -> Self {
        let now = now();
        Self {
            name: name.to_string(),
            description: String::new(),
            created: now,
            modified: now,
            children: Children::new(),
        }
    }

    pub fn touch(&mut self) {
        self.modified = now();
    }

    /// Returns `base` if no child uses it, otherwise `"base (n)"` with the
    /// smallest free `n >= 1`.
    pub fn unique_child_name(&self, base: &str) -> String {
        if !self.children.contains_key(base) {
            return base.to_string();
        }
        let mut n = 1;
        loop {
            let candidate = format!("{} ({})", base, n);
            if !self.children.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Inserts `node` under a collision-free variant of `base` and returns the
    /// key actually used. Folder names follow their key.
    pub fn insert_unique(&mut self, base: &str, mut node: Node) -> String {
        let key = self.unique_child_name(base);
        if let Node::Folder(folder) = &mut node {
            folder.name = key.clone();
        }
        self.children.insert(key.clone(), node);
        key
    }

    /// Number of bookmarks anywhere below this folder.
    pub fn bookmark_count(&self) -> usize {
        self.children
            .values()
            .map(|child| match child {
                Node::Bookmark(_) => 1,
                Node::Folder(folder) => folder.bookmark_count(),
            })
            .sum()
    }

    /// Number of folders anywhere below this folder (not counting itself).
    pub fn folder_count(&self) -> usize {
        self.children
            .values()
            .map(|child| match child {
                Node::Bookmark(_) => 0,
                Node::Folder(folder) => 1 + folder.folder_count(),
            })
            .sum()
    }

    /// Number of descendants, folders and bookmarks alike.
    pub fn item_count(&self) -> usize {
        self.bookmark_count() + self.folder_count()
    }

    /// Folder levels below this one: 0 when it holds no folders.
    pub fn nesting_depth(&self) -> usize {
        self.children
            .values()
            .map(Node::nesting_depth)
            .max()
            .unwrap_or(0)
    }

    /// Keeps at most `levels` folder levels below this folder. Folders deeper
    /// than that are dissolved and their bookmarks move up into the ancestor
    /// at the limit, in document order.
    pub fn flatten_below(&mut self, levels: usize) {
        if levels > 0 {
            for child in self.children.values_mut() {
                if let Node::Folder(folder) = child {
                    folder.flatten_below(levels - 1);
                }
            }
            return;
        }
        if !self.children.values().any(Node::is_folder) {
            return;
        }

        let mut pending: Vec<(String, Node)> =
            std::mem::take(&mut self.children).into_iter().rev().collect();
        while let Some((key, node)) = pending.pop() {
            match node {
                Node::Bookmark(bookmark) => {
                    self.insert_unique(&key, bookmark.into());
                }
                Node::Folder(folder) => pending.extend(folder.children.into_iter().rev()),
            }
        }
    }

    /// The built-in library used when no usable data file exists.
    pub fn default_library() -> Folder {
        let mut languages = Folder::new("Programming Languages");
        languages.children.insert(
            "Python".to_string(),
            Bookmark::new("Python Official Site", "https://www.python.org", "").into(),
        );
        languages.children.insert(
            "JavaScript".to_string(),
            Bookmark::new(
                "MDN JavaScript",
                "https://developer.mozilla.org/en-US/docs/Web/JavaScript",
                "",
            )
            .into(),
        );

        let mut tech = Folder::new("Tech Resources");
        tech.children
            .insert("Programming Languages".to_string(), languages.into());
        tech.children.insert(
            "GitHub".to_string(),
            Bookmark::new("GitHub", "https://github.com", "").into(),
        );

        let mut engines = Folder::new("Search Engines");
        engines.children.insert(
            "Google".to_string(),
            Bookmark::new("Google Search", "https://www.google.com", "").into(),
        );
        engines.children.insert(
            "Bing".to_string(),
            Bookmark::new("Bing Search", "https://www.bing.com", "").into(),
        );

        let mut toolbox = Folder::new("Toolbox");
        toolbox
            .children
            .insert("Search Engines".to_string(), engines.into());

        let mut root = Folder::new("");
        root.children.insert("Tech Resources".to_string(), tech.into());
        root.children.insert("Toolbox".to_string(), toolbox.into());
        root
    }
}

/// A tree node: either a leaf bookmark or a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Bookmark(Bookmark),
    Folder(Folder),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Bookmark(b) => &b.name,
            Node::Folder(f) => &f.name,
        }
    }

    pub fn set_name(&mut self, name: &str) {
        match self {
            Node::Bookmark(b) => b.name = name.to_string(),
            Node::Folder(f) => f.name = name.to_string(),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Node::Folder(_))
    }

    pub fn as_folder(&self) -> Option<&Folder> {
        match self {
            Node::Folder(f) => Some(f),
            Node::Bookmark(_) => None,
        }
    }

    pub fn as_folder_mut(&mut self) -> Option<&mut Folder> {
        match self {
            Node::Folder(f) => Some(f),
            Node::Bookmark(_) => None,
        }
    }

    pub fn as_bookmark(&self) -> Option<&Bookmark> {
        match self {
            Node::Bookmark(b) => Some(b),
            Node::Folder(_) => None,
        }
    }

    pub fn as_bookmark_mut(&mut self) -> Option<&mut Bookmark> {
        match self {
            Node::Bookmark(b) => Some(b),
            Node::Folder(_) => None,
        }
    }

    pub fn modified(&self) -> i64 {
        match self {
            Node::Bookmark(b) => b.modified,
            Node::Folder(f) => f.modified,
        }
    }

    pub fn touch(&mut self) {
        match self {
            Node::Bookmark(b) => b.modified = now(),
            Node::Folder(f) => f.touch(),
        }
    }

    /// Folder levels this node occupies: 0 for a bookmark, 1 for a folder of
    /// bookmarks.
    pub fn nesting_depth(&self) -> usize {
        match self {
            Node::Bookmark(_) => 0,
            Node::Folder(f) => 1 + f.nesting_depth(),
        }
    }

    /// Counts this node plus all of its descendants.
    pub fn item_count(&self) -> usize {
        match self {
            Node::Bookmark(_) => 1,
            Node::Folder(f) => 1 + f.item_count(),
        }
    }
}

impl From<Bookmark> for Node {
    fn from(bookmark: Bookmark) -> Self {
        Node::Bookmark(bookmark)
    }
}

impl From<Folder> for Node {
    fn from(folder: Folder) -> Self {
        Node::Folder(folder)
    }
}
