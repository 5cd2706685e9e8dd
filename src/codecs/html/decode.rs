use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info};

use super::dom::{tokenize, Dom, NodeData, NodeId, Token};
use super::streaming;
use super::text::{collapse_whitespace, decode_text, unescape};
use super::{DecodeStage, HtmlDecodeOptions, HtmlImport, UNCATEGORIZED_FOLDER};
use crate::events::CancellationFlag;
use crate::types::errors::CodecError;
use crate::types::node::{now, Bookmark, Folder, Node, MAX_FOLDER_DEPTH};

static STRUCTURE_MARKER: OnceLock<Regex> = OnceLock::new();
static ANCHOR: OnceLock<Regex> = OnceLock::new();
static INNER_TAG: OnceLock<Regex> = OnceLock::new();

fn structure_marker() -> &'static Regex {
    STRUCTURE_MARKER.get_or_init(|| Regex::new(r"(?i)<(dl|dt|h[1-6])[\s>/]").expect("valid regex"))
}

fn anchor_pattern() -> &'static Regex {
    ANCHOR.get_or_init(|| Regex::new(r"(?is)(<a\s[^>]*>)(.*?)</a\s*>").expect("valid regex"))
}

fn inner_tag_pattern() -> &'static Regex {
    INNER_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

/// Reads a timestamp attribute. Millisecond and microsecond values, which some
/// exporters write, are scaled down to seconds.
fn parse_timestamp(raw: &str) -> Option<i64> {
    let mut value = raw.trim().parse::<i64>().ok()?;
    while value > 100_000_000_000 {
        value /= 1000;
    }
    Some(value)
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Builds a bookmark from an anchor's attributes and text. Returns `None`
/// when the anchor has no usable `href`.
pub(super) fn bookmark_from_attrs(
    attrs: &[(String, String)],
    text: &str,
    stamp: i64,
) -> Option<Bookmark> {
    let get = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    };
    let url = get("href")?.trim();
    if url.is_empty() {
        return None;
    }
    let title = collapse_whitespace(text);
    let name = if title.is_empty() { url.to_string() } else { title };
    let icon = get("icon").or_else(|| get("icon_uri")).unwrap_or("");

    let mut bookmark = Bookmark::new(&name, url, icon);
    bookmark.created = get("add_date").and_then(parse_timestamp).unwrap_or(stamp);
    bookmark.modified = get("last_modified")
        .and_then(parse_timestamp)
        .unwrap_or(bookmark.created);
    bookmark.last_visit = get("last_visit").and_then(parse_timestamp);
    bookmark.tags = get("tags").map(split_tags).unwrap_or_default();
    Some(bookmark)
}

/// Builds an empty folder from its heading text and date attributes.
pub(super) fn folder_from_attrs(attrs: &[(String, String)], text: &str, stamp: i64) -> Folder {
    let get = |name: &str| {
        attrs
            .iter()
            .find(|(key, _)| key == name)
            .and_then(|(_, value)| parse_timestamp(value))
    };
    let title = collapse_whitespace(text);
    let mut folder = Folder::new(if title.is_empty() {
        "Untitled Folder"
    } else {
        title.as_str()
    });
    folder.created = get("add_date").unwrap_or(stamp);
    folder.modified = get("last_modified").unwrap_or(folder.created);
    folder
}

fn check_cancelled(cancel: &CancellationFlag) -> Result<(), CodecError> {
    if cancel.is_cancelled() {
        Err(CodecError::Cancelled)
    } else {
        Ok(())
    }
}

/// Decodes a bookmark file into a fresh root folder.
pub fn decode(
    bytes: &[u8],
    options: &HtmlDecodeOptions,
    cancel: &CancellationFlag,
) -> Result<HtmlImport, CodecError> {
    if bytes.is_empty() {
        return Err(CodecError::UnsupportedFile("the file is empty".to_string()));
    }
    if bytes.len() as u64 > options.max_bytes {
        return Err(CodecError::UnsupportedFile(format!(
            "the file is {} bytes, over the {} byte limit",
            bytes.len(),
            options.max_bytes
        )));
    }

    let (text, encoding) = decode_text(bytes);
    info!(encoding = encoding.label(), bytes = bytes.len(), "bookmark file read");
    if text.trim().is_empty() {
        return Err(CodecError::UnsupportedFile(
            "the file contains no text".to_string(),
        ));
    }
    check_cancelled(cancel)?;

    let stamp = now();
    let recovered = if structure_marker().is_match(&text) {
        match StructuredParse::new(&text, stamp).run() {
            Some(found) => Some(found),
            None => {
                debug!("structured parse found no bookmarks, scanning line by line");
                check_cancelled(cancel)?;
                let root = streaming::scan(&text, cancel, stamp)?;
                (root.bookmark_count() > 0).then_some((root, DecodeStage::Streaming))
            }
        }
    } else {
        extract_links(&text, stamp).map(|root| (root, DecodeStage::Regex))
    };

    match recovered {
        Some((root, stage)) => {
            info!(
                stage = stage.label(),
                bookmarks = root.bookmark_count(),
                folders = root.folder_count(),
                "bookmark file decoded"
            );
            Ok(HtmlImport {
                root,
                stage,
                encoding,
            })
        }
        None => Err(CodecError::UnsupportedFile(
            "no bookmarks could be recovered".to_string(),
        )),
    }
}

/// Scans raw text for anchors and collects them into one flat folder.
fn extract_links(text: &str, stamp: i64) -> Option<Folder> {
    let mut links = Folder::new(UNCATEGORIZED_FOLDER);
    for caps in anchor_pattern().captures_iter(text) {
        let Some(Token::Start { attrs, .. }) = tokenize(&caps[1]).into_iter().next() else {
            continue;
        };
        let label = unescape(&inner_tag_pattern().replace_all(&caps[2], " "));
        let Some(bookmark) = bookmark_from_attrs(&attrs, &label, stamp) else {
            continue;
        };
        if bookmark.url.to_ascii_lowercase().starts_with("javascript:") {
            continue;
        }
        let name = bookmark.name.clone();
        links.insert_unique(&name, bookmark.into());
    }
    if links.children.is_empty() {
        return None;
    }
    let mut root = Folder::new("");
    root.insert_unique(UNCATEGORIZED_FOLDER, links.into());
    Some(root)
}

enum FlatEntry {
    Link(NodeId),
    Marker(usize),
}

/// One list being walked: a cursor over its children plus the state that
/// `<DD>` descriptions and sibling folder lists depend on.
struct ListCursor {
    list: NodeId,
    next: usize,
    /// A sibling list already walked as some folder's contents.
    claimed: Option<NodeId>,
    /// Key of the item a following `<DD>` describes.
    last_key: Option<String>,
    /// Finishing this list closes the innermost open folder.
    opens_folder: bool,
}

impl ListCursor {
    fn new(list: NodeId, opens_folder: bool) -> Self {
        Self {
            list,
            next: 0,
            claimed: None,
            last_key: None,
            opens_folder,
        }
    }
}

/// Pops the innermost open folder into its parent and records its key on
/// the cursor of the list that holds it.
fn close_folder(folders: &mut Vec<Folder>, cursors: &mut [ListCursor]) {
    if folders.len() < 2 {
        return;
    }
    if let Some(sub) = folders.pop() {
        let name = sub.name.clone();
        let key = folders
            .last_mut()
            .map(|parent| parent.insert_unique(&name, sub.into()));
        if let Some(cursor) = cursors.last_mut() {
            cursor.last_key = key;
        }
    }
}

/// DOM-based decoding: a walk of the list structure, backed by a flat
/// rebuild when the walk misses links.
struct StructuredParse {
    dom: Dom,
    stamp: i64,
}

impl StructuredParse {
    fn new(text: &str, stamp: i64) -> Self {
        Self {
            dom: Dom::parse(text),
            stamp,
        }
    }

    fn run(&self) -> Option<(Folder, DecodeStage)> {
        // Whether each node sits inside a `<DT>`, filled parent-first.
        let mut in_item = vec![false; self.dom.node_count()];
        for id in 1..self.dom.node_count() {
            if let Some(parent) = self.dom.parent(id) {
                in_item[id] = in_item[parent] || self.dom.tag(parent) == Some("dt");
            }
        }
        let linked_items = self
            .dom
            .elements()
            .filter(|&id| self.dom.is_link(id) && in_item[id])
            .count();

        let root = match self.dom.elements().find(|&id| self.dom.tag(id) == Some("dl")) {
            Some(list) => self.walk(list),
            None => Folder::new(""),
        };
        let walked = root.bookmark_count();
        debug!(walked, linked_items, "list walk finished");

        if walked < linked_items {
            let flat = self.flat_rebuild();
            let rebuilt = flat.bookmark_count();
            debug!(rebuilt, "flat rebuild finished");
            if rebuilt > walked {
                return Some((flat, DecodeStage::FlatRebuild));
            }
        }
        (walked > 0).then_some((root, DecodeStage::Structured))
    }

    fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.dom.node(id).data {
            NodeData::Element { attrs, .. } => attrs.as_slice(),
            _ => &[],
        }
    }

    fn heading_of(&self, item: NodeId) -> Option<NodeId> {
        self.dom.find_shallow(item, |dom, id| dom.is_heading(id))
    }

    fn bookmark_at(&self, anchor: NodeId) -> Option<Bookmark> {
        bookmark_from_attrs(self.attrs(anchor), &self.dom.text_content(anchor), self.stamp)
    }

    fn folder_at(&self, heading: NodeId) -> Folder {
        folder_from_attrs(self.attrs(heading), &self.dom.text_content(heading), self.stamp)
    }

    /// The list holding a folder item's contents: nested in the item after its
    /// heading, or the item's next sibling (possibly wrapped in a `<DD>`).
    fn folder_list(&self, item: NodeId) -> Option<NodeId> {
        let is_list = |dom: &Dom, id: NodeId| dom.tag(id) == Some("dl");
        if let Some(list) = self.dom.find_shallow(item, is_list) {
            return Some(list);
        }
        let sibling = self.dom.next_element_sibling(item)?;
        match self.dom.tag(sibling) {
            Some("dl") => Some(sibling),
            Some("dd") => self.dom.find_shallow(sibling, is_list),
            _ => None,
        }
    }

    /// Walks the list structure from `list` with explicit stacks, so nesting
    /// depth never grows the call stack. Folders deeper than
    /// [`MAX_FOLDER_DEPTH`] are not opened; their contents land in the
    /// deepest open folder.
    fn walk(&self, list: NodeId) -> Folder {
        let mut folders = vec![Folder::new("")];
        let mut cursors = vec![ListCursor::new(list, false)];

        while let Some(mut cursor) = cursors.pop() {
            let Some(&child) = self.dom.children(cursor.list).get(cursor.next) else {
                if cursor.opens_folder {
                    close_folder(&mut folders, &mut cursors);
                }
                continue;
            };
            cursor.next += 1;
            if cursor.claimed == Some(child) {
                cursors.push(cursor);
                continue;
            }

            let nested = match self.dom.tag(child) {
                Some("dt") => self.walk_item(child, &mut cursor, &mut folders),
                Some("dd") => {
                    let description = self.dom.text_content(child);
                    let target = match (cursor.last_key.take(), folders.last_mut()) {
                        (Some(key), Some(folder)) => folder.children.get_mut(&key),
                        _ => None,
                    };
                    match target {
                        Some(Node::Bookmark(b)) => b.description = description,
                        Some(Node::Folder(f)) => f.description = description,
                        None => {}
                    }
                    None
                }
                Some("dl") => Some(ListCursor::new(child, false)),
                _ => None,
            };
            cursors.push(cursor);
            cursors.extend(nested);
        }

        while folders.len() > 1 {
            close_folder(&mut folders, &mut []);
        }
        folders.pop().unwrap_or_else(|| Folder::new(""))
    }

    /// Handles one `<DT>`: adds its bookmark, or opens its folder and returns
    /// the cursor for the folder's list.
    fn walk_item(
        &self,
        item: NodeId,
        cursor: &mut ListCursor,
        folders: &mut Vec<Folder>,
    ) -> Option<ListCursor> {
        cursor.last_key = None;
        let Some(heading) = self.heading_of(item) else {
            let anchor = self.dom.find_shallow(item, |dom, id| dom.is_link(id))?;
            let bookmark = self.bookmark_at(anchor)?;
            let name = bookmark.name.clone();
            cursor.last_key = folders
                .last_mut()
                .map(|folder| folder.insert_unique(&name, bookmark.into()));
            return None;
        };

        let list = self.folder_list(item);
        if let Some(list) = list {
            if self.dom.parent(list) != Some(item) {
                cursor.claimed = Some(list);
            }
        }
        if folders.len() > MAX_FOLDER_DEPTH {
            return list.map(|list| ListCursor::new(list, false));
        }

        let folder = self.folder_at(heading);
        match list {
            Some(list) => {
                folders.push(folder);
                Some(ListCursor::new(list, true))
            }
            None => {
                let name = folder.name.clone();
                cursor.last_key = folders
                    .last_mut()
                    .map(|parent| parent.insert_unique(&name, folder.into()));
                None
            }
        }
    }

    /// Rebuilds the hierarchy from DOM ancestry alone: every link and folder
    /// marker is attached to the nearest enclosing marker, or to the root.
    /// Markers nested past [`MAX_FOLDER_DEPTH`] are merged into their
    /// deepest kept ancestor.
    fn flat_rebuild(&self) -> Folder {
        let dom = &self.dom;
        let markers: Vec<NodeId> = dom
            .elements()
            .filter(|&id| dom.tag(id) == Some("dt") && self.heading_of(id).is_some())
            .collect();

        let mut scope: HashMap<NodeId, usize> = HashMap::new();
        for (index, &marker) in markers.iter().enumerate() {
            scope.insert(marker, index);
            if let Some(list) = self.folder_list(marker) {
                scope.entry(list).or_insert(index);
            }
        }
        let root_slot = markers.len();

        // Nearest enclosing scope of every node, filled parent-first.
        let mut owner = vec![root_slot; dom.node_count()];
        for id in 1..dom.node_count() {
            if let Some(parent) = dom.parent(id) {
                owner[id] = scope.get(&parent).copied().unwrap_or(owner[parent]);
            }
        }

        // Folder each marker's contents go to, and that folder's level.
        let mut slot = vec![root_slot; root_slot];
        let mut level = vec![0usize; root_slot];
        for (index, &marker) in markers.iter().enumerate() {
            let parent = match owner[marker] {
                o if o == root_slot => root_slot,
                o => slot[o],
            };
            let parent_level = if parent == root_slot { 0 } else { level[parent] };
            if parent_level < MAX_FOLDER_DEPTH {
                slot[index] = index;
                level[index] = parent_level + 1;
            } else {
                slot[index] = parent;
                level[index] = parent_level;
            }
        }
        let target = |o: usize| if o == root_slot { root_slot } else { slot[o] };

        let mut items: Vec<(NodeId, FlatEntry)> = markers
            .iter()
            .enumerate()
            .filter(|&(index, _)| slot[index] == index)
            .map(|(index, &marker)| (marker, FlatEntry::Marker(index)))
            .chain(
                dom.elements()
                    .filter(|&id| dom.is_link(id))
                    .map(|id| (id, FlatEntry::Link(id))),
            )
            .collect();
        items.sort_by_key(|(id, _)| *id);

        let mut entries: Vec<Vec<FlatEntry>> = (0..=root_slot).map(|_| Vec::new()).collect();
        for (id, entry) in items {
            entries[target(owner[id])].push(entry);
        }

        // An owner always precedes what it owns in document order, so building
        // from the last marker backwards finishes every child before its parent.
        let mut built: Vec<Option<Folder>> = (0..root_slot).map(|_| None).collect();
        for index in (0..root_slot).rev() {
            if slot[index] != index {
                continue;
            }
            let mut folder = match self.heading_of(markers[index]) {
                Some(heading) => self.folder_at(heading),
                None => Folder::new("Untitled Folder"),
            };
            self.fill(&mut folder, &entries[index], &mut built);
            built[index] = Some(folder);
        }

        let mut root = Folder::new("");
        self.fill(&mut root, &entries[root_slot], &mut built);
        root
    }

    fn fill(&self, folder: &mut Folder, entries: &[FlatEntry], built: &mut [Option<Folder>]) {
        for entry in entries {
            match entry {
                FlatEntry::Link(anchor) => {
                    if let Some(bookmark) = self.bookmark_at(*anchor) {
                        let name = bookmark.name.clone();
                        folder.insert_unique(&name, bookmark.into());
                    }
                }
                FlatEntry::Marker(index) => {
                    if let Some(sub) = built[*index].take() {
                        let name = sub.name.clone();
                        folder.insert_unique(&name, sub.into());
                    }
                }
            }
        }
    }
}
