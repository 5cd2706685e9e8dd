//! Tolerant tokenizer and arena DOM for bookmark markup.
//!
//! Only the tag-closing rules the bookmark dialect relies on are implemented:
//! `<DT>`/`<DD>` close an open item in the same list, `</DL>` closes every item
//! inside it, `<p>` is dropped, and void elements never take children. End
//! tags that match nothing are ignored, and apart from `</DL>` no end tag
//! closes elements across a list boundary.
//!
//! Nodes are appended in source order, so comparing two [`NodeId`]s compares
//! document positions.

use super::text::{collapse_whitespace, unescape};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

/// Parses the start tag opening at `start` (which holds `<`). Returns the
/// token and the index just past its `>`, or `None` if the tag never ends.
fn parse_start_tag(input: &str, start: usize) -> Option<(Token, usize)> {
    let bytes = input.as_bytes();
    let mut i = start + 1;
    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = input[name_start..i].to_ascii_lowercase();
    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        i = skip_whitespace(bytes, i);
        if i >= bytes.len() {
            return None;
        }
        match bytes[i] {
            b'>' => break,
            b'/' => {
                self_closing = bytes.get(i + 1) == Some(&b'>');
                i += 1;
                continue;
            }
            _ => {}
        }

        let attr_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && !matches!(bytes[i], b'=' | b'>' | b'/')
        {
            i += 1;
        }
        if i == attr_start {
            // Stray `=`: skip it.
            i += 1;
            continue;
        }
        let attr_name = input[attr_start..i].to_ascii_lowercase();

        i = skip_whitespace(bytes, i);
        let mut value = String::new();
        if bytes.get(i) == Some(&b'=') {
            i = skip_whitespace(bytes, i + 1);
            match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = i + 1;
                    let end = input[value_start..]
                        .find(quote as char)
                        .map(|offset| value_start + offset)?;
                    value = unescape(&input[value_start..end]);
                    i = end + 1;
                }
                Some(_) => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                        i += 1;
                    }
                    value = unescape(&input[value_start..i]);
                }
                None => return None,
            }
        }
        attrs.push((attr_name, value));
    }

    Some((
        Token::Start {
            name,
            attrs,
            self_closing,
        },
        i + 1,
    ))
}

/// Splits markup into start tags, end tags and text. Comments, doctypes and
/// processing instructions are dropped; a `<` that does not open a tag is text.
pub fn tokenize(input: &str) -> Vec<Token> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while let Some(offset) = input[pos..].find('<') {
        let lt = pos + offset;
        let next = bytes.get(lt + 1).copied();

        let consumed = if input[lt..].starts_with("<!--") {
            let end = input[lt + 4..]
                .find("-->")
                .map_or(input.len(), |e| lt + 4 + e + 3);
            Some((None, end))
        } else if matches!(next, Some(b'!') | Some(b'?')) {
            let end = input[lt..].find('>').map_or(input.len(), |e| lt + e + 1);
            Some((None, end))
        } else if next == Some(b'/') {
            let name_start = lt + 2;
            let mut i = name_start;
            while i < bytes.len() && is_name_byte(bytes[i]) {
                i += 1;
            }
            if i == name_start {
                None
            } else {
                let name = input[name_start..i].to_ascii_lowercase();
                let end = input[i..].find('>').map_or(input.len(), |e| i + e + 1);
                Some((Some(Token::End { name }), end))
            }
        } else if next.is_some_and(|b| b.is_ascii_alphabetic()) {
            parse_start_tag(input, lt).map(|(token, end)| (Some(token), end))
        } else {
            None
        };

        let Some((token, end)) = consumed else {
            pos = lt + 1;
            continue;
        };

        if lt > text_start {
            tokens.push(Token::Text(input[text_start..lt].to_string()));
        }
        pos = end;
        text_start = end;

        if let Some(token) = token {
            let raw_text = match &token {
                Token::Start { name, .. } if RAW_TEXT_ELEMENTS.contains(&name.as_str()) => {
                    Some(format!("</{}", name))
                }
                _ => None,
            };
            tokens.push(token);
            if let Some(close) = raw_text {
                // Skip the element body without tokenizing it.
                let body_end = input[pos..]
                    .to_ascii_lowercase()
                    .find(&close)
                    .map_or(input.len(), |e| pos + e);
                pos = body_end;
                text_start = body_end;
            }
        }
    }

    if text_start < input.len() {
        tokens.push(Token::Text(input[text_start..].to_string()));
    }
    tokens
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct DomNode {
    pub parent: Option<NodeId>,
    /// Position among the parent's children.
    pub index: usize,
    pub children: Vec<NodeId>,
    pub data: NodeData,
}

/// Arena-allocated document tree.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<DomNode>,
}

impl Dom {
    pub const DOCUMENT: NodeId = 0;

    /// Builds a tree from markup, never failing.
    pub fn parse(input: &str) -> Dom {
        let mut dom = Dom {
            nodes: vec![DomNode {
                parent: None,
                index: 0,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        };
        let mut open: Vec<NodeId> = vec![Self::DOCUMENT];

        for token in tokenize(input) {
            match token {
                Token::Text(text) => {
                    let parent = *open.last().unwrap_or(&Self::DOCUMENT);
                    dom.append(parent, NodeData::Text(unescape(&text)));
                }
                Token::Start {
                    name,
                    attrs,
                    self_closing,
                } => {
                    if name == "p" {
                        continue;
                    }
                    if name == "dt" || name == "dd" {
                        dom.close_open_item(&mut open);
                    }
                    if name == "a" {
                        if let Some(index) = dom.open_index_within_list(&open, "a") {
                            open.truncate(index);
                        }
                    }
                    let parent = *open.last().unwrap_or(&Self::DOCUMENT);
                    let is_void = self_closing || VOID_ELEMENTS.contains(&name.as_str());
                    let id = dom.append(parent, NodeData::Element { name, attrs });
                    if !is_void {
                        open.push(id);
                    }
                }
                Token::End { name } => {
                    if name == "p" {
                        continue;
                    }
                    let index = if name == "dl" {
                        open.iter().rposition(|&id| dom.tag(id) == Some("dl"))
                    } else {
                        dom.open_index_within_list(&open, &name)
                    };
                    if let Some(index) = index {
                        open.truncate(index);
                    }
                }
            }
        }
        dom
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        let index = self.nodes[parent].children.len();
        self.nodes.push(DomNode {
            parent: Some(parent),
            index,
            children: Vec::new(),
            data,
        });
        self.nodes[parent].children.push(id);
        id
    }

    /// Position in `open` of the innermost element named `name`, searching no
    /// further out than the innermost open list.
    fn open_index_within_list(&self, open: &[NodeId], name: &str) -> Option<usize> {
        for (index, &id) in open.iter().enumerate().rev() {
            match self.tag(id) {
                Some(tag) if tag == name => return Some(index),
                Some("dl") => return None,
                _ => {}
            }
        }
        None
    }

    /// Closes an open `<DT>`/`<DD>` that belongs to the innermost open list.
    fn close_open_item(&self, open: &mut Vec<NodeId>) {
        let mut item = None;
        for (index, &id) in open.iter().enumerate().rev() {
            match self.tag(id) {
                Some("dl") => break,
                Some("dt") | Some("dd") => item = Some(index),
                _ => {}
            }
        }
        if let Some(index) = item {
            open.truncate(index);
        }
    }

    /// Number of nodes, the document node included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &DomNode {
        &self.nodes[id]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Lowercase tag name, or `None` for text and the document node.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn is_heading(&self, id: NodeId) -> bool {
        matches!(self.tag(id), Some("h1" | "h2" | "h3" | "h4" | "h5" | "h6"))
    }

    /// An `<a>` carrying an `href`.
    pub fn is_link(&self, id: NodeId) -> bool {
        self.tag(id) == Some("a") && self.attr(id, "href").is_some()
    }

    /// Ancestors of `id`, innermost first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&current| self.parent(current))
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        siblings[self.nodes[id].index + 1..]
            .iter()
            .copied()
            .find(|&s| self.tag(s).is_some())
    }

    /// First descendant of `id` satisfying `pred`, without descending into
    /// nested lists or list items.
    pub fn find_shallow<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Dom, NodeId) -> bool,
    {
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if pred(self, next) {
                return Some(next);
            }
            if !matches!(self.tag(next), Some("dl" | "dt" | "dd")) {
                stack.extend(self.children(next).iter().rev());
            }
        }
        None
    }

    /// Whitespace-collapsed text below `id`, skipping nested lists.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut raw = String::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            match &self.nodes[next].data {
                NodeData::Text(text) => raw.push_str(text),
                NodeData::Element { name, .. } if name == "dl" => {}
                _ => stack.extend(self.children(next).iter().rev()),
            }
        }
        collapse_whitespace(&raw)
    }

    /// All element ids in document order.
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter(move |&id| self.tag(id).is_some())
    }
}
