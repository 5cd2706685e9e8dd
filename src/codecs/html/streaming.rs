//! Last-resort line scanner for bookmark files whose markup is too broken for
//! the DOM parse.
//!
//! Folder headings, links and list boundaries are recognized independently of
//! each other. A marker split across lines stays in the buffer until the line
//! completing it arrives.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::debug;

use super::decode::{bookmark_from_attrs, folder_from_attrs};
use super::dom::{tokenize, Token};
use super::text::unescape;
use crate::events::CancellationFlag;
use crate::types::errors::CodecError;
use crate::types::node::{Folder, MAX_FOLDER_DEPTH};

/// Lines scanned between cancellation checks.
const CHUNK_LINES: usize = 256;

/// Unfinished marker text beyond this size is cut in half.
const MAX_BUFFER: usize = 64 * 1024;

static MARKER: OnceLock<Regex> = OnceLock::new();
static OPENER: OnceLock<Regex> = OnceLock::new();
static INNER_TAG: OnceLock<Regex> = OnceLock::new();

fn marker_pattern() -> &'static Regex {
    MARKER.get_or_init(|| {
        Regex::new(
            r"(?is)(?P<heading><h3\b[^>]*>)(?P<title>.*?)</h3\s*>|(?P<anchor><a\s[^>]*>)(?P<label>.*?)</a\s*>|(?P<open><dl\b[^>]*>)|(?P<close></dl\s*>)",
        )
        .expect("valid regex")
    })
}

/// Starts of markers that later text could still complete.
fn opener_pattern() -> &'static Regex {
    OPENER.get_or_init(|| {
        Regex::new(r"(?i)(?P<anchor><a\s)|(?P<heading><h3\b)|(?P<tag><[^>]*$)")
            .expect("valid regex")
    })
}

fn inner_tag_pattern() -> &'static Regex {
    INNER_TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid regex"))
}

fn tag_attrs(tag: &str) -> Vec<(String, String)> {
    match tokenize(tag).into_iter().next() {
        Some(Token::Start { attrs, .. }) => attrs,
        _ => Vec::new(),
    }
}

fn markup_text(fragment: &str) -> String {
    unescape(&inner_tag_pattern().replace_all(fragment, " "))
}

/// Offsets of the earliest unfinished anchor, heading and tag in the buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Pending {
    anchor: Option<usize>,
    heading: Option<usize>,
    tag: Option<usize>,
}

impl Pending {
    fn find(text: &str, offset: usize) -> Self {
        let mut pending = Pending::default();
        for caps in opener_pattern().captures_iter(text) {
            let slot = if caps.name("anchor").is_some() {
                &mut pending.anchor
            } else if caps.name("heading").is_some() {
                &mut pending.heading
            } else {
                &mut pending.tag
            };
            if let Some(found) = caps.get(0) {
                slot.get_or_insert(offset + found.start());
            }
        }
        pending
    }

    /// Keeps the entries before `end` and takes the rest from `later`.
    fn before(self, end: usize, later: Pending) -> Self {
        let keep = |own: Option<usize>, other: Option<usize>| own.filter(|&at| at < end).or(other);
        Self {
            anchor: keep(self.anchor, later.anchor),
            heading: keep(self.heading, later.heading),
            tag: keep(self.tag, later.tag),
        }
    }

    fn start(&self) -> Option<usize> {
        [self.anchor, self.heading, self.tag].into_iter().flatten().min()
    }

    fn shifted(self, by: usize) -> Self {
        Self {
            anchor: self.anchor.map(|at| at - by),
            heading: self.heading.map(|at| at - by),
            tag: self.tag.map(|at| at - by),
        }
    }

    /// Earliest pending marker that `added` can complete.
    fn completed_by(&self, added: &str) -> Option<usize> {
        let lower = added.to_ascii_lowercase();
        let mut from: Option<usize> = None;
        let mut consider = |at: Option<usize>, hit: bool| {
            if let (Some(at), true) = (at, hit) {
                from = Some(from.map_or(at, |f| f.min(at)));
            }
        };
        consider(self.anchor, lower.contains("</a"));
        consider(self.heading, lower.contains("</h3"));
        consider(self.tag, added.contains('>'));
        from
    }
}

struct Frame {
    /// `None` for headings nested past the depth limit; their content goes
    /// to the nearest kept folder.
    folder: Option<Folder>,
    /// List depth at which this folder's own `<DL>` opened, once seen.
    list_depth: Option<usize>,
}

struct Scanner {
    stack: Vec<Frame>,
    list_depth: usize,
    pending: Pending,
    stamp: i64,
}

impl Scanner {
    fn new(stamp: i64) -> Self {
        Self {
            stack: vec![Frame {
                folder: Some(Folder::new("")),
                list_depth: Some(0),
            }],
            list_depth: 0,
            pending: Pending::default(),
            stamp,
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Innermost folder that is kept. Skipped frames only sit above the
    /// depth limit, so it is found by index.
    fn target(&mut self) -> &mut Folder {
        let index = self.stack.len().min(MAX_FOLDER_DEPTH + 1) - 1;
        self.stack[index]
            .folder
            .get_or_insert_with(|| Folder::new(""))
    }

    /// Pops the innermost folder into its parent.
    fn close_folder(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(Frame {
            folder: Some(folder),
            ..
        }) = self.stack.pop()
        {
            let name = folder.name.clone();
            self.target().insert_unique(&name, folder.into());
        }
    }

    fn handle(&mut self, caps: &Captures<'_>) {
        if let (Some(tag), Some(title)) = (caps.name("heading"), caps.name("title")) {
            // A folder that never opened a list is empty.
            if self.top().list_depth.is_none() {
                self.close_folder();
            }
            let folder = (self.stack.len() <= MAX_FOLDER_DEPTH).then(|| {
                folder_from_attrs(
                    &tag_attrs(tag.as_str()),
                    &markup_text(title.as_str()),
                    self.stamp,
                )
            });
            self.stack.push(Frame {
                folder,
                list_depth: None,
            });
        } else if let (Some(tag), Some(label)) = (caps.name("anchor"), caps.name("label")) {
            let attrs = tag_attrs(tag.as_str());
            let text = markup_text(label.as_str());
            if let Some(bookmark) = bookmark_from_attrs(&attrs, &text, self.stamp) {
                let name = bookmark.name.clone();
                self.target().insert_unique(&name, bookmark.into());
            }
        } else if caps.name("open").is_some() {
            self.list_depth += 1;
            let depth = self.list_depth;
            let top = self.top();
            if top.list_depth.is_none() {
                top.list_depth = Some(depth);
            }
        } else if caps.name("close").is_some() {
            if self.top().list_depth.is_none() {
                self.close_folder();
            }
            let depth = self.list_depth;
            if self.top().list_depth == Some(depth) {
                self.close_folder();
            }
            self.list_depth = self.list_depth.saturating_sub(1);
        }
    }

    /// Appends one line and processes the markers it completes.
    ///
    /// The buffer only ever holds text from the earliest unfinished marker
    /// on. Text before `old_len` is rescanned only when the line completes
    /// one of those markers.
    fn feed(&mut self, buffer: &mut String, line: &str) {
        let old_len = buffer.len();
        buffer.push_str(line);
        buffer.push('\n');

        // A closer may straddle the line break.
        let mut window = old_len.saturating_sub(6);
        while !buffer.is_char_boundary(window) {
            window -= 1;
        }
        let from = self
            .pending
            .completed_by(&buffer[window..])
            .map_or(old_len, |at| at.min(old_len));
        self.drain(buffer, from);
    }

    /// Processes every complete marker in `buffer[from..]` and drops text
    /// that no later marker can use.
    fn drain(&mut self, buffer: &mut String, from: usize) {
        let mut consumed = None;
        for caps in marker_pattern().captures_iter(&buffer[from..]) {
            self.handle(&caps);
            if let Some(whole) = caps.get(0) {
                consumed = Some(from + whole.end());
            }
        }
        match consumed {
            Some(end) => {
                buffer.drain(..end);
                self.pending = Pending::find(buffer, 0);
            }
            None => {
                let later = Pending::find(&buffer[from..], from);
                self.pending = self.pending.before(from, later);
            }
        }

        if buffer.len() > MAX_BUFFER {
            let mut cut = buffer.len() - MAX_BUFFER / 2;
            while !buffer.is_char_boundary(cut) {
                cut += 1;
            }
            debug!(dropped = cut, "streaming buffer over limit, dropping unfinished marker");
            buffer.drain(..cut);
            self.pending = Pending::find(buffer, 0);
        }

        match self.pending.start() {
            None => buffer.clear(),
            Some(0) => {}
            Some(start) => {
                buffer.drain(..start);
                self.pending = self.pending.shifted(start);
            }
        }
    }

    fn finish(mut self) -> Folder {
        while self.stack.len() > 1 {
            self.close_folder();
        }
        self.stack
            .pop()
            .and_then(|frame| frame.folder)
            .unwrap_or_else(|| Folder::new(""))
    }
}

/// Scans `text` line by line, checking `cancel` between chunks.
pub(super) fn scan(
    text: &str,
    cancel: &CancellationFlag,
    stamp: i64,
) -> Result<Folder, CodecError> {
    let mut scanner = Scanner::new(stamp);
    let mut buffer = String::new();

    for (index, line) in text.lines().enumerate() {
        if index % CHUNK_LINES == 0 && cancel.is_cancelled() {
            debug!(line = index, "streaming scan cancelled");
            return Err(CodecError::Cancelled);
        }
        scanner.feed(&mut buffer, line);
    }

    Ok(scanner.finish())
}
