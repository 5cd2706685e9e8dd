use std::fmt::Write;

use super::text::escape;
use crate::types::node::{Folder, Node};

const PREAMBLE: &str = "<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file.
     It will be read and overwritten.
     DO NOT EDIT! -->
<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
";

const INDENT: &str = "    ";

/// Renders `root` as a Netscape bookmark file.
pub fn encode(root: &Folder) -> String {
    let mut out = String::from(PREAMBLE);
    write_children(&mut out, root, 1);
    out.push_str("</DL><p>\n");
    out
}

fn write_children(out: &mut String, folder: &Folder, depth: usize) {
    let indent = INDENT.repeat(depth);
    for (key, node) in &folder.children {
        match node {
            Node::Folder(sub) => {
                // Writing to a String cannot fail.
                let _ = writeln!(
                    out,
                    "{indent}<DT><H3 ADD_DATE=\"{}\" LAST_MODIFIED=\"{}\">{}</H3>",
                    sub.created,
                    sub.modified,
                    escape(key)
                );
                if !sub.description.is_empty() {
                    let _ = writeln!(out, "{indent}<DD>{}", escape(&sub.description));
                }
                let _ = writeln!(out, "{indent}<DL><p>");
                write_children(out, sub, depth + 1);
                let _ = writeln!(out, "{indent}</DL><p>");
            }
            Node::Bookmark(b) => {
                let _ = write!(
                    out,
                    "{indent}<DT><A HREF=\"{}\" ADD_DATE=\"{}\" LAST_MODIFIED=\"{}\"",
                    escape(&b.url),
                    b.created,
                    b.modified
                );
                if let Some(last_visit) = b.last_visit {
                    let _ = write!(out, " LAST_VISIT=\"{}\"", last_visit);
                }
                if !b.icon.is_empty() {
                    let _ = write!(out, " ICON=\"{}\"", escape(&b.icon));
                }
                if !b.tags.is_empty() {
                    let _ = write!(out, " TAGS=\"{}\"", escape(&b.tags.join(",")));
                }
                let _ = writeln!(out, ">{}</A>", escape(&b.name));
                if !b.description.is_empty() {
                    let _ = writeln!(out, "{indent}<DD>{}", escape(&b.description));
                }
            }
        }
    }
}
