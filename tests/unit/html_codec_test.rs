//! Unit tests for the Netscape bookmark file codec: each decode stage, the
//! input guards, encoding detection and export/re-import fidelity.

use urlnav::codecs::html::{
    decode, encode, DecodeStage, HtmlDecodeOptions, HtmlImport, TextEncoding, UNCATEGORIZED_FOLDER,
};
use urlnav::events::CancellationFlag;
use urlnav::types::errors::CodecError;
use urlnav::types::node::{Bookmark, Folder, MAX_FOLDER_DEPTH};

fn run(text: &str) -> Result<HtmlImport, CodecError> {
    decode(
        text.as_bytes(),
        &HtmlDecodeOptions::default(),
        &CancellationFlag::new(),
    )
}

fn folder<'a>(root: &'a Folder, path: &[&str]) -> &'a Folder {
    path.iter().fold(root, |current, name| {
        current.children[*name]
            .as_folder()
            .unwrap_or_else(|| panic!("{} is not a folder", name))
    })
}

const FIREFOX_EXPORT: &str = r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file.
     It will be read and overwritten.
     DO NOT EDIT! -->
<META HTTP-EQUIV="Content-Type" CONTENT="text/html; charset=UTF-8">
<meta http-equiv="Content-Security-Policy"
      content="default-src 'self'; script-src 'none'; img-src data: *; object-src 'none'"></meta>
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks Menu</H1>

<DL><p>
    <DT><H3 ADD_DATE="1700000000" LAST_MODIFIED="1700000500" PERSONAL_TOOLBAR_FOLDER="true">Bookmarks Toolbar</H3>
    <DL><p>
        <DT><A HREF="https://www.rust-lang.org/" ADD_DATE="1700000100" LAST_MODIFIED="1700000200" ICON_URI="https://www.rust-lang.org/favicon.ico" TAGS="lang,rust">Rust &amp; Cargo</A>
        <DD>Systems programming
        <DT><H3 ADD_DATE="1700000300" LAST_MODIFIED="1700000400">Reading</H3>
        <DL><p>
            <DT><A HREF="https://news.example/" ADD_DATE="1700000350">News</A>
        </DL><p>
    </DL><p>
    <HR>
    <DT><A HREF="https://mail.example/" ADD_DATE="1700000600000">Mail</A>
</DL>
"#;

// ─── Structured parse ───

#[test]
fn test_firefox_export_is_fully_structured() {
    let import = run(FIREFOX_EXPORT).unwrap();
    assert_eq!(import.stage, DecodeStage::Structured);
    assert_eq!(import.encoding, TextEncoding::Utf8);

    let root = &import.root;
    assert_eq!(root.bookmark_count(), 3);
    let keys: Vec<&str> = root.children.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["Bookmarks Toolbar", "Mail"]);

    let toolbar = folder(root, &["Bookmarks Toolbar"]);
    assert_eq!((toolbar.created, toolbar.modified), (1_700_000_000, 1_700_000_500));

    let rust = toolbar.children["Rust & Cargo"].as_bookmark().unwrap();
    assert_eq!(rust.url, "https://www.rust-lang.org/");
    assert_eq!(rust.icon, "https://www.rust-lang.org/favicon.ico");
    assert_eq!(rust.tags, vec!["lang", "rust"]);
    assert_eq!(rust.description, "Systems programming");
    assert_eq!(rust.created, 1_700_000_100);

    let reading = folder(root, &["Bookmarks Toolbar", "Reading"]);
    assert!(reading.children.contains_key("News"));

    let mail = root.children["Mail"].as_bookmark().unwrap();
    assert_eq!(mail.created, 1_700_000_600);
}

#[test]
fn test_same_named_folders_are_suffixed() {
    let import = run(
        "<DL><p>\
         <DT><H3>Docs</H3><DL><p><DT><A HREF=\"https://a.example\">Home</A></DL><p>\
         <DT><H3>Docs</H3><DL><p><DT><A HREF=\"https://b.example\">Home</A></DL><p>\
         </DL>",
    )
    .unwrap();
    let root = &import.root;
    assert_eq!(root.bookmark_count(), 2);
    assert_eq!(
        folder(root, &["Docs"]).children["Home"].as_bookmark().unwrap().url,
        "https://a.example"
    );
    let second = folder(root, &["Docs (1)"]);
    assert_eq!(second.name, "Docs (1)");
    assert_eq!(second.children["Home"].as_bookmark().unwrap().url, "https://b.example");
}

#[test]
fn test_same_named_links_in_one_folder_are_suffixed() {
    let import = run(
        "<DL><p><DT><H3>Start</H3><DL><p>\
         <DT><A HREF=\"https://a.example\">Home</A>\
         <DT><A HREF=\"https://b.example\">Home</A>\
         </DL><p></DL>",
    )
    .unwrap();
    let start = folder(&import.root, &["Start"]);
    let keys: Vec<&str> = start.children.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["Home", "Home (1)"]);
    assert_eq!(start.children["Home (1)"].as_bookmark().unwrap().url, "https://b.example");
}

#[test]
fn test_unclosed_lists_recover_via_flat_rebuild() {
    let import = run(
        "<DL><DT><H3>Work</H3><DL><DT><A HREF=\"https://w.example\">W</A></DL></DL>\
         <DT><A HREF=\"https://x.example\">X</A>\
         <DT><A HREF=\"https://y.example\">Y</A>",
    )
    .unwrap();
    assert_eq!(import.stage, DecodeStage::FlatRebuild);
    assert_eq!(import.root.bookmark_count(), 3);
    assert!(folder(&import.root, &["Work"]).children.contains_key("W"));
}

/// Thousands of folders whose lists never close nest each list in the
/// previous one. Decoding must neither exhaust the stack nor keep folders
/// past the depth limit.
#[test]
fn test_deeply_unclosed_folders_are_capped() {
    let mut text = String::from("<DL><p>\n");
    text.push_str(&"<DT><H3>f</H3><DL>\n".repeat(10_000));
    text.push_str("<DT><A HREF=\"https://x.example\">x</A>");

    let import = run(&text).unwrap();
    assert_eq!(import.stage, DecodeStage::Structured);
    assert_eq!(import.root.nesting_depth(), MAX_FOLDER_DEPTH);
    assert_eq!(import.root.bookmark_count(), 1);
    let deepest = folder(&import.root, &vec!["f"; MAX_FOLDER_DEPTH]);
    assert!(deepest.children.contains_key("x"));
}

#[test]
fn test_flat_rebuild_caps_deep_markers() {
    let mut text = String::from("<DL><p>\n");
    text.push_str(&"<DT><H3>f</H3><DL><p>\n".repeat(5_000));
    text.push_str("<DT><A HREF=\"https://x.example\">x</A>\n");
    text.push_str(&"</DL><p>\n".repeat(5_000));
    text.push_str("</DL>\n<DT><A HREF=\"https://y.example\">y</A>\n");

    let import = run(&text).unwrap();
    assert_eq!(import.stage, DecodeStage::FlatRebuild);
    assert_eq!(import.root.nesting_depth(), MAX_FOLDER_DEPTH);
    assert!(import.root.children.contains_key("y"));
    let deepest = folder(&import.root, &vec!["f"; MAX_FOLDER_DEPTH]);
    assert!(deepest.children.contains_key("x"));
}

// ─── Regex extraction ───

#[test]
fn test_flat_anchors_go_to_uncategorized_folder() {
    let import = run(
        "<html><body>\
         <p><a href=\"https://a.example\">Home</a></p>\
         <p><a href=\"https://b.example\">Home</a></p>\
         <p><a href=\"https://c.example\"></a></p>\
         <p><a href=\"javascript:alert(1)\">Run</a></p>\
         </body></html>",
    )
    .unwrap();
    assert_eq!(import.stage, DecodeStage::Regex);
    let links = folder(&import.root, &[UNCATEGORIZED_FOLDER]);
    let keys: Vec<&str> = links.children.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["Home", "Home (1)", "https://c.example"]);
}

// ─── Streaming scan ───

#[test]
fn test_links_outside_items_use_streaming_scan() {
    let import = run(
        "<H3>Folder</H3>\n<DL>\n<A HREF=\"https://one.example\">one</A>\n</DL>\n\
         <A HREF=\"https://two.example\">two</A>\n",
    )
    .unwrap();
    assert_eq!(import.stage, DecodeStage::Streaming);
    assert!(folder(&import.root, &["Folder"]).children.contains_key("one"));
    assert!(import.root.children.contains_key("two"));
}

#[test]
fn test_cancelled_decode() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let result = decode(
        FIREFOX_EXPORT.as_bytes(),
        &HtmlDecodeOptions::default(),
        &flag,
    );
    assert_eq!(result.unwrap_err(), CodecError::Cancelled);
}

// ─── Guards ───

#[test]
fn test_empty_and_blank_files_are_unsupported() {
    assert!(matches!(run(""), Err(CodecError::UnsupportedFile(_))));
    assert!(matches!(run("  \n\t "), Err(CodecError::UnsupportedFile(_))));
}

#[test]
fn test_oversize_file_is_rejected() {
    let options = HtmlDecodeOptions { max_bytes: 16 };
    let result = decode(
        b"<DL><DT><A HREF=\"u\">x</A></DL>",
        &options,
        &CancellationFlag::new(),
    );
    match result {
        Err(CodecError::UnsupportedFile(msg)) => assert!(msg.contains("16 byte limit"), "{}", msg),
        other => panic!("expected UnsupportedFile, got {:?}", other),
    }
}

#[test]
fn test_no_recoverable_bookmarks() {
    assert_eq!(
        run("<DL><DT><H3>Empty</H3><DL></DL></DL>").unwrap_err(),
        CodecError::UnsupportedFile("no bookmarks could be recovered".to_string())
    );
    assert!(matches!(
        run("just some words"),
        Err(CodecError::UnsupportedFile(_))
    ));
}

// ─── Encodings ───

#[test]
fn test_utf16_with_bom() {
    let text = "<DL><DT><A HREF=\"https://u.example\">Über</A></DL>";
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let import = decode(&bytes, &HtmlDecodeOptions::default(), &CancellationFlag::new()).unwrap();
    assert_eq!(import.encoding, TextEncoding::Utf16Le);
    assert!(import.root.children.contains_key("Über"));
}

#[test]
fn test_gbk_file() {
    let mut bytes = b"<DL><DT><H3>".to_vec();
    bytes.extend_from_slice(b"\xCA\xD5\xB2\xD8\xBC\xD0");
    bytes.extend_from_slice(b"</H3><DL><DT><A HREF=\"https://s.example\">");
    bytes.extend_from_slice(b"\xCA\xE9\xC7\xA9");
    bytes.extend_from_slice(b"</A></DL></DL>");
    let import = decode(&bytes, &HtmlDecodeOptions::default(), &CancellationFlag::new()).unwrap();
    assert_eq!(import.encoding, TextEncoding::Gbk);
    assert!(folder(&import.root, &["收藏夹"]).children.contains_key("书签"));
}

#[test]
fn test_windows_1252_fallback() {
    let mut bytes = b"<DL><DT><A HREF=\"https://c.example\">Caf".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b" \x93menu\x94</A></DL>");
    let import = decode(&bytes, &HtmlDecodeOptions::default(), &CancellationFlag::new()).unwrap();
    assert_eq!(import.encoding, TextEncoding::Windows1252);
    assert!(import.root.children.contains_key("Café \u{201C}menu\u{201D}"));
}

// ─── Export ───

#[test]
fn test_default_library_survives_html_roundtrip() {
    let original = Folder::default_library();
    let html = encode(&original);
    let import = run(&html).unwrap();

    assert_eq!(import.stage, DecodeStage::Structured);
    assert_eq!(import.root.bookmark_count(), original.bookmark_count());
    assert_eq!(import.root.bookmark_count(), 5);
    assert_eq!(import.root.folder_count(), original.folder_count());
    assert!(folder(&import.root, &["Toolbox", "Search Engines"])
        .children
        .contains_key("Google Search"));
}

#[test]
fn test_exported_metadata_roundtrips() {
    let mut bookmark = Bookmark::new("Q&A <forum> \"quotes\"", "https://q.example/?a=1&b=2", "data:image/png;base64,AA==");
    bookmark.created = 100;
    bookmark.modified = 200;
    bookmark.last_visit = Some(300);
    bookmark.tags = vec!["help".to_string(), "community".to_string()];
    bookmark.description = "Ask & answer".to_string();
    let mut sub = Folder::new("Tom's");
    sub.description = "Shared links".to_string();
    sub.created = 10;
    sub.modified = 20;
    sub.insert_unique("Q&A <forum> \"quotes\"", bookmark.clone().into());
    let mut root = Folder::new("");
    root.insert_unique("Tom's", sub.into());

    let import = run(&encode(&root)).unwrap();
    let toms = folder(&import.root, &["Tom's"]);
    assert_eq!(toms.description, "Shared links");
    assert_eq!((toms.created, toms.modified), (10, 20));
    let back = toms.children[bookmark.name.as_str()].as_bookmark().unwrap();
    assert_eq!(back, &bookmark);
}
