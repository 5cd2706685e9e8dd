//! Unit tests for the JSON document codec: strict parsing, schema validation
//! messages and deterministic encoding.

use rstest::rstest;
use urlnav::codecs::json_codec::{decode, encode};
use urlnav::types::errors::CodecError;
use urlnav::types::node::{Bookmark, Folder};

fn decode_err(text: &str) -> String {
    match decode(text.as_bytes()) {
        Err(CodecError::DecodeError(msg)) => msg,
        other => panic!("expected DecodeError, got {:?}", other),
    }
}

#[test]
fn test_decode_nested_document() {
    let root = decode(
        br#"{
            "Work": {
                "type": "folder",
                "description": "Day job",
                "created": 10,
                "modified": 20,
                "children": {
                    "Mail": {"type": "url", "url": "https://mail.example", "name": "Webmail",
                             "tags": ["email"], "visit_count": 3, "last_visit": 30}
                }
            },
            "News": {"type": "url", "url": "https://news.example", "name": "News"}
        }"#,
    )
    .unwrap();

    let keys: Vec<&str> = root.children.keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["Work", "News"]);

    let work = root.children["Work"].as_folder().unwrap();
    assert_eq!(work.name, "Work");
    assert_eq!(work.description, "Day job");
    assert_eq!((work.created, work.modified), (10, 20));

    let mail = work.children["Mail"].as_bookmark().unwrap();
    assert_eq!(mail.name, "Webmail");
    assert_eq!(mail.tags, vec!["email"]);
    assert_eq!(mail.visit_count, 3);
    assert_eq!(mail.last_visit, Some(30));
}

#[test]
fn test_duplicate_keys_are_rejected() {
    let msg = decode_err(
        r#"{"X": {"type": "folder", "children": {}}, "X": {"type": "url", "url": "u", "name": "n"}}"#,
    );
    assert!(msg.contains("duplicate key 'X'"), "{}", msg);
}

#[test]
fn test_nested_duplicate_keys_are_rejected() {
    let msg = decode_err(r#"{"A": {"type": "folder", "type": "folder", "children": {}}}"#);
    assert!(msg.contains("duplicate key 'type'"), "{}", msg);
}

#[rstest]
#[case(
    r#"{"Tech": {"type": "folder", "children": {"GitHub": {"type": "url", "name": "GitHub"}}}}"#,
    "Item 'Tech/GitHub' is missing the 'url' field"
)]
#[case(
    r#"{"A": {"type": "url", "url": "u"}}"#,
    "Item 'A' is missing the 'name' field"
)]
#[case(
    r#"{"A": {"type": "link", "url": "u", "name": "n"}}"#,
    "Item 'A' has unknown type 'link'"
)]
#[case(
    r#"{"A": {"url": "u", "name": "n"}}"#,
    "Item 'A' is missing the 'type' field"
)]
#[case(
    r#"{"A": {"type": "url", "url": "u", "name": "n", "color": "red"}}"#,
    "Item 'A' has unexpected field 'color'"
)]
#[case(
    r#"{"A": {"type": "folder", "children": {}, "url": "u"}}"#,
    "Item 'A' has unexpected field 'url'"
)]
#[case(
    r#"{"A": {"type": "folder"}}"#,
    "Item 'A' is missing the 'children' field"
)]
#[case(
    r#"{"A": {"type": "url", "url": 5, "name": "n"}}"#,
    "Item 'A' has a non-string 'url' field"
)]
#[case(
    r#"{"A": {"type": "url", "url": "u", "name": "n", "created": "yesterday"}}"#,
    "Item 'A' has a non-integer 'created' field"
)]
#[case(r#"{"A": []}"#, "Item 'A' is not an object")]
fn test_validation_messages(#[case] document: &str, #[case] expected: &str) {
    assert_eq!(decode_err(document), expected);
}

#[test]
fn test_malformed_json_is_summarized() {
    let msg = decode_err("{\n  \"A\": {\"type\": \"folder\",\n");
    assert!(msg.starts_with("malformed JSON near line"), "{}", msg);
}

#[test]
fn test_root_must_be_object() {
    assert_eq!(decode_err("[]"), "the document root must be an object");
}

#[test]
fn test_missing_timestamps_default_to_now() {
    let before = urlnav::types::node::now();
    let root = decode(br#"{"A": {"type": "url", "url": "u", "name": "n"}}"#).unwrap();
    let a = root.children["A"].as_bookmark().unwrap();
    assert!(a.created >= before);
    assert!(a.modified >= before);
    assert_eq!(a.last_visit, None);
}

#[test]
fn test_bom_is_ignored() {
    let root = decode(b"\xEF\xBB\xBF{}").unwrap();
    assert!(root.children.is_empty());
}

#[test]
fn test_encode_omits_empty_optionals_and_keeps_order() {
    let mut bookmark = Bookmark::new("Zed", "https://z.example", "");
    bookmark.created = 1;
    bookmark.modified = 2;
    let mut folder = Folder::new("Alpha");
    folder.created = 3;
    folder.modified = 4;
    let mut root = Folder::new("");
    root.children.insert("Zed".to_string(), bookmark.into());
    root.children.insert("Alpha".to_string(), folder.into());

    let text = String::from_utf8(encode(&root).unwrap()).unwrap();
    assert!(text.ends_with("}\n"));
    assert!(text.find("\"Zed\"").unwrap() < text.find("\"Alpha\"").unwrap());
    assert!(!text.contains("last_visit"));
    assert!(!text.contains("visit_count"));
    assert!(!text.contains("tags"));

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value["Zed"],
        serde_json::json!({
            "type": "url", "url": "https://z.example", "name": "Zed", "icon": "",
            "created": 1, "modified": 2
        })
    );
}

#[test]
fn test_default_library_roundtrip() {
    let root = Folder::default_library();
    let decoded = decode(&encode(&root).unwrap()).unwrap();
    assert_eq!(decoded.children, root.children);
    assert_eq!(encode(&decoded).unwrap(), encode(&root).unwrap());
}
