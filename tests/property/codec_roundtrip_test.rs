//! Property-based tests for the two document codecs.
//!
//! JSON: `decode(encode(T))` reproduces every child of `T` exactly.
//! HTML: an export re-imported by the structured parse alone yields the same
//! multiset of (bookmark name, url) pairs as the original tree.

use proptest::collection::vec;
use proptest::prelude::*;
use urlnav::codecs::html::{self, DecodeStage, HtmlDecodeOptions};
use urlnav::codecs::json_codec;
use urlnav::events::CancellationFlag;
use urlnav::managers::tree_store::{TreeStore, TreeStoreTrait};
use urlnav::types::node::{Bookmark, Folder, Node, MAX_FOLDER_DEPTH};

fn arb_bookmark(names: BoxedStrategy<String>) -> impl Strategy<Value = Bookmark> {
    (
        names,
        "https://[a-z]{1,8}\\.example/[a-z0-9&=?]{0,6}",
        vec("[a-z]{1,5}", 0..3),
        "[a-zA-Z0-9]{0,12}",
        (0i64..2_000_000_000, 0i64..2_000_000_000),
        (0u64..50, proptest::option::of(0i64..2_000_000_000)),
    )
        .prop_map(|(name, url, tags, description, (created, modified), (visits, last_visit))| {
            let mut bookmark = Bookmark::new(&name, &url, "");
            bookmark.tags = tags;
            bookmark.description = description;
            bookmark.created = created;
            bookmark.modified = modified;
            bookmark.visit_count = visits;
            bookmark.last_visit = last_visit;
            bookmark
        })
}

fn arb_tree(names: BoxedStrategy<String>) -> impl Strategy<Value = Folder> {
    let leaf = arb_bookmark(names.clone()).prop_map(Node::from);
    let folder_names = names;
    let node = leaf.prop_recursive(3, 32, 4, move |inner| {
        (folder_names.clone(), vec(inner, 0..4)).prop_map(|(name, children)| {
            let mut folder = Folder::new(&name);
            for child in children {
                let base = child.name().to_string();
                folder.insert_unique(&base, child);
            }
            Node::Folder(folder)
        })
    });
    vec(node, 0..5).prop_map(|nodes| {
        let mut root = Folder::new("");
        for node in nodes {
            let base = node.name().to_string();
            root.insert_unique(&base, node);
        }
        root
    })
}

/// Any printable text, including markup and quote characters.
fn json_names() -> BoxedStrategy<String> {
    "[ -~]{1,10}".boxed()
}

/// Names that survive whitespace collapsing in markup text.
fn html_names() -> BoxedStrategy<String> {
    "[A-Za-z0-9&<>'\"]{1,6}( [A-Za-z0-9&<>'\"]{1,6}){0,2}".boxed()
}

/// A chain of `depth` nested folders built through the store, with one
/// bookmark in the deepest folder.
fn deep_chain(depth: usize) -> Folder {
    let mut store = TreeStore::new();
    let mut path: Vec<String> = Vec::new();
    for level in 0..depth {
        let name = format!("level {}", level + 1);
        store.add_folder(&path, &name).unwrap();
        path.push(name);
    }
    store.add_bookmark(&path, "leaf", "https://leaf.example", "").unwrap();
    store.root().clone()
}

fn name_url_pairs(folder: &Folder, out: &mut Vec<(String, String)>) {
    for node in folder.children.values() {
        match node {
            Node::Bookmark(b) => out.push((b.name.clone(), b.url.clone())),
            Node::Folder(sub) => name_url_pairs(sub, out),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn json_roundtrip_preserves_tree(tree in arb_tree(json_names())) {
        let bytes = json_codec::encode(&tree).unwrap();
        let decoded = json_codec::decode(&bytes).unwrap();
        prop_assert_eq!(&decoded.children, &tree.children);
    }

    #[test]
    fn deep_trees_roundtrip_through_both_codecs(depth in 1..=MAX_FOLDER_DEPTH) {
        let tree = deep_chain(depth);

        let decoded = json_codec::decode(&json_codec::encode(&tree).unwrap()).unwrap();
        prop_assert_eq!(&decoded.children, &tree.children);

        let import = html::decode(
            html::encode(&tree).as_bytes(),
            &HtmlDecodeOptions::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        prop_assert_eq!(import.stage, DecodeStage::Structured);
        prop_assert_eq!(import.root.nesting_depth(), depth);
        prop_assert_eq!(import.root.bookmark_count(), 1);
    }

    #[test]
    fn html_roundtrip_preserves_bookmarks(tree in arb_tree(html_names())) {
        prop_assume!(tree.bookmark_count() > 0);

        let text = html::encode(&tree);
        let import = html::decode(
            text.as_bytes(),
            &HtmlDecodeOptions::default(),
            &CancellationFlag::new(),
        )
        .unwrap();
        prop_assert_eq!(import.stage, DecodeStage::Structured);

        let mut expected = Vec::new();
        name_url_pairs(&tree, &mut expected);
        let mut actual = Vec::new();
        name_url_pairs(&import.root, &mut actual);
        expected.sort();
        actual.sort();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(import.root.folder_count(), tree.folder_count());
    }
}
