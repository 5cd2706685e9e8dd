//! Unit tests for the RandomPickService: drawing from subtrees, the bounded
//! history and its file.

use std::collections::HashSet;
use std::fs;

use tempfile::TempDir;
use urlnav::managers::tree_store::TreeStore;
use urlnav::services::random_pick::{RandomPickService, RandomPickServiceTrait};
use urlnav::types::errors::{PickError, TreeError};
use urlnav::types::node::{Folder, ROOT};
use urlnav::types::settings::{RandomPickSettings, DEFAULT_PICK_HISTORY};
use urlnav::types::url::UrlEntry;

fn settings(dir: &TempDir) -> RandomPickSettings {
    RandomPickSettings {
        history_file: Some(dir.path().join("history.json").to_string_lossy().to_string()),
        max_history: DEFAULT_PICK_HISTORY,
    }
}

fn new_service(root: Folder, dir: &TempDir) -> RandomPickService {
    let mut service = RandomPickService::new(TreeStore::with_root(root).into_shared(), settings(dir));
    service.load_history();
    service
}

fn entry(i: usize) -> UrlEntry {
    UrlEntry {
        url: format!("https://{}.example", i),
        name: format!("site {}", i),
        path: vec!["Stack".to_string()],
        icon: String::new(),
    }
}

// ─── Drawing ───

#[test]
fn test_collect_all_urls_walks_subfolders() {
    let dir = TempDir::new().unwrap();
    let service = new_service(Folder::default_library(), &dir);

    let all = service.collect_all_urls(ROOT).unwrap();
    assert_eq!(all.len(), 5);
    let tech = service.collect_all_urls(&["Tech Resources"]).unwrap();
    let names: Vec<&str> = tech.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Python", "JavaScript", "GitHub"]);
    assert_eq!(tech[0].path, ["Tech Resources", "Programming Languages"]);
}

#[test]
fn test_random_urls_are_distinct_and_inside_the_folder() {
    let dir = TempDir::new().unwrap();
    let service = new_service(Folder::default_library(), &dir);

    for _ in 0..20 {
        let picks = service.get_random_urls(&["Tech Resources"], 2).unwrap();
        assert_eq!(picks.len(), 2);
        assert_ne!(picks[0].url, picks[1].url);
        assert!(picks.iter().all(|e| e.path[0] == "Tech Resources"));
    }
}

#[test]
fn test_asking_for_too_many_returns_everything() {
    let dir = TempDir::new().unwrap();
    let service = new_service(Folder::default_library(), &dir);

    let picks = service.get_random_urls(&["Toolbox"], 10).unwrap();
    let urls: HashSet<_> = picks.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(
        urls,
        HashSet::from(["https://www.google.com", "https://www.bing.com"])
    );
}

#[test]
fn test_empty_or_missing_folders() {
    let dir = TempDir::new().unwrap();
    let mut root = Folder::default_library();
    root.insert_unique("Empty", Folder::new("Empty").into());
    let service = new_service(root, &dir);

    assert!(service.get_random_urls(&["Empty"], 3).unwrap().is_empty());
    assert_eq!(
        service.get_random_urls(&["Tech Resources", "GitHub"], 1).unwrap_err(),
        PickError::Tree(TreeError::NotFound("Tech Resources/GitHub".to_string()))
    );
}

// ─── History ───

#[test]
fn test_history_is_newest_first_and_persisted() {
    let dir = TempDir::new().unwrap();
    {
        let mut service = new_service(Folder::new(""), &dir);
        service.record(&[entry(1), entry(2)]).unwrap();
        service.record(&[entry(3)]).unwrap();
        let urls: Vec<_> = service.history().iter().map(|r| r.url.clone()).collect();
        assert_eq!(
            urls,
            ["https://3.example", "https://2.example", "https://1.example"]
        );
        assert_eq!(service.history()[1].timestamp, service.history()[2].timestamp);
    }

    let reloaded = new_service(Folder::new(""), &dir);
    assert_eq!(reloaded.history().len(), 3);
    assert_eq!(reloaded.history()[0].name, "site 3");
    assert_eq!(reloaded.history()[0].path, ["Stack"]);
}

#[test]
fn test_history_keeps_the_newest_hundred() {
    let dir = TempDir::new().unwrap();
    let mut service = new_service(Folder::new(""), &dir);
    for i in 0..(DEFAULT_PICK_HISTORY + 20) {
        service.record(&[entry(i)]).unwrap();
    }

    assert_eq!(service.history().len(), DEFAULT_PICK_HISTORY);
    assert_eq!(
        service.history()[0].url,
        format!("https://{}.example", DEFAULT_PICK_HISTORY + 19)
    );
    assert_eq!(service.history().last().unwrap().url, "https://20.example");
}

#[test]
fn test_entries_without_url_are_not_recorded() {
    let dir = TempDir::new().unwrap();
    let mut service = new_service(Folder::new(""), &dir);
    let mut blank = entry(1);
    blank.url.clear();

    service.record(&[blank]).unwrap();
    assert!(service.history().is_empty());
    assert!(!dir.path().join("history.json").exists());
}

#[test]
fn test_remove_and_clear() {
    let dir = TempDir::new().unwrap();
    let mut service = new_service(Folder::new(""), &dir);
    service.record(&[entry(1), entry(2), entry(3)]).unwrap();

    let removed = service.remove_history_item(1).unwrap();
    assert_eq!(removed.url, "https://2.example");
    assert_eq!(service.remove_history_item(5), Err(PickError::NoSuchEntry(5)));

    service.clear_history().unwrap();
    assert!(service.history().is_empty());
    assert_eq!(fs::read_to_string(dir.path().join("history.json")).unwrap(), "[]");
}

#[test]
fn test_malformed_history_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("history.json"), "{ not a list").unwrap();

    let mut service = new_service(Folder::new(""), &dir);
    assert!(service.history().is_empty());
    service.record(&[entry(1)]).unwrap();
    assert_eq!(new_service(Folder::new(""), &dir).history().len(), 1);
}

#[test]
fn test_lowering_the_limit_trims_history() {
    let dir = TempDir::new().unwrap();
    let mut service = new_service(Folder::new(""), &dir);
    service.record(&[entry(1), entry(2), entry(3)]).unwrap();

    let mut smaller = settings(&dir);
    smaller.max_history = 2;
    service.update_settings(smaller);
    assert_eq!(service.history().len(), 2);
    assert_eq!(service.history()[0].url, "https://3.example");
}
