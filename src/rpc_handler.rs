//! RPC method handler for the urlnav JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! bookmark tree and services via the `App` struct.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::app::App;
use crate::codecs::json_codec::node_to_value;
use crate::events::Operation;
use crate::managers::tree_store::{BookmarkUpdate, TreeStoreTrait};
use crate::services::backup::{BackupOutcome, BackupServiceTrait};
use crate::services::interchange::TransferReport;
use crate::services::random_pick::RandomPickServiceTrait;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::types::errors::CodecError;
use crate::types::search::SearchOptions;

use serde_json::{json, Value};

/// Reads a path parameter: an array of folder names. Absent means the root.
fn path_param(params: &Value, key: &str) -> Result<Vec<String>, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("{} must be an array of strings", key))
            })
            .collect(),
        Some(_) => Err(format!("{} must be an array of strings", key)),
    }
}

fn file_param(params: &Value) -> Result<PathBuf, String> {
    let path = params.get("path").and_then(|v| v.as_str()).ok_or("missing path")?;
    if path.is_empty() {
        return Err("path cannot be empty".to_string());
    }
    Ok(PathBuf::from(path))
}

/// Sends the closing progress event and converts the report for the wire.
fn transfer(
    a: &App,
    operation: Operation,
    result: Result<TransferReport, CodecError>,
) -> Result<Value, String> {
    a.interchange.complete(operation, &result);
    let report = result.map_err(|e| e.to_string())?;
    serde_json::to_value(report).map_err(|e| e.to_string())
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Tree ───
        "tree.get" => {
            let path = path_param(params, "path")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let tree = a.tree.lock().map_err(|e| e.to_string())?;
            let node = tree.get(&path).map_err(|e| e.to_string())?;
            Ok(node_to_value(node))
        }
        "tree.add_bookmark" => {
            let parent = path_param(params, "parent")?;
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let url = params.get("url").and_then(|v| v.as_str()).ok_or("missing url")?;
            let icon = params.get("icon").and_then(|v| v.as_str()).unwrap_or("");
            if name.is_empty() {
                return Err("name cannot be empty".to_string());
            }
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.add_bookmark(&parent, name, url, icon).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.add_folder" => {
            let parent = path_param(params, "parent")?;
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            if name.is_empty() {
                return Err("name cannot be empty".to_string());
            }
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.add_folder(&parent, name).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.rename" => {
            let parent = path_param(params, "parent")?;
            let old_name = params.get("old_name").and_then(|v| v.as_str()).ok_or("missing old_name")?;
            let new_name = params.get("new_name").and_then(|v| v.as_str()).ok_or("missing new_name")?;
            if new_name.is_empty() {
                return Err("new_name cannot be empty".to_string());
            }
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.rename(&parent, old_name, new_name).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.update_bookmark" => {
            let parent = path_param(params, "parent")?;
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let update: BookmarkUpdate = serde_json::from_value(params.clone())
                .map_err(|e| format!("invalid update: {}", e))?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.update_bookmark(&parent, name, update).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.delete" => {
            let parent = path_param(params, "parent")?;
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.delete(&parent, name).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.move" => {
            let src_parent = path_param(params, "src_parent")?;
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let dst_parent = path_param(params, "dst_parent")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.move_node(&src_parent, name, &dst_parent).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.record_visit" => {
            let parent = path_param(params, "parent")?;
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let mut tree = a.tree.lock().map_err(|e| e.to_string())?;
            tree.record_visit(&parent, name).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "tree.search" => {
            let query = params.get("query").and_then(|v| v.as_str()).ok_or("missing query")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let options: SearchOptions = match params.get("options") {
                Some(v) if !v.is_null() => serde_json::from_value(v.clone())
                    .map_err(|e| format!("invalid options: {}", e))?,
                _ => a.settings_engine.get_settings().search.clone(),
            };
            let tree = a.tree.lock().map_err(|e| e.to_string())?;
            let arr: Vec<Value> = tree
                .search(query, &options)
                .map(|hit| json!({"path": hit.path, "node": node_to_value(hit.node)}))
                .collect();
            Ok(json!(arr))
        }

        // ─── Import / Export ───
        "import.html" => {
            let path = file_param(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = a.interchange.try_import_html(&path);
            transfer(&a, Operation::Import, result)
        }
        "import.json" => {
            let path = file_param(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = a.interchange.try_import_json(&path);
            transfer(&a, Operation::Import, result)
        }
        "export.html" => {
            let path = file_param(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = a.interchange.try_export_html(&path);
            transfer(&a, Operation::Export, result)
        }
        "export.json" => {
            let path = file_param(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = a.interchange.try_export_json(&path);
            transfer(&a, Operation::Export, result)
        }
        "export.subtree_html" => {
            let path = file_param(params)?;
            let subtree = path_param(params, "subtree")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = a.interchange.try_export_subtree_html(&path, &subtree);
            transfer(&a, Operation::Export, result)
        }
        "export.subtree_json" => {
            let path = file_param(params)?;
            let subtree = path_param(params, "subtree")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let result = a.interchange.try_export_subtree_json(&path, &subtree);
            transfer(&a, Operation::Export, result)
        }

        // ─── Library / Backup ───
        "library.save" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let path = match params.get("path").and_then(|v| v.as_str()) {
                Some(p) if !p.is_empty() => PathBuf::from(p),
                _ => a.library_path(),
            };
            let count = a.interchange.save_library(&path).map_err(|e| e.to_string())?;
            Ok(json!({"count": count, "path": path.to_string_lossy()}))
        }
        "backup.create" => {
            let force = params.get("force").and_then(|v| v.as_bool()).unwrap_or(false);
            let a = app.lock().map_err(|e| e.to_string())?;
            let root = {
                let tree = a.tree.lock().map_err(|e| e.to_string())?;
                tree.root().clone()
            };
            let dir = a.backup.directory();
            let outcome = a.backup.create_backup(&root, &dir, force).map_err(|e| e.to_string())?;
            let pruned = a
                .backup
                .prune(&dir, a.backup.settings().keep)
                .map_err(|e| e.to_string())?;
            match outcome {
                BackupOutcome::Created(set) => Ok(json!({
                    "created": true,
                    "timestamp": set.timestamp,
                    "json_path": set.json_path.map(|p| p.to_string_lossy().to_string()),
                    "html_path": set.html_path.map(|p| p.to_string_lossy().to_string()),
                    "pruned": pruned,
                })),
                BackupOutcome::Skipped { newest } => Ok(json!({
                    "created": false,
                    "timestamp": newest,
                    "pruned": pruned,
                })),
            }
        }

        // ─── Random picks ───
        "pick.collect" => {
            let path = path_param(params, "path")?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let entries = a.picker.collect_all_urls(&path).map_err(|e| e.to_string())?;
            serde_json::to_value(entries).map_err(|e| e.to_string())
        }
        "pick.random" => {
            let path = path_param(params, "path")?;
            let count = params.get("count").and_then(|v| v.as_u64()).unwrap_or(1) as usize;
            let record = params.get("record").and_then(|v| v.as_bool()).unwrap_or(true);
            if count == 0 {
                return Err("count must be at least 1".to_string());
            }
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let picks = a.picker.get_random_urls(&path, count).map_err(|e| e.to_string())?;
            if record {
                a.picker.record(&picks).map_err(|e| e.to_string())?;
            }
            serde_json::to_value(picks).map_err(|e| e.to_string())
        }
        "pick.history" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.picker.history()).map_err(|e| e.to_string())
        }
        "pick.remove_history" => {
            let index = params.get("index").and_then(|v| v.as_u64()).ok_or("missing index")? as usize;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            let removed = a.picker.remove_history_item(index).map_err(|e| e.to_string())?;
            serde_json::to_value(removed).map_err(|e| e.to_string())
        }
        "pick.clear_history" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.picker.clear_history().map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── Settings ───
        "settings.get" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            serde_json::to_value(a.settings_engine.get_settings()).map_err(|e| e.to_string())
        }
        "settings.set" => {
            let key = params.get("key").and_then(|v| v.as_str()).ok_or("missing key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.set_value(key, value).map_err(|e| e.to_string())?;
            a.apply_settings();
            Ok(json!({"ok": true}))
        }
        "settings.reset" => {
            let mut a = app.lock().map_err(|e| e.to_string())?;
            a.settings_engine.reset().map_err(|e| e.to_string())?;
            a.apply_settings();
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
