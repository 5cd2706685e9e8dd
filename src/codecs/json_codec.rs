//! JSON document codec.
//!
//! The document is an object whose keys are the root's child names. Every value
//! is a url object or a folder object with a nested `children` object. Parsing
//! goes through a strict visitor that rejects duplicate keys, then a validator
//! that rejects unknown fields and wrong types with a path-qualified message.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::error::Category;
use serde_json::{json, Map, Value};

use crate::types::errors::CodecError;
use crate::types::node::{display_path, now, Bookmark, Children, Folder, Node, MAX_FOLDER_DEPTH};

const URL_FIELDS: &[&str] = &[
    "type",
    "url",
    "name",
    "icon",
    "tags",
    "description",
    "created",
    "modified",
    "visit_count",
    "last_visit",
];

const FOLDER_FIELDS: &[&str] = &["type", "children", "description", "created", "modified"];

// === Strict parsing ===

/// A `serde_json::Value` built by a visitor that fails on repeated object keys.
struct StrictValue(Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictVisitor).map(StrictValue)
    }
}

struct StrictVisitor;

impl<'de> Visitor<'de> for StrictVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(StrictValue(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some(key) = map.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key '{}'", key)));
            }
            let StrictValue(value) = map.next_value()?;
            object.insert(key, value);
        }
        Ok(Value::Object(object))
    }
}

fn too_deep() -> String {
    format!("folders are nested more than {} levels deep", MAX_FOLDER_DEPTH)
}

/// Turns a serde_json error into a short message without position noise for
/// data errors.
fn summarize(err: serde_json::Error) -> CodecError {
    let text = err.to_string();
    let message = text.split(" at line ").next().unwrap_or(&text).to_string();
    // serde_json reports its nesting cap as a syntax error.
    if message.starts_with("recursion limit exceeded") {
        return CodecError::DecodeError(format!("the document is too deep: {}", too_deep()));
    }
    match err.classify() {
        Category::Syntax | Category::Eof => CodecError::DecodeError(format!(
            "malformed JSON near line {}: {}",
            err.line(),
            message
        )),
        Category::Data => CodecError::DecodeError(message),
        Category::Io => CodecError::IoError(message),
    }
}

// === Validation ===

fn invalid(path: &[&str], problem: &str) -> CodecError {
    CodecError::DecodeError(format!("Item '{}' {}", display_path(path), problem))
}

fn string_field(
    object: &Map<String, Value>,
    path: &[&str],
    field: &str,
) -> Result<Option<String>, CodecError> {
    match object.get(field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(path, &format!("has a non-string '{}' field", field))),
    }
}

fn timestamp_field(
    object: &Map<String, Value>,
    path: &[&str],
    field: &str,
) -> Result<Option<i64>, CodecError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(path, &format!("has a non-integer '{}' field", field))),
    }
}

fn check_fields(
    object: &Map<String, Value>,
    path: &[&str],
    allowed: &[&str],
) -> Result<(), CodecError> {
    match object.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(extra) => Err(invalid(path, &format!("has unexpected field '{}'", extra))),
        None => Ok(()),
    }
}

fn decode_bookmark(
    object: &Map<String, Value>,
    path: &[&str],
    stamp: i64,
) -> Result<Bookmark, CodecError> {
    check_fields(object, path, URL_FIELDS)?;
    let url = string_field(object, path, "url")?
        .ok_or_else(|| invalid(path, "is missing the 'url' field"))?;
    let name = string_field(object, path, "name")?
        .ok_or_else(|| invalid(path, "is missing the 'name' field"))?;

    let tags = match object.get("tags") {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|t| t.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| invalid(path, "has a non-string entry in 'tags'"))?,
        Some(_) => return Err(invalid(path, "has a non-array 'tags' field")),
    };
    let visit_count = match object.get("visit_count") {
        None => 0,
        Some(value) => value
            .as_u64()
            .ok_or_else(|| invalid(path, "has a negative or non-integer 'visit_count' field"))?,
    };
    let created = timestamp_field(object, path, "created")?.unwrap_or(stamp);

    Ok(Bookmark {
        name,
        url,
        icon: string_field(object, path, "icon")?.unwrap_or_default(),
        tags,
        description: string_field(object, path, "description")?.unwrap_or_default(),
        created,
        modified: timestamp_field(object, path, "modified")?.unwrap_or(stamp),
        visit_count,
        last_visit: timestamp_field(object, path, "last_visit")?,
    })
}

fn decode_node<'a>(
    value: &'a Value,
    path: &mut Vec<&'a str>,
    stamp: i64,
) -> Result<Node, CodecError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid(path, "is not an object"))?;
    let kind = match object.get("type") {
        Some(Value::String(kind)) => kind.as_str(),
        Some(_) => return Err(invalid(path, "has a non-string 'type' field")),
        None => return Err(invalid(path, "is missing the 'type' field")),
    };

    match kind {
        "url" => Ok(decode_bookmark(object, path, stamp)?.into()),
        "folder" => {
            if path.len() > MAX_FOLDER_DEPTH {
                return Err(invalid(path, &format!("is too deep: {}", too_deep())));
            }
            check_fields(object, path, FOLDER_FIELDS)?;
            let children = match object.get("children") {
                Some(Value::Object(children)) => decode_children(children, path, stamp)?,
                Some(_) => return Err(invalid(path, "has a non-object 'children' field")),
                None => return Err(invalid(path, "is missing the 'children' field")),
            };
            let name = path.last().copied().unwrap_or_default();
            Ok(Folder {
                name: name.to_string(),
                description: string_field(object, path, "description")?.unwrap_or_default(),
                created: timestamp_field(object, path, "created")?.unwrap_or(stamp),
                modified: timestamp_field(object, path, "modified")?.unwrap_or(stamp),
                children,
            }
            .into())
        }
        other => Err(invalid(path, &format!("has unknown type '{}'", other))),
    }
}

fn decode_children<'a>(
    object: &'a Map<String, Value>,
    path: &mut Vec<&'a str>,
    stamp: i64,
) -> Result<Children, CodecError> {
    let mut children = Children::with_capacity(object.len());
    for (key, value) in object {
        path.push(key.as_str());
        let node = decode_node(value, path, stamp)?;
        path.pop();
        children.insert(key.clone(), node);
    }
    Ok(children)
}

/// Parses and validates a JSON document into a root folder.
pub fn decode(bytes: &[u8]) -> Result<Folder, CodecError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let StrictValue(document) = serde_json::from_slice(bytes).map_err(summarize)?;
    let object = document.as_object().ok_or_else(|| {
        CodecError::DecodeError("the document root must be an object".to_string())
    })?;

    let stamp = now();
    let mut path = Vec::new();
    let children = decode_children(object, &mut path, stamp)?;

    let mut root = Folder::new("");
    root.children = children;
    Ok(root)
}

// === Encoding ===

/// Renders one node as its JSON object. Empty optional fields are omitted.
pub fn node_to_value(node: &Node) -> Value {
    match node {
        Node::Bookmark(b) => {
            let mut object = Map::new();
            object.insert("type".to_string(), json!("url"));
            object.insert("url".to_string(), json!(b.url));
            object.insert("name".to_string(), json!(b.name));
            object.insert("icon".to_string(), json!(b.icon));
            if !b.tags.is_empty() {
                object.insert("tags".to_string(), json!(b.tags));
            }
            if !b.description.is_empty() {
                object.insert("description".to_string(), json!(b.description));
            }
            object.insert("created".to_string(), json!(b.created));
            object.insert("modified".to_string(), json!(b.modified));
            if b.visit_count > 0 {
                object.insert("visit_count".to_string(), json!(b.visit_count));
            }
            if let Some(last_visit) = b.last_visit {
                object.insert("last_visit".to_string(), json!(last_visit));
            }
            Value::Object(object)
        }
        Node::Folder(f) => {
            let mut object = Map::new();
            object.insert("type".to_string(), json!("folder"));
            if !f.description.is_empty() {
                object.insert("description".to_string(), json!(f.description));
            }
            object.insert("created".to_string(), json!(f.created));
            object.insert("modified".to_string(), json!(f.modified));
            object.insert("children".to_string(), children_to_value(&f.children));
            Value::Object(object)
        }
    }
}

/// Renders a child mapping as a JSON object in insertion order.
pub fn children_to_value(children: &Children) -> Value {
    Value::Object(
        children
            .iter()
            .map(|(key, node)| (key.clone(), node_to_value(node)))
            .collect(),
    )
}

/// Encodes `root` as a pretty-printed document.
pub fn encode(root: &Folder) -> Result<Vec<u8>, CodecError> {
    let mut bytes = serde_json::to_vec_pretty(&children_to_value(&root.children))
        .map_err(|e| CodecError::DecodeError(format!("failed to encode library: {}", e)))?;
    bytes.push(b'\n');
    Ok(bytes)
}
