//! Dotted-path addressing over `serde_json::Value` trees.
//!
//! Paths are dot separated. A segment may carry bracketed indices
//! (`results[0]`) or be a bare number (`emails.0`), which indexes arrays and
//! is used as a plain key on objects.
//!
//! ```rust
//! use uma_resource_server::json_path;
//! use serde_json::json;
//!
//! let doc = json!({"data": {"results": [{"uid": "a1", "data": {"meta": {"label": "Album"}}}]}});
//! assert_eq!(json_path::get_str(&doc, "data.results[0].uid"), Some("a1"));
//! assert_eq!(json_path::get_str(&doc, "data.results.0.data.meta.label"), Some("Album"));
//! ```

use crate::error::{ValidationError, ValidationResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

fn parse(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    if path.is_empty() {
        return Some(segments);
    }

    for part in path.split('.') {
        match part.find('[') {
            None => segments.push(Segment::Key(part)),
            Some(open) => {
                let (key, mut rest) = part.split_at(open);
                if !key.is_empty() {
                    segments.push(Segment::Key(key));
                }
                while let Some(stripped) = rest.strip_prefix('[') {
                    let close = stripped.find(']')?;
                    let index = stripped[..close].trim().parse::<usize>().ok()?;
                    segments.push(Segment::Index(index));
                    rest = &stripped[close + 1..];
                }
                if !rest.is_empty() {
                    return None;
                }
            }
        }
    }

    Some(segments)
}

fn step<'v>(current: &'v Value, segment: Segment<'_>) -> Option<&'v Value> {
    match (segment, current) {
        (Segment::Key(key), Value::Object(map)) => map.get(key),
        (Segment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?),
        (Segment::Index(index), Value::Array(items)) => items.get(index),
        _ => None,
    }
}

/// Look up the value at `path`. An empty path returns the tree itself.
pub fn get<'v>(tree: &'v Value, path: &str) -> Option<&'v Value> {
    parse(path)?
        .into_iter()
        .try_fold(tree, |current, segment| step(current, segment))
}

/// String at `path`, if the value there is a string.
pub fn get_str<'v>(tree: &'v Value, path: &str) -> Option<&'v str> {
    get(tree, path).and_then(Value::as_str)
}

/// Boolean at `path`. Accepts JSON booleans and the strings `"true"`/`"false"`.
pub fn get_bool(tree: &Value, path: &str) -> Option<bool> {
    match get(tree, path)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

pub fn get_array<'v>(tree: &'v Value, path: &str) -> Option<&'v Vec<Value>> {
    get(tree, path).and_then(Value::as_array)
}

pub fn get_object<'v>(tree: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
    get(tree, path).and_then(Value::as_object)
}

/// Non-empty string at `path`, or a validation error naming the path.
pub fn require_str<'v>(tree: &'v Value, path: &str) -> ValidationResult<&'v str> {
    match get_str(tree, path) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ValidationError::missing_required(path)),
    }
}

/// Non-empty object at `path`, or a validation error naming the path.
pub fn require_object<'v>(tree: &'v Value, path: &str) -> ValidationResult<&'v Map<String, Value>> {
    match get_object(tree, path) {
        Some(map) if !map.is_empty() => Ok(map),
        _ => Err(ValidationError::missing_required(path)),
    }
}

/// Store `value` at `path`, creating intermediate objects as needed.
///
/// A null tree is promoted to an object. Indices only address existing array
/// slots; walking through a scalar is an error.
pub fn set(tree: &mut Value, path: &str, value: Value) -> ValidationResult<()> {
    let segments = parse(path)
        .filter(|segments| !segments.is_empty())
        .ok_or_else(|| ValidationError::custom(format!("invalid path '{}'", path)))?;

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| ValidationError::custom(format!("invalid path '{}'", path)))?;

    let mut current = tree;
    for segment in parents {
        current = descend_mut(current, *segment, path)?;
    }

    match (*last, current) {
        (Segment::Index(index), Value::Array(items)) if index < items.len() => {
            items[index] = value;
            Ok(())
        }
        (Segment::Key(key), slot) => {
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            match slot {
                Value::Object(map) => {
                    map.insert(key.to_string(), value);
                    Ok(())
                }
                _ => Err(ValidationError::invalid_type(path, "object")),
            }
        }
        _ => Err(ValidationError::invalid_type(path, "array")),
    }
}

fn descend_mut<'v>(
    current: &'v mut Value,
    segment: Segment<'_>,
    path: &str,
) -> ValidationResult<&'v mut Value> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match (segment, current) {
        (Segment::Key(key), Value::Object(map)) => Ok(map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        (Segment::Index(index), Value::Array(items)) => items
            .get_mut(index)
            .ok_or_else(|| {
                ValidationError::custom(format!("index {} out of range in '{}'", index, path))
            }),
        (Segment::Key(_), _) => Err(ValidationError::invalid_type(path, "object")),
        (Segment::Index(_), _) => Err(ValidationError::invalid_type(path, "array")),
    }
}

/// Copy every key of `overlay` onto `base`; keys only in `base` survive.
pub fn merge_shallow(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}
