//! Dot-and-bracket property paths into nested JSON values.
//!
//! A path such as `actions[0].textHTML` is a list of segments: dotted parts
//! name object keys and bracketed parts index into the array held by the
//! preceding key. Writing through a path creates missing containers on the
//! way down.
//!
//! # Numeric dotted segments
//!
//! A dotted segment made only of digits (`a.0.b`) is kept as a key. When it
//! meets an existing array it indexes that array; when it meets an object it
//! is an ordinary key; when the container is created by the write itself, a
//! digit-only *next* segment makes the new container an array.

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Upper bound on array indices a write may pad up to.
pub const MAX_ARRAY_INDEX: usize = 10_000;

/// Errors produced while parsing or writing through a path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("empty segment in path '{path}'")]
    EmptySegment { path: String },

    #[error("invalid index '{index}' in path '{path}'")]
    InvalidIndex { path: String, index: String },

    #[error("unclosed bracket in path '{path}'")]
    UnclosedBracket { path: String },

    #[error("unexpected '{rest}' after index in path '{path}'")]
    Malformed { path: String, rest: String },

    #[error("index {index} exceeds the maximum of {max}", max = MAX_ARRAY_INDEX)]
    IndexTooLarge { index: usize },

    #[error("cannot use key '{key}' on an array")]
    KeyOnArray { key: String },

    #[error("cannot descend into {found} at '{segment}'")]
    NotAContainer { segment: String, found: &'static str },
}

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Dotted object key
    Key(String),
    /// Bracketed array index
    Index(usize),
}

impl Segment {
    /// The array position this segment addresses, if it can address one.
    fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(k) if is_digits(k) => k.parse().ok(),
            Segment::Key(_) => None,
        }
    }

    /// The object key this segment addresses.
    fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }

    /// Whether a container created to hold this segment should be an array.
    fn wants_array(&self) -> bool {
        match self {
            Segment::Index(_) => true,
            Segment::Key(k) => is_digits(k),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Shape of a path string, decided by the notation it uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    /// Contains `[` and `]`
    Bracket,
    /// Contains `.` but no brackets
    Dotted,
    /// A single key
    Bare,
}

impl PathKind {
    pub fn of(path: &str) -> Self {
        if path.contains('[') && path.contains(']') {
            PathKind::Bracket
        } else if path.contains('.') {
            PathKind::Dotted
        } else {
            PathKind::Bare
        }
    }
}

/// A parsed property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<Segment>,
}

impl PropertyPath {
    /// Parse a dot-and-bracket path string.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        if path.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };

            if key.is_empty() && rest.is_empty() {
                return Err(PathError::EmptySegment {
                    path: path.to_string(),
                });
            }
            if !key.is_empty() {
                segments.push(Segment::Key(key.to_string()));
            }

            while !rest.is_empty() {
                let Some(inner) = rest.strip_prefix('[') else {
                    return Err(PathError::Malformed {
                        path: path.to_string(),
                        rest: rest.to_string(),
                    });
                };
                let Some(close) = inner.find(']') else {
                    return Err(PathError::UnclosedBracket {
                        path: path.to_string(),
                    });
                };
                let raw = &inner[..close];
                let index: usize =
                    raw.trim()
                        .parse()
                        .map_err(|_| PathError::InvalidIndex {
                            path: path.to_string(),
                            index: raw.to_string(),
                        })?;
                segments.push(Segment::Index(index));
                rest = &inner[close + 1..];
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Write `value` at this path inside `root`, creating containers as needed.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<(), PathError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(PathError::Empty);
        };

        if root.is_null() {
            *root = empty_container(self.segments[0].wants_array());
        }

        let mut current = root;
        for (i, segment) in parents.iter().enumerate() {
            let next = &self.segments[i + 1];
            let slot = child_slot(current, segment)?;
            if slot.is_null() {
                *slot = empty_container(next.wants_array());
            }
            current = slot;
        }

        *child_slot(current, last)? = value;
        Ok(())
    }
}

fn empty_container(array: bool) -> Value {
    if array {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Get (creating as null) the slot `segment` addresses inside `container`.
fn child_slot<'a>(container: &'a mut Value, segment: &Segment) -> Result<&'a mut Value, PathError> {
    match container {
        Value::Object(map) => Ok(map.entry(segment.as_key()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = segment.as_index().ok_or_else(|| PathError::KeyOnArray {
                key: segment.to_string(),
            })?;
            if index > MAX_ARRAY_INDEX {
                return Err(PathError::IndexTooLarge { index });
            }
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        other => Err(PathError::NotAContainer {
            segment: segment.to_string(),
            found: kind_name(other),
        }),
    }
}

/// Parse `path` and write `value` there, reporting failures to the caller.
pub fn try_set(obj: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    PropertyPath::parse(path)?.set(obj, value)
}

/// Write `value` at `path` inside `obj`.
///
/// Failures are logged and leave the write undone; returns whether the value
/// was written.
pub fn set_nested_property(obj: &mut Value, path: &str, value: Value) -> bool {
    match try_set(obj, path, value) {
        Ok(()) => true,
        Err(PathError::Empty) => {
            warn!("set_nested_property called with an empty path");
            false
        }
        Err(e) => {
            warn!(path, "Dropping write: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dotted_path_creates_nested_objects() {
        let mut obj = json!({});
        assert!(set_nested_property(&mut obj, "a.b.c", json!(42)));
        assert_eq!(obj, json!({"a": {"b": {"c": 42}}}));
    }

    #[test]
    fn test_bracket_path_creates_array() {
        let mut obj = json!({});
        assert!(set_nested_property(&mut obj, "a[0]", json!("x")));
        assert_eq!(obj, json!({"a": ["x"]}));
    }

    #[test]
    fn test_bracket_gap_is_padded_with_null() {
        let mut obj = json!({});
        set_nested_property(&mut obj, "a[2]", json!(1));
        assert_eq!(obj, json!({"a": [null, null, 1]}));
    }

    #[test]
    fn test_empty_path_leaves_object_unchanged() {
        let mut obj = json!({"keep": true});
        assert!(!set_nested_property(&mut obj, "", json!(1)));
        assert_eq!(obj, json!({"keep": true}));
    }

    #[test]
    fn test_invalid_index_drops_write() {
        let mut obj = json!({});
        assert_eq!(
            try_set(&mut obj, "a[x]", json!(1)),
            Err(PathError::InvalidIndex {
                path: "a[x]".into(),
                index: "x".into()
            })
        );
        assert_eq!(obj, json!({}));
    }

    #[test]
    fn test_last_write_wins_without_merge() {
        let mut obj = json!({"design": {"width": 640, "color": "red"}});
        set_nested_property(&mut obj, "design", json!("flat"));
        assert_eq!(obj, json!({"design": "flat"}));
    }

    #[test]
    fn test_existing_siblings_are_kept() {
        let mut obj = json!({"content": {"headingHTML": "", "bodyHTML": "b"}});
        set_nested_property(&mut obj, "content.headingHTML", json!("Hi"));
        assert_eq!(obj, json!({"content": {"headingHTML": "Hi", "bodyHTML": "b"}}));
    }

    #[test]
    fn test_bracket_in_middle_of_path() {
        let mut obj = json!({"actions": []});
        set_nested_property(&mut obj, "actions[1].href", json!("/x"));
        assert_eq!(obj, json!({"actions": [null, {"href": "/x"}]}));
    }

    #[test]
    fn test_numeric_dotted_segment_creates_array_when_missing() {
        let mut obj = json!({});
        set_nested_property(&mut obj, "a.0.b", json!(1));
        assert_eq!(obj, json!({"a": [{"b": 1}]}));
    }

    #[test]
    fn test_numeric_dotted_segment_is_key_on_existing_object() {
        let mut obj = json!({"a": {}});
        set_nested_property(&mut obj, "a.0.b", json!(1));
        assert_eq!(obj, json!({"a": {"0": {"b": 1}}}));
    }

    #[test]
    fn test_descending_into_scalar_is_rejected() {
        let mut obj = json!({"a": "text"});
        let err = try_set(&mut obj, "a.b", json!(1)).unwrap_err();
        assert!(matches!(err, PathError::NotAContainer { .. }));
        assert_eq!(obj, json!({"a": "text"}));
    }

    #[test]
    fn test_falsy_scalars_are_not_replaced_by_containers() {
        for scalar in [json!(""), json!(0), json!(false)] {
            let mut obj = json!({"design": scalar.clone()});
            assert!(!set_nested_property(&mut obj, "design.width", json!(5)));
            assert_eq!(obj, json!({"design": scalar}));
        }
    }

    #[test]
    fn test_key_on_array_is_rejected() {
        let mut obj = json!({"a": []});
        let err = try_set(&mut obj, "a.name", json!(1)).unwrap_err();
        assert_eq!(err, PathError::KeyOnArray { key: "name".into() });
    }

    #[test]
    fn test_huge_index_is_rejected() {
        let mut obj = json!({});
        let err = try_set(&mut obj, "a[99999999]", json!(1)).unwrap_err();
        assert!(matches!(err, PathError::IndexTooLarge { .. }));
    }

    #[test]
    fn test_parse_segments() {
        let path = PropertyPath::parse("rows[1][2].cell").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("rows".into()),
                Segment::Index(1),
                Segment::Index(2),
                Segment::Key("cell".into()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(matches!(PropertyPath::parse("a..b"), Err(PathError::EmptySegment { .. })));
        assert!(matches!(PropertyPath::parse("a[0"), Err(PathError::UnclosedBracket { .. })));
        assert!(matches!(PropertyPath::parse("a[0]x"), Err(PathError::Malformed { .. })));
        assert_eq!(PropertyPath::parse(""), Err(PathError::Empty));
    }

    #[test]
    fn test_path_kind() {
        assert_eq!(PathKind::of("actions[0].textHTML"), PathKind::Bracket);
        assert_eq!(PathKind::of("content.headingHTML"), PathKind::Dotted);
        assert_eq!(PathKind::of("homepageUrl"), PathKind::Bare);
    }
}
