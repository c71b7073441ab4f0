//! Tuple model shared by taps, operators and groupings.

use load_common::{LoadError, Result};
use serde::Serialize;
use std::fmt;

/// A single field value.
///
/// The derived ordering is the sort order used by groupings: `Null` sorts
/// first, then integers, then strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Value {
    Null,
    Int(i64),
    Str(String),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

/// An ordered list of values.
pub type Tuple = Vec<Value>;

/// Render a tuple the way text sinks write it: tab separated, nulls empty.
pub fn tuple_to_line(tuple: &[Value]) -> String {
    tuple
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\t")
}

/// Resolve a field name against a field list.
pub fn field_position(fields: &[String], name: &str) -> Result<usize> {
    fields.iter().position(|f| f == name).ok_or_else(|| {
        LoadError::build_error(format!(
            "field '{name}' not found in [{}]",
            fields.join(", ")
        ))
    })
}

/// Resolve several field names, preserving order.
pub fn field_positions<S: AsRef<str>>(fields: &[String], names: &[S]) -> Result<Vec<usize>> {
    names
        .iter()
        .map(|name| field_position(fields, name.as_ref()))
        .collect()
}

/// Fail if any field name repeats.
pub fn ensure_unique_fields(fields: &[String]) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if fields[..i].contains(field) {
            return Err(LoadError::build_error(format!(
                "duplicate field '{field}' in [{}]",
                fields.join(", ")
            )));
        }
    }
    Ok(())
}

/// Project a tuple onto positions.
pub fn select(tuple: &[Value], positions: &[usize]) -> Tuple {
    positions
        .iter()
        .map(|&p| tuple.get(p).cloned().unwrap_or(Value::Null))
        .collect()
}

/// String hash with 32-bit wrapping arithmetic over UTF-16 units.
///
/// Stable across runs and platforms, and negative for some inputs, which the
/// hash-modulo operator relies on for key collisions of both signs.
pub fn string_hash(s: &str) -> i32 {
    s.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_ordering() {
        let mut values = vec![
            Value::from("b"),
            Value::Int(3),
            Value::Null,
            Value::from("a"),
            Value::Int(-1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int(-1),
                Value::Int(3),
                Value::from("a"),
                Value::from("b")
            ]
        );
    }

    #[test]
    fn test_tuple_to_line() {
        let tuple = vec![Value::from("word"), Value::Null, Value::Int(7)];
        assert_eq!(tuple_to_line(&tuple), "word\t\t7");
    }

    #[test]
    fn test_field_lookup() {
        let fields = vec!["line".to_string(), "count".to_string()];
        assert_eq!(field_position(&fields, "count").unwrap(), 1);
        let err = field_position(&fields, "word").unwrap_err();
        assert!(matches!(err, LoadError::BuildError { .. }));
        assert_eq!(field_positions(&fields, &["count", "line"]).unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_duplicate_fields() {
        let fields = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        assert!(ensure_unique_fields(&fields).is_err());
        assert!(ensure_unique_fields(&fields[..2]).is_ok());
    }

    #[test]
    fn test_string_hash() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        // wraps like a 32-bit integer
        assert_eq!(string_hash("polygenelubricants"), i32::MIN);
    }

    #[test]
    fn test_as_int() {
        assert_eq!(Value::Int(4).as_int(), Some(4));
        assert_eq!(Value::from(" 12 ").as_int(), Some(12));
        assert_eq!(Value::from("x").as_int(), None);
        assert_eq!(Value::Null.as_int(), None);
    }
}
