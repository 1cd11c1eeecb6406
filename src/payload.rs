//! Typed access into the loosely typed stats payload.
//!
//! A missing key and a JSON `null` both mean "this subsystem reported
//! nothing" and come back as `Ok(None)`. A value of the wrong type is a schema
//! violation and comes back as [`ExtractError::Malformed`].

use serde_json::{Map, Value};

use crate::error::{ExtractError, ExtractResult};

/// Walks `path` from `data`, treating `null` like an absent key.
pub fn lookup<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = data;
    for key in path {
        current = current.get(key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn malformed(path: &[&str], expected: &'static str) -> ExtractError {
    ExtractError::Malformed {
        path: path.join("."),
        expected,
    }
}

pub fn u64_at(data: &Value, path: &[&str]) -> ExtractResult<Option<u64>> {
    match lookup(data, path) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| malformed(path, "unsigned integer")),
    }
}

pub fn array_at<'a>(data: &'a Value, path: &[&str]) -> ExtractResult<Option<&'a Vec<Value>>> {
    match lookup(data, path) {
        None => Ok(None),
        Some(v) => v
            .as_array()
            .map(Some)
            .ok_or_else(|| malformed(path, "array")),
    }
}

pub fn object_at<'a>(data: &'a Value, path: &[&str]) -> ExtractResult<Option<&'a Map<String, Value>>> {
    match lookup(data, path) {
        None => Ok(None),
        Some(v) => v
            .as_object()
            .map(Some)
            .ok_or_else(|| malformed(path, "object")),
    }
}

/// Reads an integer element of an array, e.g. one `percpu_usage` entry.
pub fn element_u64(value: &Value, path: &[&str], index: usize) -> ExtractResult<u64> {
    value.as_u64().ok_or_else(|| ExtractError::Malformed {
        path: format!("{}[{}]", path.join("."), index),
        expected: "unsigned integer",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let data = json!({"cpu_stats": {"cpu_usage": {"total_usage": 42}}});
        assert_eq!(
            u64_at(&data, &["cpu_stats", "cpu_usage", "total_usage"]).unwrap(),
            Some(42)
        );
    }

    #[test]
    fn test_null_and_missing_are_absent() {
        let data = json!({"networks": null, "cpu_stats": {}});
        assert!(object_at(&data, &["networks"]).unwrap().is_none());
        assert!(u64_at(&data, &["cpu_stats", "system_cpu_usage"]).unwrap().is_none());
        assert!(array_at(&data, &["nope", "deeper"]).unwrap().is_none());
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let data = json!({"memory_stats": {"max_usage": "lots"}});
        let err = u64_at(&data, &["memory_stats", "max_usage"]).unwrap_err();
        match err {
            ExtractError::Malformed { path, expected } => {
                assert_eq!(path, "memory_stats.max_usage");
                assert_eq!(expected, "unsigned integer");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_number_is_malformed() {
        let data = json!({"memory_stats": {"max_usage": -1}});
        assert!(u64_at(&data, &["memory_stats", "max_usage"]).is_err());
    }
}
