//! Size limits for agent output
//!
//! Bounds resource consumption before and during structural validation.
//! The total byte size is checked once per attempt over the serialized
//! payload; string, list, and key-count limits are checked at each node
//! the validator visits.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Size limits applied to every validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum serialized payload size in bytes (pre-check, fatal)
    pub max_output_bytes: usize,
    /// Maximum length of any individual string, in characters
    pub max_str_len: usize,
    /// Maximum number of elements in any list
    pub max_list_len: usize,
    /// Maximum number of keys in any object
    pub max_dict_keys: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_output_bytes: 131_072,
            max_str_len: 8_192,
            max_list_len: 2_048,
            max_dict_keys: 512,
        }
    }
}

impl Limits {
    /// Check the serialized size of the whole payload.
    ///
    /// A violation here is unconditionally fatal for the attempt: no
    /// structural checks run after it.
    pub fn check_total_bytes(&self, value: &Value) -> bool {
        serialized_len(value) <= self.max_output_bytes
    }

    /// Whether a string value at some node is within bounds
    pub fn string_ok(&self, s: &str) -> bool {
        s.chars().count() <= self.max_str_len
    }

    /// Whether a list value at some node is within bounds
    pub fn list_ok(&self, items: &[Value]) -> bool {
        items.len() <= self.max_list_len
    }

    /// Whether an object value at some node is within bounds
    pub fn object_ok(&self, map: &serde_json::Map<String, Value>) -> bool {
        map.len() <= self.max_dict_keys
    }
}

fn serialized_len(value: &Value) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.max_output_bytes, 131_072);
        assert_eq!(limits.max_str_len, 8_192);
        assert_eq!(limits.max_list_len, 2_048);
        assert_eq!(limits.max_dict_keys, 512);
    }

    #[test]
    fn test_total_bytes_check() {
        let limits = Limits {
            max_output_bytes: 16,
            ..Limits::default()
        };
        assert!(limits.check_total_bytes(&json!({"a": 1})));
        assert!(!limits.check_total_bytes(&json!({"a": "a string well over sixteen bytes"})));
    }

    #[test]
    fn test_string_limit_counts_chars() {
        let limits = Limits {
            max_str_len: 3,
            ..Limits::default()
        };
        assert!(limits.string_ok("abc"));
        assert!(limits.string_ok("äöü"));
        assert!(!limits.string_ok("abcd"));
    }

    #[test]
    fn test_list_and_object_limits() {
        let limits = Limits {
            max_list_len: 2,
            max_dict_keys: 1,
            ..Limits::default()
        };
        assert!(limits.list_ok(&[json!(1), json!(2)]));
        assert!(!limits.list_ok(&[json!(1), json!(2), json!(3)]));

        let small = json!({"a": 1});
        let large = json!({"a": 1, "b": 2});
        assert!(limits.object_ok(small.as_object().unwrap()));
        assert!(!limits.object_ok(large.as_object().unwrap()));
    }
}
