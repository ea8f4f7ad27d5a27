//! Focus-area tag sets.
//!
//! Focus areas reach the core in several physical shapes: a JSON array, a
//! JSON string that itself contains an array (double-encoded columns), or
//! a plain comma-separated list. [`FocusAreas`] normalizes all of them into
//! one ordered, de-duplicated set.
//!
//! Tags keep their first-seen spelling for display. Membership and matching
//! compare trimmed, lowercased text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered, de-duplicated set of focus-area tags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FocusAreas(Vec<String>);

impl FocusAreas {
    /// Build a set from raw tags, trimming and dropping blanks and duplicates.
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let trimmed = tag.as_ref().trim();
            if trimmed.is_empty() {
                continue;
            }
            let key = normalize(trimmed);
            if out.iter().any(|existing| normalize(existing) == key) {
                continue;
            }
            out.push(trimmed.to_string());
        }
        Self(out)
    }

    /// Parse a stored column value.
    ///
    /// Accepts a JSON array, a JSON string wrapping an array, or a
    /// comma-separated list. Anything unparseable as JSON is treated as a
    /// comma-separated list.
    pub fn from_stored(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => Self::from_json(&value),
            Err(_) => Self::new(trimmed.split(',')),
        }
    }

    /// Convert an already-decoded JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::new(items.iter().filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })),
            Value::String(inner) => Self::from_stored(inner),
            _ => Self::default(),
        }
    }

    /// Serialize to the canonical JSON array form used for storage.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    /// Whether the set contains a tag (case-insensitive).
    pub fn contains(&self, tag: &str) -> bool {
        let key = normalize(tag);
        self.0.iter().any(|t| normalize(t) == key)
    }

    /// Number of this set's tags that also appear in `other`.
    pub fn match_count(&self, other: &FocusAreas) -> u32 {
        let count = self.0.iter().filter(|t| other.contains(t)).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Tags in display order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_lowercase()
}

impl From<Vec<String>> for FocusAreas {
    fn from(tags: Vec<String>) -> Self {
        Self::new(tags)
    }
}

impl From<FocusAreas> for Vec<String> {
    fn from(tags: FocusAreas) -> Self {
        tags.0
    }
}

impl<'a> IntoIterator for &'a FocusAreas {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
