//! Metric identity types

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// A set of tags (key-value pairs) associated with a metric
/// Tags are stored sorted by name, so insertion order never matters
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    /// Create a new TagSet from key-value pairs
    pub fn new(tags: BTreeMap<String, String>) -> Self {
        TagSet { tags }
    }

    /// Create an empty TagSet
    pub fn empty() -> Self {
        TagSet {
            tags: BTreeMap::new(),
        }
    }

    /// Create TagSet from slice of (key, value) tuples
    ///
    /// A repeated tag name keeps the last value supplied.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        pairs.iter().copied().collect()
    }

    /// Parse tags from "key:value,key2:value2" format
    ///
    /// Entries without a `:` or with an empty side are skipped.
    pub fn parse(s: &str) -> Self {
        s.split(',')
            .filter_map(|pair| {
                let (key, value) = pair.split_once(':')?;
                let (key, value) = (key.trim(), value.trim());
                if key.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((key, value))
                }
            })
            .collect()
    }

    /// Insert a tag, returning the previous value for that name
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.tags.insert(key.into(), value.into())
    }

    /// Get a specific tag value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Iterate tags in ascending tag-name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.tags.iter()
    }

    /// Number of tags
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        TagSet {
            tags: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = (&'a String, &'a String);
    type IntoIter = btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// Renders as "key:value,key2:value2", the format accepted by [`TagSet::parse`]
impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.tags.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", k, v)?;
        }
        Ok(())
    }
}

/// A metric name plus its tag set
///
/// Two identities are equal iff the names and the full tag sets are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricIdentity {
    pub name: String,
    pub tags: TagSet,
}

impl MetricIdentity {
    pub fn new(name: impl Into<String>, tags: TagSet) -> Self {
        MetricIdentity {
            name: name.into(),
            tags,
        }
    }
}
