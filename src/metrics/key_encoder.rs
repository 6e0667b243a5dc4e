//! Key encoding for metric identities
//!
//! Encodes a metric name and its tags into a single canonical key that the
//! sketch hashes and the top-k index stores.
//!
//! Key format: `<name>:<tag>=<value>,<tag>=<value>...`
//!
//! Tags are written in ascending tag-name order. The reserved characters
//! `\`, `:`, `=` and `,` are backslash-escaped wherever they appear in a name,
//! tag name or tag value, so every identity maps to exactly one key.
//!
//! Examples:
//! - `http.requests:env=prod,host=web01`
//! - `system.cpu.load:` (no tags)
//! - `odd\:name:path=/a\,b`

use super::types::{MetricIdentity, TagSet};
use crate::error::MalformedKeyError;
use std::collections::BTreeMap;
use std::str::Chars;

const ESCAPE: char = '\\';
const NAME_SEPARATOR: char = ':';
const VALUE_SEPARATOR: char = '=';
const TAG_SEPARATOR: char = ',';

#[inline]
fn is_reserved(c: char) -> bool {
    matches!(c, ESCAPE | NAME_SEPARATOR | VALUE_SEPARATOR | TAG_SEPARATOR)
}

fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        if is_reserved(c) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

/// Encodes and decodes metric identity keys
pub struct MetricKeyEncoder;

impl MetricKeyEncoder {
    /// Encode a metric identity into its canonical key
    ///
    /// `name` must be non-empty; [`decode`](Self::decode) rejects keys
    /// without a name.
    pub fn encode(name: &str, tags: &TagSet) -> String {
        let tag_bytes: usize = tags.iter().map(|(k, v)| k.len() + v.len() + 2).sum();
        let mut key = String::with_capacity(name.len() + 1 + tag_bytes);

        push_escaped(&mut key, name);
        key.push(NAME_SEPARATOR);
        for (i, (tag, value)) in tags.iter().enumerate() {
            if i > 0 {
                key.push(TAG_SEPARATOR);
            }
            push_escaped(&mut key, tag);
            key.push(VALUE_SEPARATOR);
            push_escaped(&mut key, value);
        }
        key
    }

    /// Encode a [`MetricIdentity`]
    pub fn encode_identity(identity: &MetricIdentity) -> String {
        Self::encode(&identity.name, &identity.tags)
    }

    /// Decode a key produced by [`MetricKeyEncoder::encode`]
    pub fn decode(key: &str) -> Result<MetricIdentity, MalformedKeyError> {
        let mut scanner = KeyScanner::new(key);

        let (name, sep) = scanner.read_field(NAME_SEPARATOR)?;
        if sep.is_none() {
            return Err(MalformedKeyError::new(key, "missing name separator"));
        }
        if name.is_empty() {
            return Err(MalformedKeyError::new(key, "empty metric name"));
        }

        let mut tags = BTreeMap::new();
        if !scanner.is_at_end() {
            loop {
                let (tag, sep) = scanner.read_field(VALUE_SEPARATOR)?;
                if sep.is_none() {
                    return Err(MalformedKeyError::new(key, "tag without value separator"));
                }
                if let Some((last, _)) = tags.last_key_value() {
                    if *last >= tag {
                        return Err(MalformedKeyError::new(key, "tags not in ascending order"));
                    }
                }

                let (value, sep) = scanner.read_field(TAG_SEPARATOR)?;
                tags.insert(tag, value);
                if sep.is_none() {
                    break;
                }
            }
        }

        Ok(MetricIdentity {
            name,
            tags: TagSet::new(tags),
        })
    }
}

/// Walks an encoded key one unescaped field at a time
struct KeyScanner<'a> {
    key: &'a str,
    chars: Chars<'a>,
}

impl<'a> KeyScanner<'a> {
    fn new(key: &'a str) -> Self {
        KeyScanner {
            key,
            chars: key.chars(),
        }
    }

    fn is_at_end(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    /// Read up to the next unescaped `terminator` (consumed) or the end of
    /// the key. Any other unescaped reserved character is an error.
    fn read_field(&mut self, terminator: char) -> Result<(String, Option<char>), MalformedKeyError> {
        let mut field = String::new();
        while let Some(c) = self.chars.next() {
            if c == ESCAPE {
                match self.chars.next() {
                    Some(escaped) if is_reserved(escaped) => field.push(escaped),
                    Some(_) => return Err(MalformedKeyError::new(self.key, "invalid escape")),
                    None => return Err(MalformedKeyError::new(self.key, "dangling escape")),
                }
            } else if c == terminator {
                return Ok((field, Some(c)));
            } else if is_reserved(c) {
                return Err(MalformedKeyError::new(self.key, "unexpected delimiter"));
            } else {
                field.push(c);
            }
        }
        Ok((field, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_tags() {
        let tags = TagSet::from_pairs(&[("host", "web01"), ("env", "prod")]);
        let key = MetricKeyEncoder::encode("http.requests", &tags);
        assert_eq!(key, "http.requests:env=prod,host=web01");
    }

    #[test]
    fn test_encode_without_tags() {
        let key = MetricKeyEncoder::encode("system.cpu", &TagSet::empty());
        assert_eq!(key, "system.cpu:");
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let tags = TagSet::from_pairs(&[("host", "web01"), ("region", "us")]);
        let key = MetricKeyEncoder::encode("http.requests", &tags);
        let identity = MetricKeyEncoder::decode(&key).unwrap();

        assert_eq!(identity.name, "http.requests");
        assert_eq!(identity.tags, tags);
    }

    #[test]
    fn test_decode_no_tags() {
        let identity = MetricKeyEncoder::decode("system.cpu:").unwrap();
        assert_eq!(identity.name, "system.cpu");
        assert!(identity.tags.is_empty());
    }

    #[test]
    fn test_same_tags_same_key() {
        // Same tags in different order should produce same key
        let tags1 = TagSet::from_pairs(&[("region", "us"), ("method", "get")]);
        let tags2 = TagSet::from_pairs(&[("method", "get"), ("region", "us")]);

        assert_eq!(
            MetricKeyEncoder::encode("req", &tags1),
            MetricKeyEncoder::encode("req", &tags2)
        );
    }

    #[test]
    fn test_different_tags_different_key() {
        let tags1 = TagSet::from_pairs(&[("host", "web01")]);
        let tags2 = TagSet::from_pairs(&[("host", "web02")]);

        assert_ne!(
            MetricKeyEncoder::encode("test", &tags1),
            MetricKeyEncoder::encode("test", &tags2)
        );
    }

    #[test]
    fn test_reserved_characters_escaped() {
        let tags = TagSet::from_pairs(&[("a", "1,b=2")]);
        let key = MetricKeyEncoder::encode("x:y", &tags);
        assert_eq!(key, r"x\:y:a=1\,b\=2");

        // Without escaping this would collide with {a: 1, b: 2}
        let other = TagSet::from_pairs(&[("a", "1"), ("b", "2")]);
        assert_ne!(key, MetricKeyEncoder::encode("x:y", &other));

        let identity = MetricKeyEncoder::decode(&key).unwrap();
        assert_eq!(identity.name, "x:y");
        assert_eq!(identity.tags, tags);
    }

    #[test]
    fn test_backslash_roundtrip() {
        let tags = TagSet::from_pairs(&[(r"dir\", r"c:\tmp\")]);
        let key = MetricKeyEncoder::encode(r"path\", &tags);
        let identity = MetricKeyEncoder::decode(&key).unwrap();
        assert_eq!(identity.name, r"path\");
        assert_eq!(identity.tags, tags);
    }

    #[test]
    fn test_empty_tag_value_roundtrip() {
        let tags = TagSet::from_pairs(&[("empty", "")]);
        let key = MetricKeyEncoder::encode("m", &tags);
        assert_eq!(key, "m:empty=");
        assert_eq!(MetricKeyEncoder::decode(&key).unwrap().tags, tags);
    }

    #[test]
    fn test_decode_invalid_keys() {
        let cases = [
            ("invalid", "missing name separator"),
            (":a=1", "empty metric name"),
            ("m:a", "tag without value separator"),
            ("m:a=1,", "tag without value separator"),
            ("m:b=1,a=2", "tags not in ascending order"),
            ("m:a=1,a=2", "tags not in ascending order"),
            ("m:a=1=2", "unexpected delimiter"),
            ("m=x:a=1", "unexpected delimiter"),
            (r"m\q:", "invalid escape"),
            ("m:a=1\\", "dangling escape"),
        ];
        for (key, reason) in cases {
            let err = MetricKeyEncoder::decode(key).unwrap_err();
            assert_eq!(err.reason, reason, "key {:?}", key);
            assert_eq!(err.key, key);
        }
    }

    #[test]
    fn test_empty_tag_name_roundtrip() {
        let tags = TagSet::from_pairs(&[("", "v"), ("a", "1")]);
        let key = MetricKeyEncoder::encode("m", &tags);
        assert_eq!(key, "m:=v,a=1");
        assert_eq!(MetricKeyEncoder::decode(&key).unwrap().tags, tags);
    }

    #[test]
    fn test_encode_identity() {
        let identity = MetricIdentity::new("req", TagSet::from_pairs(&[("m", "get")]));
        let key = MetricKeyEncoder::encode_identity(&identity);
        assert_eq!(key, "req:m=get");
        assert_eq!(MetricKeyEncoder::decode(&key).unwrap(), identity);
    }
}
