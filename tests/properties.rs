//! Property-based tests for the codec, sketch and tracker.
//!
//! Uses proptest to check the guarantees the engine relies on hold across
//! random identities and record sequences.

use std::collections::HashMap;

use metric_topk::{CountMinSketch, MetricKeyEncoder, TagSet, TopK};
use proptest::prelude::*;

/// Names and tag strings drawn from an alphabet that includes every reserved
/// codec character.
fn text() -> impl Strategy<Value = String> {
    "[a-c:=,\\\\. ]{0,6}"
}

fn name() -> impl Strategy<Value = String> {
    "[a-c:=,\\\\.]{1,6}"
}

fn tag_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((text(), text()), 0..5)
}

/// Small key space so collisions and evictions actually happen
fn record_sequence() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..40, 0..400)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// decode(encode(x)) == x, whatever order the tags were supplied in.
    #[test]
    fn codec_roundtrip_ignores_tag_order(name in name(), pairs in tag_pairs()) {
        let forward: TagSet = pairs.iter().cloned().collect();
        let key = MetricKeyEncoder::encode(&name, &forward);

        // Last-wins on duplicate names, so dedupe before reversing order
        let mut seen = std::collections::HashSet::new();
        let deduped: Vec<_> = pairs
            .iter()
            .rev()
            .filter(|(k, _)| seen.insert(k.clone()))
            .cloned()
            .collect();
        let reordered: TagSet = deduped.into_iter().collect();
        prop_assert_eq!(&reordered, &forward);
        prop_assert_eq!(MetricKeyEncoder::encode(&name, &reordered), key.clone());

        let identity = MetricKeyEncoder::decode(&key).unwrap();
        prop_assert_eq!(identity.name, name);
        prop_assert_eq!(identity.tags, forward);
    }

    /// Distinct identities never share a key.
    #[test]
    fn codec_is_injective(
        a in (name(), tag_pairs()),
        b in (name(), tag_pairs()),
    ) {
        let tags_a: TagSet = a.1.into_iter().collect();
        let tags_b: TagSet = b.1.into_iter().collect();
        let same_identity = a.0 == b.0 && tags_a == tags_b;
        let same_key = MetricKeyEncoder::encode(&a.0, &tags_a) == MetricKeyEncoder::encode(&b.0, &tags_b);
        prop_assert_eq!(same_identity, same_key);
    }

    /// The sketch never reports less than the true count.
    #[test]
    fn sketch_never_underestimates(seq in record_sequence(), width in 1usize..32, depth in 1usize..5) {
        let mut sketch = CountMinSketch::with_dimensions(depth, width).unwrap();
        let mut truth: HashMap<u8, u64> = HashMap::new();
        for key in &seq {
            sketch.increment(key);
            *truth.entry(*key).or_default() += 1;
        }
        for (key, count) in truth {
            prop_assert!(sketch.estimate(&key) >= count);
        }
        prop_assert_eq!(sketch.total(), seq.len() as u64);
    }

    /// elements() is bounded by K and every reported estimate is an upper bound.
    #[test]
    fn tracker_is_bounded_and_never_underestimates(seq in record_sequence(), k in 1usize..8) {
        let mut topk = TopK::new(k, CountMinSketch::with_dimensions(3, 16).unwrap()).unwrap();
        let mut truth: HashMap<String, u64> = HashMap::new();
        for key in &seq {
            let key = format!("k{}", key);
            topk.record(&key);
            *truth.entry(key).or_default() += 1;
            prop_assert!(topk.elements().len() <= k);
        }
        for element in topk.elements() {
            prop_assert!(element.estimate >= truth[&element.key]);
        }
    }

    /// After reset the tracker behaves like a fresh one.
    #[test]
    fn reset_restores_fresh_state(first in record_sequence(), second in record_sequence()) {
        let fresh = || TopK::new(4, CountMinSketch::with_dimensions(3, 16).unwrap()).unwrap();

        let mut reused = fresh();
        for key in &first {
            reused.record(&format!("k{}", key));
        }
        reused.reset();
        prop_assert!(reused.elements().is_empty());
        reused.reset();
        prop_assert!(reused.elements().is_empty());

        let mut new = fresh();
        for key in &second {
            let key = format!("k{}", key);
            reused.record(&key);
            new.record(&key);
        }

        let sort = |mut v: Vec<metric_topk::TopKElement>| {
            v.sort_by(|a, b| a.key.cmp(&b.key));
            v
        };
        prop_assert_eq!(sort(reused.elements()), sort(new.elements()));
    }
}
