//! Metric identities and their canonical key encoding
//!
//! A metric identity is a name plus an unordered tag set. The sketch and the
//! top-k index only ever see the encoded key; the flush loop decodes it back
//! before handing the identity to a sink.

mod key_encoder;
mod types;

pub use key_encoder::MetricKeyEncoder;
pub use types::{MetricIdentity, TagSet};
