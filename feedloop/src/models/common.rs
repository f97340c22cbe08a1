use std::collections::BTreeMap;

/// Flat string-keyed metadata attached to vector store records.
///
/// Ordered so serialized snapshots are stable across runs.
pub type Metadata = BTreeMap<String, String>;
