//! `tags` map

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::attrs::ResourceData;
use crate::Result;

/// Attribute key of the map
pub const TAGS: &str = "tags";

/// Read `tags` as a string map; absent reads as empty
pub fn expand_tags(data: &ResourceData) -> Result<BTreeMap<String, String>> {
    Ok(data
        .root()
        .string_map(TAGS)?
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect())
}

/// Flatten tags; empty tags flatten to an empty map, never an absent key
pub fn flatten_tags(tags: &BTreeMap<String, String>) -> Map<String, Value> {
    tags.iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}
