use crate::error::CoordError;
use crate::hash::ContentId;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Canonical byte form of a value: `domain\0sorted_json`.
///
/// Object keys are sorted recursively so the bytes do not depend on field
/// order. The domain tag keeps payloads of different kinds from ever
/// producing the same bytes.
pub fn canonical_bytes(domain: &str, value: &impl Serialize) -> Result<Vec<u8>, CoordError> {
    let sorted = serde_json::to_string(&sort_keys(serde_json::to_value(value)?))?;
    let mut buf = Vec::with_capacity(domain.len() + 1 + sorted.len());
    buf.extend_from_slice(domain.as_bytes());
    buf.push(0);
    buf.extend_from_slice(sorted.as_bytes());
    Ok(buf)
}

/// Digest of [`canonical_bytes`].
pub fn canonical_digest(domain: &str, value: &impl Serialize) -> Result<ContentId, CoordError> {
    Ok(ContentId::digest(&canonical_bytes(domain, value)?))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
