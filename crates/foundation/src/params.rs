use std::collections::BTreeMap;

use serde_json::Value;

/// Service-specific request parameters, ordered for deterministic output.
pub type VendorParams = BTreeMap<String, Value>;

/// Merges parameter layers; later layers override earlier ones key by key.
pub fn merge_params<'a>(layers: impl IntoIterator<Item = &'a VendorParams>) -> VendorParams {
    let mut out = VendorParams::new();
    for layer in layers {
        for (k, v) in layer {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

/// Textual value of a parameter: strings verbatim, other scalars in JSON form.
pub fn param_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Removes `key` matching case-insensitively (`CQL_FILTER` vs `cql_filter`).
pub fn take_param_ignore_case(params: &mut VendorParams, key: &str) -> Option<Value> {
    let found = params.keys().find(|k| k.eq_ignore_ascii_case(key)).cloned()?;
    params.remove(&found)
}
