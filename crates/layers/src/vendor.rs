use foundation::params::{VendorParams, param_text, take_param_ignore_case};
use serde_json::Value;

use crate::cql::{and_all, filter_object_cql};
use crate::filter::FilterObject;

/// Parameter key carrying the merged CQL predicate.
pub const CQL_FILTER: &str = "CQL_FILTER";

/// Inputs of a vendor parameter merge.
#[derive(Debug, Clone, Default)]
pub struct VendorOptions<'a> {
    /// The resource's own CQL filter.
    pub layer_filter: Option<&'a str>,
    pub filter: Option<&'a FilterObject>,
    /// Already layered parameters (resource base, resource overrides, caller).
    pub params: VendorParams,
}

/// Folds every filter source into a single `CQL_FILTER` parameter.
///
/// Sources, in order: the layer filter, the structured filter, a `CQL_FILTER`
/// found in `params` (any case), then `extra_cql`. Other parameters pass through.
pub fn merge_vendor_params(options: VendorOptions<'_>, extra_cql: Option<&str>) -> VendorParams {
    let VendorOptions {
        layer_filter,
        filter,
        mut params,
    } = options;

    let mut fragments: Vec<String> = Vec::new();
    fragments.extend(layer_filter.map(str::to_string));
    if let Some(filter) = filter {
        fragments.extend(filter_object_cql(filter));
    }
    if let Some(existing) = take_param_ignore_case(&mut params, CQL_FILTER) {
        fragments.extend(param_text(&existing));
    }
    fragments.extend(extra_cql.map(str::to_string));

    if let Some(cql) = and_all(fragments) {
        params.insert(CQL_FILTER.to_string(), Value::String(cql));
    }
    params
}
