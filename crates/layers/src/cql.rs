//! CQL rendering of filters sent to feature services.

use foundation::feature::Feature;

use crate::filter::{FilterObject, SpatialFilter};

/// Quotes `value` as a CQL string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Attribute names are left bare when they are plain identifiers, double-quoted otherwise.
pub fn quote_attribute(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `IN ('id1','id2')` feature-id predicate; `None` when no feature carries an id.
pub fn feature_id_filter(features: &[Feature]) -> Option<String> {
    let ids: Vec<String> = features
        .iter()
        .filter_map(Feature::id_text)
        .map(|id| quote_literal(&id))
        .collect();
    if ids.is_empty() {
        return None;
    }
    Some(format!("IN ({})", ids.join(",")))
}

/// `OPERATION(attribute, SRID=n;WKT)`; filters without an attribute cannot be rendered.
pub fn spatial_filter_cql(filter: &SpatialFilter) -> Option<String> {
    let attribute = filter.attribute.as_deref()?;
    Some(format!(
        "{}({}, {})",
        filter.operation.cql_name(),
        quote_attribute(attribute),
        filter.geometry.to_ewkt()
    ))
}

pub fn filter_object_cql(filter: &FilterObject) -> Vec<String> {
    filter
        .spatial_field
        .iter()
        .filter_map(spatial_filter_cql)
        .collect()
}

/// Joins predicates with `AND`; each one is parenthesised when there is more than one.
pub fn and_all(fragments: impl IntoIterator<Item = String>) -> Option<String> {
    let fragments: Vec<String> = fragments
        .into_iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    match fragments.len() {
        0 => None,
        1 => fragments.into_iter().next(),
        _ => Some(
            fragments
                .iter()
                .map(|f| format!("({f})"))
                .collect::<Vec<_>>()
                .join(" AND "),
        ),
    }
}
