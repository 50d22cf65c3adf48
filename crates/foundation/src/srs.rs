/// Geographic WGS84, the reference system pointer positions are reported in.
pub const WGS84: &str = "EPSG:4326";

/// Spherical Web Mercator.
pub const WEB_MERCATOR: &str = "EPSG:3857";

// Legacy codes that every service treats as Web Mercator.
const WEB_MERCATOR_ALIASES: [&str; 4] = ["EPSG:900913", "EPSG:102100", "EPSG:102113", "EPSG:3785"];

/// Normalizes a projection code to the form feature services expect.
///
/// Returns `None` for a blank code so callers can apply their own default.
pub fn normalize_srs(srs: &str) -> Option<String> {
    let srs = srs.trim();
    if srs.is_empty() {
        return None;
    }
    if WEB_MERCATOR_ALIASES
        .iter()
        .any(|alias| alias.eq_ignore_ascii_case(srs))
    {
        return Some(WEB_MERCATOR.to_string());
    }
    Some(srs.to_string())
}

/// Numeric EPSG code of `EPSG:nnnn` style identifiers.
pub fn epsg_code(srs: &str) -> Option<u32> {
    let (authority, code) = srs.split_once(':')?;
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    code.trim().parse().ok()
}
