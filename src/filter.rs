//! ASPA-style authorization filters
//!
//! A route is accepted if its AS path originates at the ASN directly, or if it
//! reached us through one of the ASN's declared authorized providers.

use std::collections::BTreeMap;

use tracing::warn;

/// Emitted in place of a filter when the ASN has no provider entry.
///
/// Callers validate membership before rendering, so this only shows up in
/// generated config when that validation was skipped.
pub const MISSING_ASN_SENTINEL: &str = "# CODE ERROR: ASN not in ASPA map. This should never happen.";

/// Build the BIRD filter statement rejecting routes from unauthorized paths
///
/// ```rust
/// use std::collections::BTreeMap;
/// use pathgen::filter::build_authorization_filter;
///
/// let providers = BTreeMap::from([(64500, vec![64501])]);
/// assert_eq!(
///     build_authorization_filter(64500, &providers),
///     r#"if !((bgp_path ~ [= 64500+ =]) || (bgp_path ~ [= * 64501 64500 * =])) then _reject("not in authorized providers list");"#
/// );
/// ```
pub fn build_authorization_filter(asn: u32, providers_by_asn: &BTreeMap<u32, Vec<u32>>) -> String {
    let Some(providers) = providers_by_asn.get(&asn) else {
        warn!(asn, "ASN missing from authorized providers map");
        return MISSING_ASN_SENTINEL.to_string();
    };

    let clauses = providers
        .iter()
        .map(|provider| format!("bgp_path ~ [= * {} {} * =]", provider, asn))
        .collect::<Vec<_>>()
        .join(" || ");

    format!(
        r#"if !((bgp_path ~ [= {asn}+ =]) || ({clauses})) then _reject("not in authorized providers list");"#
    )
}
