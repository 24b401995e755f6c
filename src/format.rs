//! Formatting helpers that turn config values into BIRD syntax fragments
//!
//! Every function here is pure and total: absent optionals collapse to the
//! type's zero value instead of failing. The only exception to purity is
//! [`timestamp`], which reads the wall clock; tests use [`timestamp_at`].

use std::fmt::Display;

use chrono::{DateTime, Utc};

/// Separator between entries of a multi-line BIRD list
const LIST_SEPARATOR: &str = ",\n";

/// Indentation applied to every entry of a multi-line BIRD list
const LIST_INDENT: &str = "  ";

/// RFC 822 layout with a two digit year, always rendered in UTC
const RFC822_UTC: &str = "%d %b %y %H:%M UTC";

fn indented_list<T: Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", LIST_INDENT, item))
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// Format prefixes as the body of a BIRD prefix set
///
/// ```rust
/// use pathgen::format::format_prefix_list;
///
/// let body = format_prefix_list(&["10.0.0.0/8", "192.168.0.0/16"]);
/// assert_eq!(body, "  10.0.0.0/8,\n  192.168.0.0/16");
/// ```
pub fn format_prefix_list<S: AsRef<str>>(prefixes: &[S]) -> String {
    let prefixes: Vec<&str> = prefixes.iter().map(AsRef::as_ref).collect();
    indented_list(&prefixes)
}

/// Format AS numbers as the body of a BIRD int set, one per line
pub fn format_asn_list(asns: &[u32]) -> String {
    indented_list(asns)
}

/// Format AS numbers as an inline bracketed set, e.g. `[64500, 64501]`
pub fn format_asn_set(asns: &[u32]) -> String {
    let joined = asns
        .iter()
        .map(|asn| asn.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}

/// True if the sequence is unset or has no elements
pub fn is_empty<T>(items: Option<&[T]>) -> bool {
    items.map_or(true, |items| items.is_empty())
}

/// Return the value behind an optional, or the type's zero value if unset
pub fn deref<T: Default + Clone>(value: Option<&T>) -> T {
    value.cloned().unwrap_or_default()
}

/// Join an optional string list with `", "`; unset yields an empty string
pub fn join(items: Option<&[String]>) -> String {
    items.map(|items| items.join(", ")).unwrap_or_default()
}

/// Current time rendered per `format`
///
/// `"unix"` yields seconds since the epoch; anything else yields an RFC 822
/// style UTC timestamp.
pub fn timestamp(format: &str) -> String {
    timestamp_at(format, Utc::now())
}

/// Render a fixed instant the same way [`timestamp`] renders the current one
pub fn timestamp_at(format: &str, now: DateTime<Utc>) -> String {
    if format == "unix" {
        now.timestamp().to_string()
    } else {
        now.format(RFC822_UTC).to_string()
    }
}

pub fn contains(haystack: &str, needle: &str) -> bool {
    haystack.contains(needle)
}

/// First segment of `s` split on `delimiter`, or `s` itself if the delimiter is absent
pub fn split_first<'a>(s: &'a str, delimiter: &str) -> &'a str {
    if delimiter.is_empty() {
        return s;
    }
    s.split(delimiter).next().unwrap_or(s)
}

/// True if `index` is the last position of a sequence of length `len`
pub fn is_last(index: usize, len: usize) -> bool {
    index.checked_add(1) == Some(len)
}

/// Largest count [`iterate`] expands
pub const ITERATE_LIMIT: usize = 4096;

/// Indices `0..count`, for templates that need to repeat a block
///
/// Returns `None` if `count` exceeds [`ITERATE_LIMIT`].
pub fn iterate(count: usize) -> Option<Vec<usize>> {
    (count <= ITERATE_LIMIT).then(|| (0..count).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    #[test]
    fn test_prefix_list_two_entries() {
        let out = format_prefix_list(&["10.0.0.0/8", "192.168.0.0/16"]);
        assert_eq!(out, "  10.0.0.0/8,\n  192.168.0.0/16");
    }

    #[test]
    fn test_prefix_list_separator_count() {
        let prefixes: Vec<String> = (0..7).map(|i| format!("10.{}.0.0/16", i)).collect();
        let out = format_prefix_list(&prefixes);
        assert_eq!(out.matches(",\n").count(), prefixes.len() - 1);
        assert!(!out.ends_with(','));
        assert!(!out.ends_with('\n'));
    }

    #[test]
    fn test_prefix_list_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(format_prefix_list(&empty), "");
    }

    #[test]
    fn test_prefix_list_single_entry() {
        assert_eq!(format_prefix_list(&["2001:db8::/32"]), "  2001:db8::/32");
    }

    #[test]
    fn test_asn_list() {
        assert_eq!(format_asn_list(&[64500, 64501]), "  64500,\n  64501");
        assert_eq!(format_asn_list(&[]), "");
    }

    #[test]
    fn test_asn_set() {
        assert_eq!(format_asn_set(&[64500, 64501]), "[64500, 64501]");
        assert_eq!(format_asn_set(&[4200000000]), "[4200000000]");
        assert_eq!(format_asn_set(&[]), "[]");
    }

    #[test]
    fn test_is_empty() {
        let unset: Option<&[String]> = None;
        assert!(is_empty(unset));
        assert!(is_empty::<u32>(Some(&[][..])));
        assert!(!is_empty(Some(&[1u32][..])));
    }

    #[test]
    fn test_deref_zero_values() {
        assert_eq!(deref::<String>(None), "");
        assert_eq!(deref::<u32>(None), 0);
        assert!(!deref::<bool>(None));
        assert!(deref::<Vec<u32>>(None).is_empty());
        assert!(deref::<BTreeMap<u32, Vec<u32>>>(None).is_empty());
    }

    #[test]
    fn test_deref_set_values() {
        assert_eq!(deref(Some(&"edge".to_string())), "edge");
        assert_eq!(deref(Some(&42u32)), 42);
        assert!(deref(Some(&true)));
    }

    #[test]
    fn test_join() {
        let tags = vec!["transit".to_string(), "ixp".to_string()];
        assert_eq!(join(Some(&tags[..])), "transit, ixp");
        assert_eq!(join(None), "");
    }

    #[test]
    fn test_timestamp_unix() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(timestamp_at("unix", now), now.timestamp().to_string());
    }

    #[test]
    fn test_timestamp_human() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        assert_eq!(timestamp_at("", now), "05 Mar 24 14:07 UTC");
        assert_eq!(timestamp_at("anything", now), "05 Mar 24 14:07 UTC");
    }

    #[test]
    fn test_timestamp_now_is_numeric() {
        assert!(timestamp("unix").parse::<i64>().is_ok());
    }

    #[test]
    fn test_split_first() {
        assert_eq!(split_first("203.0.113.1%eth0", "%"), "203.0.113.1");
        assert_eq!(split_first("203.0.113.1", "%"), "203.0.113.1");
        assert_eq!(split_first("", "%"), "");
        assert_eq!(split_first("abc", ""), "abc");
    }

    #[test]
    fn test_contains_and_is_last() {
        assert!(contains("2001:db8::1", ":"));
        assert!(!contains("192.0.2.1", ":"));
        assert!(is_last(2, 3));
        assert!(!is_last(0, 3));
        assert!(!is_last(0, 0));
    }

    #[test]
    fn test_is_last_at_usize_max() {
        assert!(!is_last(usize::MAX, 0));
        assert!(!is_last(usize::MAX, usize::MAX));
        assert!(is_last(usize::MAX - 1, usize::MAX));
    }

    #[test]
    fn test_iterate() {
        assert_eq!(iterate(3), Some(vec![0, 1, 2]));
        assert_eq!(iterate(0), Some(vec![]));
        assert_eq!(iterate(ITERATE_LIMIT).map(|v| v.len()), Some(ITERATE_LIMIT));
        assert_eq!(iterate(ITERATE_LIMIT + 1), None);
    }
}
