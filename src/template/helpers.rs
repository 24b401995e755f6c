//! Functions callable from templates
//!
//! This table is the whole API available to template authors. Every helper
//! here is a thin adapter from JSON render values to [`crate::format`],
//! [`crate::filter`] and [`ProtocolRegistry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperDef, JsonValue as Json, RenderContext,
    RenderError, RenderErrorReason, ScopedJson,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::filter::build_authorization_filter;
use crate::format;
use crate::registry::ProtocolRegistry;

/// Helpers that ship with handlebars and may be used by templates
pub const BUILTIN_HELPERS: &[&str] = &[
    "if", "unless", "each", "with", "lookup", "raw", "log", "len", "eq", "ne", "gt", "gte", "lt",
    "lte", "and", "or", "not",
];

type BoxedHelper = Box<dyn HelperDef + Send + Sync>;

/// Register every template function and return their names
pub fn register(handlebars: &mut Handlebars<'static>, registry: &Arc<ProtocolRegistry>) -> Vec<&'static str> {
    let helpers: Vec<(&'static str, BoxedHelper)> = vec![
        ("format_prefix_list", Box::new(format_prefix_list)),
        ("format_asn_list", Box::new(format_asn_list)),
        ("format_asn_set", Box::new(format_asn_set)),
        ("is_empty", Box::new(Optional(is_empty))),
        ("str_deref", Box::new(Optional(deref::<String>))),
        ("bool_deref", Box::new(Optional(deref::<bool>))),
        ("int_deref", Box::new(Optional(deref::<i64>))),
        ("uint_deref", Box::new(Optional(deref::<u64>))),
        ("slice_deref", Box::new(Optional(deref::<Vec<Json>>))),
        ("map_deref", Box::new(Optional(deref::<serde_json::Map<String, Json>>))),
        ("timestamp", Box::new(timestamp)),
        ("contains", Box::new(contains)),
        ("split_first", Box::new(split_first)),
        ("is_last", Box::new(is_last)),
        ("iterate", Box::new(iterate)),
        ("join", Box::new(Optional(join))),
        ("asn_map_contains", Box::new(asn_map_contains)),
        ("aspa_filter", Box::new(aspa_filter)),
        (
            "unique_protocol_name",
            Box::new(UniqueProtocolName {
                registry: Arc::clone(registry),
            }),
        ),
    ];

    helpers
        .into_iter()
        .map(|(name, helper)| {
            handlebars.register_helper(name, helper);
            name
        })
        .collect()
}

fn mismatch(helper: &'static str, param: &str, expected: &str) -> RenderError {
    RenderErrorReason::ParamTypeMismatchForName(helper, param.to_string(), expected.to_string()).into()
}

fn strings(values: &[Json]) -> Vec<String> {
    values
        .iter()
        .map(|value| match value {
            Json::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

/// Every element must be a 32-bit AS number
fn asns(helper: &'static str, param: &str, values: &[Json]) -> Result<Vec<u32>, RenderError> {
    values
        .iter()
        .map(|value| {
            value
                .as_u64()
                .and_then(|asn| u32::try_from(asn).ok())
                .ok_or_else(|| mismatch(helper, param, "array of u32"))
        })
        .collect()
}

/// Rebuild an ASN-keyed map from its JSON form, where keys are strings
fn provider_map(object: &serde_json::Map<String, Json>) -> Result<BTreeMap<u32, Vec<u32>>, RenderError> {
    object
        .iter()
        .map(|(key, providers)| {
            let asn = key
                .parse::<u32>()
                .map_err(|_| mismatch("aspa_filter", "providers", "map keyed by ASN"))?;
            let providers = providers
                .as_array()
                .ok_or_else(|| mismatch("aspa_filter", "providers", "map of ASN arrays"))?;
            Ok((asn, asns("aspa_filter", "providers", providers)?))
        })
        .collect()
}

/// A helper over one optional argument
///
/// A missing key, a missing argument and `null` all reach the function as
/// `None`, even in strict mode.
struct Optional(fn(Option<&Json>) -> Json);

impl HelperDef for Optional {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let value = h
            .param(0)
            .filter(|p| !p.is_value_missing())
            .map(|p| p.value())
            .filter(|value| !value.is_null());
        Ok(ScopedJson::Derived((self.0)(value)))
    }
}

fn is_empty(value: Option<&Json>) -> Json {
    let empty = match value {
        Some(Json::Array(items)) => format::is_empty(Some(items.as_slice())),
        Some(Json::Object(map)) => map.is_empty(),
        Some(Json::String(s)) => s.is_empty(),
        Some(_) => false,
        None => format::is_empty::<Json>(None),
    };
    Json::Bool(empty)
}

/// A value of the wrong type derefs to the zero value, like an absent one
fn deref<T>(value: Option<&Json>) -> Json
where
    T: DeserializeOwned + Default + Clone + Into<Json>,
{
    let typed = value.and_then(|value| T::deserialize(value).ok());
    format::deref(typed.as_ref()).into()
}

fn join(value: Option<&Json>) -> Json {
    let items = value.and_then(Json::as_array).map(|items| strings(items));
    Json::String(format::join(items.as_deref()))
}

handlebars_helper!(format_prefix_list: |prefixes: array| format::format_prefix_list(&strings(prefixes)));
handlebars_helper!(format_asn_list: |values: array| {
    format::format_asn_list(&asns("format_asn_list", "values", values)?)
});
handlebars_helper!(format_asn_set: |values: array| {
    format::format_asn_set(&asns("format_asn_set", "values", values)?)
});

handlebars_helper!(timestamp: |fmt: str| format::timestamp(fmt));
handlebars_helper!(contains: |haystack: str, needle: str| format::contains(haystack, needle));
handlebars_helper!(split_first: |s: str, delimiter: str| format::split_first(s, delimiter).to_string());
handlebars_helper!(is_last: |index: u64, len: u64| {
    match (usize::try_from(index), usize::try_from(len)) {
        (Ok(index), Ok(len)) => format::is_last(index, len),
        _ => false,
    }
});
handlebars_helper!(iterate: |count: u64| {
    usize::try_from(count)
        .ok()
        .and_then(format::iterate)
        .ok_or_else(|| {
            RenderError::from(RenderErrorReason::Other(format!(
                "iterate count {} exceeds the limit of {}",
                count,
                format::ITERATE_LIMIT
            )))
        })?
});
handlebars_helper!(asn_map_contains: |asn: u64, map: object| map.contains_key(&asn.to_string()));
handlebars_helper!(aspa_filter: |asn: u64, providers: object| {
    let asn = u32::try_from(asn).map_err(|_| mismatch("aspa_filter", "asn", "u32"))?;
    build_authorization_filter(asn, &provider_map(providers)?)
});

const UNIQUE_PROTOCOL_NAME: &str = "unique_protocol_name";

/// `unique_protocol_name base operator_name af asn [tags]`
///
/// Allocates through the shared registry, so the same arguments yield a new
/// suffixed name on every call.
pub struct UniqueProtocolName {
    registry: Arc<ProtocolRegistry>,
}

impl UniqueProtocolName {
    fn param<'a>(h: &'a Helper<'_>, index: usize) -> Result<&'a Json, RenderError> {
        h.param(index)
            .map(|p| p.value())
            .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex(UNIQUE_PROTOCOL_NAME, index).into())
    }

    fn mismatch(index: usize, expected: &str) -> RenderError {
        mismatch(UNIQUE_PROTOCOL_NAME, &index.to_string(), expected)
    }

    fn str_param<'a>(h: &'a Helper<'_>, index: usize) -> Result<&'a str, RenderError> {
        Self::param(h, index)?
            .as_str()
            .ok_or_else(|| Self::mismatch(index, "string"))
    }
}

impl HelperDef for UniqueProtocolName {
    fn call_inner<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
    ) -> Result<ScopedJson<'rc>, RenderError> {
        let base = Self::str_param(h, 0)?;
        let operator_name = Self::str_param(h, 1)?;
        // "4" and 4 are both accepted
        let address_family = match Self::param(h, 2)? {
            Json::String(af) => af.clone(),
            Json::Number(af) => af.to_string(),
            _ => return Err(Self::mismatch(2, "string")),
        };
        let asn = Self::param(h, 3)?
            .as_u64()
            .and_then(|asn| u32::try_from(asn).ok())
            .ok_or_else(|| Self::mismatch(3, "u32"))?;
        let tags = h
            .param(4)
            .and_then(|p| p.value().as_array())
            .map(|tags| strings(tags));

        let name = self
            .registry
            .allocate(base, operator_name, &address_family, asn, tags.as_deref());
        Ok(ScopedJson::Derived(Json::String(name)))
    }
}
