use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Resolve a dot-separated field path against a record tree.
///
/// For each segment, an ordered list of strategies is tried:
///
/// 1. direct key access on an object;
/// 2. accessor-convention key (`"get"` + capitalized segment), the serialized
///    form of a zero-argument getter;
/// 3. index lookup when the current node is an array and the segment parses
///    as an index.
///
/// The first segment that matches none of these short-circuits the whole
/// resolution to `None` — no partial results are surfaced. An empty path
/// resolves to `None` immediately. Side-effect free.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = root;
    for segment in path.split('.') {
        current = resolve_segment(current, segment)?;
    }
    Some(current)
}

fn resolve_segment<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map
            .get(segment)
            .or_else(|| map.get(&accessor_key(segment))),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// `number` → `getNumber`, the accessor convention for serialized records.
fn accessor_key(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_uppercase(), chars.as_str()),
        None => String::from("get"),
    }
}

/// Resolve a field path, falling back to `default` when the path is absent,
/// unset, or resolves to nothing.
///
/// This is the collaborator-facing query: configuration stores paths as
/// `Option<String>`, and a `None` path means "not mapped" rather than an
/// error.
pub fn get_field_value(record: &Value, path: Option<&str>, default: Option<Value>) -> Option<Value> {
    match path {
        Some(p) => match resolve(record, p) {
            Some(Value::Null) | None => default,
            Some(v) => Some(v.clone()),
        },
        None => default,
    }
}

/// Coerce a scalar JSON value to a string. Containers and null yield `None`.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Coerce a scalar JSON value to a `Decimal`.
///
/// Accepts both JSON numbers and numeric strings — source systems store
/// amounts either way. Parsing goes through the decimal string representation
/// so no float rounding is introduced.
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub(crate) fn resolve_string(record: &Value, path: Option<&str>) -> Option<String> {
    get_field_value(record, path, None).and_then(|v| value_to_string(&v))
}

pub(crate) fn resolve_decimal(record: &Value, path: Option<&str>) -> Option<Decimal> {
    get_field_value(record, path, None).and_then(|v| value_to_decimal(&v))
}

/// Parse a date out of the common source representations: plain dates,
/// RFC 3339 timestamps, and `YYYY-MM-DD HH:MM:SS` database strings.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    parse_datetime(s)
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    parse_datetime(s)
        .map(|dt| dt.time())
        .or_else(|| NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
}

pub(crate) fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.naive_utc())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok())
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
}
