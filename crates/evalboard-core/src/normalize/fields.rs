//! Total accessors over loosely-typed JSON. None of these fail: absence and
//! type mismatches collapse to `None` or an empty value.

use chrono::{DateTime, Utc};
use serde_json::Value;

pub fn at<'a>(v: Option<&'a Value>, path: &[&str]) -> Option<&'a Value> {
    let mut cur = v?;
    for key in path {
        cur = cur.get(key)?;
    }
    if cur.is_null() {
        None
    } else {
        Some(cur)
    }
}

/// First element of an array, or the value itself when it is an object.
pub fn first(v: Option<&Value>) -> Option<&Value> {
    match v? {
        Value::Array(items) => items.first().filter(|i| !i.is_null()),
        obj @ Value::Object(_) => Some(obj),
        _ => None,
    }
}

pub fn object(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| v.is_object())
}

/// Strings verbatim, scalars stringified, null/absent as "".
pub fn text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Non-empty string, or `None`.
pub fn opt_text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Finite number; numeric strings are accepted.
pub fn num(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

pub fn boolean(v: Option<&Value>) -> Option<bool> {
    match v? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "pass" | "passed" => Some(true),
            "false" | "no" | "fail" | "failed" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Evaluation score clamped into [0, 1].
pub fn score(v: Option<&Value>) -> Option<f64> {
    num(v).map(|s| s.clamp(0.0, 1.0))
}

/// Milliseconds since the epoch, from a number or an RFC3339 string.
pub fn epoch_ms(v: Option<&Value>) -> Option<f64> {
    if let Some(n) = num(v) {
        return Some(n);
    }
    let s = v?.as_str()?;
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.timestamp_millis() as f64)
}

pub fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|i| !i.is_null())
            .map(|i| text(Some(i)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Clone of the value, `Null` when absent.
pub fn raw(v: Option<&Value>) -> Value {
    v.cloned().unwrap_or(Value::Null)
}

/// `(date, fullDate)` display strings for a record.
pub fn display_dates(t: DateTime<Utc>) -> (String, String) {
    (
        t.format("%b %-d, %Y").to_string(),
        t.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn path_navigation_treats_null_as_absent() {
        let v = json!({"a": {"b": null, "c": 1}});
        assert!(at(Some(&v), &["a", "b"]).is_none());
        assert_eq!(at(Some(&v), &["a", "c"]), Some(&json!(1)));
        assert!(at(Some(&v), &["x", "y"]).is_none());
        assert!(at(None, &["a"]).is_none());
    }

    #[test]
    fn numbers_accept_strings_and_reject_garbage() {
        assert_eq!(num(Some(&json!(0.5))), Some(0.5));
        assert_eq!(num(Some(&json!(" 0.75 "))), Some(0.75));
        assert_eq!(num(Some(&json!("n/a"))), None);
        assert_eq!(num(Some(&json!(true))), None);
    }

    #[test]
    fn score_is_clamped() {
        assert_eq!(score(Some(&json!(1.7))), Some(1.0));
        assert_eq!(score(Some(&json!(-0.2))), Some(0.0));
        assert_eq!(score(None), None);
    }

    #[test]
    fn text_stringifies_scalars() {
        assert_eq!(text(Some(&json!("hi"))), "hi");
        assert_eq!(text(Some(&json!(3))), "3");
        assert_eq!(text(Some(&Value::Null)), "");
        assert_eq!(opt_text(Some(&json!("   "))), None);
    }

    #[test]
    fn first_of_array_or_object() {
        let arr = json!([{"score": 1}, {"score": 2}]);
        assert_eq!(first(Some(&arr)), Some(&json!({"score": 1})));
        let obj = json!({"score": 3});
        assert_eq!(first(Some(&obj)), Some(&obj));
        assert!(first(Some(&json!([]))).is_none());
    }

    #[test]
    fn epoch_from_rfc3339() {
        let v = json!("1970-01-01T00:00:01Z");
        assert_eq!(epoch_ms(Some(&v)), Some(1000.0));
    }

    #[test]
    fn display_dates_format() {
        let t = Utc.with_ymd_and_hms(2026, 2, 7, 14, 54, 59).unwrap();
        let (date, full) = display_dates(t);
        assert_eq!(date, "Feb 7, 2026");
        assert_eq!(full, "2026-02-07 14:54:59");
    }
}
