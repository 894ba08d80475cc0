//! Login-time decoding.

use serde_json::Value;

/// Decode a stored login time.
///
/// Sources are tried in order: a JSON number, a numeric string, the
/// session's score in the per-user index. If none of them yields a finite
/// value the login time is unknown.
pub fn decode_login_time(raw: Option<&Value>, index_score: Option<f64>) -> Option<i64> {
    raw.and_then(from_value)
        .or_else(|| index_score.and_then(finite_millis))
}

fn from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(finite_millis)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(finite_millis))
        }
        _ => None,
    }
}

fn finite_millis(v: f64) -> Option<i64> {
    v.is_finite().then_some(v as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_wins() {
        assert_eq!(
            decode_login_time(Some(&json!(1_700_000_000_123_i64)), Some(5.0)),
            Some(1_700_000_000_123)
        );
    }

    #[test]
    fn test_numeric_string() {
        assert_eq!(
            decode_login_time(Some(&json!("1700000000123")), Some(5.0)),
            Some(1_700_000_000_123)
        );
        assert_eq!(decode_login_time(Some(&json!(" 12.0 ")), None), Some(12));
    }

    #[test]
    fn test_falls_back_to_score() {
        assert_eq!(decode_login_time(Some(&json!("yesterday")), Some(99.0)), Some(99));
        assert_eq!(decode_login_time(Some(&json!(true)), Some(7.0)), Some(7));
        assert_eq!(decode_login_time(None, Some(3.0)), Some(3));
    }

    #[test]
    fn test_absent() {
        assert_eq!(decode_login_time(Some(&json!("nope")), None), None);
        assert_eq!(decode_login_time(None, Some(f64::NAN)), None);
        assert_eq!(decode_login_time(None, None), None);
    }
}
