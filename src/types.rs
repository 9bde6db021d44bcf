//! Custom scalars shared by generated schemas

use async_graphql::dynamic::Scalar;
use async_graphql::Value;
use chrono::DateTime as ChronoDateTime;

pub const LONG: &str = "Long";
pub const DATE_TIME: &str = "DateTime";

/// 64-bit integer scalar
pub fn long_scalar() -> Scalar {
    Scalar::new(LONG)
        .description("Long type")
        .validator(|value| matches!(value, Value::Number(n) if n.is_i64() || n.is_u64()))
}

/// RFC 3339 timestamp scalar
pub fn date_time_scalar() -> Scalar {
    Scalar::new(DATE_TIME)
        .description("Date and time in RFC 3339 format")
        .specified_by_url("https://datatracker.ietf.org/doc/html/rfc3339")
        .validator(|value| is_date_time(value))
}

fn is_date_time(value: &Value) -> bool {
    match value {
        Value::String(s) => ChronoDateTime::parse_from_rfc3339(s).is_ok(),
        _ => false,
    }
}

/// Every custom scalar a registry may reference
pub fn custom_scalars() -> Vec<Scalar> {
    vec![long_scalar(), date_time_scalar()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_validation() {
        assert!(is_date_time(&Value::String("2024-03-01T10:00:00Z".to_string())));
        assert!(is_date_time(&Value::String("2024-03-01T10:00:00+02:00".to_string())));
        assert!(!is_date_time(&Value::String("yesterday".to_string())));
        assert!(!is_date_time(&Value::from(12)));
    }
}
