//! Lenient deserializers for query-string parameters.
//!
//! Browsers and form clients send absent filters as empty strings
//! (`?category=&from=`); these helpers treat an empty value as `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => s.parse::<i64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

pub fn deserialize_optional_datetime<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn deserialize_optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref() {
        None | Some("") => Ok(None),
        Some("true") | Some("1") => Ok(Some(true)),
        Some("false") | Some("0") => Ok(Some(false)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid boolean value: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Filters {
        #[serde(default, deserialize_with = "deserialize_optional_string")]
        q: Option<String>,
        #[serde(default, deserialize_with = "deserialize_optional_datetime")]
        from: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "deserialize_optional_bool")]
        upcoming: Option<bool>,
    }

    #[test]
    fn test_empty_values_are_none() {
        let filters: Filters =
            serde_json::from_str(r#"{"q":"  ","from":"","upcoming":""}"#).unwrap();
        assert!(filters.q.is_none());
        assert!(filters.from.is_none());
        assert!(filters.upcoming.is_none());
    }

    #[test]
    fn test_values_are_parsed() {
        let filters: Filters = serde_json::from_str(
            r#"{"q":" jazz ","from":"2026-05-01T18:00:00Z","upcoming":"true"}"#,
        )
        .unwrap();
        assert_eq!(filters.q.as_deref(), Some("jazz"));
        assert!(filters.from.is_some());
        assert_eq!(filters.upcoming, Some(true));
    }

    #[test]
    fn test_invalid_bool_is_rejected() {
        let result: Result<Filters, _> = serde_json::from_str(r#"{"upcoming":"maybe"}"#);
        assert!(result.is_err());
    }
}
