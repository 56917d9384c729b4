//! Deserializers for numbers the server sends either as JSON numbers or as
//! numeric strings (`"2500.00"`).

use std::fmt::Display;
use std::str::FromStr;

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Number(T),
    Text(String),
}

fn parse<T, E>(text: &str) -> Result<T, E>
where
    T: FromStr,
    T::Err: Display,
    E: Error,
{
    text.trim()
        .parse()
        .map_err(|e| E::custom(format!("invalid number {:?}: {}", text, e)))
}

pub fn number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Number(n) => Ok(n),
        Lenient::Text(text) => parse(&text),
    }
}

/// Like [`number`], but `null` and empty strings decode to `None`.
pub fn optional_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Option::<Lenient<T>>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Lenient::Number(n)) => Ok(Some(n)),
        Some(Lenient::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Lenient::Text(text)) => parse(&text).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "number")]
        amount: f64,
        #[serde(deserialize_with = "number")]
        count: u32,
        #[serde(default, deserialize_with = "optional_number")]
        extra: Option<f64>,
    }

    #[test]
    fn test_numbers_and_strings() {
        let s: Sample = serde_json::from_value(json!({"amount": "2500.00", "count": "4"})).unwrap();
        assert_eq!(s.amount, 2500.0);
        assert_eq!(s.count, 4);
        assert_eq!(s.extra, None);

        let s: Sample =
            serde_json::from_value(json!({"amount": 1200, "count": 10, "extra": "7.5"})).unwrap();
        assert_eq!(s.amount, 1200.0);
        assert_eq!(s.count, 10);
        assert_eq!(s.extra, Some(7.5));
    }

    #[test]
    fn test_optional_accepts_null_and_blank() {
        let s: Sample =
            serde_json::from_value(json!({"amount": 1, "count": 1, "extra": null})).unwrap();
        assert_eq!(s.extra, None);
        let s: Sample =
            serde_json::from_value(json!({"amount": 1, "count": 1, "extra": " "})).unwrap();
        assert_eq!(s.extra, None);
    }

    #[test]
    fn test_garbage_is_an_error() {
        let result = serde_json::from_value::<Sample>(json!({"amount": "abc", "count": 1}));
        assert!(result.is_err());
    }
}
