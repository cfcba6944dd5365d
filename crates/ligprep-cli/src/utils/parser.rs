//! Value shapes accepted by control files. Switches are the literal strings
//! `"true"`/`"false"`, numbers may be quoted.

use serde::{Deserialize, Deserializer, de};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid switch '{0}'. Expected \"true\" or \"false\".")]
    InvalidSwitch(String),

    #[error("Invalid number '{0}'.")]
    InvalidNumber(String),

    #[error("Invalid timeout '{0}'. Expected a non-negative number of seconds.")]
    InvalidTimeout(String),
}

pub fn parse_switch(value: &str) -> Result<bool, ParseError> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ParseError::InvalidSwitch(other.to_string())),
    }
}

pub fn parse_number(value: &str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(value.to_string()))
}

pub fn parse_seconds(value: &str) -> Result<Duration, ParseError> {
    let seconds = parse_number(value).map_err(|_| ParseError::InvalidTimeout(value.to_string()))?;
    Duration::try_from_secs_f64(seconds).map_err(|_| ParseError::InvalidTimeout(value.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Raw {
    fn into_text(self) -> String {
        match self {
            Raw::Bool(b) => b.to_string(),
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        }
    }
}

pub fn switch<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Raw>::deserialize(deserializer)?;
    raw.map(|r| parse_switch(&r.into_text()).map_err(de::Error::custom))
        .transpose()
}

pub fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Raw>::deserialize(deserializer)?;
    raw.map(|r| match r {
        Raw::Number(n) => Ok(n),
        other => parse_number(&other.into_text()).map_err(de::Error::custom),
    })
    .transpose()
}

pub fn seconds<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Raw>::deserialize(deserializer)?;
    raw.map(|r| parse_seconds(&r.into_text()).map_err(de::Error::custom))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Debug)]
    struct Sample {
        #[serde(default, deserialize_with = "switch")]
        flag: Option<bool>,
        #[serde(default, deserialize_with = "number")]
        value: Option<f64>,
        #[serde(default, deserialize_with = "seconds")]
        timeout: Option<Duration>,
    }

    #[test]
    fn switches_accept_literal_strings_only() {
        assert_eq!(parse_switch("true"), Ok(true));
        assert_eq!(parse_switch(" false "), Ok(false));
        assert_eq!(
            parse_switch("yes"),
            Err(ParseError::InvalidSwitch("yes".to_string()))
        );
    }

    #[test]
    fn quoted_and_bare_values_are_equivalent() {
        let quoted: Sample =
            serde_json::from_str(r#"{"flag": "true", "value": "7.4", "timeout": "10"}"#).unwrap();
        let bare: Sample =
            serde_json::from_str(r#"{"flag": true, "value": 7.4, "timeout": 10}"#).unwrap();
        assert_eq!(quoted.flag, Some(true));
        assert_eq!(quoted.value, Some(7.4));
        assert_eq!(quoted.timeout, Some(Duration::from_secs(10)));
        assert_eq!(bare.flag, quoted.flag);
        assert_eq!(bare.value, quoted.value);
        assert_eq!(bare.timeout, quoted.timeout);
    }

    #[test]
    fn absent_values_stay_unset() {
        let sample: Sample = serde_json::from_str("{}").unwrap();
        assert!(sample.flag.is_none());
        assert!(sample.value.is_none());
        assert!(sample.timeout.is_none());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"flag": "1"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"value": "abc"}"#).is_err());
        assert!(serde_json::from_str::<Sample>(r#"{"timeout": "-3"}"#).is_err());
    }
}
