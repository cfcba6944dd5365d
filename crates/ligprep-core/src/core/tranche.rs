//! Bucket assignment of computed attributes into a fixed-width letter code.
//!
//! Each tranche type contributes exactly one letter. Numeric types scan an
//! ascending list of partition boundaries; categorical types look the value up
//! in an explicit mapping. The code is the concatenation of the letters in
//! declaration order.

use crate::core::models::ligand::AttributeValue;
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

pub const TRANCHE_LETTERS: &[u8; 52] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Letter used for categorical values without a mapping entry.
pub const UNMAPPED_LETTER: char = 'X';

/// One fewer than the number of available letters.
pub const MAX_PARTITIONS: usize = TRANCHE_LETTERS.len() - 1;

static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9+\-eE\.]+$").expect("valid number regex"));

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrancheError {
    #[error("Attribute '{0}' required for tranche assignment was not generated")]
    MissingAttribute(String),

    #[error("Invalid result from tranche type '{attribute}', value was '{value}'")]
    NonNumeric { attribute: String, value: String },

    #[error("Invalid partitions for tranche type '{attribute}': {reason}")]
    InvalidPartitions { attribute: String, reason: String },

    #[error("Invalid mapping for tranche type '{attribute}': '{letter}' is not a tranche letter")]
    InvalidMapping { attribute: String, letter: char },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrancheRule {
    /// Ascending boundaries; `n` boundaries yield `n + 1` letters.
    Partitions(Vec<f64>),
    /// Categorical value to letter.
    Mapping(HashMap<String, char>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrancheType {
    pub attribute: String,
    pub rule: TrancheRule,
}

impl TrancheType {
    pub fn numeric(attribute: impl Into<String>, partitions: Vec<f64>) -> Self {
        Self {
            attribute: attribute.into(),
            rule: TrancheRule::Partitions(partitions),
        }
    }

    pub fn categorical(attribute: impl Into<String>, mapping: HashMap<String, char>) -> Self {
        Self {
            attribute: attribute.into(),
            rule: TrancheRule::Mapping(mapping),
        }
    }

    fn validate(&self) -> Result<(), TrancheError> {
        match &self.rule {
            TrancheRule::Partitions(partitions) => {
                let invalid = |reason: &str| TrancheError::InvalidPartitions {
                    attribute: self.attribute.clone(),
                    reason: reason.to_string(),
                };
                if partitions.is_empty() {
                    return Err(invalid("at least one boundary is required"));
                }
                if partitions.len() > MAX_PARTITIONS {
                    return Err(invalid("more boundaries than available letters"));
                }
                if partitions.iter().any(|p| !p.is_finite()) {
                    return Err(invalid("boundaries must be finite numbers"));
                }
                if partitions.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(invalid("boundaries must be strictly ascending"));
                }
                Ok(())
            }
            TrancheRule::Mapping(mapping) => {
                match mapping.values().find(|l| !l.is_ascii_alphabetic()) {
                    Some(letter) => Err(TrancheError::InvalidMapping {
                        attribute: self.attribute.clone(),
                        letter: *letter,
                    }),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Letter for `value` against ascending `partitions`.
///
/// `A` for values at or below the first boundary, the last letter above the
/// final boundary, otherwise the letter after the last boundary that is
/// strictly exceeded.
pub fn letter_for_value(partitions: &[f64], value: f64) -> char {
    let index = partitions.iter().take_while(|p| value > **p).count();
    TRANCHE_LETTERS[index.min(MAX_PARTITIONS)] as char
}

pub fn letter_for_category(mapping: &HashMap<String, char>, value: &str) -> char {
    mapping.get(value).copied().unwrap_or(UNMAPPED_LETTER)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrancheAssignment {
    pub code: String,
    /// `<attribute>: <value>` per tranche type, in declaration order.
    pub details: Vec<String>,
}

/// Validated, ordered list of tranche types.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrancheScheme {
    types: Vec<TrancheType>,
}

impl TrancheScheme {
    pub fn new(types: Vec<TrancheType>) -> Result<Self, TrancheError> {
        for tranche_type in &types {
            tranche_type.validate()?;
        }
        Ok(Self { types })
    }

    pub fn types(&self) -> &[TrancheType] {
        &self.types
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.attribute.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn assign(
        &self,
        attributes: &IndexMap<String, AttributeValue>,
    ) -> Result<TrancheAssignment, TrancheError> {
        let mut code = String::with_capacity(self.types.len());
        let mut details = Vec::with_capacity(self.types.len());

        for tranche_type in &self.types {
            let value = attributes
                .get(&tranche_type.attribute)
                .ok_or_else(|| TrancheError::MissingAttribute(tranche_type.attribute.clone()))?
                .to_string();

            let letter = match &tranche_type.rule {
                TrancheRule::Mapping(mapping) => letter_for_category(mapping, &value),
                TrancheRule::Partitions(partitions) => {
                    let number = PLAIN_NUMBER
                        .is_match(&value)
                        .then(|| value.parse::<f64>().ok())
                        .flatten()
                        .ok_or_else(|| TrancheError::NonNumeric {
                            attribute: tranche_type.attribute.clone(),
                            value: value.clone(),
                        })?;
                    letter_for_value(partitions, number)
                }
            };

            debug!(
                attribute = %tranche_type.attribute,
                value = %value,
                letter = %letter,
                "Assigned tranche letter."
            );
            code.push(letter);
            details.push(format!("{}: {}", tranche_type.attribute, value));
        }

        Ok(TrancheAssignment { code, details })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> IndexMap<String, AttributeValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn partition_scan_is_inclusive_at_each_boundary() {
        let partitions = [1.0, 2.0, 3.0];
        assert_eq!(letter_for_value(&partitions, 0.2), 'A');
        assert_eq!(letter_for_value(&partitions, 1.0), 'A');
        assert_eq!(letter_for_value(&partitions, 1.5), 'B');
        assert_eq!(letter_for_value(&partitions, 3.0), 'C');
        assert_eq!(letter_for_value(&partitions, 3.5), 'D');
    }

    #[test]
    fn letters_continue_into_lowercase() {
        let partitions: Vec<f64> = (0..MAX_PARTITIONS).map(|i| i as f64).collect();
        assert_eq!(letter_for_value(&partitions, 26.5), 'b');
        assert_eq!(letter_for_value(&partitions, 1000.0), 'z');
    }

    #[test]
    fn unmapped_category_yields_sentinel() {
        let mapping = HashMap::from([("REAL".to_string(), 'R')]);
        assert_eq!(letter_for_category(&mapping, "REAL"), 'R');
        assert_eq!(letter_for_category(&mapping, "Other"), UNMAPPED_LETTER);
    }

    #[test]
    fn code_concatenates_in_declaration_order() {
        let scheme = TrancheScheme::new(vec![
            TrancheType::numeric("halogencount", vec![0.0, 1.0]),
            TrancheType::categorical(
                "enamine_type",
                HashMap::from([("REAL".to_string(), 'R')]),
            ),
            TrancheType::numeric("mw_file", vec![200.0, 300.0, 400.0]),
        ])
        .unwrap();

        let assignment = scheme
            .assign(&attrs(&[
                ("mw_file", AttributeValue::Text("350.2".into())),
                ("halogencount", AttributeValue::Integer(2)),
                ("enamine_type", AttributeValue::Text("REAL".into())),
            ]))
            .unwrap();

        assert_eq!(assignment.code, "CRC");
        assert_eq!(
            assignment.details,
            ["halogencount: 2", "enamine_type: REAL", "mw_file: 350.2"]
        );
    }

    #[test]
    fn non_numeric_value_fails_whole_assignment() {
        let scheme =
            TrancheScheme::new(vec![TrancheType::numeric("mw_obabel", vec![300.0])]).unwrap();
        let err = scheme
            .assign(&attrs(&[("mw_obabel", AttributeValue::Text("INVALID".into()))]))
            .unwrap_err();
        assert_eq!(
            err,
            TrancheError::NonNumeric {
                attribute: "mw_obabel".into(),
                value: "INVALID".into()
            }
        );

        let err = scheme
            .assign(&attrs(&[("mw_obabel", AttributeValue::Text("1e".into()))]))
            .unwrap_err();
        assert!(matches!(err, TrancheError::NonNumeric { .. }));
    }

    #[test]
    fn missing_attribute_is_reported() {
        let scheme =
            TrancheScheme::new(vec![TrancheType::numeric("mw_file", vec![300.0])]).unwrap();
        assert_eq!(
            scheme.assign(&IndexMap::new()),
            Err(TrancheError::MissingAttribute("mw_file".into()))
        );
    }

    #[test]
    fn scheme_rejects_unsorted_or_oversized_partitions() {
        assert!(matches!(
            TrancheScheme::new(vec![TrancheType::numeric("x", vec![2.0, 1.0])]),
            Err(TrancheError::InvalidPartitions { .. })
        ));
        assert!(matches!(
            TrancheScheme::new(vec![TrancheType::numeric("x", vec![])]),
            Err(TrancheError::InvalidPartitions { .. })
        ));
        let too_many: Vec<f64> = (0..=MAX_PARTITIONS).map(|i| i as f64).collect();
        assert!(matches!(
            TrancheScheme::new(vec![TrancheType::numeric("x", too_many)]),
            Err(TrancheError::InvalidPartitions { .. })
        ));
        assert!(matches!(
            TrancheScheme::new(vec![TrancheType::categorical(
                "enamine_type",
                HashMap::from([("REAL".to_string(), '1')])
            )]),
            Err(TrancheError::InvalidMapping { .. })
        ));
    }
}
