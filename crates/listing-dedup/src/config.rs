//! Configuration for the deduplication engine
//!
//! Every knob has a default, so an empty TOML document or `{}` is a valid
//! configuration. Call [`DeduplicationConfig::validate`] (the engine does it
//! on construction) before scoring anything.

use std::path::Path;

use listing_domain::Field;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeduplicationConfig {
    /// Minimum aggregate confidence (0-100) for a fuzzy pair to be recorded
    pub acceptance_threshold: f64,
    /// Per-field weights for the aggregate confidence
    pub weights: FieldWeights,
    /// Confidence tier boundaries
    pub tiers: TierBoundaries,
    /// Fields hashed by the exact matcher
    pub exact_match_fields: Vec<Field>,
    /// Candidate pre-filter for the fuzzy pass
    pub blocking: BlockingStrategy,
    /// How review items sharing a record are presented
    pub review_grouping: ReviewGrouping,
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 80.0,
            weights: FieldWeights::default(),
            tiers: TierBoundaries::default(),
            exact_match_fields: vec![Field::Name, Field::Address],
            blocking: BlockingStrategy::default(),
            review_grouping: ReviewGrouping::default(),
        }
    }
}

/// Weights of the comparable fields
///
/// Weights are re-normalized over the fields present in both records, so
/// only their ratios matter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub name: f64,
    pub address: f64,
    pub phone: f64,
    pub email: f64,
    pub website: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name: 0.5,
            address: 0.3,
            phone: 0.15,
            email: 0.05,
            website: 0.0,
        }
    }
}

impl FieldWeights {
    /// Weight of a field; non-comparable fields weigh nothing
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Name => self.name,
            Field::Address => self.address,
            Field::Phone => self.phone,
            Field::Email => self.email,
            Field::Website => self.website,
            _ => 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        Field::COMPARABLE.iter().map(|f| self.get(*f)).sum()
    }
}

/// Lower bounds (inclusive) of the confidence tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBoundaries {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for TierBoundaries {
    fn default() -> Self {
        Self {
            high: 90.0,
            medium: 70.0,
            low: 50.0,
        }
    }
}

/// Pre-filter that limits which pairs reach full fuzzy scoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingStrategy {
    /// Compare every pair
    #[default]
    None,
    /// Compare pairs sharing at least one normalized name token
    SharedNameToken,
    /// Compare pairs with the same normalized city
    SameCity,
}

/// Presentation of review items that share a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewGrouping {
    /// Each item stands alone
    #[default]
    Independent,
    /// Items connected through a shared record get one cluster number
    ByRecord,
}

impl DeduplicationConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load configuration from a file; `.json` is parsed as JSON, anything
    /// else as TOML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_percentage("acceptance_threshold", self.acceptance_threshold)?;
        check_percentage("tiers.high", self.tiers.high)?;
        check_percentage("tiers.medium", self.tiers.medium)?;
        check_percentage("tiers.low", self.tiers.low)?;

        if self.tiers.high <= self.tiers.medium || self.tiers.medium <= self.tiers.low {
            return Err(ConfigError::InvalidThresholds(format!(
                "tiers must satisfy high > medium > low, got {} / {} / {}",
                self.tiers.high, self.tiers.medium, self.tiers.low
            )));
        }

        for field in Field::COMPARABLE {
            let weight = self.weights.get(field);
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::InvalidWeights(format!(
                    "weight for {} must be a non-negative number, got {}",
                    field, weight
                )));
            }
        }

        if self.weights.total() <= 0.0 {
            return Err(ConfigError::InvalidWeights(
                "at least one comparable field must have a positive weight".to_string(),
            ));
        }

        if self.exact_match_fields.is_empty() {
            return Err(ConfigError::InvalidExactFields(
                "at least one field is required".to_string(),
            ));
        }

        if let Some(field) = self.exact_match_fields.iter().find(|f| !f.is_comparable()) {
            return Err(ConfigError::InvalidExactFields(format!(
                "{} is not a comparable field",
                field
            )));
        }

        Ok(())
    }
}

fn check_percentage(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DeduplicationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.acceptance_threshold, 80.0);
        assert_eq!(config.exact_match_fields, vec![Field::Name, Field::Address]);
    }

    #[test]
    fn test_json_serialization() {
        let config = DeduplicationConfig::default();
        let json = config.to_json().unwrap();
        let parsed = DeduplicationConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DeduplicationConfig::from_toml(
            r#"
acceptance_threshold = 60.0
blocking = "same_city"

[weights]
phone = 0.6
"#,
        )
        .unwrap();

        assert_eq!(config.acceptance_threshold, 60.0);
        assert_eq!(config.blocking, BlockingStrategy::SameCity);
        assert_eq!(config.weights.phone, 0.6);
        assert_eq!(config.weights.name, 0.5);
        assert_eq!(config.tiers.high, 90.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range() {
        let mut config = DeduplicationConfig::default();
        config.acceptance_threshold = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_invalid_thresholds() {
        let mut config = DeduplicationConfig::default();
        config.tiers.high = 60.0;
        config.tiers.medium = 70.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThresholds(_))
        ));
    }

    #[test]
    fn test_zero_weights_rejected() {
        let mut config = DeduplicationConfig::default();
        config.weights = FieldWeights {
            name: 0.0,
            address: 0.0,
            phone: 0.0,
            email: 0.0,
            website: 0.0,
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeights(_))
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = DeduplicationConfig::default();
        config.weights.email = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exact_fields_must_be_comparable() {
        let mut config = DeduplicationConfig::default();
        config.exact_match_fields = vec![Field::Name, Field::Description];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidExactFields(_))
        ));

        config.exact_match_fields.clear();
        assert!(config.validate().is_err());
    }
}
