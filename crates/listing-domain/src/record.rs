//! Record domain model

use super::{Field, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entity record (e.g. a business listing) as delivered by a collector
///
/// String fields use the empty string for "absent"; everything that is
/// genuinely optional is an `Option`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Where the collector found this record (URL or source label)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Default for Record {
    fn default() -> Self {
        Self {
            id: RecordId::default(),
            name: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            website: String::new(),
            category: None,
            operating_hours: None,
            rating: None,
            description: None,
            created_at: None,
            last_seen_at: None,
            is_active: true,
            source: None,
        }
    }
}

impl Record {
    /// Create a new record with an identifier and a name
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder method to add an address
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Builder method to add a phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Builder method to add an email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    /// Builder method to add a website
    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }

    /// Builder method to add a rating
    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Builder method to add a description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to set the last-seen instant
    pub fn with_last_seen(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen_at = Some(at);
        self
    }

    /// Rating if present and a finite number
    pub fn valid_rating(&self) -> Option<f64> {
        self.rating.filter(|r| r.is_finite())
    }

    /// Most recent observation instant (last seen, else created)
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_at.or(self.created_at)
    }

    /// Raw text value of a string-typed field
    ///
    /// Returns `None` for `Rating` and for absent optional fields.
    pub fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(self.name.as_str()),
            Field::Address => Some(self.address.as_str()),
            Field::Phone => Some(self.phone.as_str()),
            Field::Email => Some(self.email.as_str()),
            Field::Website => Some(self.website.as_str()),
            Field::Category => self.category.as_deref(),
            Field::OperatingHours => self.operating_hours.as_deref(),
            Field::Description => self.description.as_deref(),
            Field::Rating => None,
        }
    }

    /// Whether a field carries a usable value
    pub fn has_value(&self, field: Field) -> bool {
        match field {
            Field::Rating => self.valid_rating().is_some(),
            _ => self.text(field).is_some_and(|v| !v.trim().is_empty()),
        }
    }

    /// Number of non-empty mergeable fields
    pub fn completeness(&self) -> usize {
        [
            Field::Name,
            Field::Address,
            Field::Phone,
            Field::Email,
            Field::Website,
            Field::Category,
            Field::OperatingHours,
            Field::Rating,
            Field::Description,
        ]
        .iter()
        .filter(|f| self.has_value(**f))
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completeness() {
        let minimal = Record::new(1u64, "Island Grill");
        assert_eq!(minimal.completeness(), 1);

        let full = Record::new(2u64, "Island Grill")
            .with_address("5 Hope Rd")
            .with_phone("876-555-0101")
            .with_rating(4.0)
            .with_description("Jerk chicken");
        assert_eq!(full.completeness(), 5);
    }

    #[test]
    fn test_blank_values_do_not_count() {
        let mut record = Record::new(1u64, "   ");
        record.rating = Some(f64::NAN);
        record.category = Some(String::new());
        assert_eq!(record.completeness(), 0);
    }

    #[test]
    fn test_deserialize_defaults() {
        let record: Record =
            serde_json::from_str(r#"{"id": 7, "name": "Kingston Hardware"}"#).unwrap();
        assert_eq!(record.id, RecordId::from("7"));
        assert!(record.is_active);
        assert!(record.address.is_empty());
        assert!(record.rating.is_none());
    }
}
