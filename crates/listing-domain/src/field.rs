//! Named record fields

use serde::{Deserialize, Serialize};
use std::fmt;

/// A mergeable field of a [`crate::Record`]
///
/// Only the [`Field::COMPARABLE`] subset takes part in similarity scoring;
/// the rest is carried through merging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Address,
    Phone,
    Email,
    Website,
    Category,
    OperatingHours,
    Rating,
    Description,
}

impl Field {
    /// Fields scored by the fuzzy matcher
    pub const COMPARABLE: [Field; 5] = [
        Field::Name,
        Field::Address,
        Field::Phone,
        Field::Email,
        Field::Website,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Email => "email",
            Field::Website => "website",
            Field::Category => "category",
            Field::OperatingHours => "operating_hours",
            Field::Rating => "rating",
            Field::Description => "description",
        }
    }

    pub fn is_comparable(&self) -> bool {
        Self::COMPARABLE.contains(self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparable_subset() {
        assert!(Field::Phone.is_comparable());
        assert!(!Field::Description.is_comparable());
        assert!(!Field::Rating.is_comparable());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Field::OperatingHours).unwrap();
        assert_eq!(json, r#""operating_hours""#);
        let parsed: Field = serde_json::from_str(r#""address""#).unwrap();
        assert_eq!(parsed, Field::Address);
    }
}
