//! Validation for incoming records

use super::{Field, Record, RecordId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a record was kept out of a deduplication pass
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    #[error("record has no identifier")]
    MissingIdentifier,

    #[error("record has no comparable field (name, address, phone, email, website)")]
    NoComparableFields,
}

/// A record rejected from the input set, reported back for audit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Identifier as supplied (empty when missing)
    pub id: RecordId,
    /// Position in the input collection
    pub position: usize,
    pub reason: RejectionReason,
}

/// Check that a record can take part in deduplication
pub fn validate_record(record: &Record) -> Result<(), RejectionReason> {
    if record.id.is_missing() {
        return Err(RejectionReason::MissingIdentifier);
    }

    if !Field::COMPARABLE.iter().any(|f| record.has_value(*f)) {
        return Err(RejectionReason::NoComparableFields);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_record() {
        let record = Record::new(1u64, "Island Grill");
        assert!(validate_record(&record).is_ok());
    }

    #[test]
    fn test_missing_identifier() {
        let record = Record::new("", "Island Grill");
        assert_eq!(
            validate_record(&record),
            Err(RejectionReason::MissingIdentifier)
        );
    }

    #[test]
    fn test_no_comparable_fields() {
        let record = Record::new(1u64, "  ").with_description("only a description");
        assert_eq!(
            validate_record(&record),
            Err(RejectionReason::NoComparableFields)
        );
    }

    #[test]
    fn test_phone_alone_is_enough() {
        let record = Record::new(1u64, "").with_phone("876-555-0101");
        assert!(validate_record(&record).is_ok());
    }
}
