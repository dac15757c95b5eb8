//! Listing domain types shared by the deduplication engine and its callers
//!
//! This crate provides the canonical models for collected entity records:
//! - Record: a business listing (or customer) as delivered by a collector
//! - RecordId: caller-assigned identifier with numeric-aware ordering
//! - Field: the named fields that are scored and merged
//! - Validation: per-record rejection reasons surfaced to the caller

pub mod field;
pub mod record;
pub mod record_id;
pub mod validation;

pub use field::*;
pub use record::*;
pub use record_id::*;
pub use validation::*;
