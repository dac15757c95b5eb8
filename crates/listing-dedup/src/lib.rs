//! listing-dedup: Record deduplication engine
//!
//! This library provides:
//! - Field normalization (names, addresses, phones, emails, websites)
//! - Exact duplicate detection via content hashing
//! - Weighted fuzzy matching with candidate blocking
//! - Confidence tiers and transitive grouping of HIGH matches
//! - Merge resolution with per-field provenance
//! - A manual review queue for MEDIUM and LOW matches
//!
//! The engine is an in-process library: records go in, a final record set
//! and a review queue come out. It never touches a datastore.

pub mod blocking;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod exact;
pub mod merge;
pub mod normalization;
pub mod review;
pub mod similarity;
pub mod union_find;

// Re-export main types for convenience
pub use classify::{classify_matches, Classification, ConfidenceTier};
pub use config::{
    BlockingStrategy, DeduplicationConfig, FieldWeights, ReviewGrouping, TierBoundaries,
};
pub use engine::{Budget, DeduplicationEngine, DeduplicationOutcome, DeduplicationStats, Phase};
pub use error::{ConfigError, DedupError, Result};
pub use exact::{content_hash, find_exact_duplicates};
pub use merge::{resolve, DiscardedValue, FieldOrigin, MergeDecision, Provenance};
pub use normalization::{normalize, NormalizedRecord};
pub use review::{build_review_queue, ReviewItem, ReviewQueue, ReviewSuggestion};
pub use similarity::{compare, score_pair, MatchKind, MatchResult, PairScore};

pub use listing_domain::{Field, Record, RecordId, RejectedRecord, RejectionReason};
