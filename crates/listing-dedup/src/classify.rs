//! Confidence tiers and match routing
//!
//! HIGH matches are auto-merge eligible, MEDIUM and LOW go to manual review,
//! NONE is not a match at all.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::TierBoundaries;
use crate::similarity::MatchResult;

/// Named band of an aggregate confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    None,
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Tier of a 0-100 score; boundaries are inclusive lower bounds
    pub fn classify(score: f64, tiers: &TierBoundaries) -> Self {
        if score >= tiers.high {
            ConfidenceTier::High
        } else if score >= tiers.medium {
            ConfidenceTier::Medium
        } else if score >= tiers.low {
            ConfidenceTier::Low
        } else {
            ConfidenceTier::None
        }
    }

    pub fn is_auto_merge(&self) -> bool {
        matches!(self, ConfidenceTier::High)
    }

    pub fn requires_review(&self) -> bool {
        matches!(self, ConfidenceTier::Medium | ConfidenceTier::Low)
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfidenceTier::None => "NONE",
            ConfidenceTier::Low => "LOW",
            ConfidenceTier::Medium => "MEDIUM",
            ConfidenceTier::High => "HIGH",
        };
        f.write_str(label)
    }
}

/// Matches split by routing decision
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// HIGH matches, to be unioned into merge groups
    pub auto_merge: Vec<MatchResult>,
    /// MEDIUM and LOW matches, surfaced for manual review
    pub review: Vec<MatchResult>,
    /// Number of NONE matches dropped
    pub discarded: usize,
}

/// Route every match by its tier
pub fn classify_matches(matches: Vec<MatchResult>) -> Classification {
    let mut classification = Classification::default();

    for result in matches {
        if result.tier.is_auto_merge() {
            classification.auto_merge.push(result);
        } else if result.tier.requires_review() {
            classification.review.push(result);
        } else {
            classification.discarded += 1;
        }
    }

    classification
}
