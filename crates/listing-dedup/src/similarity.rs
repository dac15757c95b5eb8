//! Similarity scoring for deduplication
//!
//! Every score is on a 0-100 scale. Per-field scores are combined into one
//! confidence with the configured weights, re-normalized over the fields
//! present in both records so that missing data never drags a pair down.

use std::collections::{BTreeMap, BTreeSet};

use listing_domain::{Field, RecordId};
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;
use url::Url;

use crate::classify::ConfidenceTier;
use crate::config::{DeduplicationConfig, FieldWeights};
use crate::normalization::NormalizedRecord;

/// How a match was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Identical content hash
    Exact,
    /// Weighted similarity above the acceptance threshold
    Fuzzy,
}

/// Result of comparing two records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub left: RecordId,
    pub right: RecordId,
    pub kind: MatchKind,
    /// Per-field similarity (0-100) for every field present in both records
    pub field_scores: BTreeMap<Field, f64>,
    /// Aggregate confidence (0-100)
    pub confidence: f64,
    pub tier: ConfidenceTier,
    /// Fields whose own score reached the acceptance threshold
    pub contributing_fields: Vec<Field>,
    /// Comparable fields missing in either record, left out of the score
    pub excluded_fields: Vec<Field>,
}

impl MatchResult {
    /// Exact-hash match: confidence 100 on every hashed field
    pub fn exact(left: RecordId, right: RecordId, fields: &[Field]) -> Self {
        Self {
            left,
            right,
            kind: MatchKind::Exact,
            field_scores: fields.iter().map(|f| (*f, 100.0)).collect(),
            confidence: 100.0,
            tier: ConfidenceTier::High,
            contributing_fields: fields.to_vec(),
            excluded_fields: Vec::new(),
        }
    }
}

/// Unthresholded aggregate score of a pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    pub field_scores: BTreeMap<Field, f64>,
    pub confidence: f64,
    pub excluded_fields: Vec<Field>,
}

/// Score a pair without applying any threshold
///
/// Returns `None` when the records share no weighted comparable field; such
/// a pair can be asserted neither duplicate nor distinct.
pub fn score_pair(
    a: &NormalizedRecord,
    b: &NormalizedRecord,
    weights: &FieldWeights,
) -> Option<PairScore> {
    let mut field_scores = BTreeMap::new();
    let mut excluded_fields = Vec::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for field in Field::COMPARABLE {
        if !a.has(field) || !b.has(field) {
            excluded_fields.push(field);
            continue;
        }

        let score = field_similarity(field, a.get(field), b.get(field));
        let weight = weights.get(field);
        field_scores.insert(field, score);
        weighted_sum += score * weight;
        weight_total += weight;
    }

    if weight_total <= 0.0 {
        return None;
    }

    Some(PairScore {
        field_scores,
        confidence: (weighted_sum / weight_total).clamp(0.0, 100.0),
        excluded_fields,
    })
}

/// Compare two records, keeping the pair only at or above the acceptance
/// threshold
pub fn compare(
    a: &NormalizedRecord,
    b: &NormalizedRecord,
    config: &DeduplicationConfig,
) -> Option<MatchResult> {
    let score = score_pair(a, b, &config.weights)?;
    if score.confidence < config.acceptance_threshold {
        return None;
    }
    Some(fuzzy_match(a.id.clone(), b.id.clone(), score, config))
}

pub(crate) fn fuzzy_match(
    left: RecordId,
    right: RecordId,
    score: PairScore,
    config: &DeduplicationConfig,
) -> MatchResult {
    let contributing_fields = score
        .field_scores
        .iter()
        .filter(|(_, s)| **s >= config.acceptance_threshold)
        .map(|(f, _)| *f)
        .collect();

    MatchResult {
        left,
        right,
        kind: MatchKind::Fuzzy,
        tier: ConfidenceTier::classify(score.confidence, &config.tiers),
        confidence: score.confidence,
        field_scores: score.field_scores,
        contributing_fields,
        excluded_fields: score.excluded_fields,
    }
}

/// Similarity of two normalized values of one field
pub fn field_similarity(field: Field, a: &str, b: &str) -> f64 {
    match field {
        // Names vary in word order and legal suffixes
        Field::Name => token_sort_ratio(a, b),
        // Addresses vary in completeness
        Field::Address => token_set_ratio(a, b),
        // A single wrong digit is a different number
        Field::Phone => binary(!a.is_empty() && a == b),
        Field::Website => binary(!a.is_empty() && website_host(a) == website_host(b)),
        _ => ratio(a, b),
    }
}

/// Normalized Levenshtein similarity (0-100)
pub fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 100.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Ratio after sorting whitespace tokens
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Ratio over token intersection and differences
///
/// A non-empty intersection with one side fully contained in the other
/// scores 100, so extra or missing address parts are not penalized.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && (diff_a.is_empty() || diff_b.is_empty()) {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let combined_a = join_parts(&sect, &diff_a);
    let combined_b = join_parts(&sect, &diff_b);

    ratio(&sect, &combined_a)
        .max(ratio(&sect, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

fn sorted_tokens(value: &str) -> String {
    let mut tokens: Vec<&str> = value.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn join_parts(sect: &str, diff: &[&str]) -> String {
    let rest = diff.join(" ");
    match (sect.is_empty(), rest.is_empty()) {
        (true, _) => rest,
        (_, true) => sect.to_string(),
        _ => format!("{} {}", sect, rest),
    }
}

fn binary(matched: bool) -> f64 {
    if matched {
        100.0
    } else {
        0.0
    }
}

/// Host part of a normalized website ("example.com/about" -> "example.com")
pub fn website_host(website: &str) -> String {
    Url::parse(&format!("http://{}", website))
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| website.split('/').next().unwrap_or(website).to_string())
}
