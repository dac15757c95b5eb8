//! Manual review queue
//!
//! MEDIUM and LOW matches are never merged automatically. They are mapped
//! onto the records that survive the HIGH merges and handed to a human.

use std::collections::{BTreeMap, HashMap};

use listing_domain::{Field, RecordId};
use serde::{Deserialize, Serialize};

use crate::classify::ConfidenceTier;
use crate::config::ReviewGrouping;
use crate::similarity::MatchResult;
use crate::union_find::UnionFind;

/// What the reviewer is asked to decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSuggestion {
    /// MEDIUM confidence: likely the same entity
    MergeSuggested,
    /// LOW confidence: possibly the same entity
    MergeOptional,
}

impl ReviewSuggestion {
    pub fn for_tier(tier: ConfidenceTier) -> Option<Self> {
        match tier {
            ConfidenceTier::Medium => Some(ReviewSuggestion::MergeSuggested),
            ConfidenceTier::Low => Some(ReviewSuggestion::MergeOptional),
            _ => None,
        }
    }
}

/// An uncertain match awaiting a human decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Surviving record on the left (lower identifier)
    pub left: RecordId,
    /// Surviving record on the right
    pub right: RecordId,
    /// Records that were actually compared
    pub matched: (RecordId, RecordId),
    pub confidence: f64,
    pub tier: ConfidenceTier,
    pub suggestion: ReviewSuggestion,
    pub field_scores: BTreeMap<Field, f64>,
    pub contributing_fields: Vec<Field>,
    /// Items sharing a record share a cluster under `by_record` grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<usize>,
}

/// Review items plus the count of candidates that no longer apply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewQueue {
    pub items: Vec<ReviewItem>,
    /// Candidates dropped because both sides were merged together, or
    /// because a stronger item covers the same surviving pair
    pub superseded: usize,
}

/// Build the review queue from MEDIUM/LOW candidates
///
/// `surviving` maps a record to the record it ended up in (itself when it
/// was not merged away). The queue is sorted by confidence, strongest
/// first, then by identifiers.
pub fn build_review_queue<F>(
    candidates: Vec<MatchResult>,
    surviving: F,
    grouping: ReviewGrouping,
) -> ReviewQueue
where
    F: Fn(&RecordId) -> RecordId,
{
    let mut superseded = 0;
    let mut by_pair: BTreeMap<(RecordId, RecordId), ReviewItem> = BTreeMap::new();

    for candidate in candidates {
        let Some(suggestion) = ReviewSuggestion::for_tier(candidate.tier) else {
            continue;
        };

        let mut left = surviving(&candidate.left);
        let mut right = surviving(&candidate.right);
        if left == right {
            superseded += 1;
            continue;
        }
        if right < left {
            std::mem::swap(&mut left, &mut right);
        }

        let key = (left.clone(), right.clone());
        let item = ReviewItem {
            left,
            right,
            matched: (candidate.left, candidate.right),
            confidence: candidate.confidence,
            tier: candidate.tier,
            suggestion,
            field_scores: candidate.field_scores,
            contributing_fields: candidate.contributing_fields,
            cluster: None,
        };

        let replace = match by_pair.get(&key) {
            Some(existing) => {
                superseded += 1;
                stronger(&item, existing)
            }
            None => true,
        };
        if replace {
            by_pair.insert(key, item);
        }
    }

    let mut items: Vec<ReviewItem> = by_pair.into_values().collect();
    items.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.left.cmp(&b.left))
            .then_with(|| a.right.cmp(&b.right))
    });

    if grouping == ReviewGrouping::ByRecord {
        assign_clusters(&mut items);
    }

    ReviewQueue { items, superseded }
}

fn stronger(candidate: &ReviewItem, existing: &ReviewItem) -> bool {
    match candidate.confidence.total_cmp(&existing.confidence) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => candidate.matched < existing.matched,
    }
}

/// Number connected items 1.. in queue order
fn assign_clusters(items: &mut [ReviewItem]) {
    let mut index: HashMap<RecordId, usize> = HashMap::new();
    for item in items.iter() {
        for id in [&item.left, &item.right] {
            let next = index.len();
            index.entry(id.clone()).or_insert(next);
        }
    }

    let mut uf = UnionFind::new(index.len());
    for item in items.iter() {
        uf.union(index[&item.left], index[&item.right]);
    }

    let mut numbers: HashMap<usize, usize> = HashMap::new();
    for item in items.iter_mut() {
        let root = uf.find(index[&item.left]);
        let next = numbers.len() + 1;
        item.cluster = Some(*numbers.entry(root).or_insert(next));
    }
}
