//! Deduplication orchestrator
//!
//! One call is one forward pass through
//! `INIT -> EXACT_PASS -> FUZZY_PASS -> CLASSIFY -> MERGE -> DONE`.
//! The engine keeps no state between calls; nothing is merged before the
//! MERGE phase, so an interrupted pass has no effect.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use listing_domain::{validate_record, Record, RecordId, RejectedRecord, RejectionReason};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::blocking::candidate_pairs;
use crate::classify::classify_matches;
use crate::config::DeduplicationConfig;
use crate::error::{DedupError, Result};
use crate::exact::exact_clusters;
use crate::merge::{resolve, MergeDecision};
use crate::normalization::{normalize, NormalizedRecord};
use crate::review::{build_review_queue, ReviewItem};
use crate::similarity::{fuzzy_match, score_pair, MatchKind, MatchResult, PairScore};
use crate::union_find::UnionFind;

/// Stage of a deduplication pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Init,
    ExactPass,
    FuzzyPass,
    Classify,
    Merge,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "INIT",
            Phase::ExactPass => "EXACT_PASS",
            Phase::FuzzyPass => "FUZZY_PASS",
            Phase::Classify => "CLASSIFY",
            Phase::Merge => "MERGE",
            Phase::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Caller-imposed limit on a pass: a shared cancel flag plus an optional
/// wall-clock deadline
///
/// Clones share the cancel flag, so one clone can stop a pass running on
/// another thread.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn is_exhausted(&self) -> bool {
        self.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn check(&self, phase: Phase) -> Result<()> {
        if self.is_exhausted() {
            return Err(DedupError::Interrupted { phase });
        }
        Ok(())
    }
}

/// Counters describing one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeduplicationStats {
    pub input_records: usize,
    pub rejected_records: usize,
    pub exact_clusters: usize,
    /// Records collapsed into another by the exact pass
    pub exact_duplicates: usize,
    pub candidate_pairs: usize,
    /// Candidate pairs that produced a score
    pub pairs_compared: usize,
    /// Candidate pairs sharing no weighted comparable field
    pub pairs_without_common_fields: usize,
    /// Pairs at or above the acceptance threshold
    pub fuzzy_matches: usize,
    pub high_matches: usize,
    pub review_items: usize,
    pub superseded_review_items: usize,
    /// Matches below the LOW boundary
    pub discarded_matches: usize,
    pub merge_decisions: usize,
    pub output_records: usize,
}

/// Result of one deduplication pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeduplicationOutcome {
    /// Merged primaries and untouched records, in input order of the
    /// surviving record
    pub records: Vec<Record>,
    pub review_queue: Vec<ReviewItem>,
    pub merge_decisions: Vec<MergeDecision>,
    pub rejected: Vec<RejectedRecord>,
    pub stats: DeduplicationStats,
}

impl DeduplicationOutcome {
    /// Every record merged away into a primary
    pub fn subsumed_ids(&self) -> Vec<&RecordId> {
        self.merge_decisions
            .iter()
            .flat_map(|d| d.subsumed.iter())
            .collect()
    }

    /// Identifier of the output record that now stands for `id`
    ///
    /// `None` when `id` was rejected or never part of the input.
    pub fn surviving_id(&self, id: &RecordId) -> Option<&RecordId> {
        if let Some(decision) = self.merge_decisions.iter().find(|d| d.subsumed.contains(id)) {
            return Some(&decision.primary);
        }
        self.records.iter().map(|r| &r.id).find(|r| *r == id)
    }
}

/// Stateless deduplication engine over a validated configuration
#[derive(Debug, Clone)]
pub struct DeduplicationEngine {
    config: DeduplicationConfig,
}

impl DeduplicationEngine {
    /// Create an engine; fails if the configuration is invalid
    pub fn new(config: DeduplicationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: DeduplicationConfig::default(),
        }
    }

    pub fn config(&self) -> &DeduplicationConfig {
        &self.config
    }

    /// Run one pass without a budget
    pub fn deduplicate(&self, records: Vec<Record>) -> Result<DeduplicationOutcome> {
        self.deduplicate_within(records, &Budget::unlimited())
    }

    /// Run one pass, stopping cleanly once `budget` is exhausted
    pub fn deduplicate_within(
        &self,
        records: Vec<Record>,
        budget: &Budget,
    ) -> Result<DeduplicationOutcome> {
        let config = &self.config;
        let mut stats = DeduplicationStats {
            input_records: records.len(),
            ..Default::default()
        };

        // INIT
        enter(Phase::Init, budget)?;
        tracing::info!("Starting deduplication of {} records", records.len());

        let (accepted, normalized, rejected) = prepare(records)?;
        stats.rejected_records = rejected.len();
        let index_of: HashMap<RecordId, usize> = accepted
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        // EXACT_PASS
        enter(Phase::ExactPass, budget)?;
        let mut groups = UnionFind::new(accepted.len());
        let mut edges: Vec<MatchResult> = Vec::new();
        let clusters = exact_clusters(&normalized, &config.exact_match_fields);
        let mut slots: Vec<Option<NormalizedRecord>> = normalized.into_iter().map(Some).collect();

        for cluster in clusters {
            let members: Vec<&Record> = cluster.iter().map(|&i| &accepted[i]).collect();
            let Some(decision) = resolve(
                &members,
                &config.exact_match_fields,
                MatchKind::Exact,
                100.0,
            ) else {
                continue;
            };
            let anchor = index_of[&decision.primary];

            for &i in &cluster {
                groups.union(anchor, i);
                slots[i] = None;
                if i != anchor {
                    edges.push(MatchResult::exact(
                        decision.primary.clone(),
                        accepted[i].id.clone(),
                        &config.exact_match_fields,
                    ));
                }
            }
            // Merged representative stands in for the cluster from here on
            slots[anchor] = Some(normalize(&decision.merged));

            stats.exact_clusters += 1;
            stats.exact_duplicates += cluster.len() - 1;
        }
        tracing::debug!(
            "Exact pass: {} clusters, {} duplicates",
            stats.exact_clusters,
            stats.exact_duplicates
        );

        // FUZZY_PASS
        enter(Phase::FuzzyPass, budget)?;
        let representatives: Vec<NormalizedRecord> = slots.into_iter().flatten().collect();
        let pairs = candidate_pairs(&representatives, config.blocking);
        stats.candidate_pairs = pairs.len();

        let scores = score_candidates(&representatives, &pairs, config, budget)?;

        let mut matches = Vec::new();
        for scored in scores {
            let Some((i, j, score)) = scored else {
                stats.pairs_without_common_fields += 1;
                continue;
            };
            stats.pairs_compared += 1;
            if score.confidence >= config.acceptance_threshold {
                matches.push(fuzzy_match(
                    representatives[i].id.clone(),
                    representatives[j].id.clone(),
                    score,
                    config,
                ));
            }
        }
        stats.fuzzy_matches = matches.len();
        tracing::debug!(
            "Fuzzy pass: {} of {} candidate pairs matched",
            matches.len(),
            pairs.len()
        );

        // CLASSIFY
        enter(Phase::Classify, budget)?;
        let classification = classify_matches(matches);
        stats.high_matches = classification.auto_merge.len();
        stats.discarded_matches = classification.discarded;

        for high in classification.auto_merge {
            groups.union(index_of[&high.left], index_of[&high.right]);
            edges.push(high);
        }

        // MERGE
        enter(Phase::Merge, budget)?;
        let mut weakest: HashMap<usize, (f64, MatchKind)> = HashMap::new();
        for edge in &edges {
            let root = groups.find(index_of[&edge.left]);
            let entry = weakest.entry(root).or_insert((100.0, MatchKind::Exact));
            entry.0 = entry.0.min(edge.confidence);
            if edge.kind == MatchKind::Fuzzy {
                entry.1 = MatchKind::Fuzzy;
            }
        }

        let mut decisions = Vec::new();
        let mut primary_decision: HashMap<usize, usize> = HashMap::new();
        let mut surviving: HashMap<RecordId, RecordId> = HashMap::new();

        for component in groups.components() {
            let root = groups.find(component[0]);
            let (confidence, kind) = weakest
                .get(&root)
                .copied()
                .unwrap_or((100.0, MatchKind::Exact));
            let members: Vec<&Record> = component.iter().map(|&i| &accepted[i]).collect();
            let Some(decision) =
                resolve(&members, &config.exact_match_fields, kind, confidence)
            else {
                continue;
            };

            for id in &decision.subsumed {
                surviving.insert(id.clone(), decision.primary.clone());
            }
            primary_decision.insert(index_of[&decision.primary], decisions.len());
            decisions.push(decision);
        }

        let queue = build_review_queue(
            classification.review,
            |id| surviving.get(id).cloned().unwrap_or_else(|| id.clone()),
            config.review_grouping,
        );

        let records: Vec<Record> = accepted
            .into_iter()
            .enumerate()
            .filter_map(|(i, record)| match primary_decision.get(&i) {
                Some(&d) => Some(decisions[d].merged.clone()),
                None if surviving.contains_key(&record.id) => None,
                None => Some(record),
            })
            .collect();

        // DONE
        stats.review_items = queue.items.len();
        stats.superseded_review_items = queue.superseded;
        stats.merge_decisions = decisions.len();
        stats.output_records = records.len();
        tracing::debug!("Entering {}", Phase::Done);
        tracing::info!(
            "Deduplication complete: {} -> {} records, {} merges, {} for review",
            stats.input_records,
            stats.output_records,
            stats.merge_decisions,
            stats.review_items
        );

        Ok(DeduplicationOutcome {
            records,
            review_queue: queue.items,
            merge_decisions: decisions,
            rejected,
            stats,
        })
    }
}

/// Score candidate pairs in parallel, checking the budget before each one
///
/// `None` marks a pair with no weighted comparable field in common.
fn score_candidates(
    representatives: &[NormalizedRecord],
    pairs: &[(usize, usize)],
    config: &DeduplicationConfig,
    budget: &Budget,
) -> Result<Vec<Option<(usize, usize, PairScore)>>> {
    pairs
        .par_iter()
        .map(|&(i, j)| -> Result<Option<(usize, usize, PairScore)>> {
            budget.check(Phase::FuzzyPass)?;
            Ok(score_pair(&representatives[i], &representatives[j], &config.weights)
                .map(|score| (i, j, score)))
        })
        .collect()
}

fn enter(phase: Phase, budget: &Budget) -> Result<()> {
    budget.check(phase)?;
    tracing::debug!("Entering {}", phase);
    Ok(())
}

/// Validate and normalize the input, splitting off rejected records
fn prepare(
    records: Vec<Record>,
) -> Result<(Vec<Record>, Vec<NormalizedRecord>, Vec<RejectedRecord>)> {
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(records.len());

    for (position, record) in records.into_iter().enumerate() {
        if let Err(reason) = validate_record(&record) {
            reject(&mut rejected, record.id, position, reason);
            continue;
        }
        if !seen.insert(record.id.clone()) {
            return Err(DedupError::DuplicateRecordId(record.id));
        }
        candidates.push((position, record));
    }

    let normalized: Vec<NormalizedRecord> = candidates
        .par_iter()
        .map(|(_, record)| normalize(record))
        .collect();

    let mut accepted = Vec::with_capacity(candidates.len());
    let mut kept = Vec::with_capacity(candidates.len());
    for ((position, record), norm) in candidates.into_iter().zip(normalized) {
        // Values like "n/a" for a phone vanish under normalization
        if !norm.has_comparable_fields() {
            reject(
                &mut rejected,
                record.id,
                position,
                RejectionReason::NoComparableFields,
            );
            continue;
        }
        accepted.push(record);
        kept.push(norm);
    }

    rejected.sort_by_key(|r| r.position);
    Ok((accepted, kept, rejected))
}

fn reject(rejected: &mut Vec<RejectedRecord>, id: RecordId, position: usize, reason: RejectionReason) {
    tracing::warn!("Rejected record at position {} ({}): {}", position, id, reason);
    rejected.push(RejectedRecord {
        id,
        position,
        reason,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::ExactPass.to_string(), "EXACT_PASS");
        assert!(Phase::Init < Phase::Done);
    }

    #[test]
    fn test_budget() {
        let budget = Budget::unlimited();
        assert!(!budget.is_exhausted());

        let shared = budget.clone();
        shared.cancel();
        assert!(budget.is_exhausted());

        assert!(Budget::with_timeout(Duration::ZERO).is_exhausted());
        assert!(!Budget::with_timeout(Duration::from_secs(3600)).is_exhausted());
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = DeduplicationConfig::default();
        config.acceptance_threshold = -1.0;
        assert!(matches!(
            DeduplicationEngine::new(config),
            Err(DedupError::Config(_))
        ));
    }

    #[test]
    fn test_empty_input() {
        let outcome = DeduplicationEngine::with_defaults().deduplicate(Vec::new()).unwrap();
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.stats, DeduplicationStats::default());
    }

    #[test]
    fn test_duplicate_identifier_is_fatal() {
        let records = vec![
            Record::new(1u64, "Island Grill"),
            Record::new(1u64, "Blue Mountain Coffee"),
        ];
        assert!(matches!(
            DeduplicationEngine::with_defaults().deduplicate(records),
            Err(DedupError::DuplicateRecordId(_))
        ));
    }

    #[test]
    fn test_rejects_unusable_records() {
        let records = vec![
            Record::new("", "Island Grill"),
            Record::new(2u64, "").with_phone("n/a"),
            Record::new(3u64, "Island Grill"),
        ];
        let outcome = DeduplicationEngine::with_defaults().deduplicate(records).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.rejected.len(), 2);
        assert_eq!(outcome.rejected[0].reason, RejectionReason::MissingIdentifier);
        assert_eq!(outcome.rejected[1].reason, RejectionReason::NoComparableFields);
        assert_eq!(outcome.rejected[1].position, 1);
    }

    #[test]
    fn test_cancelled_budget_interrupts_pair_scoring() {
        let representatives: Vec<NormalizedRecord> = [
            Record::new(1u64, "Island Grill").with_address("5 Hope Rd"),
            Record::new(2u64, "Island Grille").with_address("5 Hope Road"),
            Record::new(3u64, "Blue Mountain Coffee"),
        ]
        .iter()
        .map(normalize)
        .collect();
        let pairs = vec![(0, 1), (0, 2), (1, 2)];
        let config = DeduplicationConfig::default();

        let budget = Budget::unlimited();
        let scores = score_candidates(&representatives, &pairs, &config, &budget).unwrap();
        assert_eq!(scores.len(), 3);

        budget.cancel();
        assert!(matches!(
            score_candidates(&representatives, &pairs, &config, &budget),
            Err(DedupError::Interrupted {
                phase: Phase::FuzzyPass
            })
        ));
    }

    #[test]
    fn test_cancelled_budget_interrupts_at_init() {
        let budget = Budget::unlimited();
        budget.cancel();
        let result = DeduplicationEngine::with_defaults()
            .deduplicate_within(vec![Record::new(1u64, "Island Grill")], &budget);
        assert!(matches!(
            result,
            Err(DedupError::Interrupted { phase: Phase::Init })
        ));
    }
}
