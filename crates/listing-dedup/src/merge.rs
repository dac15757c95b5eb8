//! Merge resolution for groups of duplicate records
//!
//! A group is resolved in one step: a primary record is chosen, then every
//! field is merged across the whole group independent of which record is
//! primary. Values that lose a conflict are kept in the provenance instead
//! of being dropped.
//!
//! The exact-match key fields are taken together from a single member, so
//! a merged record never carries a content hash that no input record had.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use listing_domain::{Field, Record, RecordId};
use serde::{Deserialize, Serialize};

use crate::similarity::MatchKind;

/// Fields merged by "most recently observed non-empty value wins"
const RECENCY_FIELDS: [Field; 7] = [
    Field::Name,
    Field::Address,
    Field::Phone,
    Field::Email,
    Field::Website,
    Field::Category,
    Field::OperatingHours,
];

const DESCRIPTION_SEPARATOR: &str = " | ";

/// A conflicting value that lost to the merged one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardedValue {
    pub source: RecordId,
    pub value: String,
}

/// Where a merged field value came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldOrigin {
    /// Records whose value made it into the merged record
    pub sources: Vec<RecordId>,
    /// Distinct values that were not kept
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discarded: Vec<DiscardedValue>,
}

/// Per-field origin of a merged record
pub type Provenance = BTreeMap<Field, FieldOrigin>;

/// Outcome of collapsing one group of duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeDecision {
    pub primary: RecordId,
    /// Every other member of the group, ascending
    pub subsumed: Vec<RecordId>,
    /// Merged record; carries the primary's identifier
    pub merged: Record,
    pub provenance: Provenance,
    /// Weakest match that formed the group (100 for exact clusters)
    pub confidence: f64,
    pub kind: MatchKind,
}

impl MergeDecision {
    /// Primary followed by the subsumed records
    pub fn members(&self) -> impl Iterator<Item = &RecordId> {
        std::iter::once(&self.primary).chain(self.subsumed.iter())
    }
}

/// Collapse a group of duplicate records into one
///
/// `key_fields` are the exact-match fields; they are copied as a unit from
/// the most recently observed member that has all of them.
/// Returns `None` for groups with fewer than two records.
pub fn resolve(
    group: &[&Record],
    key_fields: &[Field],
    kind: MatchKind,
    confidence: f64,
) -> Option<MergeDecision> {
    if group.len() < 2 {
        return None;
    }

    let mut members: Vec<&Record> = group.to_vec();
    members.sort_by(|a, b| a.id.cmp(&b.id));

    let primary = select_primary(&members)?;
    let mut merged = primary.clone();
    let mut provenance = Provenance::new();

    let donor = key_donor(&members, primary, key_fields);
    for field in RECENCY_FIELDS {
        let merged_field = if key_fields.contains(&field) {
            merge_from(&members, donor, field)
        } else {
            let winner = members
                .iter()
                .copied()
                .filter(|r| r.has_value(field))
                .max_by(|a, b| recency(a, b, primary));
            winner.and_then(|w| merge_from(&members, w, field))
        };
        if let Some((value, origin)) = merged_field {
            if !value.is_empty() {
                set_text(&mut merged, field, value);
            }
            provenance.insert(field, origin);
        }
    }

    if let Some((rating, origin)) = merge_rating(&members) {
        merged.rating = Some(rating);
        provenance.insert(Field::Rating, origin);
    }

    if let Some((description, origin)) = merge_description(&members, primary) {
        merged.description = Some(description);
        provenance.insert(Field::Description, origin);
    }

    merged.created_at = members.iter().filter_map(|r| r.created_at).min();
    merged.last_seen_at = members.iter().filter_map(|r| r.last_seen_at).max();
    merged.is_active = members.iter().any(|r| r.is_active);
    merged.source = std::iter::once(primary)
        .chain(members.iter().copied())
        .find_map(|r| r.source.clone().filter(|s| !s.trim().is_empty()));

    let subsumed = members
        .iter()
        .filter(|r| r.id != primary.id)
        .map(|r| r.id.clone())
        .collect();

    Some(MergeDecision {
        primary: primary.id.clone(),
        subsumed,
        merged,
        provenance,
        confidence,
        kind,
    })
}

/// Most complete record, then highest rating, then most recently seen,
/// then lowest identifier
pub fn select_primary<'a>(group: &[&'a Record]) -> Option<&'a Record> {
    group.iter().copied().max_by(|a, b| primary_preference(a, b))
}

fn primary_preference(a: &Record, b: &Record) -> Ordering {
    a.completeness()
        .cmp(&b.completeness())
        .then_with(|| rating_key(a).total_cmp(&rating_key(b)))
        .then_with(|| a.observed_at().cmp(&b.observed_at()))
        .then_with(|| b.id.cmp(&a.id))
}

fn rating_key(record: &Record) -> f64 {
    record.valid_rating().unwrap_or(f64::NEG_INFINITY)
}

/// Newer observation first, then the primary, then the lower identifier
fn recency(a: &Record, b: &Record, primary: &Record) -> Ordering {
    a.observed_at()
        .cmp(&b.observed_at())
        .then_with(|| (a.id == primary.id).cmp(&(b.id == primary.id)))
        .then_with(|| b.id.cmp(&a.id))
}

/// Member supplying the exact-match key
///
/// Falls back to the primary when no member has the full key; its missing
/// key fields then stay empty.
fn key_donor<'a>(
    members: &[&'a Record],
    primary: &'a Record,
    key_fields: &[Field],
) -> &'a Record {
    members
        .iter()
        .copied()
        .filter(|r| key_fields.iter().all(|&f| r.has_value(f)))
        .max_by(|a, b| recency(a, b, primary))
        .unwrap_or(primary)
}

/// Take `field` from `winner`, recording every other distinct value as
/// discarded
///
/// When `winner` has no value the field is left untouched but conflicting
/// values still land in the provenance.
fn merge_from(
    members: &[&Record],
    winner: &Record,
    field: Field,
) -> Option<(String, FieldOrigin)> {
    let value = winner.text(field).filter(|v| !v.trim().is_empty());
    let kept = value.map(comparison_key);

    let mut origin = FieldOrigin::default();
    let mut seen: Vec<String> = kept.iter().cloned().collect();
    for record in members.iter().filter(|r| r.has_value(field)) {
        let Some(text) = record.text(field) else {
            continue;
        };
        let key = comparison_key(text);
        if kept.as_ref() == Some(&key) {
            origin.sources.push(record.id.clone());
        } else if !seen.contains(&key) {
            seen.push(key);
            origin.discarded.push(DiscardedValue {
                source: record.id.clone(),
                value: text.to_string(),
            });
        }
    }

    match value {
        Some(value) => Some((value.to_string(), origin)),
        None if origin.discarded.is_empty() => None,
        None => Some((String::new(), origin)),
    }
}

fn merge_rating(members: &[&Record]) -> Option<(f64, FieldOrigin)> {
    let best = members
        .iter()
        .filter_map(|r| r.valid_rating())
        .max_by(|a, b| a.total_cmp(b))?;

    let mut origin = FieldOrigin::default();
    for record in members {
        match record.valid_rating() {
            Some(rating) if rating == best => origin.sources.push(record.id.clone()),
            Some(rating) => origin.discarded.push(DiscardedValue {
                source: record.id.clone(),
                value: rating.to_string(),
            }),
            None => {}
        }
    }

    Some((best, origin))
}

fn merge_description(members: &[&Record], primary: &Record) -> Option<(String, FieldOrigin)> {
    let ordered = std::iter::once(primary).chain(
        members
            .iter()
            .copied()
            .filter(|r| r.id != primary.id),
    );

    let mut parts: Vec<&str> = Vec::new();
    let mut keys: Vec<String> = Vec::new();
    let mut origin = FieldOrigin::default();

    for record in ordered {
        let Some(text) = record.description.as_deref().map(str::trim) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let key = comparison_key(text);
        if !keys.contains(&key) {
            keys.push(key);
            parts.push(text);
        }
        origin.sources.push(record.id.clone());
    }

    if parts.is_empty() {
        return None;
    }
    Some((parts.join(DESCRIPTION_SEPARATOR), origin))
}

fn set_text(record: &mut Record, field: Field, value: String) {
    match field {
        Field::Name => record.name = value,
        Field::Address => record.address = value,
        Field::Phone => record.phone = value,
        Field::Email => record.email = value,
        Field::Website => record.website = value,
        Field::Category => record.category = Some(value),
        Field::OperatingHours => record.operating_hours = Some(value),
        Field::Description => record.description = Some(value),
        Field::Rating => {}
    }
}

fn comparison_key(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const KEY: [Field; 2] = [Field::Name, Field::Address];

    fn day(d: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_primary_most_complete() {
        let sparse = Record::new(1u64, "Island Grill");
        let full = Record::new(2u64, "Island Grill")
            .with_address("5 Hope Rd")
            .with_phone("876-555-0101");

        let primary = select_primary(&[&sparse, &full]).unwrap();
        assert_eq!(primary.id, RecordId::from(2u64));
    }

    #[test]
    fn test_primary_tie_breaks() {
        let a = Record::new(1u64, "Island Grill").with_rating(4.0);
        let b = Record::new(2u64, "Island Grill").with_rating(4.5);
        assert_eq!(select_primary(&[&a, &b]).unwrap().id, b.id);

        let a = Record::new(1u64, "Island Grill").with_last_seen(day(1));
        let b = Record::new(2u64, "Island Grill").with_last_seen(day(5));
        assert_eq!(select_primary(&[&a, &b]).unwrap().id, b.id);

        let a = Record::new(10u64, "Island Grill");
        let b = Record::new(9u64, "Island Grill");
        assert_eq!(select_primary(&[&a, &b]).unwrap().id, RecordId::from(9u64));
    }

    #[test]
    fn test_resolve_requires_two_records() {
        let a = Record::new(1u64, "Island Grill");
        assert!(resolve(&[&a], &KEY, MatchKind::Exact, 100.0).is_none());
        assert!(resolve(&[], &KEY, MatchKind::Exact, 100.0).is_none());
    }

    #[test]
    fn test_resolve_fills_missing_fields() {
        let a = Record::new(1u64, "Island Grill")
            .with_address("5 Hope Rd")
            .with_phone("876-555-0101");
        let b = Record::new(2u64, "Island Grill").with_email("info@islandgrill.jm");

        let decision = resolve(&[&a, &b], &KEY, MatchKind::Fuzzy, 92.0).unwrap();
        assert_eq!(decision.primary, a.id);
        assert_eq!(decision.subsumed, vec![b.id.clone()]);
        assert_eq!(decision.merged.id, a.id);
        assert_eq!(decision.merged.email, "info@islandgrill.jm");
        assert_eq!(decision.merged.phone, "876-555-0101");
        assert_eq!(decision.provenance[&Field::Email].sources, vec![b.id.clone()]);
        assert_eq!(decision.confidence, 92.0);
    }

    #[test]
    fn test_resolve_prefers_recent_contact_and_keeps_discarded() {
        let old = Record::new(1u64, "Island Grill")
            .with_address("5 Hope Rd")
            .with_phone("876-555-0101")
            .with_last_seen(day(1));
        let new = Record::new(2u64, "Island Grill")
            .with_phone("876-555-0199")
            .with_last_seen(day(9));

        let decision = resolve(&[&old, &new], &KEY, MatchKind::Fuzzy, 91.0).unwrap();
        assert_eq!(decision.primary, old.id);
        assert_eq!(decision.merged.phone, "876-555-0199");

        let phone = &decision.provenance[&Field::Phone];
        assert_eq!(phone.sources, vec![new.id.clone()]);
        assert_eq!(
            phone.discarded,
            vec![DiscardedValue {
                source: old.id.clone(),
                value: "876-555-0101".to_string(),
            }]
        );
    }

    #[test]
    fn test_resolve_scalar_and_text_rules() {
        let a = Record::new(1u64, "Island Grill")
            .with_rating(3.5)
            .with_description("Jerk chicken");
        let mut b = Record::new(2u64, "Island Grill")
            .with_rating(4.5)
            .with_description("Open late");
        b.is_active = false;
        let mut c = Record::new(3u64, "Island Grill").with_description("jerk chicken ");
        c.created_at = Some(day(2));
        c.is_active = false;

        let decision = resolve(&[&a, &b, &c], &KEY, MatchKind::Exact, 100.0).unwrap();
        assert_eq!(decision.primary, b.id);
        assert_eq!(decision.merged.rating, Some(4.5));
        assert_eq!(
            decision.merged.description.as_deref(),
            Some("Open late | Jerk chicken")
        );
        assert!(decision.merged.is_active);
        assert_eq!(decision.merged.created_at, Some(day(2)));
        assert_eq!(decision.provenance[&Field::Rating].discarded.len(), 1);
        assert_eq!(decision.members().count(), 3);
    }

    #[test]
    fn test_resolve_is_order_independent() {
        let a = Record::new(1u64, "Island Grill").with_phone("876-555-0101");
        let b = Record::new(2u64, "Island Grill").with_phone("876-555-0199");

        let forward = resolve(&[&a, &b], &KEY, MatchKind::Fuzzy, 95.0).unwrap();
        let backward = resolve(&[&b, &a], &KEY, MatchKind::Fuzzy, 95.0).unwrap();
        assert_eq!(forward, backward);
        // Equal standing: the primary's value wins
        assert_eq!(forward.merged.phone, "876-555-0101");
    }
    #[test]
    fn test_key_fields_come_from_one_member() {
        let complete = Record::new(1u64, "Kingston Hardware")
            .with_address("12 Main St, Kingston")
            .with_phone("876-555-0101")
            .with_last_seen(day(1));
        let newer = Record::new(2u64, "Kingston Hardwares")
            .with_phone("876-555-0101")
            .with_last_seen(day(5));

        let decision = resolve(&[&complete, &newer], &KEY, MatchKind::Fuzzy, 93.0).unwrap();
        assert_eq!(decision.merged.name, "Kingston Hardware");
        assert_eq!(decision.merged.address, "12 Main St, Kingston");

        let name = &decision.provenance[&Field::Name];
        assert_eq!(name.sources, vec![complete.id.clone()]);
        assert_eq!(name.discarded[0].value, "Kingston Hardwares");
    }

    #[test]
    fn test_key_prefers_most_recent_complete_member() {
        let old = Record::new(1u64, "Island Grill")
            .with_address("5 Hope Rd")
            .with_last_seen(day(1));
        let new = Record::new(2u64, "Island Grill Jerk Centre")
            .with_address("5 Hope Road")
            .with_last_seen(day(8));

        let decision = resolve(&[&old, &new], &KEY, MatchKind::Fuzzy, 90.5).unwrap();
        assert_eq!(decision.merged.name, "Island Grill Jerk Centre");
        assert_eq!(decision.merged.address, "5 Hope Road");
    }

    #[test]
    fn test_incomplete_key_is_not_assembled() {
        let primary = Record::new(1u64, "Island Grill")
            .with_phone("876-555-0101")
            .with_email("info@islandgrill.jm");
        let other = Record::new(2u64, "").with_address("5 Hope Rd");

        let decision = resolve(&[&primary, &other], &KEY, MatchKind::Fuzzy, 91.0).unwrap();
        assert_eq!(decision.primary, primary.id);
        assert_eq!(decision.merged.name, "Island Grill");
        assert!(decision.merged.address.is_empty());

        let address = &decision.provenance[&Field::Address];
        assert!(address.sources.is_empty());
        assert_eq!(address.discarded[0].source, other.id);
    }
}

