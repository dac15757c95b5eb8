//! Exact duplicate detection by content hash
//!
//! Hashes the normalized exact-match fields of every record and groups
//! records whose hashes collide. Runs in O(n) and must finish before any
//! fuzzy comparison starts.

use std::collections::HashMap;

use listing_domain::{Field, RecordId};
use rayon::prelude::*;
use sha2::{Digest, Sha256};

use crate::normalization::NormalizedRecord;

/// SHA-256 (hex) over the normalized values of `fields`
///
/// Returns `None` when any of the fields is empty: a record missing a
/// hashed field can only be matched fuzzily.
pub fn content_hash(record: &NormalizedRecord, fields: &[Field]) -> Option<String> {
    let mut fields: Vec<Field> = fields.to_vec();
    fields.sort();
    fields.dedup();

    let mut components = Vec::with_capacity(fields.len());
    for field in fields {
        let value = record.get(field);
        if value.is_empty() {
            return None;
        }
        components.push(format!("{}:{}", field, value));
    }

    let mut hasher = Sha256::new();
    hasher.update(components.join("|").as_bytes());
    Some(hex::encode(hasher.finalize()))
}

/// Map every content hash to the records carrying it
///
/// Groups with two or more members are exact-duplicate clusters.
pub fn find_exact_duplicates(
    records: &[NormalizedRecord],
    fields: &[Field],
) -> HashMap<String, Vec<RecordId>> {
    let mut by_hash: HashMap<String, Vec<RecordId>> = HashMap::new();
    for (hash, index) in hash_all(records, fields) {
        by_hash.entry(hash).or_default().push(records[index].id.clone());
    }
    by_hash
}

/// Index clusters (two or more members) sharing a content hash
///
/// Built from [`find_exact_duplicates`]; identifiers must be unique. Members
/// are in ascending index order and clusters are ordered by their first
/// member, so the result does not depend on thread scheduling.
pub(crate) fn exact_clusters(records: &[NormalizedRecord], fields: &[Field]) -> Vec<Vec<usize>> {
    let position: HashMap<&RecordId, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (&record.id, index))
        .collect();

    let mut clusters: Vec<Vec<usize>> = find_exact_duplicates(records, fields)
        .into_values()
        .filter(|ids| ids.len() > 1)
        .map(|ids| {
            let mut members: Vec<usize> = ids.iter().map(|id| position[id]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    clusters.sort_by_key(|members| members[0]);
    clusters
}

fn hash_all(records: &[NormalizedRecord], fields: &[Field]) -> Vec<(String, usize)> {
    records
        .par_iter()
        .enumerate()
        .filter_map(|(index, record)| content_hash(record, fields).map(|hash| (hash, index)))
        .collect()
}
