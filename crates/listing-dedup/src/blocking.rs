//! Candidate pair generation for the fuzzy pass

use std::collections::{BTreeSet, HashMap};

use crate::config::BlockingStrategy;
use crate::normalization::NormalizedRecord;

/// Index pairs `(i, j)`, `i < j`, worth scoring under `strategy`
///
/// Pairs are unique and ascending. A record without a blocking key pairs
/// with every other record, so missing data never hides a duplicate.
pub fn candidate_pairs(records: &[NormalizedRecord], strategy: BlockingStrategy) -> Vec<(usize, usize)> {
    let n = records.len();
    if strategy == BlockingStrategy::None {
        return (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .collect();
    }

    let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut keyless = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let keys = blocking_keys(record, strategy);
        if keys.is_empty() {
            keyless.push(index);
        }
        for key in keys {
            buckets.entry(key).or_default().push(index);
        }
    }

    let mut pairs = BTreeSet::new();
    for members in buckets.values() {
        for (pos, &i) in members.iter().enumerate() {
            for &j in &members[pos + 1..] {
                pairs.insert(ordered(i, j));
            }
        }
    }
    for &i in &keyless {
        for j in (0..n).filter(|&j| j != i) {
            pairs.insert(ordered(i, j));
        }
    }

    pairs.into_iter().collect()
}

fn blocking_keys(record: &NormalizedRecord, strategy: BlockingStrategy) -> Vec<&str> {
    match strategy {
        BlockingStrategy::None => Vec::new(),
        BlockingStrategy::SharedNameToken => {
            let mut tokens: Vec<&str> = record.name_tokens().collect();
            tokens.sort_unstable();
            tokens.dedup();
            tokens
        }
        BlockingStrategy::SameCity if record.city.is_empty() => Vec::new(),
        BlockingStrategy::SameCity => vec![record.city.as_str()],
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
