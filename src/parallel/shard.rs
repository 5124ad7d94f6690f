use std::collections::HashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use crate::core::types::{Posting, TermHash};

pub const SHARD_COUNT: usize = 256;

pub type ShardMap = HashMap<TermHash, Vec<Posting>>;

#[inline]
pub fn shard_of(hash: TermHash) -> usize {
    (hash & 0xFF) as usize
}

/// 256 independently locked term maps. Workers redistribute their local
/// postings here; a worker holds at most one shard lock at a time.
pub struct ShardedPostings {
    shards: Vec<Mutex<ShardMap>>,
}

impl Default for ShardedPostings {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardedPostings {
    pub fn new() -> Self {
        ShardedPostings {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    /// Move a worker's local map into the shards, one shard lock at a time.
    pub fn scatter(&self, local: ShardMap) {
        let mut buckets: Vec<Vec<(TermHash, Vec<Posting>)>> = (0..SHARD_COUNT).map(|_| Vec::new()).collect();
        for (hash, postings) in local {
            buckets[shard_of(hash)].push((hash, postings));
        }

        for (shard, bucket) in self.shards.iter().zip(buckets) {
            if bucket.is_empty() {
                continue;
            }
            let mut shard = shard.lock();
            for (hash, mut postings) in bucket {
                shard.entry(hash).or_default().append(&mut postings);
            }
        }
    }

    /// Phase 2: every shard sorts its posting lists by document number,
    /// one rayon task per shard. Must run inside the caller's pool.
    pub fn into_sorted(self) -> Vec<ShardMap> {
        self.shards
            .into_par_iter()
            .map(|shard| {
                let mut map = shard.into_inner();
                for postings in map.values_mut() {
                    postings.sort_unstable_by_key(|p| p.doc);
                }
                map
            })
            .collect()
    }
}

/// Empty per-shard maps, the accumulated state of a memory accumulator.
pub fn empty_shards() -> Vec<ShardMap> {
    (0..SHARD_COUNT).map(|_| HashMap::new()).collect()
}

/// Append a later batch's shards to accumulated ones. Document numbers of
/// `batch` are all greater than those already in `into`, so appending keeps
/// every list sorted.
pub fn append_shards(into: &mut [ShardMap], batch: Vec<ShardMap>) {
    into.par_iter_mut().zip(batch).for_each(|(acc, shard)| {
        for (hash, mut postings) in shard {
            acc.entry(hash).or_default().append(&mut postings);
        }
    });
}

/// Flatten shards into the builder's term list.
pub fn flatten(shards: Vec<ShardMap>) -> Vec<(TermHash, Vec<Posting>)> {
    let total = shards.iter().map(|s| s.len()).sum();
    let mut terms = Vec::with_capacity(total);
    for shard in shards {
        terms.extend(shard);
    }
    terms
}
