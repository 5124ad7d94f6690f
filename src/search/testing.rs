//! Generated corpora and a brute-force ranker for query tests.

use std::collections::HashMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::core::config::SegmentConfig;
use crate::core::types::{Posting, TermHash};
use crate::index::builder::{SegmentBuilder, SegmentInput};
use crate::index::segment::{Segment, SegmentSource};
use crate::search::results::ScoredDoc;

pub const VOCABULARY: u64 = 40;

/// Random documents over a skewed vocabulary; term `t` has hash `t + 1`.
pub fn random_segment(seed: u64, base_doc: u32, docs: u32, config: &SegmentConfig) -> Segment {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut terms: HashMap<TermHash, Vec<Posting>> = HashMap::new();
    let mut doc_lens = Vec::with_capacity(docs as usize);
    let mut total_tokens = 0u64;

    for doc in base_doc..base_doc + docs {
        let len = rng.gen_range(1..60u32);
        let mut freqs: HashMap<TermHash, u16> = HashMap::new();
        for _ in 0..len {
            // Squaring skews towards low term numbers.
            let x: f64 = rng.gen_range(0.0..1.0);
            let term = ((x * x) * VOCABULARY as f64) as u64 + 1;
            *freqs.entry(term).or_default() += 1;
        }
        if rng.gen_bool(0.01) {
            *freqs.entry(VOCABULARY).or_default() += 300;
        }
        let tokens: u32 = freqs.values().map(|&f| f as u32).sum();
        doc_lens.push(tokens.min(u16::MAX as u32) as u16);
        total_tokens += tokens as u64;
        for (term, freq) in freqs {
            terms.entry(term).or_default().push(Posting::new(doc, freq));
        }
    }

    let terms = terms
        .into_iter()
        .map(|(term, mut postings)| {
            postings.sort_unstable_by_key(|p| p.doc);
            (term, postings)
        })
        .collect();
    SegmentBuilder::new(config)
        .build(SegmentInput { base_doc, doc_lens, total_tokens, terms })
        .expect("generated segment builds")
}

/// Score every document holding any (or, with `all`, every) query term,
/// summing contributions in query-term order.
pub fn brute_force(segment: &dyn SegmentSource, terms: &[TermHash], k: usize, all: bool) -> (Vec<ScoredDoc>, u64) {
    let stats = segment.stats();
    let scorer = stats.scorer();
    let avg = stats.avg_doc_len as f32;

    let lists: Vec<Option<(f32, HashMap<u32, u16>)>> = terms
        .iter()
        .map(|&t| {
            segment.postings(t).unwrap().map(|p| {
                let freqs = p.decode_all().unwrap().into_iter().map(|x| (x.doc, x.freq)).collect();
                (p.idf, freqs)
            })
        })
        .collect();

    let mut hits = Vec::new();
    for doc in stats.base_doc..stats.end_doc() {
        let mut parts = Vec::new();
        let mut matched = 0;
        for (idf, freqs) in lists.iter().flatten() {
            if let Some(&freq) = freqs.get(&doc) {
                matched += 1;
                parts.push(scorer.score(*idf, freq, segment.doc_len(doc), avg));
            }
        }
        let wanted = if all { matched == terms.len() } else { matched > 0 };
        if wanted {
            hits.push(ScoredDoc::new(doc, parts.iter().sum()));
        }
    }
    let candidates = hits.len() as u64;
    hits.sort_unstable_by(ScoredDoc::rank_cmp);
    hits.truncate(k);
    (hits, candidates)
}
