use std::collections::HashSet;
use crate::analysis::hash::hash_term;
use crate::core::types::TermHash;

/// Stop words held as term hashes, checked before stemming.
#[derive(Debug, Clone)]
pub struct StopWordFilter {
    pub stop_words: HashSet<TermHash>,
}

impl StopWordFilter {
    pub fn new<'a>(stop_words: impl IntoIterator<Item = &'a str>) -> Self {
        StopWordFilter {
            stop_words: stop_words.into_iter().map(hash_term).collect(),
        }
    }

    pub fn english() -> Self {
        StopWordFilter::new([
            "a", "an", "and", "are", "as", "at", "be", "by", "for",
            "from", "has", "he", "in", "is", "it", "its", "of", "on",
            "that", "the", "to", "was", "will", "with",
        ])
    }

    #[inline]
    pub fn contains(&self, hash: TermHash) -> bool {
        self.stop_words.contains(&hash)
    }

    pub fn len(&self) -> usize {
        self.stop_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_words.is_empty()
    }
}
