/// BM25 Scorer
///
/// Every segment carries the `k1`/`b` it was built with; the query path
/// rebuilds the scorer from those values so stored block maxima stay valid
/// upper bounds for the scores computed at query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BM25Scorer {
    pub k1: f32,  // Term frequency saturation (default: 1.2)
    pub b: f32,   // Length normalization strength (default: 0.75)
}

impl Default for BM25Scorer {
    fn default() -> Self {
        BM25Scorer {
            k1: 1.2,
            b: 0.75,
        }
    }
}

impl BM25Scorer {
    pub fn new(k1: f32, b: f32) -> Self {
        BM25Scorer { k1, b }
    }

    /// `ln((N - df + 0.5) / (df + 0.5) + 1)`, always positive.
    pub fn idf(doc_count: u32, doc_freq: u32) -> f32 {
        let n = doc_count as f64;
        let df = doc_freq as f64;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln() as f32
    }

    #[inline]
    pub fn score(&self, idf: f32, term_freq: u16, doc_len: u16, avg_doc_len: f32) -> f32 {
        let tf = term_freq as f32;
        let doc_len = doc_len as f32;
        let norm = if avg_doc_len > 0.0 { doc_len / avg_doc_len } else { 1.0 };

        // BM25 formula
        let numerator = idf * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * norm);

        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_is_positive_and_decreasing() {
        let rare = BM25Scorer::idf(1000, 1);
        let common = BM25Scorer::idf(1000, 900);
        let everywhere = BM25Scorer::idf(1000, 1000);
        assert!(rare > common);
        assert!(common > everywhere);
        assert!(everywhere > 0.0);
    }

    #[test]
    fn score_saturates_with_frequency() {
        let bm25 = BM25Scorer::default();
        let one = bm25.score(1.0, 1, 10, 10.0);
        let ten = bm25.score(1.0, 10, 10, 10.0);
        let hundred = bm25.score(1.0, 100, 10, 10.0);
        assert!(one < ten && ten < hundred);
        assert!(hundred < 1.0 * (bm25.k1 + 1.0));
    }

    #[test]
    fn longer_documents_score_lower() {
        let bm25 = BM25Scorer::default();
        assert!(bm25.score(1.0, 2, 5, 10.0) > bm25.score(1.0, 2, 50, 10.0));
    }

    #[test]
    fn average_length_document_matches_closed_form() {
        let bm25 = BM25Scorer::default();
        // doc_len == avg_doc_len: idf * tf * (k1 + 1) / (tf + k1)
        let expected = 2.0 * 3.0 * 2.2 / (3.0 + 1.2);
        assert!((bm25.score(2.0, 3, 8, 8.0) - expected).abs() < 1e-6);
    }
}
