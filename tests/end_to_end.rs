use quarry::core::cancel::CancelToken;
use quarry::core::config::Config;
use quarry::core::index::Index;
use quarry::search::executor::{SearchMode, SearchRequest};

const DOCS: &[(&str, &str)] = &[
    ("doc1", "The quick brown fox jumps over the lazy dog"),
    ("doc2", "Python is a programming language that is easy to learn"),
    ("doc3", "Machine learning and artificial intelligence are transforming technology"),
    ("doc4", "The fox is quick and brown while the dog is lazy"),
    ("doc5", "Go programming language is fast and efficient"),
];

fn index_with(dir: &std::path::Path, options: &[(&str, &str)]) -> Index {
    let mut config = Config::new(dir, "en").unwrap();
    for (key, value) in options {
        config = config.with_option(key, value).unwrap();
    }
    let index = Index::create(config).unwrap();
    let docs = DOCS.iter().map(|(id, text)| Ok((id.to_string(), text.to_string())));
    index.import(docs, |_| {}, &CancelToken::new()).unwrap();
    index
}

fn ids(index: &Index, query: &str, limit: usize, offset: usize) -> Vec<String> {
    index
        .search(query, limit, offset)
        .unwrap()
        .documents
        .into_iter()
        .map(|hit| hit.id)
        .collect()
}

#[test]
fn five_document_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[]);

    assert_eq!(index.count(), 5);

    // Both hold "fox" once; doc1 is shorter and ranks first.
    assert_eq!(ids(&index, "fox", 10, 0), vec!["doc1", "doc4"]);

    let python = index.search("python", 10, 0).unwrap();
    assert_eq!(python.documents[0].id, "doc2");
    assert!(python.complete);

    let none = index.search("nonexistent xyz123", 10, 0).unwrap();
    assert!(none.documents.is_empty());
    assert_eq!(none.total_candidates, 0);
}

#[test]
fn scores_descend() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[]);
    let results = index.search("quick brown programming language", 10, 0).unwrap();
    assert_eq!(results.documents.len(), 4);
    assert!(results.documents.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.documents.iter().all(|h| h.score > 0.0));
}

#[test]
fn limit_and_offset_boundaries() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[]);

    let count_only = index.search("fox", 0, 0).unwrap();
    assert!(count_only.documents.is_empty());
    assert_eq!(count_only.total_candidates, 2);

    assert!(ids(&index, "fox", 10, 100).is_empty());

    let all = ids(&index, "the is", 10, 0);
    let paged: Vec<String> = (0..all.len()).flat_map(|i| ids(&index, "the is", 1, i)).collect();
    assert_eq!(paged, all);
}

#[test]
fn query_is_case_insensitive_and_deduplicated() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[]);
    let lower = index.search("fox", 10, 0).unwrap();
    let upper = index.search("FOX Fox fox", 10, 0).unwrap();
    assert_eq!(lower.documents, upper.documents);
}

#[test]
fn all_mode_requires_every_term() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[("bitmaps", "true")]);

    let request = SearchRequest::new("programming fast").mode(SearchMode::All);
    let results = index.search_with(&request).unwrap();
    let found: Vec<&str> = results.documents.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(found, vec!["doc5"]);

    let any = index.search("programming fast", 10, 0).unwrap();
    assert_eq!(any.documents.len(), 2);
    assert_eq!(any.documents[0].id, "doc5");
}

#[test]
fn cancelled_query_is_marked_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let results = index.search_with(&SearchRequest::new("fox dog").cancel(cancel)).unwrap();
    assert!(!results.complete);
    assert!(results.documents.is_empty());
}

#[test]
fn repeated_queries_are_stable() {
    let dir = tempfile::tempdir().unwrap();
    let index = index_with(dir.path(), &[]);
    let first = index.search("the quick lazy dog", 10, 0).unwrap().documents;
    for _ in 0..5 {
        assert_eq!(index.search("the quick lazy dog", 10, 0).unwrap().documents, first);
    }
}
