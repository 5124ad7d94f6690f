use std::fs;
use quarry::core::cancel::CancelToken;
use quarry::core::config::Config;
use quarry::core::error::{Error, ErrorKind, Result};
use quarry::core::index::Index;
use quarry::storage::layout::StorageLayout;

fn config(dir: &std::path::Path, language: &str, options: &[(&str, &str)]) -> Config {
    let mut config = Config::new(dir, language).unwrap();
    for (key, value) in options {
        config = config.with_option(key, value).unwrap();
    }
    config
}

fn docs(items: &[(&str, &str)]) -> Vec<Result<(String, String)>> {
    items.iter().map(|(id, text)| Ok((id.to_string(), text.to_string()))).collect()
}

/// Every document has ten tokens; documents 200..300 hold "needle" 1 to 5 times.
fn padded_corpus() -> Vec<Result<(String, String)>> {
    (0..400)
        .map(|i| {
            let needles = if (200..300).contains(&i) { 1 + i % 5 } else { 0 };
            let mut words: Vec<String> = (0..needles).map(|_| "needle".to_string()).collect();
            words.extend((needles..10).map(|j| format!("hay{}", (i + j) % 37)));
            Ok((format!("doc{}", i), words.join(" ")))
        })
        .collect()
}

fn segment_files(dir: &std::path::Path) -> usize {
    let layout = StorageLayout::at(dir);
    match fs::read_dir(&layout.segments_dir) {
        Ok(entries) => entries
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "seg"))
            .count(),
        Err(_) => 0,
    }
}

#[test]
fn pipeline_spills_one_segment_per_batch() {
    let dir = tempfile::tempdir().unwrap();
    let options = [("store", "mmap"), ("ingest", "pipeline"), ("batch_docs", "100")];
    let index = Index::create(config(dir.path(), "en", &options)).unwrap();
    index.import(padded_corpus(), |_| {}, &CancelToken::new()).unwrap();

    assert_eq!(index.count(), 400);
    assert_eq!(index.segment_count(), 4);
    assert_eq!(segment_files(dir.path()), 4);
}

#[test]
fn pipeline_and_memory_agree_within_one_batch() {
    let memory_dir = tempfile::tempdir().unwrap();
    let memory = Index::create(config(memory_dir.path(), "en", &[])).unwrap();
    memory.import(padded_corpus(), |_| {}, &CancelToken::new()).unwrap();

    let pipeline_dir = tempfile::tempdir().unwrap();
    let options = [("store", "mmap"), ("ingest", "pipeline"), ("batch_docs", "100")];
    let pipeline = Index::create(config(pipeline_dir.path(), "en", &options)).unwrap();
    pipeline.import(padded_corpus(), |_| {}, &CancelToken::new()).unwrap();
    assert!(pipeline.segment_count() > memory.segment_count());

    for limit in [1, 5, 20, 100] {
        let ids = |index: &Index| -> Vec<String> {
            index.search("needle", limit, 0).unwrap().documents.into_iter().map(|h| h.id).collect()
        };
        assert_eq!(ids(&memory), ids(&pipeline), "limit {}", limit);
    }
}

#[test]
fn heap_store_with_pipeline_ingest_keeps_no_spill_files() {
    let dir = tempfile::tempdir().unwrap();
    let options = [("ingest", "pipeline"), ("batch_docs", "150")];
    let index = Index::create(config(dir.path(), "en", &options)).unwrap();
    index.import(padded_corpus(), |_| {}, &CancelToken::new()).unwrap();

    assert_eq!(index.segment_count(), 3);
    assert_eq!(segment_files(dir.path()), 0);
    assert_eq!(index.search("needle", 100, 0).unwrap().documents.len(), 100);
}

#[test]
fn iterator_error_aborts_whole_import() {
    for options in [&[][..], &[("store", "mmap"), ("ingest", "pipeline"), ("batch_docs", "2")][..]] {
        let dir = tempfile::tempdir().unwrap();
        let index = Index::create(config(dir.path(), "en", options)).unwrap();
        index.import(docs(&[("kept", "first import")]), |_| {}, &CancelToken::new()).unwrap();
        let files_before = segment_files(dir.path());

        let mut items = docs(&[("a", "one"), ("b", "two"), ("c", "three")]);
        items.push(Err(Error::new(ErrorKind::InvalidInput, "unreadable row")));
        items.extend(docs(&[("d", "four")]));
        let err = index.import(items, |_| {}, &CancelToken::new()).unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidInput);
        assert_eq!(index.count(), 1);
        assert!(index.search("one", 10, 0).unwrap().documents.is_empty());
        assert_eq!(segment_files(dir.path()), files_before);

        // Document numbers are not burnt by the failed import.
        index.import(docs(&[("e", "five")]), |_| {}, &CancelToken::new()).unwrap();
        let hits = index.search("five", 10, 0).unwrap().documents;
        assert_eq!(hits[0].id, "e");
        assert_eq!(index.count(), 2);
    }
}

#[test]
fn cancellation_between_batches_leaves_index_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let options = [("store", "mmap"), ("ingest", "pipeline"), ("batch_docs", "50")];
    let index = Index::create(config(dir.path(), "en", &options)).unwrap();

    let cancel = CancelToken::new();
    let trigger = cancel.clone();
    let err = index
        .import(padded_corpus(), |p| if p.imported >= 100 { trigger.cancel() }, &cancel)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(index.count(), 0);
    assert_eq!(index.segment_count(), 0);
    assert_eq!(segment_files(dir.path()), 0);
    assert!(index.search("needle", 10, 0).unwrap().documents.is_empty());
}

#[test]
fn stopwords_and_stemming_apply_to_queries_too() {
    let dir = tempfile::tempdir().unwrap();
    let options = [("stopwords", "english"), ("stemmer", "english")];
    let index = Index::create(config(dir.path(), "en", &options)).unwrap();
    index
        .import(
            docs(&[("a", "She runs every morning"), ("b", "The running of the bulls"), ("c", "A quiet evening")]),
            |_| {},
            &CancelToken::new(),
        )
        .unwrap();

    assert!(index.search("the", 10, 0).unwrap().documents.is_empty());
    let mut ids: Vec<String> = index.search("run", 10, 0).unwrap().documents.into_iter().map(|h| h.id).collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(
        index.search("the running", 10, 0).unwrap().documents,
        index.search("running", 10, 0).unwrap().documents
    );
}

#[test]
fn vietnamese_diacritics_fold_away() {
    let dir = tempfile::tempdir().unwrap();
    let index = Index::create(config(dir.path(), "vi", &[])).unwrap();
    index
        .import(
            docs(&[("vi1", "Tiếng Việt rất đẹp"), ("vi2", "Hà Nội mùa thu"), ("en1", "plain english text")]),
            |_| {},
            &CancelToken::new(),
        )
        .unwrap();

    for query in ["viet", "VIỆT", "việt"] {
        let hits = index.search(query, 10, 0).unwrap().documents;
        assert_eq!(hits.len(), 1, "{}", query);
        assert_eq!(hits[0].id, "vi1");
    }
    assert_eq!(index.search("ha noi", 10, 0).unwrap().documents[0].id, "vi2");
    assert_eq!(index.search("english", 10, 0).unwrap().documents[0].id, "en1");
}

#[test]
fn empty_import_adds_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let index = Index::create(config(dir.path(), "en", &[])).unwrap();
    let added = index.import(Vec::<Result<(String, String)>>::new(), |_| {}, &CancelToken::new()).unwrap();
    assert_eq!(added, 0);
    assert_eq!(index.count(), 0);
    assert_eq!(index.segment_count(), 0);
}
