use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};
use crate::analysis::analyzer::Analyzer;
use crate::core::cancel::CancelToken;
use crate::core::config::{Config, IngestMode, StoreMode};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocNum, Document};
use crate::index::segment::{SegmentHandle, SegmentSource};
use crate::parallel::accumulator::{BuiltSegment, MemoryAccumulator, PostingAccumulator};
use crate::parallel::indexer::ParallelIndexer;
use crate::parallel::pipeline::PipelineAccumulator;
use crate::search::executor::{QueryExecutor, SearchRequest};
use crate::search::results::{SearchHit, SearchResults};
use crate::storage::catalog::{Catalog, CatalogEntry, SegmentId};
use crate::storage::docid_map::DocIdMap;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::{write_file_atomic, StorageLayout};
use crate::storage::segment_file::{decode_segment, MappedSegment};
use crate::storage::snapshot::{read_snapshot, write_snapshot};
use crate::writer::batch::BatchReader;

/// Reported after every committed batch and once when the import finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub imported: u64,
    pub completed: Option<u64>,  // Some(total) on the final report
}

/// Everything a query needs. Segment bytes are immutable; only this list
/// (and the catalog describing it) changes, under its own lock.
#[derive(Default)]
struct IndexState {
    segments: Vec<SegmentHandle>,
    catalog: Catalog,
    doc_ids: DocIdMap,
}

/// A single-node BM25 index over an append-only list of segments.
///
/// Searches run concurrently against a snapshot of the segment list;
/// imports are serialized and publish their segments only once the whole
/// input has been indexed.
pub struct Index {
    config: Config,
    layout: StorageLayout,
    analyzer: Arc<Analyzer>,
    executor: QueryExecutor,
    state: RwLock<IndexState>,
    import_lock: Mutex<()>,
    file_lock: Mutex<Option<FileLock>>,
    closed: AtomicBool,
}

impl Index {
    /// Create an empty index in `config.data_dir`. Refuses a directory that
    /// already holds a persisted index.
    pub fn create(config: Config) -> Result<Self> {
        let layout = StorageLayout::create(&config.data_dir)?;
        let lock = FileLock::acquire(&layout)?;
        if layout.catalog_path().exists() || layout.snapshot_path().exists() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("{} already holds an index", layout.base_dir.display()),
            ));
        }
        info!(path = %layout.base_dir.display(), store = ?config.store, "index created");
        Self::assemble(config, layout, lock, IndexState::default())
    }

    /// Open a persisted index; `NotFound` when the directory holds none for
    /// the configured store.
    pub fn open(config: Config) -> Result<Self> {
        let layout = StorageLayout::at(&config.data_dir);
        if !layout.base_dir.is_dir() {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("{} does not exist", layout.base_dir.display()),
            ));
        }
        let lock = FileLock::acquire(&layout)?;
        let started = Instant::now();
        let state = match config.store {
            StoreMode::Heap => load_snapshot(&layout, config.verify_checksums)?,
            StoreMode::Mmap => load_catalog(&layout, config.verify_checksums)?,
        };
        info!(
            path = %layout.base_dir.display(),
            docs = state.doc_ids.len(),
            segments = state.segments.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index opened"
        );
        Self::assemble(config, layout, lock, state)
    }

    pub fn open_or_create(config: Config) -> Result<Self> {
        match Self::open(config.clone()) {
            Err(e) if e.kind == ErrorKind::NotFound => Self::create(config),
            other => other,
        }
    }

    fn assemble(config: Config, layout: StorageLayout, lock: FileLock, state: IndexState) -> Result<Self> {
        let analyzer = Arc::new(Analyzer::from_config(&config.tokenizer)?);
        Ok(Index {
            executor: QueryExecutor::new(Arc::clone(&analyzer)),
            analyzer,
            config,
            layout,
            state: RwLock::new(state),
            import_lock: Mutex::new(()),
            file_lock: Mutex::new(Some(lock)),
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyzer(&self) -> &Arc<Analyzer> {
        &self.analyzer
    }

    pub fn data_dir(&self) -> &Path {
        &self.layout.base_dir
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::new(ErrorKind::InvalidState, "index is closed"));
        }
        Ok(())
    }

    /// Number of documents.
    pub fn count(&self) -> u64 {
        self.state.read().doc_ids.len() as u64
    }

    pub fn segment_count(&self) -> usize {
        self.state.read().segments.len()
    }

    /// External id of a document number.
    pub fn doc_id(&self, doc: DocNum) -> Option<String> {
        self.state.read().doc_ids.get(doc.value()).map(str::to_string)
    }

    /// Index every document of `docs`, read lazily in `batch_docs` chunks.
    ///
    /// All or nothing: an item error, a failed batch or cancellation leaves
    /// the index exactly as it was and removes any segment file written on
    /// the way. Returns the number of documents added.
    pub fn import<I, D>(
        &self,
        docs: I,
        mut progress: impl FnMut(ImportProgress),
        cancel: &CancelToken,
    ) -> Result<u64>
    where
        I: IntoIterator<Item = Result<D>>,
        D: Into<Document>,
    {
        self.ensure_open()?;
        let _serial = self.import_lock.lock();
        let started = Instant::now();
        let base = self.state.read().doc_ids.len() as u64;

        let mut accumulator = self.accumulator()?;
        let mut reader = BatchReader::new(docs.into_iter(), self.config.ingest.batch_docs);
        let mut new_ids: Vec<String> = Vec::new();

        let outcome = (|| -> Result<Vec<BuiltSegment>> {
            while let Some(batch) = reader.next_batch()? {
                if cancel.is_cancelled() {
                    return Err(Error::cancelled());
                }
                let first = base + new_ids.len() as u64;
                // u32::MAX marks exhausted cursors and is never a document.
                let end = first + batch.len() as u64;
                if end > u32::MAX as u64 {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        format!("index is full: {} documents exceed the document number space", end),
                    ));
                }
                let doc_nums: Vec<DocNum> = (first as u32..end as u32).map(DocNum).collect();
                accumulator.add_batch(&doc_nums, &batch.texts, cancel)?;
                new_ids.extend(batch.ids);
                progress(ImportProgress { imported: new_ids.len() as u64, completed: None });
            }
            if cancel.is_cancelled() {
                return Err(Error::cancelled());
            }
            accumulator.finish()
        })();

        let built = match outcome {
            Ok(built) => built,
            Err(e) => {
                accumulator.abort();
                warn!(error = %e, pending = new_ids.len(), "import aborted");
                return Err(e);
            }
        };

        let imported = new_ids.len() as u64;
        let segments = built.len();
        self.commit(built, new_ids)?;
        info!(
            docs = imported,
            segments,
            total_docs = self.count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "import committed"
        );
        progress(ImportProgress { imported, completed: Some(imported) });
        Ok(imported)
    }

    fn accumulator(&self) -> Result<Box<dyn PostingAccumulator>> {
        let indexer = ParallelIndexer::new(self.config.ingest.workers, Arc::clone(&self.analyzer))?;
        Ok(match self.config.ingest.mode {
            IngestMode::Memory => Box::new(MemoryAccumulator::new(indexer, &self.config.segment)),
            IngestMode::Pipeline => {
                fs::create_dir_all(&self.layout.segments_dir)?;
                Box::new(PipelineAccumulator::new(
                    indexer,
                    &self.config.segment,
                    self.layout.segments_dir.clone(),
                    self.config.verify_checksums,
                ))
            }
        })
    }

    /// Publish freshly built segments and their ids.
    fn commit(&self, built: Vec<BuiltSegment>, new_ids: Vec<String>) -> Result<()> {
        let mut handles = Vec::with_capacity(built.len());
        let mut entries = Vec::with_capacity(built.len());
        let mut spilled: Vec<PathBuf> = Vec::new();
        let mut written: Vec<PathBuf> = Vec::new();

        let prepared = (|| -> Result<()> {
            for segment in built {
                if let Some(file) = &segment.file {
                    spilled.push(file.path.clone());
                }
                match self.config.store {
                    StoreMode::Heap => {
                        let handle = if segment.handle.is_mapped() {
                            decode_segment(segment.handle.encode()?, false)?.into_handle()
                        } else {
                            segment.handle
                        };
                        handles.push(handle);
                    }
                    StoreMode::Mmap => {
                        let (handle, entry) = match segment.file {
                            Some(file) => {
                                let stats = segment.handle.stats();
                                let entry = CatalogEntry {
                                    id: file.id,
                                    base_doc: stats.base_doc,
                                    doc_count: stats.doc_count,
                                    created_at: Utc::now(),
                                    size_bytes: file.size_bytes,
                                };
                                (segment.handle, entry)
                            }
                            None => {
                                let id = SegmentId::new();
                                let path = self.layout.segment_path(&id);
                                let bytes = segment.handle.encode()?;
                                written.push(path.clone());
                                write_file_atomic(&path, &bytes)?;
                                let mapped = MappedSegment::open_path(&path, self.config.verify_checksums)?;
                                let stats = segment.handle.stats();
                                let entry = CatalogEntry {
                                    id,
                                    base_doc: stats.base_doc,
                                    doc_count: stats.doc_count,
                                    created_at: Utc::now(),
                                    size_bytes: bytes.len() as u64,
                                };
                                let handle: SegmentHandle = Arc::new(mapped);
                                (handle, entry)
                            }
                        };
                        handles.push(handle);
                        entries.push(entry);
                    }
                }
            }
            Ok(())
        })();

        let mut state = self.state.write();
        let mut catalog = state.catalog.clone();
        let mut doc_ids = state.doc_ids.clone();
        let persisted = prepared.and_then(|()| {
            for entry in entries {
                catalog.push(entry)?;
            }
            doc_ids.extend(new_ids);
            if self.config.store == StoreMode::Mmap {
                doc_ids.save(&self.layout.doc_ids_path())?;
                catalog.save(&self.layout)?;
            }
            Ok(())
        });

        if let Err(e) = persisted {
            // The catalog is the commit record; put the id table back in step with it.
            if self.config.store == StoreMode::Mmap {
                if let Err(restore) = state.doc_ids.save(&self.layout.doc_ids_path()) {
                    warn!(error = %restore, "could not restore document id table");
                }
            }
            drop(state);
            for path in spilled.iter().chain(&written) {
                remove_quietly(path);
            }
            warn!(error = %e, "import could not be committed");
            return Err(e);
        }

        state.segments.extend(handles);
        state.catalog = catalog;
        state.doc_ids = doc_ids;
        drop(state);

        // Heap segments were decoded from their spill files.
        if self.config.store == StoreMode::Heap {
            for path in &spilled {
                remove_quietly(path);
            }
        }
        Ok(())
    }

    pub fn search(&self, query: &str, limit: usize, offset: usize) -> Result<SearchResults> {
        self.search_with(&SearchRequest::new(query).limit(limit).offset(offset))
    }

    pub fn search_with(&self, request: &SearchRequest) -> Result<SearchResults> {
        let started = Instant::now();
        // One guard for segments and ids; `close` clears both under the write lock.
        let state = self.state.read();
        self.ensure_open()?;
        let merged = self.executor.execute(&state.segments, request)?;

        let documents = merged
            .hits
            .iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|hit| {
                let id = state.doc_ids.get(hit.doc).ok_or_else(|| {
                    Error::corrupted(format!("document {} has no external id", hit.doc))
                })?;
                Ok(SearchHit { id: id.to_string(), score: hit.score })
            })
            .collect::<Result<Vec<_>>>()?;
        drop(state);

        let elapsed = started.elapsed();
        debug!(
            query = %request.query,
            hits = documents.len(),
            candidates = merged.scored,
            elapsed_us = elapsed.as_micros() as u64,
            "search"
        );
        Ok(SearchResults {
            documents,
            elapsed,
            total_candidates: merged.scored,
            complete: merged.complete,
        })
    }

    /// Write the index to its data directory: a snapshot for the heap store,
    /// the catalog and id table for the mmap store.
    pub fn persist(&self) -> Result<()> {
        self.ensure_open()?;
        let _serial = self.import_lock.lock();
        let state = self.state.read();
        match self.config.store {
            StoreMode::Heap => {
                let size = write_snapshot(&self.layout.snapshot_path(), &state.doc_ids, &state.segments)?;
                info!(path = %self.layout.snapshot_path().display(), bytes = size, "snapshot persisted");
            }
            StoreMode::Mmap => {
                state.doc_ids.save(&self.layout.doc_ids_path())?;
                state.catalog.save(&self.layout)?;
                info!(segments = state.catalog.segments.len(), "catalog persisted");
            }
        }
        Ok(())
    }

    /// Release segments, memory maps and the directory lock. Unpersisted
    /// heap data is dropped. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _serial = self.import_lock.lock();
        *self.state.write() = IndexState::default();
        self.file_lock.lock().take();
        info!(path = %self.layout.base_dir.display(), "index closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove segment file");
        }
    }
}

fn load_snapshot(layout: &StorageLayout, verify_checksums: bool) -> Result<IndexState> {
    let path = layout.snapshot_path();
    let Some(snapshot) = read_snapshot(&path, verify_checksums)? else {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("no snapshot at {}", path.display()),
        ));
    };
    Ok(IndexState {
        segments: snapshot.segments.into_iter().map(|s| s.into_handle()).collect(),
        catalog: Catalog::default(),
        doc_ids: snapshot.doc_ids,
    })
}

fn load_catalog(layout: &StorageLayout, verify_checksums: bool) -> Result<IndexState> {
    let Some(catalog) = Catalog::load(layout)? else {
        return Err(Error::new(
            ErrorKind::NotFound,
            format!("no catalog at {}", layout.catalog_path().display()),
        ));
    };
    let mut doc_ids = DocIdMap::load(&layout.doc_ids_path())?
        .ok_or_else(|| Error::corrupted("catalog present but document id table missing"))?;
    let committed = catalog.doc_count() as usize;
    if doc_ids.len() < committed {
        return Err(Error::corrupted(format!(
            "catalog holds {} documents but {} ids",
            committed,
            doc_ids.len()
        )));
    }
    if doc_ids.len() > committed {
        // Ids written by an import whose catalog never landed.
        warn!(ids = doc_ids.len(), committed, "dropping uncommitted document ids");
        doc_ids.truncate(committed);
    }

    let mut segments = Vec::with_capacity(catalog.segments.len());
    for entry in &catalog.segments {
        let path = layout.segment_path(&entry.id);
        let segment = MappedSegment::open_path(&path, verify_checksums).map_err(|e| {
            if e.kind == ErrorKind::NotFound {
                Error::corrupted(format!("catalog lists missing segment {}", path.display()))
            } else {
                e
            }
        })?;
        let stats = segment.stats();
        if stats.base_doc != entry.base_doc || stats.doc_count != entry.doc_count {
            warn!(path = %path.display(), "segment does not match its catalog entry");
            return Err(Error::corrupted(format!(
                "{} covers documents {}..{}, catalog says {}..{}",
                path.display(),
                stats.base_doc,
                stats.end_doc(),
                entry.base_doc,
                entry.base_doc + entry.doc_count
            )));
        }
        segments.push(Arc::new(segment) as SegmentHandle);
    }
    Ok(IndexState { segments, catalog, doc_ids })
}
