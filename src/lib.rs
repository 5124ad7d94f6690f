pub mod core;
pub mod analysis;
pub mod parallel;
pub mod index;
pub mod compression;
pub mod scoring;
pub mod search;
pub mod storage;
pub mod mmap;
pub mod writer;

/*
┌──────────────────────────────────────────────────────────────────────────────────────────┐
│                               QUARRY STRUCT ARCHITECTURE                                 │
└──────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────────── CORE LAYER ──────────────────────────────────────┐
│                                                                                          │
│  ┌────────────────────────────────────────────────────────────────────────────────────┐  │
│  │                                   struct Index                                     │  │
│  │  config: Config                        // data dir, language, typed options        │  │
│  │  layout: StorageLayout                 // segments/, meta/, index.snap, .lock      │  │
│  │  analyzer: Arc<Analyzer>               // shared by ingest and query               │  │
│  │  executor: QueryExecutor               // fan-out over segments                    │  │
│  │  state: RwLock<IndexState>             // segment list + catalog + doc ids         │  │
│  │  import_lock: Mutex<()>                // one import at a time                     │  │
│  │  file_lock: Mutex<Option<FileLock>>    // flock on the data directory              │  │
│  └────────────────────────────────────────────────────────────────────────────────────┘  │
│                                                                                          │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌────────────────────────────────┐  │
│  │ trait SearchBackend  │  │ struct BackendFactory│  │ struct Config                  │  │
│  │ • import             │  │ • "heap"             │  │ • tokenizer: TokenizerConfig   │  │
│  │ • search             │  │ • "mmap"             │  │ • ingest: IngestConfig         │  │
│  │ • count              │  │ • "pipeline"         │  │ • store: StoreMode             │  │
│  │ • close              │  │                      │  │ • segment: SegmentConfig       │  │
│  └──────────────────────┘  └──────────────────────┘  └────────────────────────────────┘  │
└──────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────────── INGEST PATH ─────────────────────────────────────┐
│                                                                                          │
│  Iterator<Result<(id, text)>>                                                            │
│        │  BatchReader (batch_docs per chunk, lazy)                                       │
│        ▼                                                                                 │
│  ParallelIndexer ── phase 1: workers tokenize slices ─► 256 × Mutex<ShardMap>            │
│        │            phase 2: one task per shard sorts postings                           │
│        ▼                                                                                 │
│  trait PostingAccumulator                                                                │
│   ├─ MemoryAccumulator    all batches in RAM ─► one segment at finish                    │
│   └─ PipelineAccumulator  segment per batch ─► crossbeam channel ─► writer thread        │
│                                                  └─► segments/<uuid>.seg (mmap reopen)   │
│        ▼                                                                                 │
│  SegmentBuilder: IDF, 128-posting blocks, VByte gaps, block max BM25, roaring bitmaps    │
└──────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────────── SEARCH PATH ─────────────────────────────────────┐
│                                                                                          │
│  query ─► Analyzer::query_terms ─► QueryExecutor ──rayon──► per segment:                 │
│                                      ├─ SearchMode::Any  search_any (Block-Max WAND,     │
│                                      │                   block skipping for one term)    │
│                                      └─ SearchMode::All  search_all (bitmap AND, score)  │
│                                   merge_top_k (score desc, doc asc) ─► offset/limit      │
└──────────────────────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────────────── STORAGE LAYER ───────────────────────────────────┐
│                                                                                          │
│  trait SegmentSource ── Segment (heap)                                                   │
│                     └─ MappedSegment (ByteView over Arc<Mmap>, FST dictionary)           │
│                                                                                          │
│  <data_dir>/                                                                             │
│   ├─ .lock                    FileLock                                                   │
│   ├─ index.snap               heap store: ids + every segment, crc32                     │
│   ├─ segments/<uuid>.seg      QRYSEG01, 128-byte header, dict/terms/blocks/lens/bitmaps  │
│   └─ meta/catalog.json        ordered CatalogEntry list                                  │
│      meta/docids.bin          QRYIDS01, length-prefixed ids                              │
└──────────────────────────────────────────────────────────────────────────────────────────┘
*/
