use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{info, warn};
use crate::core::cancel::CancelToken;
use crate::core::config::SegmentConfig;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocNum;
use crate::index::builder::{SegmentBuilder, SegmentInput};
use crate::index::segment::{Segment, SegmentSource};
use crate::parallel::accumulator::{BuiltSegment, PostingAccumulator, SpilledFile};
use crate::parallel::indexer::ParallelIndexer;
use crate::parallel::shard::flatten;
use crate::storage::catalog::SegmentId;
use crate::storage::layout::write_file_atomic;
use crate::storage::segment_file::MappedSegment;

/// Segments waiting for the writer thread.
const WRITE_QUEUE: usize = 2;

/// Builds one segment per batch and spills it to disk from a writer thread.
///
/// Spilled segments are never merged; each is reopened memory-mapped so the
/// builder's heap copy can be dropped as soon as it is written.
pub struct PipelineAccumulator {
    indexer: ParallelIndexer,
    builder: SegmentBuilder,
    segments_dir: PathBuf,
    verify_checksums: bool,
    sender: Option<Sender<Segment>>,
    writer: Option<JoinHandle<Result<Vec<BuiltSegment>>>>,
    written: Arc<Mutex<Vec<PathBuf>>>,
}

impl PipelineAccumulator {
    pub fn new(
        indexer: ParallelIndexer,
        config: &SegmentConfig,
        segments_dir: PathBuf,
        verify_checksums: bool,
    ) -> Self {
        PipelineAccumulator {
            indexer,
            builder: SegmentBuilder::new(config),
            segments_dir,
            verify_checksums,
            sender: None,
            writer: None,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn ensure_writer(&mut self) -> Result<&Sender<Segment>> {
        if self.sender.is_none() {
            let (sender, receiver) = bounded(WRITE_QUEUE);
            let dir = self.segments_dir.clone();
            let written = Arc::clone(&self.written);
            let verify = self.verify_checksums;
            let handle = std::thread::Builder::new()
                .name("quarry-segment-writer".to_string())
                .spawn(move || write_segments(receiver, dir, written, verify))?;
            self.sender = Some(sender);
            self.writer = Some(handle);
        }
        self.sender
            .as_ref()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "segment writer missing"))
    }

    fn join_writer(&mut self) -> Result<Vec<BuiltSegment>> {
        self.sender = None;
        match self.writer.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| Error::new(ErrorKind::Internal, "segment writer panicked"))?,
            None => Ok(Vec::new()),
        }
    }

    pub fn spilled_files(&self) -> usize {
        self.written.lock().len()
    }
}

fn write_segments(
    receiver: Receiver<Segment>,
    dir: PathBuf,
    written: Arc<Mutex<Vec<PathBuf>>>,
    verify_checksums: bool,
) -> Result<Vec<BuiltSegment>> {
    let mut built = Vec::new();
    for segment in receiver {
        let id = SegmentId::new();
        let path = dir.join(format!("{}.seg", id.0));
        let bytes = segment.encode()?;
        drop(segment);

        written.lock().push(path.clone());
        write_file_atomic(&path, &bytes)?;
        let mapped = MappedSegment::open_path(&path, verify_checksums)?;
        info!(
            path = %path.display(),
            docs = mapped.stats().doc_count,
            bytes = bytes.len(),
            "segment spilled"
        );
        built.push(BuiltSegment {
            handle: Arc::new(mapped),
            file: Some(SpilledFile { id, path, size_bytes: bytes.len() as u64 }),
        });
    }
    Ok(built)
}

impl PostingAccumulator for PipelineAccumulator {
    fn add_batch(&mut self, doc_nums: &[DocNum], texts: &[String], cancel: &CancelToken) -> Result<()> {
        let batch = self.indexer.index_batch(doc_nums, texts, cancel)?;
        if batch.doc_lens.is_empty() {
            return Ok(());
        }
        let segment = self.builder.build(SegmentInput {
            base_doc: batch.base_doc,
            doc_lens: batch.doc_lens,
            total_tokens: batch.total_tokens,
            terms: flatten(batch.shards),
        })?;
        if cancel.is_cancelled() {
            return Err(Error::cancelled());
        }

        let sent = self.ensure_writer()?.send(segment);
        if sent.is_err() {
            // The writer stopped on an error; surface it.
            return match self.join_writer() {
                Err(e) => Err(e),
                Ok(_) => Err(Error::new(ErrorKind::Internal, "segment writer stopped")),
            };
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<BuiltSegment>> {
        let built = self.join_writer()?;
        self.written.lock().clear();
        Ok(built)
    }

    fn abort(&mut self) {
        if let Err(e) = self.join_writer() {
            warn!(error = %e, "segment writer failed during abort");
        }
        for path in self.written.lock().drain(..) {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "could not remove spilled segment");
                }
            }
        }
    }
}

impl Drop for PipelineAccumulator {
    fn drop(&mut self) {
        // Files not handed out by `finish` belong to an unfinished import.
        if self.writer.is_some() || !self.written.lock().is_empty() {
            self.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyzer::Analyzer;
    use crate::analysis::hash::hash_term;
    use crate::core::config::TokenizerConfig;

    fn accumulator(dir: &std::path::Path) -> PipelineAccumulator {
        let analyzer = Arc::new(Analyzer::from_config(&TokenizerConfig::ascii()).unwrap());
        PipelineAccumulator::new(
            ParallelIndexer::new(2, analyzer).unwrap(),
            &SegmentConfig::default(),
            dir.to_path_buf(),
            true,
        )
    }

    fn batch(base: u32, n: u32) -> (Vec<DocNum>, Vec<String>) {
        (
            (base..base + n).map(DocNum).collect(),
            (base..base + n).map(|i| format!("shared doc{}", i)).collect(),
        )
    }

    fn seg_files(dir: &std::path::Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "seg"))
            .count()
    }

    #[test]
    fn one_mapped_segment_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = accumulator(dir.path());
        for base in [0, 10, 20] {
            let (d, t) = batch(base, 10);
            acc.add_batch(&d, &t, &CancelToken::new()).unwrap();
        }
        let built = acc.finish().unwrap();
        assert_eq!(built.len(), 3);
        assert_eq!(seg_files(dir.path()), 3);

        for (i, segment) in built.iter().enumerate() {
            assert!(segment.handle.is_mapped());
            assert_eq!(segment.handle.stats().base_doc, i as u32 * 10);
            assert!(segment.file.as_ref().unwrap().path.exists());
            let shared = segment.handle.postings(hash_term("shared")).unwrap().unwrap();
            assert_eq!(shared.doc_freq, 10);
        }
        drop(acc);
        assert_eq!(seg_files(dir.path()), 3);
    }

    #[test]
    fn abort_removes_spilled_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut acc = accumulator(dir.path());
        let (d, t) = batch(0, 5);
        acc.add_batch(&d, &t, &CancelToken::new()).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let (d, t) = batch(5, 5);
        assert!(acc.add_batch(&d, &t, &cancel).unwrap_err().is_cancelled());

        acc.abort();
        assert_eq!(seg_files(dir.path()), 0);
    }

    #[test]
    fn dropping_unfinished_accumulator_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut acc = accumulator(dir.path());
            let (d, t) = batch(0, 5);
            acc.add_batch(&d, &t, &CancelToken::new()).unwrap();
        }
        assert_eq!(seg_files(dir.path()), 0);
    }
}
