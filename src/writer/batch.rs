use crate::core::error::Result;
use crate::core::types::Document;

/// One chunk of the ingest stream.
#[derive(Debug, Default)]
pub struct DocBatch {
    pub ids: Vec<String>,
    pub texts: Vec<String>,
}

impl DocBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Batch reader for bulk operations
///
/// Pulls at most `batch_size` documents from the source per call, so the
/// whole corpus is never held at once. The first item error ends the stream.
pub struct BatchReader<I> {
    source: I,
    batch_size: usize,
    failed: bool,
}

impl<I, D> BatchReader<I>
where
    I: Iterator<Item = Result<D>>,
    D: Into<Document>,
{
    pub fn new(source: I, batch_size: usize) -> Self {
        BatchReader {
            source,
            batch_size: batch_size.max(1),
            failed: false,
        }
    }

    /// Next batch, `None` once the source is exhausted.
    pub fn next_batch(&mut self) -> Result<Option<DocBatch>> {
        if self.failed {
            return Ok(None);
        }
        let mut batch = DocBatch {
            ids: Vec::with_capacity(self.batch_size),
            texts: Vec::with_capacity(self.batch_size),
        };
        while batch.len() < self.batch_size {
            match self.source.next() {
                Some(Ok(doc)) => {
                    let doc: Document = doc.into();
                    batch.ids.push(doc.id);
                    batch.texts.push(doc.text);
                }
                Some(Err(e)) => {
                    self.failed = true;
                    return Err(e);
                }
                None => break,
            }
        }
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}
