use serde::{Deserialize, Serialize};

/// Dense internal document number, assigned sequentially at ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocNum(pub u32);

impl DocNum {
    pub fn new(num: u32) -> Self {
        DocNum(num)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocNum {
    fn from(num: u32) -> Self {
        DocNum(num)
    }
}

/// 64-bit hash of a normalized term. Collisions are accepted, never resolved.
pub type TermHash = u64;

/// Block size of every posting list.
pub const BLOCK_SIZE: usize = 128;

/// One (document, frequency) record of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc: u32,
    pub freq: u16,
}

impl Posting {
    pub fn new(doc: u32, freq: u16) -> Self {
        Posting { doc, freq }
    }
}

/// An external document handed to the ingest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub text: String,
}

impl Document {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            text: text.into(),
        }
    }
}

impl From<(String, String)> for Document {
    fn from((id, text): (String, String)) -> Self {
        Document { id, text }
    }
}

/// Saturating conversion of a token count into the stored document length.
pub fn clamp_doc_len(len: u32) -> u16 {
    len.min(u16::MAX as u32) as u16
}
