use rust_stemmers::Stemmer;
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::hash::{fnv_step, hash_bytes, FNV_OFFSET};
use crate::analysis::term_table::TermFreqTable;
use crate::core::config::TokenizerConfig;
use crate::core::types::TermHash;

pub trait Tokenizer: Send + Sync {
    /// Clear `table`, fill it with the terms of `text` and return the
    /// document length (number of accepted tokens).
    fn tokenize_into(&self, text: &str, table: &mut TermFreqTable) -> u32;

    fn name(&self) -> &str;

    fn tokenize(&self, text: &str) -> Vec<(TermHash, u16)> {
        let mut table = TermFreqTable::new();
        self.tokenize_into(text, &mut table);
        table.entries().collect()
    }
}

const STACK_TOKEN_BYTES: usize = 64;

/// Token scratch: inline up to 64 bytes, heap beyond.
pub struct TokenBuf {
    stack: [u8; STACK_TOKEN_BYTES],
    len: usize,
    heap: Vec<u8>,
}

impl Default for TokenBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBuf {
    pub fn new() -> Self {
        TokenBuf {
            stack: [0; STACK_TOKEN_BYTES],
            len: 0,
            heap: Vec::new(),
        }
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        if self.len < STACK_TOKEN_BYTES {
            self.stack[self.len] = byte;
        } else {
            if self.len == STACK_TOKEN_BYTES {
                self.heap.clear();
                self.heap.extend_from_slice(&self.stack);
            }
            self.heap.push(byte);
        }
        self.len += 1;
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.len <= STACK_TOKEN_BYTES {
            &self.stack[..self.len]
        } else {
            &self.heap
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Post-normalization filters shared by both tiers. They run identically at
/// index and query time because both go through the same tokenizer.
#[derive(Default)]
pub struct TokenFilters {
    pub stopwords: Option<StopWordFilter>,
    pub stemmer: Option<Stemmer>,
}

impl TokenFilters {
    /// The token text must be materialized (stemming works on strings).
    #[inline]
    pub fn needs_text(&self) -> bool {
        self.stemmer.is_some()
    }

    #[inline]
    pub fn is_stopword(&self, hash: TermHash) -> bool {
        self.stopwords.as_ref().is_some_and(|s| s.contains(hash))
    }

    /// Final term hash of a folded token, `None` when a filter drops it.
    pub fn finish_token(&self, folded: &[u8]) -> Option<TermHash> {
        let raw = hash_bytes(folded);
        if self.is_stopword(raw) {
            return None;
        }
        match (&self.stemmer, std::str::from_utf8(folded)) {
            (Some(stemmer), Ok(text)) => Some(hash_bytes(stemmer.stem(text).as_bytes())),
            _ => Some(raw),
        }
    }
}

/// Byte-oriented tokenizer: ASCII letters and digits form terms, every other
/// byte (including all bytes >= 0x80) is a delimiter.
pub struct AsciiTokenizer {
    delimiters: [bool; 256],
    fold: [u8; 256], // 0 = not a term byte
    min_len: usize,
    max_len: usize,
    filters: TokenFilters,
}

impl AsciiTokenizer {
    pub fn new(config: &TokenizerConfig, filters: TokenFilters) -> Self {
        let fold = ascii_fold_table(config.lowercase);
        let mut delimiters = [false; 256];
        for (b, is_delim) in delimiters.iter_mut().enumerate() {
            *is_delim = fold[b] == 0;
        }
        AsciiTokenizer {
            delimiters,
            fold,
            min_len: config.min_token_len,
            max_len: config.max_token_len,
            filters,
        }
    }
}

/// Fold table for the ASCII range; 0 marks non-term bytes.
pub fn ascii_fold_table(lowercase: bool) -> [u8; 256] {
    let mut table = [0u8; 256];
    for b in 0u8..128 {
        table[b as usize] = match b {
            b'a'..=b'z' | b'0'..=b'9' => b,
            b'A'..=b'Z' if lowercase => b | 0x20,
            b'A'..=b'Z' => b,
            _ => 0,
        };
    }
    table
}

impl Tokenizer for AsciiTokenizer {
    fn tokenize_into(&self, text: &str, table: &mut TermFreqTable) -> u32 {
        table.clear();
        let bytes = text.as_bytes();
        let n = bytes.len();
        let buffered = self.filters.needs_text();
        let mut buf = TokenBuf::new();
        let mut count = 0u32;
        let mut i = 0;

        while i < n {
            while i < n && self.delimiters[bytes[i] as usize] {
                i += 1;
            }
            if i >= n {
                break;
            }

            let start = i;
            let mut hash = FNV_OFFSET;
            buf.clear();
            while i < n {
                let c = self.fold[bytes[i] as usize];
                if c == 0 {
                    break;
                }
                hash = fnv_step(hash, c);
                if buffered && buf.len() <= self.max_len {
                    buf.push(c);
                }
                i += 1;
            }

            let len = i - start;
            if len < self.min_len || len > self.max_len {
                continue;
            }
            let term = if buffered {
                match self.filters.finish_token(buf.as_bytes()) {
                    Some(h) => h,
                    None => continue,
                }
            } else if self.filters.is_stopword(hash) {
                continue;
            } else {
                hash
            };
            table.add(term);
            count += 1;
        }

        count
    }

    fn name(&self) -> &str {
        "ascii"
    }
}
