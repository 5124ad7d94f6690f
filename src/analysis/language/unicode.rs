use crate::analysis::language::fold::{classify, CharClass};
use crate::analysis::term_table::TermFreqTable;
use crate::analysis::tokenizer::{ascii_fold_table, TokenBuf, TokenFilters, Tokenizer};
use crate::core::config::TokenizerConfig;

/// Unicode-aware tokenizer.
///
/// Decodes code points, folds case and (optionally) strips diacritics through
/// explicit range tables, and re-encodes the folded token as UTF-8 before
/// hashing. Roughly four times slower than the ASCII tier; pick it when
/// accented scripts such as Vietnamese must match with and without marks.
pub struct UnicodeTokenizer {
    ascii_fold: [u8; 256],
    lowercase: bool,
    strip_diacritics: bool,
    min_len: usize,
    max_len: usize,
    filters: TokenFilters,
}

impl UnicodeTokenizer {
    pub fn new(config: &TokenizerConfig, filters: TokenFilters) -> Self {
        UnicodeTokenizer {
            ascii_fold: ascii_fold_table(config.lowercase),
            lowercase: config.lowercase,
            strip_diacritics: config.strip_diacritics,
            min_len: config.min_token_len,
            max_len: config.max_token_len,
            filters,
        }
    }

    #[inline]
    fn class_of(&self, ch: char) -> CharClass {
        if ch.is_ascii() {
            match self.ascii_fold[ch as usize] {
                0 => CharClass::Delimiter,
                c => CharClass::Term(c as char),
            }
        } else {
            classify(ch, self.lowercase, self.strip_diacritics)
        }
    }

    #[inline]
    fn flush(&self, buf: &mut TokenBuf, table: &mut TermFreqTable, count: &mut u32) {
        if buf.is_empty() {
            return;
        }
        let len = buf.len();
        if len >= self.min_len && len <= self.max_len {
            if let Some(hash) = self.filters.finish_token(buf.as_bytes()) {
                table.add(hash);
                *count += 1;
            }
        }
        buf.clear();
    }
}

impl Tokenizer for UnicodeTokenizer {
    fn tokenize_into(&self, text: &str, table: &mut TermFreqTable) -> u32 {
        table.clear();
        let mut buf = TokenBuf::new();
        let mut utf8 = [0u8; 4];
        let mut count = 0u32;

        for ch in text.chars() {
            match self.class_of(ch) {
                CharClass::Term(c) => {
                    if buf.len() <= self.max_len {
                        buf.extend(c.encode_utf8(&mut utf8).as_bytes());
                    }
                }
                CharClass::Mark(m) => {
                    if !self.strip_diacritics && !buf.is_empty() && buf.len() <= self.max_len {
                        buf.extend(m.encode_utf8(&mut utf8).as_bytes());
                    }
                }
                CharClass::Delimiter => self.flush(&mut buf, table, &mut count),
            }
        }
        self.flush(&mut buf, table, &mut count);

        count
    }

    fn name(&self) -> &str {
        "unicode"
    }
}
