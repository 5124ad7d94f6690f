use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::filters::stopword::StopWordFilter;
use crate::analysis::language::unicode::UnicodeTokenizer;
use crate::analysis::term_table::TermFreqTable;
use crate::analysis::tokenizer::{AsciiTokenizer, TokenFilters, Tokenizer};
use crate::core::config::{StopWords, TokenizerConfig, TokenizerTier};
use crate::core::error::{Error, Result};
use crate::core::types::TermHash;

/// Text analysis pipeline
///
/// Wraps the configured tokenizer tier together with its stop word and
/// stemming filters. Index and query text go through the same analyzer, so a
/// query term hashes to exactly what was indexed.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer { tokenizer, name }
    }

    pub fn from_config(config: &TokenizerConfig) -> Result<Self> {
        let stemmer = match &config.stemmer {
            Some(name) => {
                let algorithm = stemmer_algorithm(name).ok_or_else(|| {
                    Error::invalid_argument(format!("unknown stemmer '{}'", name))
                })?;
                Some(Stemmer::create(algorithm))
            }
            None => None,
        };
        let stopwords = match config.stopwords {
            StopWords::None => None,
            StopWords::English => Some(StopWordFilter::english()),
        };
        let filters = TokenFilters { stopwords, stemmer };

        let tokenizer: Box<dyn Tokenizer> = match config.tier {
            TokenizerTier::Ascii => Box::new(AsciiTokenizer::new(config, filters)),
            TokenizerTier::Unicode => Box::new(UnicodeTokenizer::new(config, filters)),
        };
        let name = tokenizer.name().to_string();
        Ok(Analyzer::new(name, tokenizer))
    }

    /// Fill `table` with the terms of `text`, returning the document length.
    #[inline]
    pub fn analyze_into(&self, text: &str, table: &mut TermFreqTable) -> u32 {
        self.tokenizer.tokenize_into(text, table)
    }

    pub fn analyze(&self, text: &str) -> Vec<(TermHash, u16)> {
        self.tokenizer.tokenize(text)
    }

    /// Distinct query terms in first-occurrence order.
    pub fn query_terms(&self, query: &str) -> Vec<TermHash> {
        self.analyze(query).into_iter().map(|(hash, _)| hash).collect()
    }
}

/// Snowball algorithm for a language name such as "english" or "en".
pub fn stemmer_algorithm(name: &str) -> Option<Algorithm> {
    let algorithm = match name.to_ascii_lowercase().as_str() {
        "english" | "en" => Algorithm::English,
        "french" | "fr" => Algorithm::French,
        "german" | "de" => Algorithm::German,
        "spanish" | "es" => Algorithm::Spanish,
        "italian" | "it" => Algorithm::Italian,
        "portuguese" | "pt" => Algorithm::Portuguese,
        "dutch" | "nl" => Algorithm::Dutch,
        "swedish" | "sv" => Algorithm::Swedish,
        "norwegian" | "no" => Algorithm::Norwegian,
        "danish" | "da" => Algorithm::Danish,
        "finnish" | "fi" => Algorithm::Finnish,
        "russian" | "ru" => Algorithm::Russian,
        "hungarian" | "hu" => Algorithm::Hungarian,
        "romanian" | "ro" => Algorithm::Romanian,
        "turkish" | "tr" => Algorithm::Turkish,
        _ => return None,
    };
    Some(algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::hash::hash_term;

    #[test]
    fn picks_tier_from_config() {
        assert_eq!(Analyzer::from_config(&TokenizerConfig::ascii()).unwrap().name, "ascii");
        assert_eq!(Analyzer::from_config(&TokenizerConfig::unicode()).unwrap().name, "unicode");
    }

    #[test]
    fn stopwords_and_stemming_apply_to_queries() {
        let mut config = TokenizerConfig::ascii();
        config.stopwords = StopWords::English;
        config.stemmer = Some("english".to_string());
        let analyzer = Analyzer::from_config(&config).unwrap();

        assert!(analyzer.query_terms("the and of").is_empty());
        assert_eq!(analyzer.query_terms("running foxes"), analyzer.query_terms("run fox"));
    }

    #[test]
    fn query_terms_are_unique() {
        let analyzer = Analyzer::from_config(&TokenizerConfig::ascii()).unwrap();
        assert_eq!(
            analyzer.query_terms("fox Fox dog fox"),
            vec![hash_term("fox"), hash_term("dog")]
        );
    }

    #[test]
    fn rejects_unknown_stemmer() {
        let mut config = TokenizerConfig::ascii();
        config.stemmer = Some("klingon".to_string());
        assert!(Analyzer::from_config(&config).is_err());
        assert!(stemmer_algorithm("EN").is_some());
    }
}
