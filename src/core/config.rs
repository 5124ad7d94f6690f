use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::analysis::analyzer::stemmer_algorithm;
use crate::core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerTier {
    Ascii,    // byte tables, ASCII letters and digits only
    Unicode,  // code point decode, range-based folding
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopWords {
    None,
    English,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerConfig {
    pub tier: TokenizerTier,
    pub lowercase: bool,
    pub strip_diacritics: bool,
    pub min_token_len: usize,
    pub max_token_len: usize,
    pub stemmer: Option<String>,
    pub stopwords: StopWords,
}

impl TokenizerConfig {
    pub fn ascii() -> Self {
        TokenizerConfig {
            tier: TokenizerTier::Ascii,
            lowercase: true,
            strip_diacritics: false,
            min_token_len: 1,
            max_token_len: 32,
            stemmer: None,
            stopwords: StopWords::None,
        }
    }

    pub fn unicode() -> Self {
        TokenizerConfig {
            tier: TokenizerTier::Unicode,
            lowercase: true,
            strip_diacritics: true,
            min_token_len: 1,
            max_token_len: 128,
            stemmer: None,
            stopwords: StopWords::None,
        }
    }

    /// Default profile for a language tag.
    pub fn for_language(language: &str) -> Self {
        match language.to_ascii_lowercase().as_str() {
            "en" | "english" | "ascii" => TokenizerConfig::ascii(),
            _ => TokenizerConfig::unicode(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    Memory,    // accumulate every batch in RAM, one segment at finish
    Pipeline,  // one spilled segment per batch, never merged
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub mode: IngestMode,
    pub workers: usize,
    pub batch_docs: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            mode: IngestMode::Memory,
            workers: (num_cpus::get() * 2).clamp(1, 64),
            batch_docs: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Heap,  // whole-index snapshot file, decoded into memory on open
    Mmap,  // per-segment files read through memory maps
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreqPrecision {
    U8,
    U16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    pub k1: f32,
    pub b: f32,
    pub freq_precision: FreqPrecision,
    pub bitmaps: bool,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        SegmentConfig {
            k1: 1.2,
            b: 0.75,
            freq_precision: FreqPrecision::U8,
            bitmaps: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub language: String,
    pub options: HashMap<String, String>,

    pub tokenizer: TokenizerConfig,
    pub ingest: IngestConfig,
    pub store: StoreMode,
    pub segment: SegmentConfig,
    pub verify_checksums: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from("./data"),
            language: "en".to_string(),
            options: HashMap::new(),
            tokenizer: TokenizerConfig::ascii(),
            ingest: IngestConfig::default(),
            store: StoreMode::Heap,
            segment: SegmentConfig::default(),
            verify_checksums: true,
        }
    }
}

/// On-disk form of a configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub data_dir: PathBuf,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>, language: &str) -> Result<Self> {
        Self::from_options(data_dir, language, HashMap::new())
    }

    /// Build a typed configuration from the option bag. Unknown keys are rejected.
    pub fn from_options(
        data_dir: impl Into<PathBuf>,
        language: &str,
        options: HashMap<String, String>,
    ) -> Result<Self> {
        let mut config = Config {
            data_dir: data_dir.into(),
            language: language.to_string(),
            tokenizer: TokenizerConfig::for_language(language),
            ..Config::default()
        };

        // Tier first: it decides the defaults the remaining keys override.
        if let Some(tier) = options.get("tokenizer") {
            config.tokenizer = match tier.as_str() {
                "ascii" => TokenizerConfig::ascii(),
                "unicode" => TokenizerConfig::unicode(),
                other => return Err(Error::invalid_argument(format!("unknown tokenizer '{}'", other))),
            };
        }

        for (key, value) in &options {
            config.apply_option(key, value)?;
        }
        config.options = options;
        config.validate()?;
        Ok(config)
    }

    /// Load `{ "data_dir", "language", "options" }` from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let file: ConfigFile = serde_json::from_slice(&data)
            .map_err(|e| Error::invalid_argument(format!("config file: {}", e)))?;
        Self::from_options(file.data_dir, &file.language, file.options)
    }

    /// Return a copy with one more option applied.
    pub fn with_option(&self, key: &str, value: &str) -> Result<Self> {
        let mut options = self.options.clone();
        options.insert(key.to_string(), value.to_string());
        Self::from_options(self.data_dir.clone(), &self.language, options)
    }

    fn apply_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "tokenizer" => {}
            "lowercase" => self.tokenizer.lowercase = parse_bool(key, value)?,
            "strip_diacritics" => self.tokenizer.strip_diacritics = parse_bool(key, value)?,
            "min_token_len" => self.tokenizer.min_token_len = parse_usize(key, value)?,
            "max_token_len" => self.tokenizer.max_token_len = parse_usize(key, value)?,
            "stemmer" => {
                self.tokenizer.stemmer = match value {
                    "none" | "" => None,
                    name if stemmer_algorithm(name).is_some() => Some(name.to_ascii_lowercase()),
                    other => return Err(Error::invalid_argument(format!("unknown stemmer '{}'", other))),
                }
            }
            "stopwords" => {
                self.tokenizer.stopwords = match value {
                    "none" | "" => StopWords::None,
                    "english" | "en" => StopWords::English,
                    other => return Err(Error::invalid_argument(format!("unknown stopword list '{}'", other))),
                }
            }
            "ingest" => {
                self.ingest.mode = match value {
                    "memory" => IngestMode::Memory,
                    "pipeline" => IngestMode::Pipeline,
                    other => return Err(Error::invalid_argument(format!("unknown ingest mode '{}'", other))),
                }
            }
            "workers" => self.ingest.workers = parse_usize(key, value)?,
            "batch_docs" => self.ingest.batch_docs = parse_usize(key, value)?,
            "store" => {
                self.store = match value {
                    "heap" => StoreMode::Heap,
                    "mmap" => StoreMode::Mmap,
                    other => return Err(Error::invalid_argument(format!("unknown store mode '{}'", other))),
                }
            }
            "k1" => self.segment.k1 = parse_f32(key, value)?,
            "b" => self.segment.b = parse_f32(key, value)?,
            "freq_precision" => {
                self.segment.freq_precision = match value {
                    "u8" => FreqPrecision::U8,
                    "u16" => FreqPrecision::U16,
                    other => return Err(Error::invalid_argument(format!("unknown freq precision '{}'", other))),
                }
            }
            "bitmaps" => self.segment.bitmaps = parse_bool(key, value)?,
            "verify_checksums" => self.verify_checksums = parse_bool(key, value)?,
            other => return Err(Error::invalid_argument(format!("unknown option '{}'", other))),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.ingest.workers == 0 {
            return Err(Error::invalid_argument("workers must be at least 1"));
        }
        if self.ingest.batch_docs == 0 {
            return Err(Error::invalid_argument("batch_docs must be at least 1"));
        }
        if self.tokenizer.min_token_len == 0 || self.tokenizer.min_token_len > self.tokenizer.max_token_len {
            return Err(Error::invalid_argument("token length bounds must satisfy 1 <= min <= max"));
        }
        if !(self.segment.k1 >= 0.0) || !(0.0..=1.0).contains(&self.segment.b) {
            return Err(Error::invalid_argument("BM25 parameters require k1 >= 0 and 0 <= b <= 1"));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_argument(format!("{}: expected a boolean, got '{}'", key, value))),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| Error::invalid_argument(format!("{}: expected an integer, got '{}'", key, value)))
}

fn parse_f32(key: &str, value: &str) -> Result<f32> {
    value
        .parse()
        .map_err(|_| Error::invalid_argument(format!("{}: expected a number, got '{}'", key, value)))
}
