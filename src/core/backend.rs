use std::collections::BTreeMap;
use crate::core::cancel::CancelToken;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::index::{ImportProgress, Index};
use crate::core::types::Document;
use crate::search::results::SearchResults;

/// Capability set every search backend offers.
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    fn import(
        &self,
        docs: &mut dyn Iterator<Item = Result<Document>>,
        progress: &mut dyn FnMut(ImportProgress),
        cancel: &CancelToken,
    ) -> Result<u64>;

    fn search(&self, query: &str, limit: usize, offset: usize) -> Result<SearchResults>;

    fn count(&self) -> Result<u64>;

    fn close(&self) -> Result<()>;
}

impl SearchBackend for Index {
    fn name(&self) -> &str {
        "quarry"
    }

    fn import(
        &self,
        docs: &mut dyn Iterator<Item = Result<Document>>,
        progress: &mut dyn FnMut(ImportProgress),
        cancel: &CancelToken,
    ) -> Result<u64> {
        Index::import(self, docs, progress, cancel)
    }

    fn search(&self, query: &str, limit: usize, offset: usize) -> Result<SearchResults> {
        Index::search(self, query, limit, offset)
    }

    fn count(&self) -> Result<u64> {
        Ok(Index::count(self))
    }

    fn close(&self) -> Result<()> {
        Index::close(self)
    }
}

pub type BackendConstructor = fn(Config) -> Result<Box<dyn SearchBackend>>;

/// Name -> constructor table. Built by the caller and passed around;
/// there is no process-wide registry.
#[derive(Clone, Default)]
pub struct BackendFactory {
    constructors: BTreeMap<String, BackendConstructor>,
}

impl BackendFactory {
    pub fn new() -> Self {
        BackendFactory::default()
    }

    /// `heap`, `mmap` and `pipeline` profiles of [`Index`].
    pub fn with_defaults() -> Self {
        let mut factory = BackendFactory::new();
        factory.register("heap", open_heap);
        factory.register("mmap", open_mmap);
        factory.register("pipeline", open_pipeline);
        factory
    }

    pub fn register(&mut self, name: &str, constructor: BackendConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn create(&self, name: &str, config: Config) -> Result<Box<dyn SearchBackend>> {
        let constructor = self.constructors.get(name).ok_or_else(|| {
            Error::invalid_argument(format!(
                "unknown backend '{}' (known: {})",
                name,
                self.names().join(", ")
            ))
        })?;
        constructor(config)
    }
}

fn open_heap(config: Config) -> Result<Box<dyn SearchBackend>> {
    let config = config.with_option("store", "heap")?;
    Ok(Box::new(Index::open_or_create(config)?))
}

fn open_mmap(config: Config) -> Result<Box<dyn SearchBackend>> {
    let config = config.with_option("store", "mmap")?;
    Ok(Box::new(Index::open_or_create(config)?))
}

fn open_pipeline(config: Config) -> Result<Box<dyn SearchBackend>> {
    let config = config.with_option("store", "mmap")?.with_option("ingest", "pipeline")?;
    Ok(Box::new(Index::open_or_create(config)?))
}
