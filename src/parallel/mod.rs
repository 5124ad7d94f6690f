pub mod shard;
pub mod indexer;
pub mod accumulator;
pub mod pipeline;
