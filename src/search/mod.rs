pub mod results;
pub mod cursor;
pub mod wand;
pub mod conjunctive;
pub mod executor;

#[cfg(test)]
pub(crate) mod testing;
