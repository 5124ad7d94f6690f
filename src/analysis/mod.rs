pub mod hash;
pub mod term_table;
pub mod tokenizer;
pub mod analyzer;
pub mod filters;
pub mod language;
