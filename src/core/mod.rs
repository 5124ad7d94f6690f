pub mod types;
pub mod error;
pub mod config;
pub mod cancel;
pub mod index;
pub mod backend;
