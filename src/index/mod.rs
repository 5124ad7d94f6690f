pub mod posting;
pub mod segment;
pub mod builder;
