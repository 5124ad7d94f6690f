pub mod fold;
pub mod unicode;
