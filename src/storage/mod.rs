pub mod layout;
pub mod file_lock;
pub mod catalog;
pub mod segment_file;
pub mod docid_map;
pub mod snapshot;
