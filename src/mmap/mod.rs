pub mod byte_view;
pub mod mmap_file;
