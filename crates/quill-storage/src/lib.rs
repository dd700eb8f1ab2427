//! quill-storage - Storage library for quill
//!
//! This crate provides a file system backed implementation of the
//! `quill-core` storage traits.

mod fs_store;

pub use fs_store::{FileSystemStore, RecordFile, CURRENT_SCHEMA_VERSION};
