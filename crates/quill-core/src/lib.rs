//! quill-core - Core library for quill
//!
//! This crate provides the publication and comment-moderation logic of the
//! quill blog engine: publish scheduling, the comment moderation pipeline,
//! reply threading, category housekeeping and the text-analysis seam.

pub mod analysis;
pub mod author;
pub mod category;
pub mod comment;
pub mod config;
pub mod error;
pub mod post;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ErrorKind, QuillError, Result};
pub use types::*;
