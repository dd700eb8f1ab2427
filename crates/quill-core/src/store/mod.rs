//! Storage traits and abstractions
//!
//! The persistent engine is an external collaborator. These traits describe
//! what the core needs from it: keyed reads, inserts that reject duplicate
//! natural keys, and replacements guarded by the `updatedAt` value the writer
//! last observed. A replacement whose expectation no longer holds fails with
//! [`QuillError::Conflict`](crate::QuillError::Conflict) so the caller can
//! re-read and retry.

pub mod memory;

use crate::author::Author;
use crate::category::BlogCategory;
use crate::comment::{BlogComment, CommentStatus};
use crate::error::Result;
use crate::post::BlogPost;
use crate::types::{AuthorId, CategoryId, CommentId, PostId, Slug};
use chrono::{DateTime, Utc};

pub use memory::MemoryStore;

/// Trait for blog post storage implementations
pub trait PostStore: Send + Sync {
    /// Load a post by ID
    fn get_post(&self, id: &PostId) -> Result<BlogPost>;

    /// Look up a post by its slug
    fn find_post_by_slug(&self, slug: &Slug) -> Result<Option<BlogPost>>;

    /// List all posts, deleted ones included
    fn list_posts(&self) -> Result<Vec<BlogPost>>;

    /// Store a new post; fails with a conflict if the ID or slug is taken
    fn insert_post(&self, post: &BlogPost) -> Result<()>;

    /// Overwrite a post if its stored `updatedAt` still equals `expected_updated_at`
    fn replace_post(&self, post: &BlogPost, expected_updated_at: DateTime<Utc>) -> Result<()>;

    /// Count posts referencing a category
    fn count_posts_in_category(&self, id: &CategoryId) -> Result<usize> {
        Ok(self
            .list_posts()?
            .iter()
            .filter(|p| p.category_id.as_ref() == Some(id))
            .count())
    }
}

/// Trait for comment storage implementations
pub trait CommentStore: Send + Sync {
    /// Load a comment by ID
    fn get_comment(&self, id: &CommentId) -> Result<BlogComment>;

    /// List every comment on a post, whatever its status
    fn list_comments_for_post(&self, post_id: &PostId) -> Result<Vec<BlogComment>>;

    /// List all comments
    fn list_comments(&self) -> Result<Vec<BlogComment>>;

    /// Store a new comment
    fn insert_comment(&self, comment: &BlogComment) -> Result<()>;

    /// Overwrite a comment if its stored `updatedAt` still equals `expected_updated_at`
    fn replace_comment(
        &self,
        comment: &BlogComment,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// List comments in a given status
    fn list_comments_by_status(&self, status: CommentStatus) -> Result<Vec<BlogComment>> {
        Ok(self
            .list_comments()?
            .into_iter()
            .filter(|c| c.status == status)
            .collect())
    }
}

/// Trait for category storage implementations
pub trait CategoryStore: Send + Sync {
    /// Load a category by ID
    fn get_category(&self, id: &CategoryId) -> Result<BlogCategory>;

    /// Look up a category by exact name
    fn find_category_by_name(&self, name: &str) -> Result<Option<BlogCategory>>;

    /// List all categories
    fn list_categories(&self) -> Result<Vec<BlogCategory>>;

    /// Store a new category; fails with a conflict if the name is taken
    fn insert_category(&self, category: &BlogCategory) -> Result<()>;

    /// Remove a category
    fn delete_category(&self, id: &CategoryId) -> Result<()>;
}

/// Read-only view of the host's user directory
pub trait AuthorDirectory: Send + Sync {
    /// Resolve an author reference
    fn find_author(&self, id: &AuthorId) -> Result<Option<Author>>;
}

/// Everything the core needs from a storage backend
pub trait BlogStore: PostStore + CommentStore + CategoryStore + AuthorDirectory {}

impl<T> BlogStore for T where T: PostStore + CommentStore + CategoryStore + AuthorDirectory {}
