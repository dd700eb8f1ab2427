//! In-memory storage, used by tests and short-lived tooling

use super::{AuthorDirectory, CategoryStore, CommentStore, PostStore};
use crate::author::Author;
use crate::category::BlogCategory;
use crate::comment::BlogComment;
use crate::error::{QuillError, Result};
use crate::post::BlogPost;
use crate::types::{AuthorId, CategoryId, CommentId, PostId, Slug};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    posts: HashMap<PostId, BlogPost>,
    comments: HashMap<CommentId, BlogComment>,
    categories: HashMap<CategoryId, BlogCategory>,
    authors: HashMap<AuthorId, Author>,
}

/// In-memory blog storage.
///
/// All tables sit behind a single lock, so every compare-and-replace is atomic
/// with respect to every other write.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an author so posts and comments can reference it
    pub fn register_author(&self, author: Author) {
        self.write().authors.insert(author.id.clone(), author);
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PostStore for MemoryStore {
    fn get_post(&self, id: &PostId) -> Result<BlogPost> {
        self.read()
            .posts
            .get(id)
            .cloned()
            .ok_or_else(|| QuillError::PostNotFound(id.to_string()))
    }

    fn find_post_by_slug(&self, slug: &Slug) -> Result<Option<BlogPost>> {
        Ok(self.read().posts.values().find(|p| &p.slug == slug).cloned())
    }

    fn list_posts(&self) -> Result<Vec<BlogPost>> {
        Ok(self.read().posts.values().cloned().collect())
    }

    fn insert_post(&self, post: &BlogPost) -> Result<()> {
        let mut tables = self.write();
        if tables.posts.contains_key(&post.id) {
            return Err(QuillError::Conflict(format!("post {} already exists", post.id)));
        }
        if tables.posts.values().any(|p| p.slug == post.slug) {
            return Err(QuillError::Conflict(format!("slug '{}' is taken", post.slug)));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(())
    }

    fn replace_post(&self, post: &BlogPost, expected_updated_at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.write();
        let current = tables
            .posts
            .get(&post.id)
            .ok_or_else(|| QuillError::PostNotFound(post.id.to_string()))?;
        if current.updated_at != expected_updated_at {
            return Err(QuillError::Conflict(format!(
                "post {} changed since it was read",
                post.id
            )));
        }
        if tables
            .posts
            .values()
            .any(|p| p.id != post.id && p.slug == post.slug)
        {
            return Err(QuillError::Conflict(format!("slug '{}' is taken", post.slug)));
        }
        tables.posts.insert(post.id, post.clone());
        Ok(())
    }
}

impl CommentStore for MemoryStore {
    fn get_comment(&self, id: &CommentId) -> Result<BlogComment> {
        self.read()
            .comments
            .get(id)
            .cloned()
            .ok_or_else(|| QuillError::CommentNotFound(id.to_string()))
    }

    fn list_comments_for_post(&self, post_id: &PostId) -> Result<Vec<BlogComment>> {
        Ok(self
            .read()
            .comments
            .values()
            .filter(|c| &c.post_id == post_id)
            .cloned()
            .collect())
    }

    fn list_comments(&self) -> Result<Vec<BlogComment>> {
        Ok(self.read().comments.values().cloned().collect())
    }

    fn insert_comment(&self, comment: &BlogComment) -> Result<()> {
        let mut tables = self.write();
        if tables.comments.contains_key(&comment.id) {
            return Err(QuillError::Conflict(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }

    fn replace_comment(
        &self,
        comment: &BlogComment,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.write();
        let current = tables
            .comments
            .get(&comment.id)
            .ok_or_else(|| QuillError::CommentNotFound(comment.id.to_string()))?;
        if current.updated_at != expected_updated_at {
            return Err(QuillError::Conflict(format!(
                "comment {} changed since it was read",
                comment.id
            )));
        }
        tables.comments.insert(comment.id, comment.clone());
        Ok(())
    }
}

impl CategoryStore for MemoryStore {
    fn get_category(&self, id: &CategoryId) -> Result<BlogCategory> {
        self.read()
            .categories
            .get(id)
            .cloned()
            .ok_or_else(|| QuillError::CategoryNotFound(id.to_string()))
    }

    fn find_category_by_name(&self, name: &str) -> Result<Option<BlogCategory>> {
        Ok(self
            .read()
            .categories
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    fn list_categories(&self) -> Result<Vec<BlogCategory>> {
        Ok(self.read().categories.values().cloned().collect())
    }

    fn insert_category(&self, category: &BlogCategory) -> Result<()> {
        let mut tables = self.write();
        if tables.categories.values().any(|c| c.name == category.name) {
            return Err(QuillError::Conflict(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(())
    }

    fn delete_category(&self, id: &CategoryId) -> Result<()> {
        self.write()
            .categories
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| QuillError::CategoryNotFound(id.to_string()))
    }
}

impl AuthorDirectory for MemoryStore {
    fn find_author(&self, id: &AuthorId) -> Result<Option<Author>> {
        Ok(self.read().authors.get(id).cloned())
    }
}
