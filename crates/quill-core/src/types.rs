//! Core type definitions for quill

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a blog post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(pub Uuid);

impl PostId {
    /// Generate a new PostId
    pub fn new() -> Self {
        PostId(Uuid::new_v4())
    }

    /// Create from UUID string
    pub fn from_string(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s)
            .map(PostId)
            .map_err(|e| crate::QuillError::Validation(format!("Invalid post ID '{}': {}", s, e)))
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommentId(pub Uuid);

impl CommentId {
    /// Generate a new CommentId
    pub fn new() -> Self {
        CommentId(Uuid::new_v4())
    }

    /// Create from UUID string
    pub fn from_string(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s).map(CommentId).map_err(|e| {
            crate::QuillError::Validation(format!("Invalid comment ID '{}': {}", s, e))
        })
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub Uuid);

impl CategoryId {
    /// Generate a new CategoryId
    pub fn new() -> Self {
        CategoryId(Uuid::new_v4())
    }

    /// Create from UUID string
    pub fn from_string(s: &str) -> crate::Result<Self> {
        Uuid::parse_str(s).map(CategoryId).map_err(|e| {
            crate::QuillError::Validation(format!("Invalid category ID '{}': {}", s, e))
        })
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque reference to a user known to the host's identity system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorId(pub String);

impl AuthorId {
    /// Create an AuthorId from a string
    pub fn from_string(s: impl Into<String>) -> Self {
        AuthorId(s.into())
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URL slug, the natural key of a post
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    /// Normalise arbitrary text into a slug.
    ///
    /// Lowercases, drops everything outside `[a-z0-9 -]`, turns whitespace runs
    /// into a dash and collapses repeated dashes. Fails if nothing is left.
    pub fn parse(input: &str) -> crate::Result<Self> {
        let lowered = input.trim().to_lowercase();
        let mut slug = String::with_capacity(lowered.len());
        let mut in_space = false;

        for ch in lowered.chars() {
            if ch.is_whitespace() {
                in_space = true;
                continue;
            }
            if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-') {
                continue;
            }
            if in_space {
                if !slug.is_empty() && !slug.ends_with('-') {
                    slug.push('-');
                }
                in_space = false;
            }
            if ch == '-' && slug.ends_with('-') {
                continue;
            }
            slug.push(ch);
        }

        if slug.is_empty() || slug.chars().all(|c| c == '-') {
            return Err(crate::QuillError::Validation(format!(
                "Unable to derive slug from '{}'",
                input
            )));
        }

        Ok(Slug(slug))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Successor of `previous` for `updatedAt`, which doubles as the
/// optimistic-concurrency token: never equal to or older than `previous`.
pub(crate) fn next_revision(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}
