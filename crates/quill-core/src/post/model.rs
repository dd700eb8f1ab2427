//! Blog post data models

use super::scheduler::PublicationPlan;
use crate::category::BlogCategory;
use crate::types::{next_revision, AuthorId, CategoryId, PostId, Slug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Publication lifecycle of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    /// Work in progress, never public
    #[default]
    Draft,
    /// Becomes public once `publishedAt` passes
    Scheduled,
    /// Public
    Published,
}

impl PostStatus {
    /// Parse from user input (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(PostStatus::Draft),
            "scheduled" => Some(PostStatus::Scheduled),
            "published" => Some(PostStatus::Published),
            _ => None,
        }
    }

    /// Whether this status carries a publish timestamp
    pub fn has_publish_date(&self) -> bool {
        matches!(self, PostStatus::Scheduled | PostStatus::Published)
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostStatus::Draft => write!(f, "DRAFT"),
            PostStatus::Scheduled => write!(f, "SCHEDULED"),
            PostStatus::Published => write!(f, "PUBLISHED"),
        }
    }
}

/// A blog post as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: PostId,
    pub slug: Slug,
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "default_allow_comments")]
    pub allow_comments: bool,
    pub reading_minutes: u32,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub author_id: AuthorId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_allow_comments() -> bool {
    true
}

impl BlogPost {
    /// Whether readers can see the post at `now`
    pub fn is_publicly_visible(&self, now: DateTime<Utc>) -> bool {
        if self.is_deleted {
            return false;
        }
        match (self.status, self.published_at) {
            (PostStatus::Published, _) => true,
            (PostStatus::Scheduled, Some(at)) => at <= now,
            _ => false,
        }
    }

    /// Whether a scheduled post has reached its publish time
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == PostStatus::Scheduled
            && self.published_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Write status, publish date and reading time as a single unit
    pub fn apply_plan(&mut self, plan: &PublicationPlan) {
        self.status = plan.status;
        self.published_at = plan.published_at;
        self.reading_minutes = plan.reading_minutes;
    }

    /// Advance `updated_at` to `now`, strictly past the previous value
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = next_revision(self.updated_at, now);
    }

    /// Check the publish-date invariant for the current status
    pub fn has_consistent_schedule(&self) -> bool {
        self.status.has_publish_date() == self.published_at.is_some()
    }
}

/// Deduplicate free-text tags, trimming and dropping empties, keeping first-seen order
pub(crate) fn normalize_tags(tags: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

/// Authoring input for creating or updating a post by slug
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub slug: Option<String>,
    pub title: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub cover_image: Option<String>,
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub featured: bool,
    pub allow_comments: bool,
    pub status: PostStatus,
    pub requested_publish_at: Option<String>,
    pub author_id: AuthorId,
}

impl PostDraft {
    /// Create a draft with the required fields
    pub fn new(title: impl Into<String>, content: impl Into<String>, author_id: AuthorId) -> Self {
        Self {
            slug: None,
            title: title.into(),
            excerpt: None,
            content: content.into(),
            cover_image: None,
            category_id: None,
            tags: Vec::new(),
            featured: false,
            allow_comments: true,
            status: PostStatus::Draft,
            requested_publish_at: None,
            author_id,
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = Some(excerpt.into());
        self
    }

    pub fn cover_image(mut self, cover_image: impl Into<String>) -> Self {
        self.cover_image = Some(cover_image.into());
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn featured(mut self, featured: bool) -> Self {
        self.featured = featured;
        self
    }

    pub fn allow_comments(mut self, allow: bool) -> Self {
        self.allow_comments = allow;
        self
    }

    pub fn status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    /// Caller-supplied publish date, parsed by the scheduler
    pub fn publish_at(mut self, date: impl Into<String>) -> Self {
        self.requested_publish_at = Some(date.into());
        self
    }
}

/// Filter criteria for public post listings
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Category id, or category name compared case-insensitively
    pub category: Option<String>,
    /// Only featured (`true`) or only regular (`false`) posts
    pub featured: Option<bool>,
}

impl PostFilter {
    /// Create a new empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by category id or name
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Filter by the featured flag
    pub fn with_featured(mut self, featured: bool) -> Self {
        self.featured = Some(featured);
        self
    }

    /// Whether `category` is the one this filter names
    pub fn names_category(&self, category: &BlogCategory) -> bool {
        match self.category.as_deref().map(str::trim) {
            Some(wanted) => {
                CategoryId::from_string(wanted).ok() == Some(category.id)
                    || category.name.to_lowercase() == wanted.to_lowercase()
            }
            None => true,
        }
    }

    /// Check a post against this filter.
    ///
    /// `categories` holds the ids the category criterion resolved to; it is
    /// ignored when the filter names no category.
    pub fn matches(&self, post: &BlogPost, categories: &HashSet<CategoryId>) -> bool {
        if let Some(featured) = self.featured {
            if post.featured != featured {
                return false;
            }
        }
        if self.category.is_some() {
            return post
                .category_id
                .map(|id| categories.contains(&id))
                .unwrap_or(false);
        }
        true
    }
}
