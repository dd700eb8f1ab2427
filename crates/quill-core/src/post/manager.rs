//! Post manager: authoring, publication transitions and visibility

use super::excerpt::derive_excerpt;
use super::model::{normalize_tags, BlogPost, PostDraft, PostFilter, PostStatus};
use super::scheduler::PublicationScheduler;
use crate::config::PublicationConfig;
use crate::error::{ErrorKind, QuillError, Result};
use crate::store::BlogStore;
use crate::types::{CategoryId, PostId, Slug};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Attempts for a read-then-write before giving up on a contended slug
pub const MAX_UPSERT_ATTEMPTS: usize = 5;

/// Maximum post title length
pub const MAX_TITLE_LENGTH: usize = 200;

/// Whether an upsert created a post or updated one in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

/// Manager for blog posts
pub struct PostManager {
    store: Arc<dyn BlogStore>,
    scheduler: PublicationScheduler,
}

impl PostManager {
    /// Create a manager over `store`
    pub fn new(store: Arc<dyn BlogStore>, config: &PublicationConfig) -> Self {
        Self {
            store,
            scheduler: PublicationScheduler::new(config),
        }
    }

    pub fn scheduler(&self) -> &PublicationScheduler {
        &self.scheduler
    }

    /// Create or update a post keyed by slug.
    ///
    /// Re-authoring an existing slug replaces every supplied and derived field
    /// in place, keeps `id` and `created_at`, and clears `is_deleted`.
    pub fn upsert(&self, draft: PostDraft, now: DateTime<Utc>) -> Result<(BlogPost, UpsertKind)> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(QuillError::Validation("Post title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(QuillError::Validation(format!(
                "Post title exceeds maximum length of {} characters",
                MAX_TITLE_LENGTH
            )));
        }
        if draft.content.trim().is_empty() {
            return Err(QuillError::Validation(
                "Post content is required".to_string(),
            ));
        }

        let slug = match draft.slug.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Slug::parse(raw)?,
            _ => Slug::parse(&title)?,
        };

        if let Some(category_id) = &draft.category_id {
            self.store.get_category(category_id)?;
        }
        if self.store.find_author(&draft.author_id)?.is_none() {
            return Err(QuillError::AuthorNotFound(draft.author_id.to_string()));
        }

        let plan = self.scheduler.plan(
            draft.status,
            draft.requested_publish_at.as_deref(),
            &draft.content,
            now,
        )?;
        let excerpt = draft
            .excerpt
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .or_else(|| derive_excerpt(&draft.content));
        let tags = normalize_tags(draft.tags.iter().cloned());

        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            let existing = self.store.find_post_by_slug(&slug)?;

            let result = match &existing {
                None => {
                    let post = BlogPost {
                        id: PostId::new(),
                        slug: slug.clone(),
                        title: title.clone(),
                        excerpt: excerpt.clone(),
                        content: draft.content.clone(),
                        cover_image: draft.cover_image.clone(),
                        category_id: draft.category_id,
                        tags: tags.clone(),
                        featured: draft.featured,
                        allow_comments: draft.allow_comments,
                        reading_minutes: plan.reading_minutes,
                        status: plan.status,
                        published_at: plan.published_at,
                        is_deleted: false,
                        author_id: draft.author_id.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    self.store
                        .insert_post(&post)
                        .map(|()| (post, UpsertKind::Created))
                }
                Some(current) => {
                    let mut post = current.clone();
                    post.title = title.clone();
                    post.excerpt = excerpt.clone();
                    post.content = draft.content.clone();
                    post.cover_image = draft.cover_image.clone();
                    post.category_id = draft.category_id;
                    post.tags = tags.clone();
                    post.featured = draft.featured;
                    post.allow_comments = draft.allow_comments;
                    post.author_id = draft.author_id.clone();
                    post.is_deleted = false;
                    post.apply_plan(&plan);
                    post.touch(now);
                    self.store
                        .replace_post(&post, current.updated_at)
                        .map(|()| (post, UpsertKind::Updated))
                }
            };

            match result {
                Ok((post, kind)) => {
                    tracing::info!("{:?} post '{}' as {}", kind, post.slug, post.status);
                    return Ok((post, kind));
                }
                Err(e) if e.kind() == ErrorKind::Conflict => {
                    tracing::warn!(
                        "Conflict upserting post '{}' (attempt {}/{}), retrying",
                        slug,
                        attempt,
                        MAX_UPSERT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(QuillError::Conflict(format!(
            "post '{}' kept changing; gave up after {} attempts",
            slug, MAX_UPSERT_ATTEMPTS
        )))
    }

    /// Load a post by slug, deleted posts included
    pub fn get_by_slug(&self, slug: &str) -> Result<BlogPost> {
        let parsed = Slug::parse(slug)?;
        self.store
            .find_post_by_slug(&parsed)?
            .ok_or_else(|| QuillError::PostNotFound(slug.to_string()))
    }

    /// Move a post to `status`, re-deriving publish date and reading time.
    ///
    /// Re-publishing an already PUBLISHED post without a requested date keeps
    /// its original `published_at`.
    pub fn transition(
        &self,
        slug: &str,
        status: PostStatus,
        requested: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<BlogPost> {
        let scheduler = &self.scheduler;
        self.update_post(slug, now, |post| {
            let mut plan = scheduler.plan(status, requested, &post.content, now)?;
            if status == PostStatus::Published
                && post.status == PostStatus::Published
                && requested.is_none()
            {
                plan.published_at = post.published_at.or(plan.published_at);
            }
            tracing::info!("Post '{}' {} -> {}", post.slug, post.status, status);
            post.apply_plan(&plan);
            Ok(true)
        })
    }

    /// Promote SCHEDULED posts whose time has come; returns how many changed
    pub fn publish_due(&self, now: DateTime<Utc>) -> Result<usize> {
        let due: Vec<BlogPost> = self
            .store
            .list_posts()?
            .into_iter()
            .filter(|p| !p.is_deleted && p.is_due(now))
            .collect();

        let mut promoted = 0;
        for post in due {
            let mut changed = false;
            self.update_post(post.slug.as_str(), now, |current| {
                if current.is_deleted || !current.is_due(now) {
                    return Ok(false);
                }
                current.status = PostStatus::Published;
                changed = true;
                Ok(true)
            })?;
            if changed {
                tracing::info!("Published scheduled post '{}'", post.slug);
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    /// Hide a post without removing it
    pub fn soft_delete(&self, slug: &str, now: DateTime<Utc>) -> Result<BlogPost> {
        self.update_post(slug, now, |post| {
            if post.is_deleted {
                return Ok(false);
            }
            post.is_deleted = true;
            Ok(true)
        })
    }

    /// Undo a soft delete
    pub fn restore(&self, slug: &str, now: DateTime<Utc>) -> Result<BlogPost> {
        self.update_post(slug, now, |post| {
            if !post.is_deleted {
                return Ok(false);
            }
            post.is_deleted = false;
            Ok(true)
        })
    }

    /// Publicly visible posts matching `filter`, featured first, then newest.
    ///
    /// A category criterion that names no existing category yields an empty
    /// list.
    pub fn list_visible(&self, filter: &PostFilter, now: DateTime<Utc>) -> Result<Vec<BlogPost>> {
        let categories: HashSet<CategoryId> = match &filter.category {
            Some(_) => self
                .store
                .list_categories()?
                .iter()
                .filter(|c| filter.names_category(c))
                .map(|c| c.id)
                .collect(),
            None => HashSet::new(),
        };
        if filter.category.is_some() && categories.is_empty() {
            tracing::debug!("No category matches {:?}", filter.category);
            return Ok(Vec::new());
        }

        let mut posts: Vec<BlogPost> = self
            .store
            .list_posts()?
            .into_iter()
            .filter(|p| p.is_publicly_visible(now) && filter.matches(p, &categories))
            .collect();
        posts.sort_by(|a, b| {
            b.featured
                .cmp(&a.featured)
                .then_with(|| b.published_at.cmp(&a.published_at))
                .then_with(|| a.slug.cmp(&b.slug))
        });
        Ok(posts)
    }

    /// Every post, newest authored first
    pub fn list_all(&self) -> Result<Vec<BlogPost>> {
        let mut posts = self.store.list_posts()?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.slug.cmp(&b.slug)));
        Ok(posts)
    }

    /// Read-modify-write a post under the `updatedAt` guard, retrying lost races
    fn update_post<F>(&self, slug: &str, now: DateTime<Utc>, mut change: F) -> Result<BlogPost>
    where
        F: FnMut(&mut BlogPost) -> Result<bool>,
    {
        for attempt in 1..=MAX_UPSERT_ATTEMPTS {
            let mut post = self.get_by_slug(slug)?;
            let expected = post.updated_at;

            if !change(&mut post)? {
                return Ok(post);
            }
            post.touch(now);

            match self.store.replace_post(&post, expected) {
                Ok(()) => return Ok(post),
                Err(e) if e.kind() == ErrorKind::Conflict => {
                    tracing::warn!(
                        "Conflict updating post '{}' (attempt {}/{}), retrying",
                        slug,
                        attempt,
                        MAX_UPSERT_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(QuillError::Conflict(format!(
            "post '{}' kept changing; gave up after {} attempts",
            slug, MAX_UPSERT_ATTEMPTS
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::author::Author;
    use crate::category::BlogCategory;
    use crate::store::{CategoryStore, MemoryStore, PostStore};
    use crate::types::AuthorId;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    fn setup() -> (Arc<MemoryStore>, PostManager) {
        let store = Arc::new(MemoryStore::new());
        store.register_author(Author::new("admin", "Site Team"));
        let manager = PostManager::new(store.clone(), &PublicationConfig::default());
        (store, manager)
    }

    fn draft(title: &str) -> PostDraft {
        PostDraft::new(
            title,
            "Keep your firmware current. Rotate passwords.",
            AuthorId::from_string("admin"),
        )
    }

    #[test]
    fn test_upsert_creates_with_derived_fields() {
        let (_, manager) = setup();
        let now = fixed_now();
        let (post, kind) = manager
            .upsert(draft("Router Hardening 101").status(PostStatus::Published), now)
            .unwrap();

        assert_eq!(kind, UpsertKind::Created);
        assert_eq!(post.slug.as_str(), "router-hardening-101");
        assert_eq!(post.published_at, Some(now));
        assert_eq!(post.reading_minutes, 1);
        assert_eq!(
            post.excerpt.as_deref(),
            Some("Keep your firmware current. Rotate passwords.")
        );
        assert!(post.has_consistent_schedule());
    }

    #[test]
    fn test_upsert_same_slug_updates_in_place() {
        let (store, manager) = setup();
        let now = fixed_now();
        let (first, _) = manager.upsert(draft("First").slug("tips"), now).unwrap();
        let (second, kind) = manager
            .upsert(draft("Second").slug("tips"), now + Duration::minutes(5))
            .unwrap();

        assert_eq!(kind, UpsertKind::Updated);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.title, "Second");
        assert_eq!(store.list_posts().unwrap().len(), 1);
    }

    #[test]
    fn test_upsert_clears_soft_delete() {
        let (_, manager) = setup();
        let now = fixed_now();
        manager.upsert(draft("Gone").slug("gone"), now).unwrap();
        manager.soft_delete("gone", now).unwrap();
        assert!(manager.get_by_slug("gone").unwrap().is_deleted);

        let (post, _) = manager.upsert(draft("Back").slug("gone"), now).unwrap();
        assert!(!post.is_deleted);
    }

    #[test]
    fn test_upsert_validation() {
        let (_, manager) = setup();
        let now = fixed_now();
        assert!(manager.upsert(draft("   "), now).is_err());
        assert!(manager
            .upsert(PostDraft::new("Title", " ", AuthorId::from_string("admin")), now)
            .is_err());
        assert!(matches!(
            manager.upsert(draft("Title").publish_at("soon").status(PostStatus::Scheduled), now),
            Err(QuillError::Validation(_))
        ));
        assert!(matches!(
            manager.upsert(draft("Title").category(CategoryId::new()), now),
            Err(QuillError::CategoryNotFound(_))
        ));
        assert!(matches!(
            manager.upsert(
                PostDraft::new("Title", "body", AuthorId::from_string("nobody")),
                now
            ),
            Err(QuillError::AuthorNotFound(_))
        ));
    }

    #[test]
    fn test_upsert_with_category_and_tags() {
        let (store, manager) = setup();
        let category = BlogCategory::new("Security");
        store.insert_category(&category).unwrap();

        let (post, _) = manager
            .upsert(
                draft("Tagged")
                    .category(category.id)
                    .tag("wifi")
                    .tag(" wifi ")
                    .tag("routers"),
                fixed_now(),
            )
            .unwrap();
        assert_eq!(post.category_id, Some(category.id));
        assert_eq!(post.tags, vec!["wifi".to_string(), "routers".to_string()]);
    }

    #[test]
    fn test_transition_and_publish_due() {
        let (_, manager) = setup();
        let now = fixed_now();
        manager.upsert(draft("Later").slug("later"), now).unwrap();

        let scheduled = manager
            .transition("later", PostStatus::Scheduled, None, now)
            .unwrap();
        assert_eq!(scheduled.published_at, Some(now + Duration::hours(1)));
        assert!(manager.list_visible(&PostFilter::new(), now).unwrap().is_empty());

        assert_eq!(manager.publish_due(now).unwrap(), 0);
        let later = now + Duration::hours(2);
        assert_eq!(manager.list_visible(&PostFilter::new(), later).unwrap().len(), 1);
        assert_eq!(manager.publish_due(later).unwrap(), 1);

        let published = manager.get_by_slug("later").unwrap();
        assert_eq!(published.status, PostStatus::Published);
        assert_eq!(published.published_at, Some(now + Duration::hours(1)));
    }

    #[test]
    fn test_republish_keeps_original_date() {
        let (_, manager) = setup();
        let now = fixed_now();
        manager
            .upsert(draft("Live").slug("live").status(PostStatus::Published), now)
            .unwrap();

        let again = manager
            .transition("live", PostStatus::Published, None, now + Duration::days(3))
            .unwrap();
        assert_eq!(again.published_at, Some(now));

        let draft = manager
            .transition("live", PostStatus::Draft, Some("2030-01-01"), now)
            .unwrap();
        assert_eq!(draft.published_at, None);
    }

    #[test]
    fn test_soft_delete_hides_and_restore_shows() {
        let (_, manager) = setup();
        let now = fixed_now();
        manager
            .upsert(draft("Visible").slug("visible").status(PostStatus::Published), now)
            .unwrap();
        assert_eq!(manager.list_visible(&PostFilter::new(), now).unwrap().len(), 1);

        manager.soft_delete("visible", now).unwrap();
        assert!(manager.list_visible(&PostFilter::new(), now).unwrap().is_empty());
        assert_eq!(manager.list_all().unwrap().len(), 1);

        manager.restore("visible", now).unwrap();
        assert_eq!(manager.list_visible(&PostFilter::new(), now).unwrap().len(), 1);
    }

    #[test]
    fn test_list_visible_filters_and_featured_first() {
        let (store, manager) = setup();
        let now = fixed_now();
        let networking = BlogCategory::new("Networking");
        let security = BlogCategory::new("Security");
        store.insert_category(&networking).unwrap();
        store.insert_category(&security).unwrap();

        let publish = |slug: &str, category: &BlogCategory, featured: bool, minutes: i64| {
            manager
                .upsert(
                    draft(slug)
                        .slug(slug)
                        .category(category.id)
                        .featured(featured)
                        .status(PostStatus::Published),
                    now + Duration::minutes(minutes),
                )
                .unwrap();
        };
        publish("old-featured", &networking, true, 0);
        publish("newest", &security, false, 20);
        publish("middle", &networking, false, 10);
        manager
            .upsert(draft("Hidden").slug("hidden").category(networking.id), now)
            .unwrap();

        let later = now + Duration::hours(1);
        let slugs = |filter: PostFilter| -> Vec<String> {
            manager
                .list_visible(&filter, later)
                .unwrap()
                .into_iter()
                .map(|p| p.slug.to_string())
                .collect()
        };

        assert_eq!(slugs(PostFilter::new()), vec!["old-featured", "newest", "middle"]);
        assert_eq!(
            slugs(PostFilter::new().with_category("NETWORKING")),
            vec!["old-featured", "middle"]
        );
        assert_eq!(
            slugs(PostFilter::new().with_category(security.id.to_string())),
            vec!["newest"]
        );
        assert_eq!(slugs(PostFilter::new().with_featured(true)), vec!["old-featured"]);
        assert_eq!(
            slugs(PostFilter::new().with_featured(false)),
            vec!["newest", "middle"]
        );
        assert!(slugs(PostFilter::new().with_category("Gardening")).is_empty());
    }

    #[test]
    fn test_missing_slug() {
        let (_, manager) = setup();
        assert!(matches!(
            manager.transition("nope", PostStatus::Published, None, fixed_now()),
            Err(QuillError::PostNotFound(_))
        ));
    }
}
