//! Explicit reclamation of unused categories
//!
//! Pruning never happens as a side effect of post writes; an administrator
//! runs it on demand.

use super::model::{BlogCategory, CategorySummary};
use crate::config::HousekeepingConfig;
use crate::error::{ErrorKind, QuillError, Result};
use crate::store::BlogStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Category maintenance operations
pub struct CategoryHousekeeper {
    store: Arc<dyn BlogStore>,
    protected: HashSet<String>,
}

impl CategoryHousekeeper {
    /// Create a housekeeper; configured protected names are never pruned
    pub fn new(store: Arc<dyn BlogStore>, config: &HousekeepingConfig) -> Self {
        Self {
            store,
            protected: config
                .protected_categories
                .iter()
                .map(|name| normalize_name(name))
                .collect(),
        }
    }

    /// Return the category called `name`, creating it if needed
    pub fn ensure_category(&self, name: &str) -> Result<BlogCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuillError::Validation(
                "Category name is required".to_string(),
            ));
        }

        if let Some(existing) = self.store.find_category_by_name(name)? {
            return Ok(existing);
        }

        let category = BlogCategory::new(name);
        match self.store.insert_category(&category) {
            Ok(()) => {
                tracing::info!("Created category '{}'", category.name);
                Ok(category)
            }
            // lost a race against another writer creating the same name
            Err(e) if e.kind() == ErrorKind::Conflict => self
                .store
                .find_category_by_name(name)?
                .ok_or(e),
            Err(e) => Err(e),
        }
    }

    /// All categories with their post counts, by name
    pub fn list_with_counts(&self) -> Result<Vec<CategorySummary>> {
        let mut summaries = self
            .store
            .list_categories()?
            .into_iter()
            .map(|category| {
                let post_count = self.store.count_posts_in_category(&category.id)?;
                Ok(CategorySummary {
                    category,
                    post_count,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        summaries.sort_by(|a, b| a.category.name.cmp(&b.category.name));
        Ok(summaries)
    }

    /// Categories `prune_empty_categories` would remove right now
    pub fn empty_categories(&self, exclude_names: &[String]) -> Result<Vec<BlogCategory>> {
        let excluded = self.excluded(exclude_names);
        Ok(self
            .list_with_counts()?
            .into_iter()
            .filter(|s| s.post_count == 0 && !excluded.contains(&normalize_name(&s.category.name)))
            .map(|s| s.category)
            .collect())
    }

    /// Delete every category with no posts whose name is neither protected
    /// nor in `exclude_names` (compared case-insensitively). Returns the
    /// number removed.
    ///
    /// Each candidate is re-counted just before deletion, so a post filed
    /// under it meanwhile keeps it alive.
    pub fn prune_empty_categories(&self, exclude_names: &[String]) -> Result<usize> {
        let mut removed = 0;

        for category in self.empty_categories(exclude_names)? {
            if self.store.count_posts_in_category(&category.id)? > 0 {
                tracing::debug!("Category '{}' gained posts, keeping it", category.name);
                continue;
            }
            match self.store.delete_category(&category.id) {
                Ok(()) => {
                    tracing::info!("Pruned empty category '{}'", category.name);
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!("Category '{}' already removed", category.name);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }

    fn excluded(&self, exclude_names: &[String]) -> HashSet<String> {
        let mut excluded = self.protected.clone();
        excluded.extend(exclude_names.iter().map(|name| normalize_name(name)));
        excluded
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::{BlogPost, PostStatus};
    use crate::store::{CategoryStore, MemoryStore, PostStore};
    use crate::types::{AuthorId, CategoryId, PostId, Slug};
    use chrono::Utc;

    fn post_in(category: CategoryId, slug: &str) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: PostId::new(),
            slug: Slug::parse(slug).unwrap(),
            title: slug.to_string(),
            excerpt: None,
            content: "body".to_string(),
            cover_image: None,
            category_id: Some(category),
            tags: vec![],
            featured: false,
            allow_comments: true,
            reading_minutes: 1,
            status: PostStatus::Draft,
            published_at: None,
            is_deleted: false,
            author_id: AuthorId::from_string("admin"),
            created_at: now,
            updated_at: now,
        }
    }

    fn setup(protected: &[&str]) -> (Arc<MemoryStore>, CategoryHousekeeper) {
        let store = Arc::new(MemoryStore::new());
        let config = HousekeepingConfig {
            protected_categories: protected.iter().map(|s| s.to_string()).collect(),
        };
        let housekeeper = CategoryHousekeeper::new(store.clone(), &config);
        (store, housekeeper)
    }

    #[test]
    fn test_ensure_category_is_idempotent() {
        let (store, housekeeper) = setup(&[]);
        let first = housekeeper.ensure_category(" Networking ").unwrap();
        let second = housekeeper.ensure_category("Networking").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_categories().unwrap().len(), 1);
        assert!(housekeeper.ensure_category("  ").is_err());
    }

    #[test]
    fn test_prune_respects_counts_and_exclusions() {
        let (store, housekeeper) = setup(&[]);
        let a = housekeeper.ensure_category("A").unwrap();
        housekeeper.ensure_category("B").unwrap();
        housekeeper.ensure_category("C").unwrap();
        store.insert_post(&post_in(a.id, "in-a")).unwrap();

        let removed = housekeeper
            .prune_empty_categories(&["c".to_string()])
            .unwrap();

        assert_eq!(removed, 1);
        let mut names: Vec<String> = store
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_protected_names_survive() {
        let (store, housekeeper) = setup(&["General"]);
        housekeeper.ensure_category("General").unwrap();
        housekeeper.ensure_category("Scratch").unwrap();

        assert_eq!(housekeeper.prune_empty_categories(&[]).unwrap(), 1);
        let remaining = store.list_categories().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "General");
    }

    #[test]
    fn test_deleted_posts_still_count() {
        let (store, housekeeper) = setup(&[]);
        let category = housekeeper.ensure_category("Archive").unwrap();
        let mut post = post_in(category.id, "old");
        post.is_deleted = true;
        store.insert_post(&post).unwrap();

        assert_eq!(housekeeper.prune_empty_categories(&[]).unwrap(), 0);
    }

    #[test]
    fn test_list_with_counts_sorted() {
        let (store, housekeeper) = setup(&[]);
        let tips = housekeeper.ensure_category("Tips").unwrap();
        housekeeper.ensure_category("Alerts").unwrap();
        store.insert_post(&post_in(tips.id, "t1")).unwrap();
        store.insert_post(&post_in(tips.id, "t2")).unwrap();

        let summaries = housekeeper.list_with_counts().unwrap();
        assert_eq!(summaries[0].category.name, "Alerts");
        assert_eq!(summaries[0].post_count, 0);
        assert_eq!(summaries[1].post_count, 2);
        assert_eq!(housekeeper.empty_categories(&[]).unwrap().len(), 1);
    }
}
