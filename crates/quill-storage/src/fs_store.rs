//! File system storage for blog records
//!
//! Layout under the base directory:
//!
//! ```text
//! posts/{id}.json
//! comments/{id}.json
//! categories/{id}.json
//! authors/{id}.json
//! ```
//!
//! Each file holds one record wrapped in a [`RecordFile`] envelope. Writes go
//! to a uniquely named dot-prefixed temp file first and are renamed into place.
//!
//! Every check-then-write sequence runs under an exclusive lock on
//! `{base}/.lock`, so separate handles and separate processes sharing a
//! directory see the same conflicts a single handle would.

use chrono::{DateTime, Utc};
use quill_core::author::Author;
use quill_core::category::BlogCategory;
use quill_core::comment::BlogComment;
use quill_core::error::{QuillError, Result};
use quill_core::post::BlogPost;
use quill_core::store::{AuthorDirectory, CategoryStore, CommentStore, PostStore};
use quill_core::types::{AuthorId, CategoryId, CommentId, PostId, Slug};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Current on-disk schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Lock file guarding writes, relative to the base directory
const LOCK_FILE: &str = ".lock";

/// On-disk envelope for a single record
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordFile<T> {
    pub schema_version: u32,
    pub record: T,
}

impl<T> RecordFile<T> {
    pub fn new(record: T) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            record,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Posts,
    Comments,
    Categories,
    Authors,
}

impl Table {
    const ALL: [Table; 4] = [Table::Posts, Table::Comments, Table::Categories, Table::Authors];

    fn dir_name(self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::Comments => "comments",
            Table::Categories => "categories",
            Table::Authors => "authors",
        }
    }
}

/// Exclusive hold on the store's lock file; released on drop
struct WriteGuard {
    file: fs::File,
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!("Failed to release store lock: {}", e);
        }
    }
}

/// File system based blog storage
pub struct FileSystemStore {
    /// Base directory for all tables
    base_dir: PathBuf,
}

impl FileSystemStore {
    /// Create a new file system store rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            base_dir: base_dir.into(),
        };

        store.ensure_dirs()?;
        Ok(store)
    }

    /// Create storage in the platform data directory (falls back to ~/.quill)
    pub fn default_location() -> Result<Self> {
        let base_dir = directories::ProjectDirs::from("com", "quill", "quill")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".quill")
            });

        Self::new(base_dir)
    }

    /// Get base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Add or replace an author in the directory
    pub fn register_author(&self, author: &Author) -> Result<()> {
        let key = author_key(&author.id).ok_or_else(|| {
            QuillError::Validation(format!(
                "Author id '{}' may only contain letters, digits, '-', '_', '.' and '@'",
                author.id
            ))
        })?;
        let _guard = self.lock()?;
        self.atomic_write(Table::Authors, &key, author)
    }

    /// List registered authors
    pub fn list_authors(&self) -> Result<Vec<Author>> {
        self.read_all(Table::Authors)
    }

    fn ensure_dirs(&self) -> Result<()> {
        for table in Table::ALL {
            let dir = self.table_dir(table);
            if !dir.exists() {
                fs::create_dir_all(&dir).map_err(|e| {
                    QuillError::Io(std::io::Error::new(
                        e.kind(),
                        format!("Failed to create {} directory: {}", table.dir_name(), e),
                    ))
                })?;
                debug!("Created directory: {:?}", dir);
            }
        }
        Ok(())
    }

    /// Block until this handle holds the store-wide write lock
    fn lock(&self) -> Result<WriteGuard> {
        let path = self.base_dir.join(LOCK_FILE);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| {
                QuillError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to open lock file {:?}: {}", path, e),
                ))
            })?;
        file.lock_exclusive().map_err(|e| {
            QuillError::Transient(format!("Failed to lock {:?}: {}", path, e))
        })?;
        Ok(WriteGuard { file })
    }

    fn table_dir(&self, table: Table) -> PathBuf {
        self.base_dir.join(table.dir_name())
    }

    fn record_path(&self, table: Table, key: &str) -> PathBuf {
        self.table_dir(table).join(format!("{}.json", key))
    }

    /// Write a record atomically (write to a unique temp file, then rename).
    /// The temp file is removed if anything fails before the rename.
    fn atomic_write<T: Serialize>(&self, table: Table, key: &str, record: &T) -> Result<()> {
        let final_path = self.record_path(table, key);

        let temp_file = NamedTempFile::new_in(self.table_dir(table)).map_err(|e| {
            QuillError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create temp file: {}", e),
            ))
        })?;
        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer_pretty(&mut writer, &RecordFile::new(record))?;
            writer.flush()?;
        }

        temp_file.persist(&final_path).map_err(|e| {
            QuillError::Io(std::io::Error::new(
                e.error.kind(),
                format!("Failed to rename temp file: {}", e.error),
            ))
        })?;

        debug!("Saved {} record {} to {:?}", table.dir_name(), key, final_path);
        Ok(())
    }

    fn read_file<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let file = fs::File::open(path)?;
        let envelope: RecordFile<T> = serde_json::from_reader(BufReader::new(file))?;
        if envelope.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(QuillError::DataIntegrity(format!(
                "{:?} has schema version {}, newer than supported {}",
                path, envelope.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(envelope.record)
    }

    fn read_record<T: DeserializeOwned>(&self, table: Table, key: &str) -> Result<Option<T>> {
        let path = self.record_path(table, key);
        match self.read_file(&path) {
            Ok(record) => Ok(Some(record)),
            Err(QuillError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.with_context(format!("Failed to read {:?}", path))),
        }
    }

    fn read_all<T: DeserializeOwned>(&self, table: Table) -> Result<Vec<T>> {
        let dir = self.table_dir(table);
        let entries = fs::read_dir(&dir).map_err(|e| {
            QuillError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read {} directory: {}", table.dir_name(), e),
            ))
        })?;

        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();

            // Skip non-json files and temp files
            if !path.extension().map(|e| e == "json").unwrap_or(false) {
                continue;
            }
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false)
            {
                continue;
            }

            match self.read_file(&path) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Failed to read record file {:?}: {}", path, e),
            }
        }

        Ok(records)
    }
}

/// File-name-safe key for an author id
fn author_key(id: &AuthorId) -> Option<String> {
    let raw = id.as_str();
    let safe = !raw.is_empty()
        && !raw.starts_with('.')
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'));
    safe.then(|| raw.to_string())
}

fn stale_write(kind: &str, id: impl std::fmt::Display) -> QuillError {
    QuillError::Conflict(format!("{} {} changed since it was read", kind, id))
}

impl PostStore for FileSystemStore {
    fn get_post(&self, id: &PostId) -> Result<BlogPost> {
        self.read_record(Table::Posts, &id.to_string())?
            .ok_or_else(|| QuillError::PostNotFound(id.to_string()))
    }

    fn find_post_by_slug(&self, slug: &Slug) -> Result<Option<BlogPost>> {
        Ok(self
            .read_all::<BlogPost>(Table::Posts)?
            .into_iter()
            .find(|p| &p.slug == slug))
    }

    fn list_posts(&self) -> Result<Vec<BlogPost>> {
        self.read_all(Table::Posts)
    }

    fn insert_post(&self, post: &BlogPost) -> Result<()> {
        let _guard = self.lock()?;
        let key = post.id.to_string();
        if self.record_path(Table::Posts, &key).exists() {
            return Err(QuillError::Conflict(format!("post {} already exists", post.id)));
        }
        if self.find_post_by_slug(&post.slug)?.is_some() {
            return Err(QuillError::Conflict(format!("slug '{}' is taken", post.slug)));
        }
        self.atomic_write(Table::Posts, &key, post)
    }

    fn replace_post(&self, post: &BlogPost, expected_updated_at: DateTime<Utc>) -> Result<()> {
        let _guard = self.lock()?;
        let current = self.get_post(&post.id)?;
        if current.updated_at != expected_updated_at {
            return Err(stale_write("post", post.id));
        }
        if let Some(other) = self.find_post_by_slug(&post.slug)? {
            if other.id != post.id {
                return Err(QuillError::Conflict(format!("slug '{}' is taken", post.slug)));
            }
        }
        self.atomic_write(Table::Posts, &post.id.to_string(), post)
    }
}

impl CommentStore for FileSystemStore {
    fn get_comment(&self, id: &CommentId) -> Result<BlogComment> {
        self.read_record(Table::Comments, &id.to_string())?
            .ok_or_else(|| QuillError::CommentNotFound(id.to_string()))
    }

    fn list_comments_for_post(&self, post_id: &PostId) -> Result<Vec<BlogComment>> {
        Ok(self
            .list_comments()?
            .into_iter()
            .filter(|c| &c.post_id == post_id)
            .collect())
    }

    fn list_comments(&self) -> Result<Vec<BlogComment>> {
        self.read_all(Table::Comments)
    }

    fn insert_comment(&self, comment: &BlogComment) -> Result<()> {
        let _guard = self.lock()?;
        let key = comment.id.to_string();
        if self.record_path(Table::Comments, &key).exists() {
            return Err(QuillError::Conflict(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        self.atomic_write(Table::Comments, &key, comment)
    }

    fn replace_comment(
        &self,
        comment: &BlogComment,
        expected_updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let _guard = self.lock()?;
        let current = self.get_comment(&comment.id)?;
        if current.updated_at != expected_updated_at {
            return Err(stale_write("comment", comment.id));
        }
        self.atomic_write(Table::Comments, &comment.id.to_string(), comment)
    }
}

impl CategoryStore for FileSystemStore {
    fn get_category(&self, id: &CategoryId) -> Result<BlogCategory> {
        self.read_record(Table::Categories, &id.to_string())?
            .ok_or_else(|| QuillError::CategoryNotFound(id.to_string()))
    }

    fn find_category_by_name(&self, name: &str) -> Result<Option<BlogCategory>> {
        Ok(self
            .list_categories()?
            .into_iter()
            .find(|c| c.name == name))
    }

    fn list_categories(&self) -> Result<Vec<BlogCategory>> {
        self.read_all(Table::Categories)
    }

    fn insert_category(&self, category: &BlogCategory) -> Result<()> {
        let _guard = self.lock()?;
        if self.find_category_by_name(&category.name)?.is_some() {
            return Err(QuillError::Conflict(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        self.atomic_write(Table::Categories, &category.id.to_string(), category)
    }

    fn delete_category(&self, id: &CategoryId) -> Result<()> {
        let _guard = self.lock()?;
        let path = self.record_path(Table::Categories, &id.to_string());

        if !path.exists() {
            return Err(QuillError::CategoryNotFound(id.to_string()));
        }

        fs::remove_file(&path).map_err(|e| {
            QuillError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to delete category file: {}", e),
            ))
        })?;

        debug!("Deleted category {} from {:?}", id, path);
        Ok(())
    }
}

impl AuthorDirectory for FileSystemStore {
    fn find_author(&self, id: &AuthorId) -> Result<Option<Author>> {
        match author_key(id) {
            Some(key) => self.read_record(Table::Authors, &key),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quill_core::config::PublicationConfig;
    use quill_core::post::{PostDraft, PostManager, PostStatus, UpsertKind};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn create_test_store() -> (FileSystemStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileSystemStore::new(temp_dir.path()).unwrap();
        (store, temp_dir)
    }

    fn create_test_post(slug: &str) -> BlogPost {
        let now = Utc::now();
        BlogPost {
            id: PostId::new(),
            slug: Slug::parse(slug).unwrap(),
            title: slug.to_string(),
            excerpt: Some("summary".to_string()),
            content: "content".to_string(),
            cover_image: None,
            category_id: None,
            tags: vec!["networking".to_string()],
            featured: false,
            allow_comments: true,
            reading_minutes: 1,
            status: PostStatus::Published,
            published_at: Some(now),
            is_deleted: false,
            author_id: AuthorId::from_string("admin"),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_store_creation() {
        let (store, _temp) = create_test_store();
        for table in Table::ALL {
            assert!(store.table_dir(table).exists());
        }
    }

    #[test]
    fn test_post_round_trip() {
        let (store, _temp) = create_test_store();
        let post = create_test_post("vpn-basics");
        store.insert_post(&post).unwrap();

        assert_eq!(store.get_post(&post.id).unwrap(), post);
        let found = store
            .find_post_by_slug(&Slug::parse("vpn-basics").unwrap())
            .unwrap();
        assert_eq!(found.map(|p| p.id), Some(post.id));
    }

    #[test]
    fn test_duplicate_slug_conflicts() {
        let (store, _temp) = create_test_store();
        store.insert_post(&create_test_post("same")).unwrap();
        assert!(matches!(
            store.insert_post(&create_test_post("same")),
            Err(QuillError::Conflict(_))
        ));
    }

    #[test]
    fn test_replace_guard() {
        let (store, _temp) = create_test_store();
        let post = create_test_post("guarded");
        store.insert_post(&post).unwrap();

        let mut update = post.clone();
        update.title = "Updated".to_string();
        update.touch(Utc::now());

        store.replace_post(&update, post.updated_at).unwrap();
        // the same expectation is now stale
        assert!(matches!(
            store.replace_post(&update, post.updated_at),
            Err(QuillError::Conflict(_))
        ));
        assert_eq!(store.get_post(&post.id).unwrap().title, "Updated");
    }

    #[test]
    fn test_comment_round_trip() {
        let (store, _temp) = create_test_store();
        let post = create_test_post("threads");
        let mut comment = BlogComment::new(post.id, "Sam", "Nice");
        comment.moderation_tags = vec!["links".to_string()];
        store.insert_comment(&comment).unwrap();

        assert_eq!(store.get_comment(&comment.id).unwrap(), comment);
        assert_eq!(store.list_comments_for_post(&post.id).unwrap().len(), 1);
        assert!(store.list_comments_for_post(&PostId::new()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_records() {
        let (store, _temp) = create_test_store();
        assert!(matches!(
            store.get_post(&PostId::new()),
            Err(QuillError::PostNotFound(_))
        ));
        assert!(matches!(
            store.get_comment(&CommentId::new()),
            Err(QuillError::CommentNotFound(_))
        ));
        assert!(matches!(
            store.delete_category(&CategoryId::new()),
            Err(QuillError::CategoryNotFound(_))
        ));
    }

    #[test]
    fn test_categories() {
        let (store, _temp) = create_test_store();
        let category = BlogCategory::new("Security");
        store.insert_category(&category).unwrap();
        assert!(store.insert_category(&BlogCategory::new("Security")).is_err());

        assert_eq!(
            store.find_category_by_name("Security").unwrap(),
            Some(category.clone())
        );
        store.delete_category(&category.id).unwrap();
        assert!(store.list_categories().unwrap().is_empty());
    }

    #[test]
    fn test_authors() {
        let (store, _temp) = create_test_store();
        let author = Author::new("admin", "Site Team");
        store.register_author(&author).unwrap();

        assert_eq!(
            store.find_author(&AuthorId::from_string("admin")).unwrap(),
            Some(author)
        );
        assert_eq!(store.list_authors().unwrap().len(), 1);
        assert!(store
            .find_author(&AuthorId::from_string("../escape"))
            .unwrap()
            .is_none());
        assert!(store.register_author(&Author::new("a/b", "Bad")).is_err());
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let (store, _temp) = create_test_store();
        let post = create_test_post("atomic");
        store.insert_post(&post).unwrap();

        let key = post.id.to_string();
        let leftovers: Vec<_> = fs::read_dir(store.table_dir(Table::Posts))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());

        let content = fs::read_to_string(store.record_path(Table::Posts, &key)).unwrap();
        assert!(content.contains("schema_version"));
        assert!(content.contains("publishedAt"));
    }

    #[test]
    fn test_ignores_temp_and_foreign_files() {
        let (store, _temp) = create_test_store();
        let dir = store.table_dir(Table::Posts);
        fs::write(dir.join(".temp.json.tmp"), "{}").unwrap();
        fs::write(dir.join("readme.txt"), "test").unwrap();
        fs::write(dir.join("broken.json"), "not json").unwrap();

        assert!(store.list_posts().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_newer_schema() {
        let (store, _temp) = create_test_store();
        let post = create_test_post("future");
        let id = post.id;
        let path = store.record_path(Table::Posts, &id.to_string());
        let envelope = serde_json::json!({ "schema_version": 99, "record": post });
        fs::write(&path, envelope.to_string()).unwrap();

        assert!(store.get_post(&id).is_err());
    }

    #[test]
    fn test_separate_handles_never_duplicate_a_slug() {
        let temp = TempDir::new().unwrap();
        const WRITERS: usize = 4;

        for round in 0..10 {
            let slug = format!("race-{}", round);
            let barrier = Arc::new(Barrier::new(WRITERS));
            let handles: Vec<_> = (0..WRITERS)
                .map(|_| {
                    let dir = temp.path().to_path_buf();
                    let barrier = barrier.clone();
                    let post = create_test_post(&slug);
                    thread::spawn(move || {
                        let store = FileSystemStore::new(dir).unwrap();
                        barrier.wait();
                        store.insert_post(&post)
                    })
                })
                .collect();

            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let inserted = results.iter().filter(|r| r.is_ok()).count();
            assert_eq!(inserted, 1, "round {}", round);
            assert!(results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, QuillError::Conflict(_))));
        }

        let store = FileSystemStore::new(temp.path()).unwrap();
        assert_eq!(store.list_posts().unwrap().len(), 10);
    }

    #[test]
    fn test_concurrent_upserts_across_handles() {
        let temp = TempDir::new().unwrap();
        const WRITERS: usize = 4;
        let barrier = Arc::new(Barrier::new(WRITERS));

        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let dir = temp.path().to_path_buf();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let store = Arc::new(FileSystemStore::new(dir).unwrap());
                    store
                        .register_author(&Author::new("admin", "Site Team"))
                        .unwrap();
                    let manager = PostManager::new(store, &PublicationConfig::default());
                    barrier.wait();
                    let draft = PostDraft::new(
                        format!("Shared post {}", i),
                        "body",
                        AuthorId::from_string("admin"),
                    )
                    .slug("shared");
                    manager.upsert(draft, Utc::now()).map(|(_, kind)| kind)
                })
            })
            .collect();

        let kinds: Vec<UpsertKind> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();
        assert_eq!(kinds.iter().filter(|k| **k == UpsertKind::Created).count(), 1);

        let store = FileSystemStore::new(temp.path()).unwrap();
        let posts = store.list_posts().unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].slug.as_str(), "shared");
        assert_eq!(store.list_authors().unwrap().len(), 1);
    }
}
