//! Comment moderation pipeline
//!
//! Comments are stored PENDING the moment they are submitted. Analyzer
//! results arrive later and are merged with an optimistic compare on
//! `updatedAt`, so a moderator decision made in between is never lost.

use super::builder::NewComment;
use super::model::{BlogComment, CommentAuthor, CommentStatus};
use super::moderation::{AnalysisOutcome, ModerationPolicy};
use super::tree::{build_tree, CommentNode, ThreadView, TreeOptions};
use super::validator::CommentValidator;
use crate::analysis::AnalysisReport;
use crate::config::{Config, ThreadConfig};
use crate::error::{ErrorKind, QuillError, Result};
use crate::store::BlogStore;
use crate::types::{AuthorId, CommentId, PostId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Attempts for a read-modify-write before giving up on a contended comment
pub const MAX_WRITE_ATTEMPTS: usize = 5;

/// Per-post comment counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub flagged: usize,
    pub analyzed: usize,
}

/// Submission, analysis merge, moderation and threading for comments
pub struct ModerationPipeline {
    store: Arc<dyn BlogStore>,
    policy: ModerationPolicy,
    validator: CommentValidator,
    threads: ThreadConfig,
}

impl ModerationPipeline {
    /// Create a pipeline over `store`
    pub fn new(store: Arc<dyn BlogStore>, config: &Config) -> Self {
        Self {
            store,
            policy: ModerationPolicy::from_config(&config.moderation),
            validator: CommentValidator::with_max_length(config.moderation.max_comment_length),
            threads: config.threads.clone(),
        }
    }

    pub fn policy(&self) -> &ModerationPolicy {
        &self.policy
    }

    /// Store a new PENDING comment with every moderation field unset.
    ///
    /// The post must be publicly visible and accept comments. A reply must
    /// point at a comment on the same post.
    pub fn submit_comment(&self, new: NewComment, now: DateTime<Utc>) -> Result<BlogComment> {
        let content = self.validator.validate_content(&new.content)?.to_string();
        self.validator.validate_author(&new.author)?;

        let post = self.store.get_post(&new.post_id)?;
        if !post.is_publicly_visible(now) {
            return Err(QuillError::PostNotFound(new.post_id.to_string()));
        }
        if !post.allow_comments {
            return Err(QuillError::Validation(
                "Comments are disabled for this post".to_string(),
            ));
        }

        if let Some(parent_id) = &new.parent_id {
            let parent = self.store.get_comment(parent_id)?;
            if parent.post_id != post.id {
                return Err(QuillError::Validation(format!(
                    "Comment {} belongs to a different post",
                    parent_id
                )));
            }
        }

        let mut comment = BlogComment::new(post.id, String::new(), content);
        match new.author {
            CommentAuthor::Registered(author_id) => {
                let author = self
                    .store
                    .find_author(&author_id)?
                    .ok_or_else(|| QuillError::AuthorNotFound(author_id.to_string()))?;
                comment.author_name = author.display_name().to_string();
                comment.author_email = author.email.clone();
                comment.author_id = Some(author_id);
            }
            CommentAuthor::Guest { name, email } => {
                comment.author_name = name.trim().to_string();
                comment.author_email = email
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty());
            }
        }
        comment.parent_id = new.parent_id;
        comment.created_at = now;
        comment.updated_at = now;

        self.store.insert_comment(&comment)?;
        tracing::info!("Comment {} submitted on post {}", comment.id, post.slug);
        Ok(comment)
    }

    /// Merge an analyzer report into a stored comment.
    ///
    /// Out-of-range scores are rejected before anything is read. Reports not
    /// strictly newer than the stored analysis are ignored, which makes
    /// re-delivery idempotent.
    pub fn apply_analysis(
        &self,
        id: &CommentId,
        report: &AnalysisReport,
        analyzed_at: DateTime<Utc>,
    ) -> Result<AnalysisOutcome> {
        report.validate()?;

        let mut outcome = AnalysisOutcome::Stale;
        let policy = &self.policy;
        self.update_comment(id, analyzed_at, |comment| {
            outcome = policy.apply(comment, report, analyzed_at)?;
            if outcome == AnalysisOutcome::Stale {
                return Ok(false);
            }
            if let Some(status) = policy.disposition(comment) {
                tracing::info!(
                    "Comment {} auto-{} by flagged-comment policy",
                    comment.id,
                    status.to_string().to_lowercase()
                );
                comment.set_status(status);
            }
            outcome = AnalysisOutcome::Applied {
                auto_flagged: comment.auto_flagged,
                status: comment.status,
            };
            Ok(true)
        })?;

        if outcome == AnalysisOutcome::Stale {
            tracing::debug!("Discarded stale analysis for comment {}", id);
        }
        Ok(outcome)
    }

    /// Settle a PENDING comment as APPROVED or REJECTED
    pub fn moderate(
        &self,
        id: &CommentId,
        status: CommentStatus,
        now: DateTime<Utc>,
    ) -> Result<BlogComment> {
        if !status.is_settled() {
            return Err(QuillError::Validation(
                "A comment can only be moderated to APPROVED or REJECTED".to_string(),
            ));
        }

        self.update_comment(id, now, |comment| {
            if comment.status.is_settled() {
                return Err(QuillError::Validation(format!(
                    "Comment {} is already {}; use an override to change it",
                    comment.id, comment.status
                )));
            }
            comment.set_status(status);
            Ok(true)
        })?;

        tracing::info!("Comment {} moderated to {}", id, status);
        self.store.get_comment(id)
    }

    /// Set any status, settled comments included
    pub fn override_status(
        &self,
        id: &CommentId,
        status: CommentStatus,
        now: DateTime<Utc>,
    ) -> Result<BlogComment> {
        let mut previous = status;
        self.update_comment(id, now, |comment| {
            previous = comment.status;
            comment.set_status(status);
            Ok(true)
        })?;

        tracing::info!("Comment {} overridden from {} to {}", id, previous, status);
        self.store.get_comment(id)
    }

    /// Post an APPROVED reply on behalf of a registered author.
    ///
    /// The reply inherits the parent's language, and a PENDING parent is
    /// approved along with it.
    pub fn reply_as_moderator(
        &self,
        parent_id: &CommentId,
        author_id: &AuthorId,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<BlogComment> {
        let content = self.validator.validate_content(content)?;
        let parent = self.store.get_comment(parent_id)?;
        let post = self.store.get_post(&parent.post_id)?;
        if !post.allow_comments {
            return Err(QuillError::Validation(
                "Comments are disabled for this post".to_string(),
            ));
        }
        let author = self
            .store
            .find_author(author_id)?
            .ok_or_else(|| QuillError::AuthorNotFound(author_id.to_string()))?;

        let mut reply = BlogComment::new(post.id, author.display_name(), content);
        reply.author_id = Some(author.id.clone());
        reply.author_email = author.email.clone();
        reply.status = CommentStatus::Approved;
        reply.language_code = parent.language_code.clone();
        reply.parent_id = Some(parent.id);
        reply.created_at = now;
        reply.updated_at = now;
        self.store.insert_comment(&reply)?;

        if parent.status == CommentStatus::Pending {
            self.update_comment(parent_id, now, |comment| {
                if comment.status != CommentStatus::Pending {
                    return Ok(false);
                }
                comment.set_status(CommentStatus::Approved);
                Ok(true)
            })?;
            tracing::info!("Comment {} approved by moderator reply", parent_id);
        }

        Ok(reply)
    }

    /// Reply forest of a post for the given audience
    pub fn thread(&self, post_id: &PostId, view: ThreadView) -> Result<Vec<CommentNode>> {
        self.store.get_post(post_id)?;
        let comments = self.store.list_comments_for_post(post_id)?;
        let options = TreeOptions::for_view(&self.threads, view);

        build_tree(&comments, &options).map_err(|e| {
            if e.kind() == ErrorKind::DataIntegrity {
                tracing::error!("Thread for post {} is corrupt: {}", post_id, e);
            }
            e
        })
    }

    /// PENDING comments, flagged first, then oldest first
    pub fn moderation_queue(&self) -> Result<Vec<BlogComment>> {
        let mut queue = self.store.list_comments_by_status(CommentStatus::Pending)?;
        queue.sort_by(|a, b| {
            b.auto_flagged
                .cmp(&a.auto_flagged)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(queue)
    }

    /// Comment counts for a post
    pub fn stats(&self, post_id: &PostId) -> Result<CommentStats> {
        let comments = self.store.list_comments_for_post(post_id)?;
        let mut stats = CommentStats {
            total: comments.len(),
            ..Default::default()
        };
        for comment in &comments {
            match comment.status {
                CommentStatus::Pending => stats.pending += 1,
                CommentStatus::Approved => stats.approved += 1,
                CommentStatus::Rejected => stats.rejected += 1,
            }
            if comment.auto_flagged {
                stats.flagged += 1;
            }
            if comment.is_analyzed() {
                stats.analyzed += 1;
            }
        }
        Ok(stats)
    }

    /// Read-modify-write a comment under the `updatedAt` guard.
    ///
    /// `change` returns whether it modified the comment; nothing is written
    /// otherwise. Lost races are retried from a fresh read.
    fn update_comment<F>(&self, id: &CommentId, now: DateTime<Utc>, mut change: F) -> Result<()>
    where
        F: FnMut(&mut BlogComment) -> Result<bool>,
    {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut comment = self.store.get_comment(id)?;
            let expected = comment.updated_at;

            if !change(&mut comment)? {
                return Ok(());
            }
            comment.touch(now);

            match self.store.replace_comment(&comment, expected) {
                Ok(()) => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Conflict => {
                    tracing::warn!(
                        "Write conflict on comment {} (attempt {}/{}), retrying",
                        id,
                        attempt,
                        MAX_WRITE_ATTEMPTS
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(QuillError::Conflict(format!(
            "comment {} kept changing; gave up after {} attempts",
            id, MAX_WRITE_ATTEMPTS
        )))
    }
}
