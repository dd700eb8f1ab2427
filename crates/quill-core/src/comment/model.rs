//! Comment data models

use crate::types::{next_revision, AuthorId, CommentId, PostId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Moderation state of a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommentStatus {
    /// Awaiting a decision, the initial state
    #[default]
    Pending,
    /// Visible to readers
    Approved,
    /// Hidden from readers, kept in storage
    Rejected,
}

impl CommentStatus {
    /// Parse from user input (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(CommentStatus::Pending),
            "approved" | "approve" => Some(CommentStatus::Approved),
            "rejected" | "reject" => Some(CommentStatus::Rejected),
            _ => None,
        }
    }

    /// Whether the comment has left the PENDING state
    pub fn is_settled(&self) -> bool {
        !matches!(self, CommentStatus::Pending)
    }
}

impl std::fmt::Display for CommentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommentStatus::Pending => write!(f, "PENDING"),
            CommentStatus::Approved => write!(f, "APPROVED"),
            CommentStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Who wrote a comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentAuthor {
    /// A user known to the author directory
    Registered(AuthorId),
    /// An anonymous reader
    Guest { name: String, email: Option<String> },
}

impl CommentAuthor {
    pub fn guest(name: impl Into<String>) -> Self {
        CommentAuthor::Guest {
            name: name.into(),
            email: None,
        }
    }

    pub fn registered(id: impl Into<String>) -> Self {
        CommentAuthor::Registered(AuthorId::from_string(id))
    }
}

/// A reader comment as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogComment {
    pub id: CommentId,
    pub post_id: PostId,
    #[serde(default)]
    pub author_id: Option<AuthorId>,
    pub author_name: String,
    #[serde(default)]
    pub author_email: Option<String>,
    pub content: String,
    pub status: CommentStatus,
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub toxicity_score: Option<f64>,
    #[serde(default)]
    pub spam_score: Option<f64>,
    #[serde(default)]
    pub auto_flagged: bool,
    #[serde(default)]
    pub moderation_tags: Vec<String>,
    #[serde(default)]
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parent_id: Option<CommentId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogComment {
    /// Create a PENDING comment with every moderation field unset
    pub fn new(post_id: PostId, author_name: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CommentId::new(),
            post_id,
            author_id: None,
            author_name: author_name.into(),
            author_email: None,
            content: content.into(),
            status: CommentStatus::Pending,
            language_code: None,
            toxicity_score: None,
            spam_score: None,
            auto_flagged: false,
            moderation_tags: Vec::new(),
            analyzed_at: None,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether an analyzer result has been recorded
    pub fn is_analyzed(&self) -> bool {
        self.analyzed_at.is_some()
    }

    /// Check that scores and `analyzed_at` are set together
    pub fn has_consistent_analysis(&self) -> bool {
        let scored = self.toxicity_score.is_some() && self.spam_score.is_some();
        let unscored = self.toxicity_score.is_none() && self.spam_score.is_none();
        (self.analyzed_at.is_some() && scored) || (self.analyzed_at.is_none() && unscored)
    }

    /// Advance `updated_at` to `now`, strictly past the previous value
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = next_revision(self.updated_at, now);
    }

    /// Move to `status`; approving clears the auto-flag
    pub fn set_status(&mut self, status: CommentStatus) {
        self.status = status;
        if status == CommentStatus::Approved {
            self.auto_flagged = false;
        }
    }
}
