//! Auto-flagging rules and the flagged-comment disposition policy

use super::model::{BlogComment, CommentStatus};
use crate::analysis::AnalysisReport;
use crate::config::{FlaggedPolicy, ModerationConfig};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of applying an analyzer report to a comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Analysis fields were written
    Applied {
        auto_flagged: bool,
        status: CommentStatus,
    },
    /// The stored analysis is as new or newer; nothing changed
    Stale,
}

/// Thresholds and disposition for analyzer results
#[derive(Debug, Clone)]
pub struct ModerationPolicy {
    pub toxicity_threshold: f64,
    pub spam_threshold: f64,
    pub flagged_policy: FlaggedPolicy,
}

impl ModerationPolicy {
    pub fn from_config(config: &ModerationConfig) -> Self {
        Self {
            toxicity_threshold: config.toxicity_threshold,
            spam_threshold: config.spam_threshold,
            flagged_policy: config.flagged_policy,
        }
    }

    /// Whether a report crosses either threshold (inclusive)
    pub fn is_flagged(&self, report: &AnalysisReport) -> bool {
        report.toxicity >= self.toxicity_threshold || report.spam >= self.spam_threshold
    }

    /// Write the analysis fields of `report` onto `comment`.
    ///
    /// Leaves the comment untouched when its recorded `analyzed_at` is not
    /// strictly older than `analyzed_at`. Never changes `status`; see
    /// [`ModerationPolicy::disposition`]. An approved comment keeps the new
    /// scores but is never flagged.
    pub fn apply(
        &self,
        comment: &mut BlogComment,
        report: &AnalysisReport,
        analyzed_at: DateTime<Utc>,
    ) -> Result<AnalysisOutcome> {
        report.validate()?;

        if let Some(previous) = comment.analyzed_at {
            if previous >= analyzed_at {
                return Ok(AnalysisOutcome::Stale);
            }
        }

        comment.toxicity_score = Some(report.toxicity);
        comment.spam_score = Some(report.spam);
        comment.moderation_tags = report.tags.clone();
        if let Some(language) = &report.language {
            comment.language_code = Some(language.clone());
        }
        comment.analyzed_at = Some(analyzed_at);
        comment.auto_flagged =
            self.is_flagged(report) && comment.status != CommentStatus::Approved;

        Ok(AnalysisOutcome::Applied {
            auto_flagged: comment.auto_flagged,
            status: comment.status,
        })
    }

    /// Status the host policy assigns to `comment`, if it changes anything.
    ///
    /// Only pending, flagged comments are affected, and only under
    /// [`FlaggedPolicy::Reject`].
    pub fn disposition(&self, comment: &BlogComment) -> Option<CommentStatus> {
        match self.flagged_policy {
            FlaggedPolicy::Reject
                if comment.auto_flagged && comment.status == CommentStatus::Pending =>
            {
                Some(CommentStatus::Rejected)
            }
            _ => None,
        }
    }
}

impl Default for ModerationPolicy {
    fn default() -> Self {
        Self::from_config(&ModerationConfig::default())
    }
}
