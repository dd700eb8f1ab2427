//! Out-of-band analysis of submitted comments
//!
//! Each comment is analyzed on its own tokio task. Analyzer calls are bounded
//! by a timeout; transient failures (timeouts, connection trouble, write
//! conflicts) are retried with exponential backoff. A comment whose analysis
//! never succeeds simply stays PENDING and unflagged.

use super::TextAnalyzer;
use crate::comment::{AnalysisOutcome, BlogComment, CommentStatus, ModerationPipeline};
use crate::config::AnalysisConfig;
use crate::error::{ErrorKind, QuillError, Result};
use crate::types::CommentId;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// How a dispatched analysis ended
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Scores were written to the comment
    Applied {
        attempts: u32,
        auto_flagged: bool,
        status: CommentStatus,
    },
    /// A newer analysis was already stored
    Stale { attempts: u32 },
    /// A non-retryable error ended the dispatch
    Rejected { kind: ErrorKind, reason: String },
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last_error: String },
}

/// Runs a [`TextAnalyzer`] against comments and merges the results
pub struct AnalysisDispatcher {
    analyzer: Arc<dyn TextAnalyzer>,
    pipeline: Arc<ModerationPipeline>,
    config: AnalysisConfig,
}

impl AnalysisDispatcher {
    pub fn new(
        analyzer: Arc<dyn TextAnalyzer>,
        pipeline: Arc<ModerationPipeline>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            analyzer,
            pipeline,
            config: config.clone(),
        }
    }

    /// Analyze `comment` on a background task. Must be called within a tokio runtime.
    pub fn spawn(self: &Arc<Self>, comment: &BlogComment) -> JoinHandle<DispatchOutcome> {
        let dispatcher = Arc::clone(self);
        let id = comment.id;
        let text = comment.content.clone();
        let hint = comment.language_code.clone();

        tokio::spawn(async move { dispatcher.analyze_comment(id, &text, hint.as_deref()).await })
    }

    /// Analyze `text` and merge the result into comment `id`, retrying
    /// transient failures
    pub async fn analyze_comment(
        &self,
        id: CommentId,
        text: &str,
        language_hint: Option<&str>,
    ) -> DispatchOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(&id, text, language_hint).await {
                Ok(AnalysisOutcome::Applied {
                    auto_flagged,
                    status,
                }) => {
                    tracing::debug!(
                        "Analysis of comment {} applied by '{}' on attempt {}",
                        id,
                        self.analyzer.name(),
                        attempt
                    );
                    return DispatchOutcome::Applied {
                        attempts: attempt,
                        auto_flagged,
                        status,
                    };
                }
                Ok(AnalysisOutcome::Stale) => return DispatchOutcome::Stale { attempts: attempt },
                Err(e) if e.is_retryable() => {
                    tracing::warn!(
                        "Analysis of comment {} failed (attempt {}/{}): {}",
                        id,
                        attempt,
                        max_attempts,
                        e
                    );
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
                Err(e) => {
                    tracing::warn!("Analysis of comment {} abandoned: {}", id, e);
                    return DispatchOutcome::Rejected {
                        kind: e.kind(),
                        reason: e.to_string(),
                    };
                }
            }
        }

        tracing::error!(
            "Giving up on analysis of comment {} after {} attempts; it stays pending",
            id,
            max_attempts
        );
        DispatchOutcome::Exhausted {
            attempts: max_attempts,
            last_error,
        }
    }

    async fn attempt(
        &self,
        id: &CommentId,
        text: &str,
        language_hint: Option<&str>,
    ) -> Result<AnalysisOutcome> {
        let limit = Duration::from_millis(self.config.timeout_ms);
        let report = match tokio::time::timeout(limit, self.analyzer.analyze(text, language_hint))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(QuillError::Transient(format!(
                    "analyzer '{}' timed out after {}ms",
                    self.analyzer.name(),
                    self.config.timeout_ms
                )))
            }
        };

        self.pipeline.apply_analysis(id, &report, Utc::now())
    }

    /// Delay before retry number `attempt`: doubling from the initial
    /// backoff, capped at the maximum
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .config
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.config.max_backoff_ms);
        Duration::from_millis(millis)
    }
}
