//! Publication scheduling: reading time and effective publish dates

use super::model::PostStatus;
use crate::config::{PublicationConfig, MAX_SCHEDULE_MINUTES};
use crate::error::{QuillError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Derived publication fields, always written to a post together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicationPlan {
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub reading_minutes: u32,
}

/// Resolves publish timestamps and reading time for posts
#[derive(Debug, Clone)]
pub struct PublicationScheduler {
    words_per_minute: usize,
    schedule_lead: Duration,
    stale_schedule_bump: Duration,
}

impl PublicationScheduler {
    /// Create a scheduler from configuration
    pub fn new(config: &PublicationConfig) -> Self {
        Self {
            words_per_minute: config.words_per_minute.max(1),
            schedule_lead: bounded_minutes(config.schedule_lead_minutes),
            stale_schedule_bump: bounded_minutes(config.stale_schedule_bump_minutes),
        }
    }

    /// Reading time in whole minutes, never below one.
    ///
    /// Words are maximal whitespace-delimited tokens; the quotient is rounded
    /// half up.
    pub fn compute_reading_minutes(&self, content: &str) -> u32 {
        let words = content.split_whitespace().count();
        let minutes = (words + self.words_per_minute / 2) / self.words_per_minute;
        u32::try_from(minutes).unwrap_or(u32::MAX).max(1)
    }

    /// Effective `publishedAt` for a post entering `status` at `now`.
    ///
    /// Drafts never carry a date. Scheduled posts default to the configured
    /// lead time, and a requested date at or before `now` is pushed forward
    /// by the stale-schedule bump so the post never lands in the past.
    pub fn resolve_published_at(
        &self,
        status: PostStatus,
        requested: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>> {
        match status {
            PostStatus::Draft => Ok(None),
            PostStatus::Published => match requested {
                Some(raw) => parse_publish_date(raw).map(Some),
                None => Ok(Some(now)),
            },
            PostStatus::Scheduled => {
                let resolved = match requested {
                    Some(raw) => parse_publish_date(raw)?,
                    None => offset(now, self.schedule_lead)?,
                };
                if resolved <= now {
                    tracing::debug!(
                        "Requested schedule {} is not after {}, bumping forward",
                        resolved,
                        now
                    );
                    offset(now, self.stale_schedule_bump).map(Some)
                } else {
                    Ok(Some(resolved))
                }
            }
        }
    }

    /// Resolve every derived publication field in one step
    pub fn plan(
        &self,
        status: PostStatus,
        requested: Option<&str>,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<PublicationPlan> {
        Ok(PublicationPlan {
            status,
            published_at: self.resolve_published_at(status, requested, now)?,
            reading_minutes: self.compute_reading_minutes(content),
        })
    }
}

/// Config minutes as a duration; unvalidated configs are clamped
fn bounded_minutes(minutes: i64) -> Duration {
    Duration::minutes(minutes.clamp(1, MAX_SCHEDULE_MINUTES))
}

fn offset(now: DateTime<Utc>, by: Duration) -> Result<DateTime<Utc>> {
    now.checked_add_signed(by).ok_or_else(|| {
        QuillError::Validation(format!("Publish date out of range: {} + {}", now, by))
    })
}

impl Default for PublicationScheduler {
    fn default() -> Self {
        Self::new(&PublicationConfig::default())
    }
}

/// Reading time with the default reading speed
pub fn compute_reading_minutes(content: &str) -> u32 {
    PublicationScheduler::default().compute_reading_minutes(content)
}

/// Publish date resolution with the default lead times
pub fn resolve_published_at(
    status: PostStatus,
    requested: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
    PublicationScheduler::default().resolve_published_at(status, requested, now)
}

/// Parse a caller-supplied date.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM[:SS]` / `YYYY-MM-DD HH:MM[:SS]`
/// (interpreted as UTC) and bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_publish_date(raw: &str) -> Result<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(QuillError::Validation(format!(
        "Invalid publish date: '{}'",
        raw
    )))
}
