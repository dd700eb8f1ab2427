//! Comment text analysis
//!
//! Analyzers score comment text for toxicity and spam. They are external
//! collaborators that may be slow or fail, so the core only ever calls them
//! through [`AnalysisDispatcher`], which runs them off the request path.

pub mod dispatcher;
pub mod keyword;

use crate::error::{QuillError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use dispatcher::{AnalysisDispatcher, DispatchOutcome};
pub use keyword::KeywordAnalyzer;

/// Scores and annotations produced for one piece of text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub toxicity: f64,
    pub spam: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl AnalysisReport {
    pub fn new(toxicity: f64, spam: f64) -> Self {
        Self {
            toxicity,
            spam,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Reject scores outside `[0, 1]`, NaN included
    pub fn validate(&self) -> Result<()> {
        for (label, score) in [("toxicity", self.toxicity), ("spam", self.spam)] {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(QuillError::Validation(format!(
                    "{} score {} is outside [0, 1]",
                    label, score
                )));
            }
        }
        Ok(())
    }
}

/// Text analyzer trait - all scoring backends implement this
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Analyzer identifier used in logs
    fn name(&self) -> &'static str;

    /// Score `text`.
    ///
    /// Failures that may succeed on a later attempt must be reported as
    /// [`QuillError::Transient`] so the dispatcher retries them.
    async fn analyze(&self, text: &str, language_hint: Option<&str>) -> Result<AnalysisReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_bounds() {
        assert!(AnalysisReport::new(0.0, 1.0).validate().is_ok());
        assert!(AnalysisReport::new(0.8, 0.8).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        for report in [
            AnalysisReport::new(-0.01, 0.0),
            AnalysisReport::new(0.0, 1.5),
            AnalysisReport::new(f64::NAN, 0.0),
            AnalysisReport::new(0.0, f64::INFINITY),
        ] {
            assert!(matches!(report.validate(), Err(QuillError::Validation(_))));
        }
    }
}
