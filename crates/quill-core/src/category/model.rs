//! Category data models

use crate::types::CategoryId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A taxonomy entry posts can be filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub id: CategoryId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl BlogCategory {
    /// Create a category with a trimmed name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into().trim().to_string(),
            created_at: Utc::now(),
        }
    }
}

/// A category with the number of posts filed under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: BlogCategory,
    pub post_count: usize,
}
