//! Authoring identities resolved through the host's user directory

use crate::types::AuthorId;
use serde::{Deserialize, Serialize};

/// A registered user that can author posts and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Author {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: AuthorId::from_string(id),
            name: name.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name shown next to comments, falling back to the email address
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.as_deref().unwrap_or(self.id.as_str())
        } else {
            &self.name
        }
    }
}
