//! Builder for comment submissions

use super::model::CommentAuthor;
use crate::error::{QuillError, Result};
use crate::types::{AuthorId, CommentId, PostId};

/// A reader comment awaiting submission
#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub post_id: PostId,
    pub author: CommentAuthor,
    pub content: String,
    pub parent_id: Option<CommentId>,
}

/// Builder for creating comment submissions with fluent API
pub struct CommentBuilder {
    post_id: PostId,
    registered: Option<AuthorId>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    content: Option<String>,
    parent_id: Option<CommentId>,
}

impl CommentBuilder {
    /// Create a new builder for a comment on `post_id`
    pub fn new(post_id: PostId) -> Self {
        Self {
            post_id,
            registered: None,
            guest_name: None,
            guest_email: None,
            content: None,
            parent_id: None,
        }
    }

    /// Set the comment content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Comment as a registered author
    pub fn author(mut self, id: impl Into<String>) -> Self {
        self.registered = Some(AuthorId::from_string(id));
        self
    }

    /// Comment as a guest
    pub fn guest(mut self, name: impl Into<String>) -> Self {
        self.guest_name = Some(name.into());
        self
    }

    /// Guest email address
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.guest_email = Some(email.into());
        self
    }

    /// Reply to an existing comment
    pub fn reply_to(mut self, parent_id: CommentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Build the submission
    pub fn build(self) -> Result<NewComment> {
        let content = self.content.ok_or_else(|| {
            QuillError::Validation("Comment content is required".to_string())
        })?;

        let author = match (self.registered, self.guest_name) {
            (Some(id), None) => CommentAuthor::Registered(id),
            (None, Some(name)) => CommentAuthor::Guest {
                name,
                email: self.guest_email,
            },
            (Some(_), Some(_)) => {
                return Err(QuillError::Validation(
                    "A comment has either a registered author or a guest name, not both"
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(QuillError::Validation(
                    "Comment author is required".to_string(),
                ))
            }
        };

        Ok(NewComment {
            post_id: self.post_id,
            author,
            content,
            parent_id: self.parent_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_guest() {
        let post_id = PostId::new();
        let comment = CommentBuilder::new(post_id)
            .guest("Sam")
            .email("sam@example.com")
            .content("Helpful, thanks")
            .build()
            .unwrap();

        assert_eq!(comment.post_id, post_id);
        assert_eq!(
            comment.author,
            CommentAuthor::Guest {
                name: "Sam".to_string(),
                email: Some("sam@example.com".to_string()),
            }
        );
        assert!(comment.parent_id.is_none());
    }

    #[test]
    fn test_builder_registered_reply() {
        let parent = CommentId::new();
        let comment = CommentBuilder::new(PostId::new())
            .author("u-42")
            .content("Agreed")
            .reply_to(parent)
            .build()
            .unwrap();

        assert_eq!(comment.author, CommentAuthor::registered("u-42"));
        assert_eq!(comment.parent_id, Some(parent));
    }

    #[test]
    fn test_builder_requires_content_and_author() {
        assert!(CommentBuilder::new(PostId::new()).guest("Sam").build().is_err());
        assert!(CommentBuilder::new(PostId::new()).content("hi").build().is_err());
        assert!(CommentBuilder::new(PostId::new())
            .author("u1")
            .guest("Sam")
            .content("hi")
            .build()
            .is_err());
    }
}
