//! Comment system module
//!
//! Handles comment submission, analysis merging, moderation and threading.

pub mod builder;
pub mod model;
pub mod moderation;
pub mod pipeline;
pub mod tree;
pub mod validator;

pub use builder::{CommentBuilder, NewComment};
pub use model::*;
pub use moderation::{AnalysisOutcome, ModerationPolicy};
pub use pipeline::{CommentStats, ModerationPipeline};
pub use tree::{build_tree, CommentNode, ThreadView, TreeOptions};
pub use validator::CommentValidator;
