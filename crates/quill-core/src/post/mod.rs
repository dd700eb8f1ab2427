//! Blog posts and publication scheduling

pub mod excerpt;
pub mod manager;
pub mod model;
pub mod scheduler;

pub use excerpt::derive_excerpt;
pub use manager::{PostManager, UpsertKind};
pub use model::{BlogPost, PostDraft, PostFilter, PostStatus};
pub use scheduler::{
    compute_reading_minutes, parse_publish_date, resolve_published_at, PublicationPlan,
    PublicationScheduler,
};
