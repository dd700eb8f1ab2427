//! End-to-end flows on the in-memory store: authoring, commenting,
//! analysis, moderation, threading and housekeeping.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use quill_core::analysis::{AnalysisDispatcher, AnalysisReport, DispatchOutcome, KeywordAnalyzer};
use quill_core::author::Author;
use quill_core::category::CategoryHousekeeper;
use quill_core::comment::{
    AnalysisOutcome, CommentBuilder, CommentStatus, ModerationPipeline, ThreadView,
};
use quill_core::config::{Config, FlaggedPolicy};
use quill_core::post::{PostDraft, PostFilter, PostManager, PostStatus, UpsertKind};
use quill_core::store::{BlogStore, CommentStore, MemoryStore, PostStore};
use quill_core::{AuthorId, ErrorKind};
use std::sync::Arc;

struct Blog {
    store: Arc<MemoryStore>,
    posts: PostManager,
    pipeline: Arc<ModerationPipeline>,
    config: Config,
}

fn blog_with(config: Config) -> Blog {
    let store = Arc::new(MemoryStore::new());
    store.register_author(Author::new("admin", "Site Team").with_email("team@example.com"));
    let shared: Arc<dyn BlogStore> = store.clone();
    Blog {
        posts: PostManager::new(shared.clone(), &config.publication),
        pipeline: Arc::new(ModerationPipeline::new(shared, &config)),
        store,
        config,
    }
}

fn blog() -> Blog {
    blog_with(Config::default())
}

fn published(blog: &Blog, title: &str) -> quill_core::post::BlogPost {
    let draft = PostDraft::new(
        title,
        "A short body for the reading time estimate.",
        AuthorId::from_string("admin"),
    )
    .status(PostStatus::Published);
    blog.posts.upsert(draft, Utc::now()).unwrap().0
}

#[test]
fn test_upsert_twice_keeps_one_post() {
    let blog = blog();
    let now = Utc::now();

    let (first, kind) = blog
        .posts
        .upsert(
            PostDraft::new("VPN Basics", "body", AuthorId::from_string("admin")).slug("vpn"),
            now,
        )
        .unwrap();
    assert_eq!(kind, UpsertKind::Created);

    let (second, kind) = blog
        .posts
        .upsert(
            PostDraft::new("VPN Basics, Revised", "body", AuthorId::from_string("admin"))
                .slug("vpn"),
            now + Duration::seconds(1),
        )
        .unwrap();
    assert_eq!(kind, UpsertKind::Updated);

    let posts = blog.store.list_posts().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(second.id, first.id);
    assert_eq!(second.created_at, first.created_at);
    assert_eq!(posts[0].title, "VPN Basics, Revised");
}

#[test]
fn test_scheduled_post_becomes_visible_after_publish_due() {
    let blog = blog();
    let now = Utc::now();
    let (post, _) = blog
        .posts
        .upsert(
            PostDraft::new("Later", "body", AuthorId::from_string("admin"))
                .status(PostStatus::Scheduled),
            now,
        )
        .unwrap();

    let published_at = post.published_at.unwrap();
    assert!(published_at > now + Duration::minutes(59));
    assert!(published_at < now + Duration::minutes(61));
    assert!(blog.posts.list_visible(&PostFilter::new(), now).unwrap().is_empty());

    let later = published_at + Duration::seconds(1);
    assert_eq!(blog.posts.publish_due(later).unwrap(), 1);
    let promoted = blog.posts.get_by_slug("later").unwrap();
    assert_eq!(promoted.status, PostStatus::Published);
    assert_eq!(promoted.published_at, Some(published_at));
    assert_eq!(blog.posts.list_visible(&PostFilter::new(), later).unwrap().len(), 1);
}

#[test]
fn test_comment_lifecycle() {
    let blog = blog();
    let post = published(&blog, "Hello");
    let now = Utc::now();

    let comment = blog
        .pipeline
        .submit_comment(
            CommentBuilder::new(post.id)
                .guest("Sam")
                .content("  Great write-up  ")
                .build()
                .unwrap(),
            now,
        )
        .unwrap();

    // stored and readable before any analysis
    let stored = blog.store.get_comment(&comment.id).unwrap();
    assert_eq!(stored.status, CommentStatus::Pending);
    assert_eq!(stored.content, "Great write-up");
    assert!(stored.toxicity_score.is_none());
    assert!(stored.analyzed_at.is_none());
    assert!(!stored.auto_flagged);

    let t1 = now + Duration::seconds(5);
    let outcome = blog
        .pipeline
        .apply_analysis(&comment.id, &AnalysisReport::new(0.9, 0.1), t1)
        .unwrap();
    assert_eq!(
        outcome,
        AnalysisOutcome::Applied {
            auto_flagged: true,
            status: CommentStatus::Pending
        }
    );

    // an older report arriving late changes nothing
    let outcome = blog
        .pipeline
        .apply_analysis(&comment.id, &AnalysisReport::new(0.1, 0.1), now)
        .unwrap();
    assert_eq!(outcome, AnalysisOutcome::Stale);
    let stored = blog.store.get_comment(&comment.id).unwrap();
    assert_eq!(stored.toxicity_score, Some(0.9));
    assert_eq!(stored.analyzed_at, Some(t1));

    let queue = blog.pipeline.moderation_queue().unwrap();
    assert_eq!(queue[0].id, comment.id);

    let approved = blog
        .pipeline
        .moderate(&comment.id, CommentStatus::Approved, t1 + Duration::seconds(1))
        .unwrap();
    assert_eq!(approved.status, CommentStatus::Approved);
    assert!(!approved.auto_flagged);
    assert!(blog.pipeline.moderation_queue().unwrap().is_empty());

    // settled comments only move through an override
    let err = blog
        .pipeline
        .moderate(&comment.id, CommentStatus::Rejected, t1 + Duration::seconds(2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_out_of_range_scores_are_not_persisted() {
    let blog = blog();
    let post = published(&blog, "Scores");
    let comment = blog
        .pipeline
        .submit_comment(
            CommentBuilder::new(post.id).guest("Ana").content("hi").build().unwrap(),
            Utc::now(),
        )
        .unwrap();

    let err = blog
        .pipeline
        .apply_analysis(&comment.id, &AnalysisReport::new(1.2, 0.0), Utc::now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!blog.store.get_comment(&comment.id).unwrap().is_analyzed());
}

#[test]
fn test_reject_policy_settles_flagged_comments() {
    let mut config = Config::default();
    config.moderation.flagged_policy = FlaggedPolicy::Reject;
    let blog = blog_with(config);
    let post = published(&blog, "Strict");

    let comment = blog
        .pipeline
        .submit_comment(
            CommentBuilder::new(post.id).guest("Spammer").content("buy now").build().unwrap(),
            Utc::now(),
        )
        .unwrap();
    let outcome = blog
        .pipeline
        .apply_analysis(&comment.id, &AnalysisReport::new(0.0, 0.8), Utc::now())
        .unwrap();

    assert_eq!(
        outcome,
        AnalysisOutcome::Applied {
            auto_flagged: true,
            status: CommentStatus::Rejected
        }
    );
}

#[test]
fn test_thread_views() {
    let blog = blog();
    let post = published(&blog, "Threads");
    let now = Utc::now();

    let submit = |content: &str, parent: Option<quill_core::CommentId>, offset: i64| {
        let mut builder = CommentBuilder::new(post.id).guest("Reader").content(content);
        if let Some(parent) = parent {
            builder = builder.reply_to(parent);
        }
        blog.pipeline
            .submit_comment(builder.build().unwrap(), now + Duration::seconds(offset))
            .unwrap()
    };

    let root = submit("root", None, 0);
    let reply = submit("reply", Some(root.id), 1);
    let rejected = submit("rude", Some(root.id), 2);
    blog.pipeline
        .moderate(&rejected.id, CommentStatus::Rejected, now + Duration::seconds(3))
        .unwrap();

    let public = blog.pipeline.thread(&post.id, ThreadView::Public).unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].comment.id, root.id);
    assert_eq!(public[0].replies.len(), 1);
    assert_eq!(public[0].replies[0].comment.id, reply.id);

    let moderator = blog.pipeline.thread(&post.id, ThreadView::Moderator).unwrap();
    assert_eq!(moderator[0].replies.len(), 2);
    // rejected comments stay in storage
    assert_eq!(blog.store.list_comments_for_post(&post.id).unwrap().len(), 3);
}

#[test]
fn test_moderator_reply_approves_parent() {
    let blog = blog();
    let post = published(&blog, "Replies");
    let now = Utc::now();
    let question = blog
        .pipeline
        .submit_comment(
            CommentBuilder::new(post.id).guest("Kim").content("How?").build().unwrap(),
            now,
        )
        .unwrap();

    let reply = blog
        .pipeline
        .reply_as_moderator(
            &question.id,
            &AuthorId::from_string("admin"),
            "Like this.",
            now + Duration::seconds(1),
        )
        .unwrap();

    assert_eq!(reply.status, CommentStatus::Approved);
    assert_eq!(reply.parent_id, Some(question.id));
    assert_eq!(reply.author_name, "Site Team");
    assert_eq!(
        blog.store.get_comment(&question.id).unwrap().status,
        CommentStatus::Approved
    );

    let stats = blog.pipeline.stats(&post.id).unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.approved, 2);
}

#[test]
fn test_housekeeping_keeps_used_and_excluded_categories() {
    let blog = blog();
    let housekeeper = CategoryHousekeeper::new(blog.store.clone(), &blog.config.housekeeping);
    let used = housekeeper.ensure_category("Networking").unwrap();
    housekeeper.ensure_category("Drafts").unwrap();
    housekeeper.ensure_category("Empty").unwrap();

    blog.posts
        .upsert(
            PostDraft::new("Routing", "body", AuthorId::from_string("admin")).category(used.id),
            Utc::now(),
        )
        .unwrap();

    let removed = housekeeper
        .prune_empty_categories(&["drafts".to_string()])
        .unwrap();
    assert_eq!(removed, 1);

    let mut names: Vec<String> = housekeeper
        .list_with_counts()
        .unwrap()
        .into_iter()
        .map(|s| s.category.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Drafts".to_string(), "Networking".to_string()]);
}

#[tokio::test]
async fn test_dispatcher_analyzes_submitted_comment() {
    let blog = blog();
    let post = published(&blog, "Async");
    let comment = blog
        .pipeline
        .submit_comment(
            CommentBuilder::new(post.id)
                .guest("Promo")
                .content("Click here to buy now: http://a.example http://b.example")
                .build()
                .unwrap(),
            Utc::now(),
        )
        .unwrap();

    let dispatcher = Arc::new(AnalysisDispatcher::new(
        Arc::new(KeywordAnalyzer::new()),
        blog.pipeline.clone(),
        &blog.config.analysis,
    ));
    let outcome = dispatcher.spawn(&comment).await.unwrap();

    assert!(matches!(outcome, DispatchOutcome::Applied { attempts: 1, .. }));
    let stored = blog.store.get_comment(&comment.id).unwrap();
    assert!(stored.is_analyzed());
    assert!(stored.spam_score.unwrap() > 0.0);
    assert_eq!(stored.status, CommentStatus::Pending);
}
