//! Comment command
//!
//! Submit comments, run the analyzer and work the moderation queue.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use quill_core::analysis::{AnalysisDispatcher, DispatchOutcome, KeywordAnalyzer};
use quill_core::comment::{
    BlogComment, CommentBuilder, CommentNode, CommentStatus, ModerationPipeline, ThreadView,
};
use quill_core::post::PostManager;
use quill_core::store::CommentStore;
use quill_core::{AuthorId, CommentId};
use std::sync::Arc;

use super::{print_json, Workspace};

/// Moderator decision on a pending comment
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Decision {
    Approve,
    Reject,
}

impl From<Decision> for CommentStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approve => CommentStatus::Approved,
            Decision::Reject => CommentStatus::Rejected,
        }
    }
}

/// Any comment status, for overrides
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for CommentStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => CommentStatus::Pending,
            StatusArg::Approved => CommentStatus::Approved,
            StatusArg::Rejected => CommentStatus::Rejected,
        }
    }
}

/// Comment subcommands
#[derive(Debug, Subcommand)]
pub enum CommentCommand {
    /// Submit a comment on a post
    Submit {
        /// Post slug
        post: String,

        /// Comment text
        #[arg(long)]
        content: String,

        /// Registered author ID
        #[arg(long, conflicts_with = "guest")]
        author: Option<String>,

        /// Guest display name
        #[arg(long)]
        guest: Option<String>,

        /// Guest email
        #[arg(long, requires = "guest")]
        email: Option<String>,

        /// Comment ID this replies to
        #[arg(long)]
        reply_to: Option<String>,

        /// Store the comment without running the analyzer
        #[arg(long)]
        no_analyze: bool,
    },

    /// Run the analyzer on comments
    Analyze {
        /// Comment IDs (default: every comment not yet analyzed)
        ids: Vec<String>,
    },

    /// Approve or reject a pending comment
    Moderate {
        /// Comment ID
        id: String,

        /// Decision
        #[arg(value_enum)]
        decision: Decision,
    },

    /// Force a comment into any status
    Override {
        /// Comment ID
        id: String,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Reply to a comment as a registered author (auto-approved)
    Reply {
        /// Comment ID to reply to
        id: String,

        /// Author ID from the author directory
        #[arg(long, short)]
        author: String,

        /// Reply text
        #[arg(long)]
        content: String,
    },

    /// Show the reply thread of a post
    Thread {
        /// Post slug
        post: String,

        /// Include every comment, rejected ones too
        #[arg(long)]
        moderator: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List pending comments, flagged ones first
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Comment counts for a post
    Stats {
        /// Post slug
        post: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute the comment command
pub fn execute(cmd: CommentCommand, workspace: &Workspace) -> Result<()> {
    let pipeline = Arc::new(ModerationPipeline::new(
        workspace.blog_store(),
        &workspace.config,
    ));
    let posts = PostManager::new(workspace.blog_store(), &workspace.config.publication);

    match cmd {
        CommentCommand::Submit {
            post,
            content,
            author,
            guest,
            email,
            reply_to,
            no_analyze,
        } => {
            let post = posts
                .get_by_slug(&post)
                .with_context(|| format!("Post '{}' not found", post))?;

            let mut builder = CommentBuilder::new(post.id).content(content);
            if let Some(id) = author {
                builder = builder.author(id);
            }
            if let Some(name) = guest {
                builder = builder.guest(name);
            }
            if let Some(email) = email {
                builder = builder.email(email);
            }
            if let Some(parent) = reply_to {
                builder = builder.reply_to(parse_id(&parent)?);
            }

            let comment = pipeline.submit_comment(builder.build()?, Utc::now())?;
            println!(
                "{} Comment {} submitted ({})",
                "✓".green(),
                comment.id.to_string().cyan(),
                comment.status
            );

            if !no_analyze {
                run_analysis(workspace, pipeline, vec![comment])?;
            }
            Ok(())
        }
        CommentCommand::Analyze { ids } => {
            let comments = if ids.is_empty() {
                workspace
                    .store
                    .list_comments()?
                    .into_iter()
                    .filter(|c| !c.is_analyzed())
                    .collect()
            } else {
                ids.iter()
                    .map(|raw| Ok(workspace.store.get_comment(&parse_id(raw)?)?))
                    .collect::<Result<Vec<_>>>()?
            };

            if comments.is_empty() {
                println!("Nothing to analyze.");
                return Ok(());
            }
            run_analysis(workspace, pipeline, comments)
        }
        CommentCommand::Moderate { id, decision } => {
            let comment = pipeline.moderate(&parse_id(&id)?, decision.into(), Utc::now())?;
            println!(
                "{} Comment {} is now {}",
                "✓".green(),
                comment.id,
                status_label(comment.status)
            );
            Ok(())
        }
        CommentCommand::Override { id, status } => {
            let comment =
                pipeline.override_status(&parse_id(&id)?, status.into(), Utc::now())?;
            println!(
                "{} Comment {} is now {}",
                "✓".green(),
                comment.id,
                status_label(comment.status)
            );
            Ok(())
        }
        CommentCommand::Reply {
            id,
            author,
            content,
        } => {
            let reply = pipeline.reply_as_moderator(
                &parse_id(&id)?,
                &AuthorId::from_string(author),
                &content,
                Utc::now(),
            )?;
            println!(
                "{} Reply {} posted by {}",
                "✓".green(),
                reply.id.to_string().cyan(),
                reply.author_name
            );
            Ok(())
        }
        CommentCommand::Thread {
            post,
            moderator,
            json,
        } => {
            let post = posts
                .get_by_slug(&post)
                .with_context(|| format!("Post '{}' not found", post))?;
            let view = if moderator {
                ThreadView::Moderator
            } else {
                ThreadView::Public
            };
            let roots = pipeline.thread(&post.id, view)?;

            if json {
                return print_json(&roots);
            }
            if roots.is_empty() {
                println!("No comments yet.");
                return Ok(());
            }
            println!("{}", post.title.bold().underline());
            println!();
            for node in &roots {
                print_node(node);
            }
            Ok(())
        }
        CommentCommand::Queue { json } => {
            let queue = pipeline.moderation_queue()?;
            if json {
                return print_json(&queue);
            }
            if queue.is_empty() {
                println!("Moderation queue is empty.");
                return Ok(());
            }

            println!("{}", "Moderation queue:".bold().underline());
            println!();
            for comment in &queue {
                print_queue_entry(comment);
            }
            Ok(())
        }
        CommentCommand::Stats { post, json } => {
            let post = posts
                .get_by_slug(&post)
                .with_context(|| format!("Post '{}' not found", post))?;
            let stats = pipeline.stats(&post.id)?;
            if json {
                return print_json(&stats);
            }
            println!("{}", post.title.bold());
            println!(
                "  {} total, {} pending, {} approved, {} rejected",
                stats.total,
                stats.pending.to_string().yellow(),
                stats.approved.to_string().green(),
                stats.rejected.to_string().red()
            );
            println!("  {} analyzed, {} flagged", stats.analyzed, stats.flagged);
            Ok(())
        }
    }
}

fn parse_id(raw: &str) -> Result<CommentId> {
    CommentId::from_string(raw.trim()).map_err(|e| anyhow!(e))
}

/// Analyze comments concurrently on a small runtime and report each outcome
fn run_analysis(
    workspace: &Workspace,
    pipeline: Arc<ModerationPipeline>,
    comments: Vec<BlogComment>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")?;

    let dispatcher = Arc::new(AnalysisDispatcher::new(
        Arc::new(KeywordAnalyzer::new()),
        pipeline,
        &workspace.config.analysis,
    ));

    let outcomes = runtime.block_on(async {
        let handles: Vec<_> = comments
            .iter()
            .map(|comment| (comment.id, dispatcher.spawn(comment)))
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let outcome = handle
                .await
                .map_err(|e| anyhow!("Analysis task for {} failed: {}", id, e))?;
            outcomes.push((id, outcome));
        }
        Ok::<_, anyhow::Error>(outcomes)
    })?;

    for (id, outcome) in outcomes {
        match outcome {
            DispatchOutcome::Applied {
                auto_flagged,
                status,
                ..
            } => {
                let flag = if auto_flagged {
                    "flagged".red().to_string()
                } else {
                    "clean".green().to_string()
                };
                println!("  {} analyzed: {} ({})", id, flag, status_label(status));
            }
            DispatchOutcome::Stale { .. } => {
                println!("  {} already had a newer analysis", id);
            }
            DispatchOutcome::Rejected { reason, .. } => {
                eprintln!("  {} {} analysis rejected: {}", "⚠".yellow(), id, reason);
            }
            DispatchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                eprintln!(
                    "  {} {} analysis gave up after {} attempts: {}",
                    "⚠".yellow(),
                    id,
                    attempts,
                    last_error
                );
            }
        }
    }
    Ok(())
}

fn status_label(status: CommentStatus) -> String {
    match status {
        CommentStatus::Pending => status.to_string().yellow().to_string(),
        CommentStatus::Approved => status.to_string().green().to_string(),
        CommentStatus::Rejected => status.to_string().red().to_string(),
    }
}

fn print_node(node: &CommentNode) {
    let indent = "  ".repeat(node.depth + 1);
    let comment = &node.comment;
    let marker = if comment.status == CommentStatus::Approved {
        String::new()
    } else {
        format!(" [{}]", status_label(comment.status))
    };
    println!(
        "{}{} {}{}",
        indent,
        comment.author_name.bold(),
        comment.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
        marker
    );
    for line in comment.content.lines() {
        println!("{}  {}", indent, line);
    }
    for reply in &node.replies {
        print_node(reply);
    }
}

fn print_queue_entry(comment: &BlogComment) {
    let flag = if comment.auto_flagged {
        "⚑ ".red().to_string()
    } else {
        "  ".to_string()
    };
    let scores = match (comment.toxicity_score, comment.spam_score) {
        (Some(t), Some(s)) => format!("toxicity {:.2}, spam {:.2}", t, s),
        _ => "not analyzed".to_string(),
    };
    println!(
        "{}{} {} ({})",
        flag,
        comment.id.to_string().cyan(),
        comment.author_name,
        scores.dimmed()
    );
    if !comment.moderation_tags.is_empty() {
        println!("    tags: {}", comment.moderation_tags.join(", "));
    }
    println!("    {}", comment.content.lines().next().unwrap_or_default());
}
