//! Post command
//!
//! Create, schedule and retire blog posts.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use quill_core::post::{BlogPost, PostDraft, PostFilter, PostManager, PostStatus, UpsertKind};
use quill_core::store::CategoryStore;
use quill_core::AuthorId;
use std::fs;
use std::path::PathBuf;

use super::{print_json, Workspace};

/// Post status as accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Draft,
    Scheduled,
    Published,
}

impl From<StatusArg> for PostStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => PostStatus::Draft,
            StatusArg::Scheduled => PostStatus::Scheduled,
            StatusArg::Published => PostStatus::Published,
        }
    }
}

/// Post subcommands
#[derive(Debug, Subcommand)]
pub enum PostCommand {
    /// Create a post, or update the one with the same slug
    Upsert {
        /// Post title
        title: String,

        /// Author ID from the author directory
        #[arg(long, short)]
        author: String,

        /// Post body
        #[arg(long, conflicts_with = "content_file")]
        content: Option<String>,

        /// Read the post body from a file
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Explicit slug (derived from the title otherwise)
        #[arg(long)]
        slug: Option<String>,

        /// Short summary (derived from the body otherwise)
        #[arg(long)]
        excerpt: Option<String>,

        /// Cover image URL
        #[arg(long)]
        cover_image: Option<String>,

        /// Category name; must already exist
        #[arg(long)]
        category: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag", short)]
        tags: Vec<String>,

        /// Feature the post
        #[arg(long)]
        featured: bool,

        /// Disable comments
        #[arg(long)]
        no_comments: bool,

        /// Requested status
        #[arg(long, value_enum, default_value = "draft")]
        status: StatusArg,

        /// Requested publish date (RFC 3339 or YYYY-MM-DD HH:MM)
        #[arg(long)]
        publish_at: Option<String>,
    },

    /// List posts
    List {
        /// Include drafts, scheduled and deleted posts
        #[arg(long, conflicts_with_all = ["category", "featured", "regular"])]
        all: bool,

        /// Only posts in this category (name or ID)
        #[arg(long)]
        category: Option<String>,

        /// Only featured posts
        #[arg(long, conflicts_with = "regular")]
        featured: bool,

        /// Only posts that are not featured
        #[arg(long)]
        regular: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show post details
    Show {
        /// Post slug
        slug: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a post's status
    Transition {
        /// Post slug
        slug: String,

        /// Target status
        #[arg(value_enum)]
        status: StatusArg,

        /// Requested publish date
        #[arg(long)]
        at: Option<String>,
    },

    /// Publish scheduled posts whose time has come
    PublishDue,

    /// Soft-delete a post
    Delete {
        /// Post slug
        slug: String,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Undo a soft delete
    Restore {
        /// Post slug
        slug: String,
    },
}

/// Execute the post command
pub fn execute(cmd: PostCommand, workspace: &Workspace) -> Result<()> {
    let manager = PostManager::new(workspace.blog_store(), &workspace.config.publication);

    match cmd {
        PostCommand::Upsert {
            title,
            author,
            content,
            content_file,
            slug,
            excerpt,
            cover_image,
            category,
            tags,
            featured,
            no_comments,
            status,
            publish_at,
        } => {
            let content = match (content, content_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => return Err(anyhow!("Provide --content or --content-file")),
            };

            let mut draft = PostDraft::new(title, content, AuthorId::from_string(author))
                .featured(featured)
                .allow_comments(!no_comments)
                .status(status.into());
            if let Some(slug) = slug {
                draft = draft.slug(slug);
            }
            if let Some(excerpt) = excerpt {
                draft = draft.excerpt(excerpt);
            }
            if let Some(cover_image) = cover_image {
                draft = draft.cover_image(cover_image);
            }
            if let Some(name) = category {
                let category = workspace
                    .store
                    .find_category_by_name(name.trim())?
                    .ok_or_else(|| {
                        anyhow!("Category '{}' not found. Create it with 'quill category add'", name)
                    })?;
                draft = draft.category(category.id);
            }
            for tag in tags {
                draft = draft.tag(tag);
            }
            if let Some(date) = publish_at {
                draft = draft.publish_at(date);
            }

            let (post, kind) = manager.upsert(draft, Utc::now())?;
            let verb = match kind {
                UpsertKind::Created => "Created",
                UpsertKind::Updated => "Updated",
            };
            println!(
                "{} {} post '{}' ({}, {} min read)",
                "✓".green(),
                verb,
                post.slug.to_string().cyan(),
                post.status,
                post.reading_minutes
            );
            if let Some(published_at) = post.published_at {
                println!("  Publishes at {}", published_at.format("%Y-%m-%d %H:%M UTC"));
            }
            Ok(())
        }
        PostCommand::List {
            all,
            category,
            featured,
            regular,
            json,
        } => {
            let posts = if all {
                manager.list_all()?
            } else {
                let filter = listing_filter(category, featured, regular);
                manager.list_visible(&filter, Utc::now())?
            };
            list_posts(&posts, json)
        }
        PostCommand::Show { slug, json } => {
            let post = manager
                .get_by_slug(&slug)
                .with_context(|| format!("Post '{}' not found", slug))?;
            show_post(&post, json)
        }
        PostCommand::Transition { slug, status, at } => {
            let post = manager.transition(&slug, status.into(), at.as_deref(), Utc::now())?;
            println!(
                "{} Post '{}' is now {}",
                "✓".green(),
                post.slug.to_string().cyan(),
                post.status
            );
            Ok(())
        }
        PostCommand::PublishDue => {
            let count = manager.publish_due(Utc::now())?;
            println!("{} Published {} scheduled post(s)", "✓".green(), count);
            Ok(())
        }
        PostCommand::Delete { slug, yes } => {
            let post = manager.get_by_slug(&slug)?;
            if !yes {
                use dialoguer::Confirm;

                println!("Post: {} ({})", post.title.green(), post.status);
                let confirmed = Confirm::new()
                    .with_prompt("Hide this post from readers?")
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }
            manager.soft_delete(&slug, Utc::now())?;
            println!("{} Post '{}' deleted.", "✓".green(), slug);
            Ok(())
        }
        PostCommand::Restore { slug } => {
            manager.restore(&slug, Utc::now())?;
            println!("{} Post '{}' restored.", "✓".green(), slug);
            Ok(())
        }
    }
}

fn listing_filter(category: Option<String>, featured: bool, regular: bool) -> PostFilter {
    let mut filter = PostFilter::new();
    if let Some(category) = category {
        filter = filter.with_category(category);
    }
    if featured || regular {
        filter = filter.with_featured(featured);
    }
    filter
}

fn list_posts(posts: &[BlogPost], as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&posts);
    }

    if posts.is_empty() {
        println!("No posts found.");
        return Ok(());
    }

    println!("{}", "Posts:".bold().underline());
    println!();
    for post in posts {
        let date = post
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let deleted = if post.is_deleted { " [deleted]" } else { "" };
        let featured = if post.featured { "★ " } else { "" };
        println!(
            "  {} {}{} {}{}",
            date.dimmed(),
            featured.yellow(),
            post.slug.to_string().green(),
            post.status.to_string().yellow(),
            deleted.red()
        );
    }
    Ok(())
}

fn show_post(post: &BlogPost, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(post);
    }

    println!("{}", post.title.bold().underline());
    println!();
    println!("  Slug: {}", post.slug.to_string().green());
    println!("  Status: {}", post.status);
    if let Some(published_at) = post.published_at {
        println!("  Published: {}", published_at.format("%Y-%m-%d %H:%M:%S"));
    }
    println!("  Author: {}", post.author_id);
    println!("  Reading time: {} min", post.reading_minutes);
    if !post.tags.is_empty() {
        println!("  Tags: {}", post.tags.join(", ").cyan());
    }
    if let Some(excerpt) = &post.excerpt {
        println!("  Excerpt: {}", excerpt.dimmed());
    }
    if post.is_deleted {
        println!("  {}", "Deleted".red());
    }
    Ok(())
}
