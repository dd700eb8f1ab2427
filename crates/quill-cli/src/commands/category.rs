//! Category command
//!
//! Create categories and reclaim unused ones.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use quill_core::category::CategoryHousekeeper;

use super::{print_json, Workspace};

/// Category subcommands
#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// Create a category (no-op if it exists)
    Add {
        /// Category name
        name: String,
    },

    /// List categories with post counts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete categories that no post references
    Prune {
        /// Category name to keep even if empty (repeatable)
        #[arg(long = "exclude", short)]
        exclude: Vec<String>,

        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

/// Execute the category command
pub fn execute(cmd: CategoryCommand, workspace: &Workspace) -> Result<()> {
    let housekeeper =
        CategoryHousekeeper::new(workspace.blog_store(), &workspace.config.housekeeping);

    match cmd {
        CategoryCommand::Add { name } => {
            let category = housekeeper.ensure_category(&name)?;
            println!(
                "{} Category '{}' ({})",
                "✓".green(),
                category.name.cyan(),
                category.id.to_string().dimmed()
            );
            Ok(())
        }
        CategoryCommand::List { json } => {
            let summaries = housekeeper.list_with_counts()?;
            if json {
                return print_json(&summaries);
            }
            if summaries.is_empty() {
                println!("No categories found.");
                return Ok(());
            }

            println!("{}", "Categories:".bold().underline());
            println!();
            for summary in &summaries {
                let count = summary.post_count.to_string();
                let count = if summary.post_count == 0 {
                    count.dimmed()
                } else {
                    count.cyan()
                };
                println!("  {} {} post(s)", summary.category.name.green(), count);
            }
            Ok(())
        }
        CategoryCommand::Prune {
            exclude,
            dry_run,
            yes,
        } => {
            let candidates = housekeeper.empty_categories(&exclude)?;
            if candidates.is_empty() {
                println!("No empty categories to prune.");
                return Ok(());
            }

            println!("Empty categories:");
            for category in &candidates {
                println!("  {}", category.name.yellow());
            }

            if dry_run {
                return Ok(());
            }

            if !yes {
                use dialoguer::Confirm;

                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete {} categories?", candidates.len()))
                    .default(false)
                    .interact()?;

                if !confirmed {
                    println!("Pruning cancelled.");
                    return Ok(());
                }
            }

            let removed = housekeeper.prune_empty_categories(&exclude)?;
            println!("{} Removed {} empty categories", "✓".green(), removed);
            Ok(())
        }
    }
}
