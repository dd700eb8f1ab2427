//! Author command
//!
//! Maintain the local author directory used to resolve post and comment authors.

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use quill_core::author::Author;

use super::{print_json, Workspace};

/// Author subcommands
#[derive(Debug, Subcommand)]
pub enum AuthorCommand {
    /// Add or update an author
    Add {
        /// Author ID
        id: String,

        /// Display name
        name: String,

        /// Contact email
        #[arg(long)]
        email: Option<String>,
    },

    /// List authors
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Execute the author command
pub fn execute(cmd: AuthorCommand, workspace: &Workspace) -> Result<()> {
    match cmd {
        AuthorCommand::Add { id, name, email } => {
            let mut author = Author::new(id.trim(), name.trim());
            if let Some(email) = email {
                author = author.with_email(email.trim());
            }
            workspace.store.register_author(&author)?;
            println!(
                "{} Author '{}' saved as {}",
                "✓".green(),
                author.id.to_string().cyan(),
                author.display_name()
            );
            Ok(())
        }
        AuthorCommand::List { json } => {
            let mut authors = workspace.store.list_authors()?;
            authors.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));

            if json {
                return print_json(&authors);
            }
            if authors.is_empty() {
                println!("No authors registered.");
                return Ok(());
            }
            for author in &authors {
                let email = author.email.as_deref().unwrap_or("");
                println!(
                    "  {} {} {}",
                    author.id.to_string().green(),
                    author.display_name(),
                    email.dimmed()
                );
            }
            Ok(())
        }
    }
}
