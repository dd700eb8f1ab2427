//! quill - blog publication and comment moderation CLI
//!
//! ## Quick Start
//!
//! ```bash
//! # Initialize in your site directory
//! quill init
//!
//! # Register an author and publish a post
//! quill author add admin "Site Team"
//! quill post upsert "Hello World" --author admin --content-file hello.md --status published
//!
//! # Take a comment and work the moderation queue
//! quill comment submit hello-world --guest Sam --content "Nice post"
//! quill comment queue
//! ```

mod commands;

fn main() {
    if let Err(err) = commands::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
