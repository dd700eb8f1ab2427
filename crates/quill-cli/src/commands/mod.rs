//! CLI commands module
//!
//! This module contains all CLI command implementations.

pub mod author;
pub mod category;
pub mod comment;
pub mod config;
pub mod init;
pub mod post;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quill_core::store::BlogStore;
use quill_core::Config;
use quill_storage::FileSystemStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory holding the workspace config and data
pub const WORKSPACE_DIR: &str = ".quill";

/// quill - blog publication and comment moderation
#[derive(Debug, Parser)]
#[command(name = "quill")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory (default: .quill/data)
    #[arg(long, global = true, env = "QUILL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize quill in the current directory
    Init(init::InitArgs),

    /// Manage blog posts
    #[command(subcommand)]
    Post(post::PostCommand),

    /// Submit and moderate comments
    #[command(subcommand)]
    Comment(comment::CommentCommand),

    /// Manage categories
    #[command(subcommand)]
    Category(category::CategoryCommand),

    /// Manage the author directory
    #[command(subcommand)]
    Author(author::AuthorCommand),

    /// Inspect configuration
    #[command(subcommand)]
    Config(config::ConfigCommand),
}

/// Loaded configuration plus the store it points at
pub struct Workspace {
    pub config: Config,
    pub store: Arc<FileSystemStore>,
}

impl Workspace {
    /// Open the workspace selected by the global flags
    pub fn open(config_path: Option<&Path>, data_dir: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;

        let data_dir = match data_dir {
            Some(dir) => dir.to_path_buf(),
            None => {
                let workspace = PathBuf::from(WORKSPACE_DIR);
                if !workspace.exists() {
                    bail!(
                        "No {} directory found. Run 'quill init' first or pass --data-dir",
                        WORKSPACE_DIR
                    );
                }
                workspace.join("data")
            }
        };

        let store = FileSystemStore::new(&data_dir)
            .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
        tracing::debug!("Using data directory {}", data_dir.display());

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// The store behind the core's storage traits
    pub fn blog_store(&self) -> Arc<dyn BlogStore> {
        self.store.clone()
    }
}

/// Default location of the workspace config file
pub fn default_config_path() -> PathBuf {
    PathBuf::from(WORKSPACE_DIR).join("config.toml")
}

/// Load the explicit config file, or the workspace one if present, or defaults
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()));
    }

    let default_path = default_config_path();
    if default_path.exists() {
        Config::load(&default_path)
            .with_context(|| format!("Failed to load config {}", default_path.display()))
    } else {
        tracing::debug!("No config file found, using defaults");
        Ok(Config::default())
    }
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    setup_logging(cli.verbose);

    // Handle color output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config_path = cli.config.as_deref();
    let data_dir = cli.data_dir.as_deref();

    // Dispatch to command handler
    match cli.command {
        Commands::Init(args) => init::execute(args),
        Commands::Config(cmd) => config::execute(cmd, config_path),
        Commands::Post(cmd) => post::execute(cmd, &Workspace::open(config_path, data_dir)?),
        Commands::Comment(cmd) => comment::execute(cmd, &Workspace::open(config_path, data_dir)?),
        Commands::Category(cmd) => {
            category::execute(cmd, &Workspace::open(config_path, data_dir)?)
        }
        Commands::Author(cmd) => author::execute(cmd, &Workspace::open(config_path, data_dir)?),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
