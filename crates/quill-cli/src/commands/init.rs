//! Init command
//!
//! Initialize a quill workspace (config plus data directory).

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use quill_core::config::FlaggedPolicy;
use quill_core::Config;
use std::fs;
use std::path::{Path, PathBuf};

use super::WORKSPACE_DIR;

/// Moderation strictness presets
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum ModerationPreset {
    /// Higher thresholds, flagged comments wait for review
    Relaxed,
    /// Default thresholds, flagged comments wait for review
    #[default]
    Standard,
    /// Lower thresholds, flagged comments are rejected outright
    Strict,
}

/// Arguments for the init command
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Moderation preset to start from
    #[arg(long, short, value_enum, default_value_t = ModerationPreset::Standard)]
    pub preset: ModerationPreset,

    /// Force overwrite existing configuration
    #[arg(long)]
    pub force: bool,

    /// Directory to initialize (default: current directory)
    #[arg(long)]
    pub path: Option<PathBuf>,
}

/// Execute the init command
pub fn execute(args: InitArgs) -> Result<()> {
    use colored::Colorize;

    let site_dir = args
        .path
        .clone()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    println!("Initializing quill in {}...", site_dir.display());

    let quill_dir = site_dir.join(WORKSPACE_DIR);
    if quill_dir.exists() && !args.force {
        eprintln!(
            "{} quill already initialized. Use --force to reinitialize.",
            "⚠".yellow()
        );
        return Ok(());
    }

    fs::create_dir_all(quill_dir.join("data")).context("Failed to create .quill/data")?;
    println!("{} Created {}/ directory", "✓".green(), WORKSPACE_DIR);

    let config = generate_config(args.preset)?;
    let config_path = quill_dir.join("config.toml");
    fs::write(&config_path, config).context("Failed to write config.toml")?;
    println!(
        "{} Generated config.toml with {:?} moderation preset",
        "✓".green(),
        args.preset
    );

    if site_dir.join(".git").exists() {
        update_gitignore(&site_dir)?;
        println!("{} Updated .gitignore", "✓".green());
    }

    println!("\n{}", "Next steps:".bold());
    println!("  1. Review and customize .quill/config.toml");
    println!("  2. Register an author:");
    println!("     {}", "quill author add admin \"Site Team\"".cyan());
    println!("  3. Write your first post:");
    println!(
        "     {}",
        "quill post upsert \"Hello\" --author admin --content-file hello.md".cyan()
    );

    Ok(())
}

fn preset_config(preset: ModerationPreset) -> Config {
    let mut config = Config::default();
    match preset {
        ModerationPreset::Relaxed => {
            config.moderation.toxicity_threshold = 0.9;
            config.moderation.spam_threshold = 0.9;
        }
        ModerationPreset::Standard => {}
        ModerationPreset::Strict => {
            config.moderation.toxicity_threshold = 0.6;
            config.moderation.spam_threshold = 0.6;
            config.moderation.flagged_policy = FlaggedPolicy::Reject;
            config.threads.show_pending = false;
        }
    }
    config
}

fn generate_config(preset: ModerationPreset) -> Result<String> {
    let body = preset_config(preset).to_toml_string()?;
    Ok(format!(
        "# quill configuration ({:?} moderation preset)\n\n{}",
        preset, body
    ))
}

fn update_gitignore(site_dir: &Path) -> Result<()> {
    let gitignore_path = site_dir.join(".gitignore");
    let entries = "\n# quill\n.quill/data/\n";

    if gitignore_path.exists() {
        let content = fs::read_to_string(&gitignore_path)?;
        if !content.contains(".quill/data/") {
            let mut file = fs::OpenOptions::new()
                .append(true)
                .open(&gitignore_path)?;
            use std::io::Write;
            file.write_all(entries.as_bytes())?;
        }
    } else {
        fs::write(&gitignore_path, entries)?;
    }

    Ok(())
}
