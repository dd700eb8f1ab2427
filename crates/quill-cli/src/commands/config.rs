//! Config command
//!
//! Inspect and validate quill configuration.

use anyhow::{Context, Result};
use clap::Subcommand;
use quill_core::Config;
use std::fs;
use std::path::{Path, PathBuf};

use super::{default_config_path, load_config};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (defaults filled in)
    Show {
        /// Show as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Print the default configuration
    Defaults,
}

/// Execute the config command
pub fn execute(cmd: ConfigCommand, config_path: Option<&Path>) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show_config(config_path, json),
        ConfigCommand::Validate => validate_config(config_path),
        ConfigCommand::Defaults => {
            print!("{}", Config::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path)
}

fn show_config(config_path: Option<&Path>, as_json: bool) -> Result<()> {
    use colored::Colorize;

    let config = load_config(config_path)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let path = resolve_path(config_path);
    println!("{}", "Configuration:".bold().underline());
    if path.exists() {
        println!("{}", path.display().to_string().dimmed());
    } else {
        println!("{}", "(built-in defaults)".dimmed());
    }
    println!();
    print!("{}", config.to_toml_string()?);

    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    use colored::Colorize;

    let path = resolve_path(config_path);

    if !path.exists() {
        eprintln!(
            "{} Configuration not found at {}",
            "✗".red(),
            path.display()
        );
        return Ok(());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match toml::from_str::<toml::Value>(&content) {
        Ok(raw) => {
            println!("{} Configuration is valid TOML", "✓".green());

            let known = ["publication", "moderation", "threads", "analysis", "housekeeping"];
            if let Some(table) = raw.as_table() {
                for key in table.keys() {
                    if !known.contains(&key.as_str()) {
                        println!("{} Unknown section [{}] is ignored", "⚠".yellow(), key);
                    }
                }
            }

            match Config::from_toml_str(&content) {
                Ok(_) => println!("{} All values within range", "✓".green()),
                Err(e) => eprintln!("{} {}", "✗".red(), e),
            }
        }
        Err(e) => {
            eprintln!("{} Invalid TOML: {}", "✗".red(), e);
        }
    }

    Ok(())
}
