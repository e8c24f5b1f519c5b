//! CLI argument definitions for the Cora application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cora_core::CoraConfig;

/// Env var naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "CORA_CONFIG";

/// Cora: ask questions about your data in plain language.
#[derive(Parser, Debug)]
#[command(name = "cora", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Database to query instead of the configured dataset.
    #[arg(short = 'd', long = "database", global = true)]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive session (default).
    Chat,
    /// Answer one question and exit.
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// List databases known to the backend.
    Databases,
    /// Show example questions for the database.
    Suggest,
    /// Answer a question in natural language.
    Explain {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

impl CliArgs {
    /// The subcommand to run, `chat` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > CORA_CONFIG env var > ./config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        self.config_path_with_env(std::env::var(CONFIG_ENV_VAR).ok())
    }

    fn config_path_with_env(&self, env: Option<String>) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Some(p) = env.filter(|p| !p.is_empty()) {
            return PathBuf::from(p);
        }
        PathBuf::from("config.toml")
    }

    /// Resolve the default log filter.
    ///
    /// Priority: --log-level flag > config file value. `RUST_LOG`, when set,
    /// overrides both at subscriber construction.
    pub fn resolve_log_level(&self, config: &CoraConfig) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config.general.log_level.clone())
    }

    /// Resolve the database to query.
    ///
    /// Priority: --database flag > `[config] dataset_id`.
    pub fn resolve_database(&self, config: &CoraConfig) -> String {
        self.database
            .clone()
            .unwrap_or_else(|| config.project.dataset_id.clone())
    }
}

/// Join the words of a multi-word positional question.
pub fn join_question(words: &[String]) -> String {
    words.join(" ")
}
