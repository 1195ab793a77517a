use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::types::Period;

#[derive(Parser, Debug)]
#[command(
    name = "costops",
    about = "Usage accounting and cost optimization for LLM agents"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Restrict to a single agent id
    #[arg(long, global = true)]
    pub agent: Option<String>,

    /// Output format: table (default), json
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Usage dashboard: current spend, budgets, top models, trends (default)
    Usage,
    /// Aggregated usage history by period
    History {
        /// Bucket granularity
        #[arg(long, value_enum, default_value = "day")]
        period: Period,
        /// Start date (YYYY-MM-DD); default is the current period start
        #[arg(long)]
        from: Option<NaiveDate>,
        /// End date (YYYY-MM-DD), inclusive
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Filter by provider
        #[arg(long)]
        provider: Option<String>,
        /// Filter by model
        #[arg(long)]
        model: Option<String>,
        /// Show per-model breakdown within each period
        #[arg(long)]
        breakdown: bool,
    },
    /// Response cache size, hits, and estimated savings
    CacheStats,
    /// Remove all cached responses
    CacheClear,
    /// Re-render the dashboard whenever new usage is recorded
    Watch {
        /// Minimum seconds between refreshes (debounce)
        #[arg(long, default_value = "2")]
        interval: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    pub fn effective_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Usage)
    }
}
