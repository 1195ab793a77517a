use anyhow::Result;
use chrono::{Local, TimeZone, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use costops::cli::{Cli, Command, OutputFormat};
use costops::config;
use costops::tracker::HistoryQuery;
use costops::{dashboard, output, watch, CostOptimizationManager};

/// Local midnight of the given date, as a UTC instant.
fn day_start(date: chrono::NaiveDate) -> chrono::DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap();
    match naive.and_local_timezone(Local) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.with_timezone(&Utc)
        }
        chrono::LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.effective_command();

    let config = config::load_config(cli.config.as_deref());
    let records_dir = config.records_dir();
    let mut manager = CostOptimizationManager::from_config(config);

    match command {
        Command::Usage => {
            let metrics = manager.usage_dashboard(cli.agent.as_deref())?;
            let suggestions = manager.optimization_suggestions();
            match cli.format {
                OutputFormat::Json => output::print_json(&serde_json::json!({
                    "metrics": metrics,
                    "suggestions": suggestions,
                })),
                OutputFormat::Table => {
                    print!("{}", dashboard::format_report(&metrics));
                    output::print_suggestions(&suggestions);
                }
            }
        }
        Command::History {
            period,
            from,
            to,
            provider,
            model,
            breakdown,
        } => {
            let query = HistoryQuery {
                agent_id: cli.agent.clone(),
                provider,
                model,
                start: from.map(day_start),
                // Inclusive end date: the window runs to the next local midnight.
                end: to.map(|d| day_start(d + chrono::Duration::days(1))),
            };
            let aggregates = manager.usage_history(&query, period)?;
            if aggregates.is_empty() {
                eprintln!("No usage records found.");
                return Ok(());
            }
            match cli.format {
                OutputFormat::Json => output::print_json(&aggregates),
                OutputFormat::Table => output::print_history_table(&aggregates, breakdown),
            }
        }
        Command::CacheStats => match manager.cache_stats() {
            Some(stats) => match cli.format {
                OutputFormat::Json => output::print_json(&stats),
                OutputFormat::Table => output::print_cache_stats(&stats),
            },
            None => eprintln!("Response caching is disabled."),
        },
        Command::CacheClear => {
            if manager.clear_cache() {
                eprintln!("Cache cleared.");
            } else {
                eprintln!("Response caching is disabled.");
            }
        }
        Command::Watch { interval } => {
            watch::run(&manager, &records_dir, cli.agent.as_deref(), interval)?;
        }
    }

    Ok(())
}
