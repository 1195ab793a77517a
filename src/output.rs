use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use serde::Serialize;

use crate::dashboard::{format_cost, format_tokens};
use crate::types::{CacheStats, Suggestion, UsageAggregate};

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}

pub fn print_history_table(aggregates: &[UsageAggregate], breakdown: bool) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(["Period", "Cost", "Tokens", "Requests", "Avg/Req"]);

    let mut total_cost = 0.0;
    let mut total_tokens = 0u64;
    let mut total_requests = 0u64;

    for agg in aggregates {
        total_cost += agg.total_cost;
        total_tokens += agg.total_tokens;
        total_requests += agg.request_count;

        table.add_row([
            Cell::new(&agg.period),
            Cell::new(format_cost(agg.total_cost)),
            Cell::new(format_tokens(agg.total_tokens)),
            Cell::new(agg.request_count),
            Cell::new(format!("${:.4}", agg.avg_cost_per_request)),
        ]);

        if breakdown {
            for (provider, models) in &agg.breakdown {
                for (model, entry) in models {
                    table.add_row([
                        Cell::new(format!("  {provider}/{model}")),
                        Cell::new(format_cost(entry.cost)),
                        Cell::new(format_tokens(entry.tokens)),
                        Cell::new(entry.requests),
                        Cell::new(""),
                    ]);
                }
            }
        }
    }

    if aggregates.len() > 1 {
        let avg = if total_requests > 0 {
            total_cost / total_requests as f64
        } else {
            0.0
        };
        table.add_row([
            Cell::new("Total"),
            Cell::new(format_cost(total_cost)),
            Cell::new(format_tokens(total_tokens)),
            Cell::new(total_requests),
            Cell::new(format!("${avg:.4}")),
        ]);
    }

    println!("{table}");
}

pub fn print_suggestions(suggestions: &[Suggestion]) {
    if suggestions.is_empty() {
        return;
    }
    println!("\n== Suggestions ==");
    for s in suggestions {
        println!("- {} (est. savings {})", s.message, format_cost(s.estimated_savings));
    }
}

pub fn print_cache_stats(stats: &CacheStats) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(["Entries", "Total hits", "Cost saved", "Hits/entry"]);
    table.add_row([
        Cell::new(stats.size),
        Cell::new(stats.total_hits),
        Cell::new(format_cost(stats.total_cost_saved)),
        Cell::new(format!("{:.2}", stats.average_hit_rate)),
    ]);
    println!("{table}");
}
