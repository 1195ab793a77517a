use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};

use crate::budget::BudgetSettings;
use crate::tracker::UsageTracker;
use crate::types::{
    DashboardMetrics, Period, Trend, TrendAnalysis, UsageAggregate,
};

/// Trailing window for trend analysis, in days.
const TREND_WINDOW_DAYS: i64 = 7;
/// Days in the "recent" half of the trend comparison.
const TREND_RECENT_DAYS: usize = 3;
/// Relative change below which a trend counts as stable.
const TREND_THRESHOLD: f64 = 0.10;

pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

pub fn format_cost(cost: f64) -> String {
    format!("${cost:.2}")
}

fn classify(earlier_mean: f64, recent_mean: f64) -> Trend {
    if earlier_mean == 0.0 {
        return if recent_mean > 0.0 {
            Trend::Increasing
        } else {
            Trend::Stable
        };
    }
    let change = (recent_mean - earlier_mean) / earlier_mean;
    if change > TREND_THRESHOLD {
        Trend::Increasing
    } else if change < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Compare the most recent days against the earlier part of the window.
/// Fewer than two days of data reports stable trends and zero projections.
pub fn analyze_trends(daily: &[UsageAggregate]) -> TrendAnalysis {
    if daily.len() < 2 {
        return TrendAnalysis {
            cost_trend: Trend::Stable,
            token_trend: Trend::Stable,
            daily_avg_cost: 0.0,
            projected_monthly_cost: 0.0,
        };
    }

    let split = daily.len().saturating_sub(TREND_RECENT_DAYS);
    let (earlier, recent) = daily.split_at(split);

    let mean_cost = |days: &[UsageAggregate]| {
        days.iter().map(|d| d.total_cost).sum::<f64>() / days.len() as f64
    };
    let mean_tokens = |days: &[UsageAggregate]| {
        days.iter().map(|d| d.total_tokens as f64).sum::<f64>() / days.len() as f64
    };

    let total_cost: f64 = daily.iter().map(|d| d.total_cost).sum();
    let daily_avg_cost = total_cost / daily.len() as f64;

    TrendAnalysis {
        cost_trend: classify(mean_cost(earlier), mean_cost(recent)),
        token_trend: classify(mean_tokens(earlier), mean_tokens(recent)),
        daily_avg_cost,
        projected_monthly_cost: daily_avg_cost * 30.0,
    }
}

/// Aggregate day/week/month metrics, the top-10 monthly models, budget
/// status for all three periods, and trend analysis.
pub fn metrics(
    tracker: &UsageTracker,
    budgets: &BudgetSettings,
    agent_id: Option<&str>,
) -> DashboardMetrics {
    let budgets = [
        (Period::Day, budgets.daily),
        (Period::Week, budgets.weekly),
        (Period::Month, budgets.monthly),
    ]
    .into_iter()
    .map(|(period, limit)| tracker.check_budget(agent_id, period, limit))
    .collect();

    DashboardMetrics {
        today: tracker.period_summary(agent_id, Period::Day),
        week: tracker.period_summary(agent_id, Period::Week),
        month: tracker.period_summary(agent_id, Period::Month),
        top_models: tracker.top_cost_models(agent_id, Period::Month, 10),
        budgets,
        trends: analyze_trends(&tracker.daily_aggregates(agent_id, TREND_WINDOW_DAYS)),
    }
}

fn period_label(period: Period) -> &'static str {
    match period {
        Period::Day => "Today",
        Period::Week => "This week",
        Period::Month => "This month",
    }
}

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Increasing => "increasing",
        Trend::Decreasing => "decreasing",
        Trend::Stable => "stable",
    }
}

/// Render the fixed multi-section text report: current usage, budget
/// status with alert lines, top-5 models, trends.
pub fn format_report(m: &DashboardMetrics) -> String {
    let mut out = String::new();

    out.push_str("== Current usage ==\n");
    for (label, summary) in [
        ("Today", &m.today),
        ("This week", &m.week),
        ("This month", &m.month),
    ] {
        out.push_str(&format!(
            "{label}: {} over {} requests ({} tokens)\n",
            format_cost(summary.cost),
            summary.requests,
            format_tokens(summary.tokens),
        ));
    }

    out.push_str("\n== Budget status ==\n");
    for status in &m.budgets {
        match status.budget {
            Some(budget) => {
                let pct = status.percentage.unwrap_or(0.0);
                out.push_str(&format!(
                    "{}: {} of {} ({pct:.1}%)\n",
                    period_label(status.period),
                    format_cost(status.spent),
                    format_cost(budget),
                ));
            }
            None => {
                out.push_str(&format!(
                    "{}: {} (no budget set)\n",
                    period_label(status.period),
                    format_cost(status.spent),
                ));
            }
        }
        for alert in &status.alerts {
            out.push_str(&format!("  ! {}\n", alert.message));
        }
    }

    out.push_str("\n== Top models (this month) ==\n");
    if m.top_models.is_empty() {
        out.push_str("No usage recorded.\n");
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(["#", "Model", "Cost", "Requests", "Avg/Req"]);
        for (i, top) in m.top_models.iter().take(5).enumerate() {
            table.add_row([
                Cell::new(i + 1),
                Cell::new(format!("{}/{}", top.provider, top.model)),
                Cell::new(format_cost(top.cost)),
                Cell::new(top.requests),
                Cell::new(format!("${:.4}", top.avg_cost)),
            ]);
        }
        out.push_str(&table.to_string());
        out.push('\n');
    }

    out.push_str("\n== Trends (last 7 days) ==\n");
    out.push_str(&format!("Cost: {}\n", trend_label(m.trends.cost_trend)));
    out.push_str(&format!("Tokens: {}\n", trend_label(m.trends.token_trend)));
    out.push_str(&format!(
        "Daily average: {}\n",
        format_cost(m.trends.daily_avg_cost)
    ));
    out.push_str(&format!(
        "Projected monthly: {}\n",
        format_cost(m.trends.projected_monthly_cost)
    ));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BudgetStatus, PeriodSummary, TopModel};

    fn day(cost: f64, tokens: u64) -> UsageAggregate {
        UsageAggregate {
            period: "day".to_string(),
            total_cost: cost,
            total_tokens: tokens,
            request_count: 1,
            avg_cost_per_request: cost,
            breakdown: Default::default(),
        }
    }

    #[test]
    fn sparse_data_reports_stable() {
        let trends = analyze_trends(&[day(1.0, 100)]);
        assert_eq!(trends.cost_trend, Trend::Stable);
        assert_eq!(trends.token_trend, Trend::Stable);
        assert_eq!(trends.daily_avg_cost, 0.0);
        assert_eq!(trends.projected_monthly_cost, 0.0);
    }

    #[test]
    fn rising_recent_days_report_increasing() {
        // Earlier days around 1.0, recent 3 days around 2.0.
        let daily = vec![
            day(1.0, 100),
            day(1.0, 100),
            day(1.0, 100),
            day(1.0, 100),
            day(2.0, 200),
            day(2.0, 200),
            day(2.0, 200),
        ];
        let trends = analyze_trends(&daily);
        assert_eq!(trends.cost_trend, Trend::Increasing);
        assert_eq!(trends.token_trend, Trend::Increasing);
        let expected_avg = 10.0 / 7.0;
        assert!((trends.daily_avg_cost - expected_avg).abs() < 1e-9);
        assert!((trends.projected_monthly_cost - expected_avg * 30.0).abs() < 1e-9);
    }

    #[test]
    fn small_changes_are_stable() {
        let daily = vec![day(1.0, 100), day(1.05, 104), day(0.98, 97), day(1.02, 101)];
        let trends = analyze_trends(&daily);
        assert_eq!(trends.cost_trend, Trend::Stable);
        assert_eq!(trends.token_trend, Trend::Stable);
    }

    #[test]
    fn falling_costs_report_decreasing() {
        let daily = vec![
            day(3.0, 300),
            day(3.0, 300),
            day(3.0, 300),
            day(1.0, 100),
            day(1.0, 100),
            day(1.0, 100),
        ];
        assert_eq!(analyze_trends(&daily).cost_trend, Trend::Decreasing);
    }

    #[test]
    fn report_contains_every_section() {
        let metrics = DashboardMetrics {
            today: PeriodSummary {
                cost: 1.5,
                tokens: 1200,
                requests: 4,
            },
            week: PeriodSummary::default(),
            month: PeriodSummary::default(),
            top_models: vec![TopModel {
                provider: "anthropic".to_string(),
                model: "claude-sonnet-4-5".to_string(),
                cost: 1.5,
                requests: 4,
                avg_cost: 0.375,
            }],
            budgets: vec![BudgetStatus {
                period: Period::Day,
                budget: Some(10.0),
                spent: 1.5,
                remaining: Some(8.5),
                percentage: Some(15.0),
                over_budget: false,
                alerts: vec![],
            }],
            trends: TrendAnalysis {
                cost_trend: Trend::Stable,
                token_trend: Trend::Stable,
                daily_avg_cost: 1.5,
                projected_monthly_cost: 45.0,
            },
        };

        let report = format_report(&metrics);
        assert!(report.contains("== Current usage =="));
        assert!(report.contains("== Budget status =="));
        assert!(report.contains("== Top models (this month) =="));
        assert!(report.contains("== Trends (last 7 days) =="));
        assert!(report.contains("claude-sonnet-4-5"));
        assert!(report.contains("$1.50"));
    }
}
