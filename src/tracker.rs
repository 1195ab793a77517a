use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Duration, Local, LocalResult, NaiveDate, TimeZone, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::Result;
use crate::pricing::PricingMap;
use crate::store::{RecordFilter, RecordStore};
use crate::types::{
    AlertLevel, BudgetAlert, BudgetStatus, Period, PeriodSummary, TopModel, UsageAggregate,
    UsageParams, UsageRecord,
};

/// Records per-call usage and answers period queries over the record store.
pub struct UsageTracker {
    store: RecordStore,
    pricing: Box<dyn PricingMap>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub agent_id: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap();
    match naive.and_local_timezone(Local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        // DST gap at midnight: fall back to the UTC reading
        LocalResult::None => Utc.from_utc_datetime(&naive),
    }
}

/// Canonical start of the requested period: midnight today for day, the
/// most recent Sunday midnight for week, first-of-month midnight for month.
pub fn period_start(period: Period) -> DateTime<Utc> {
    let today = Local::now().date_naive();
    let start = match period {
        Period::Day => today,
        Period::Week => today - Duration::days(today.weekday().num_days_from_sunday() as i64),
        Period::Month => today.with_day(1).unwrap_or(today),
    };
    local_midnight(start)
}

/// Bucket key for grouping records: day "YYYY-MM-DD", week
/// "YYYY-MM-DD (Week)" keyed by that week's Sunday, month "YYYY-MM".
pub fn bucket_key(timestamp: DateTime<Utc>, period: Period) -> String {
    let local = timestamp.with_timezone(&Local);
    match period {
        Period::Day => local.format("%Y-%m-%d").to_string(),
        Period::Week => {
            let date = local.date_naive();
            let sunday = date - Duration::days(date.weekday().num_days_from_sunday() as i64);
            format!("{} (Week)", sunday.format("%Y-%m-%d"))
        }
        Period::Month => local.format("%Y-%m").to_string(),
    }
}

/// Pure budget evaluation: percentage, remaining, and alerts from a spend
/// figure and an optional ceiling. Critical at ≥100%, warning at ≥80% and
/// below 100%, at most one alert per evaluation.
pub fn evaluate_budget(period: Period, spent: f64, budget: Option<f64>) -> BudgetStatus {
    let mut status = BudgetStatus {
        period,
        budget,
        spent,
        remaining: None,
        percentage: None,
        over_budget: false,
        alerts: Vec::new(),
    };

    let Some(budget) = budget else {
        return status;
    };
    if budget <= 0.0 {
        return status;
    }

    let percentage = spent / budget * 100.0;
    status.remaining = Some((budget - spent).max(0.0));
    status.percentage = Some(percentage);
    status.over_budget = spent > budget;

    if percentage >= 100.0 {
        status.alerts.push(BudgetAlert {
            level: AlertLevel::Critical,
            threshold: 100.0,
            current: percentage,
            message: format!(
                "budget exhausted: ${spent:.2} spent of ${budget:.2} ({percentage:.1}%)"
            ),
        });
    } else if percentage >= 80.0 {
        status.alerts.push(BudgetAlert {
            level: AlertLevel::Warning,
            threshold: 80.0,
            current: percentage,
            message: format!(
                "approaching budget: ${spent:.2} spent of ${budget:.2} ({percentage:.1}%)"
            ),
        });
    }

    status
}

/// Fold a list of records into period buckets, newest first. The breakdown
/// leaves sum exactly to the bucket totals because both are accumulated
/// from the same fields in one pass.
pub fn aggregate_records(records: &[UsageRecord], period: Period) -> Vec<UsageAggregate> {
    let mut buckets: BTreeMap<String, UsageAggregate> = BTreeMap::new();

    for r in records {
        let key = bucket_key(r.timestamp, period);
        let bucket = buckets.entry(key.clone()).or_insert_with(|| UsageAggregate {
            period: key,
            ..UsageAggregate::default()
        });

        bucket.total_cost += r.cost;
        bucket.total_tokens += r.total_tokens;
        bucket.request_count += 1;

        bucket
            .breakdown
            .entry(r.provider.clone())
            .or_default()
            .entry(r.model.clone())
            .or_default()
            .accumulate(r.cost, r.total_tokens);
    }

    let mut out: Vec<UsageAggregate> = buckets
        .into_values()
        .map(|mut b| {
            if b.request_count > 0 {
                b.avg_cost_per_request = b.total_cost / b.request_count as f64;
            }
            b
        })
        .collect();
    // BTreeMap yields keys ascending; the contract is most recent first.
    out.reverse();
    out
}

impl UsageTracker {
    pub fn new(dir: impl Into<PathBuf>, pricing: Box<dyn PricingMap>) -> Self {
        Self {
            store: RecordStore::new(dir),
            pricing,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Resolve cost from the pricing table (unknown model ⇒ 0), build the
    /// record, and append it to the day file.
    pub fn record_usage(&self, params: UsageParams) -> Result<UsageRecord> {
        let cost = self.pricing.cost_for_usage(
            &params.provider,
            &params.model,
            params.input_tokens,
            params.output_tokens,
            params.cache_read_tokens,
            params.cache_write_tokens,
        );

        let record = UsageRecord {
            id: Uuid::new_v4().to_string(),
            agent_id: params.agent_id,
            session_id: params.session_id,
            provider: params.provider,
            model: params.model,
            input_tokens: params.input_tokens,
            output_tokens: params.output_tokens,
            cache_read_tokens: params.cache_read_tokens,
            cache_write_tokens: params.cache_write_tokens,
            total_tokens: params
                .total_tokens
                .unwrap_or(params.input_tokens + params.output_tokens),
            cost,
            timestamp: Utc::now(),
            task_type: params.task_type.unwrap_or_else(|| "general".to_string()),
            duration_ms: params.duration_ms,
            success: params.success.unwrap_or(true),
            error: params.error,
        };

        self.store.append(&record)?;
        debug!(model = %record.model, cost = record.cost, "recorded usage");
        Ok(record)
    }

    fn filter_for(&self, query: &HistoryQuery, period: Period) -> RecordFilter {
        let start = query.start.unwrap_or_else(|| period_start(period));
        let end = query.end.unwrap_or_else(Utc::now);
        RecordFilter {
            start,
            end,
            agent_id: query.agent_id.clone(),
            provider: query.provider.clone(),
            model: query.model.clone(),
        }
    }

    /// Period aggregates over the query window (canonical period start
    /// through now by default), most recent bucket first.
    pub fn usage_history(&self, query: &HistoryQuery, period: Period) -> Vec<UsageAggregate> {
        let records = self.store.load(&self.filter_for(query, period));
        aggregate_records(&records, period)
    }

    /// Spend against an optional ceiling over the canonical period window.
    pub fn check_budget(
        &self,
        agent_id: Option<&str>,
        period: Period,
        budget: Option<f64>,
    ) -> BudgetStatus {
        let query = HistoryQuery {
            agent_id: agent_id.map(str::to_string),
            ..HistoryQuery::default()
        };
        let records = self.store.load(&self.filter_for(&query, period));
        let spent = records.iter().map(|r| r.cost).sum();
        evaluate_budget(period, spent, budget)
    }

    /// Summed totals over the canonical period window.
    pub fn period_summary(&self, agent_id: Option<&str>, period: Period) -> PeriodSummary {
        let query = HistoryQuery {
            agent_id: agent_id.map(str::to_string),
            ..HistoryQuery::default()
        };
        let records = self.store.load(&self.filter_for(&query, period));
        let mut summary = PeriodSummary::default();
        for r in &records {
            summary.cost += r.cost;
            summary.tokens += r.total_tokens;
            summary.requests += 1;
        }
        summary
    }

    /// Per provider:model cost ranking over the canonical period window,
    /// most expensive first.
    pub fn top_cost_models(
        &self,
        agent_id: Option<&str>,
        period: Period,
        limit: usize,
    ) -> Vec<TopModel> {
        let query = HistoryQuery {
            agent_id: agent_id.map(str::to_string),
            ..HistoryQuery::default()
        };
        let records = self.store.load(&self.filter_for(&query, period));

        let mut totals: HashMap<(String, String), (f64, u64)> = HashMap::new();
        for r in &records {
            let entry = totals
                .entry((r.provider.clone(), r.model.clone()))
                .or_insert((0.0, 0));
            entry.0 += r.cost;
            entry.1 += 1;
        }

        let mut ranked: Vec<TopModel> = totals
            .into_iter()
            .map(|((provider, model), (cost, requests))| TopModel {
                provider,
                model,
                cost,
                requests,
                avg_cost: if requests > 0 {
                    cost / requests as f64
                } else {
                    0.0
                },
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.cost
                .partial_cmp(&a.cost)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| (&a.provider, &a.model).cmp(&(&b.provider, &b.model)))
        });
        ranked.truncate(limit);
        ranked
    }

    /// Daily aggregates over the trailing `days` window, oldest first.
    /// Used by the dashboard's trend analysis.
    pub fn daily_aggregates(&self, agent_id: Option<&str>, days: i64) -> Vec<UsageAggregate> {
        let today = Local::now().date_naive();
        let start = local_midnight(today - Duration::days(days - 1));
        let query = HistoryQuery {
            agent_id: agent_id.map(str::to_string),
            start: Some(start),
            ..HistoryQuery::default()
        };
        let mut aggregates = self.usage_history(&query, Period::Day);
        aggregates.reverse();
        aggregates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{ModelPricing, TablePricing};
    use tempfile::TempDir;

    fn pricing() -> Box<dyn PricingMap> {
        let mut map = std::collections::HashMap::new();
        // $1000 per 1M input tokens: 1000 input tokens cost exactly $1.00
        map.insert(
            "p/a".to_string(),
            ModelPricing {
                input: 1000.0,
                output: 0.0,
                cache_read: None,
                cache_write: None,
            },
        );
        map.insert(
            "p/b".to_string(),
            ModelPricing {
                input: 1000.0,
                output: 0.0,
                cache_read: None,
                cache_write: None,
            },
        );
        Box::new(TablePricing::new(map))
    }

    fn params(model: &str, input_tokens: u64) -> UsageParams {
        UsageParams {
            agent_id: "agent-1".to_string(),
            session_id: "s1".to_string(),
            provider: "p".to_string(),
            model: model.to_string(),
            input_tokens,
            output_tokens: 0,
            ..UsageParams::default()
        }
    }

    #[test]
    fn day_history_sums_and_breaks_down() {
        let dir = TempDir::new().unwrap();
        let tracker = UsageTracker::new(dir.path(), pricing());

        tracker.record_usage(params("a", 1000)).unwrap();
        tracker.record_usage(params("b", 2500)).unwrap();
        tracker.record_usage(params("a", 750)).unwrap();

        let history = tracker.usage_history(&HistoryQuery::default(), Period::Day);
        assert_eq!(history.len(), 1);
        let bucket = &history[0];
        assert!((bucket.total_cost - 4.25).abs() < 1e-9);
        assert_eq!(bucket.request_count, 3);

        let a = &bucket.breakdown["p"]["a"];
        assert!((a.cost - 1.75).abs() < 1e-9);
        assert_eq!(a.requests, 2);
    }

    #[test]
    fn breakdown_conserves_totals() {
        let dir = TempDir::new().unwrap();
        let tracker = UsageTracker::new(dir.path(), pricing());

        for (model, tokens) in [("a", 137), ("b", 9431), ("a", 55), ("b", 1), ("b", 777)] {
            tracker.record_usage(params(model, tokens)).unwrap();
        }

        for bucket in tracker.usage_history(&HistoryQuery::default(), Period::Day) {
            let leaf_cost: f64 = bucket
                .breakdown
                .values()
                .flat_map(|models| models.values())
                .map(|e| e.cost)
                .sum();
            let leaf_requests: u64 = bucket
                .breakdown
                .values()
                .flat_map(|models| models.values())
                .map(|e| e.requests)
                .sum();
            assert!((leaf_cost - bucket.total_cost).abs() < 1e-9);
            assert_eq!(leaf_requests, bucket.request_count);
        }
    }

    #[test]
    fn budget_alert_thresholds() {
        let no_alerts = evaluate_budget(Period::Day, 79.99, Some(100.0));
        assert!(no_alerts.alerts.is_empty());
        assert!(!no_alerts.over_budget);

        let warning = evaluate_budget(Period::Day, 80.0, Some(100.0));
        assert_eq!(warning.alerts.len(), 1);
        assert_eq!(warning.alerts[0].level, AlertLevel::Warning);

        let critical = evaluate_budget(Period::Day, 100.0, Some(100.0));
        assert_eq!(critical.alerts.len(), 1);
        assert_eq!(critical.alerts[0].level, AlertLevel::Critical);

        let over = evaluate_budget(Period::Day, 150.0, Some(100.0));
        assert!(over.over_budget);
        assert_eq!(over.remaining, Some(0.0));
        assert_eq!(over.alerts.len(), 1);
        assert_eq!(over.alerts[0].level, AlertLevel::Critical);
    }

    #[test]
    fn no_budget_means_no_alerts() {
        let status = evaluate_budget(Period::Month, 12.5, None);
        assert!(status.alerts.is_empty());
        assert_eq!(status.percentage, None);
        assert_eq!(status.remaining, None);
    }

    #[test]
    fn top_models_ranked_by_cost() {
        let dir = TempDir::new().unwrap();
        let tracker = UsageTracker::new(dir.path(), pricing());

        tracker.record_usage(params("a", 1000)).unwrap();
        tracker.record_usage(params("b", 5000)).unwrap();
        tracker.record_usage(params("a", 500)).unwrap();

        let top = tracker.top_cost_models(None, Period::Day, 10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].model, "b");
        assert!((top[0].cost - 5.0).abs() < 1e-9);
        assert_eq!(top[1].model, "a");
        assert_eq!(top[1].requests, 2);
        assert!((top[1].avg_cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn bucket_keys_by_period() {
        let now = Utc::now();
        let local = now.with_timezone(&Local);
        assert_eq!(
            bucket_key(now, Period::Day),
            local.format("%Y-%m-%d").to_string()
        );
        assert_eq!(
            bucket_key(now, Period::Month),
            local.format("%Y-%m").to_string()
        );
        let week = bucket_key(now, Period::Week);
        assert!(week.ends_with(" (Week)"));
    }

    #[test]
    fn week_starts_on_sunday() {
        let start = period_start(Period::Week).with_timezone(&Local);
        assert_eq!(start.weekday(), chrono::Weekday::Sun);
        assert_eq!(start.time(), chrono::NaiveTime::MIN);
    }
}
