use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One LLM call's accounting entry. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub agent_id: String,
    pub session_id: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub total_tokens: u64,
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
    pub task_type: String,
    pub duration_ms: u64,
    pub success: bool,
    pub error: Option<String>,
}

/// Caller-supplied inputs for recording one call. Everything the tracker
/// can derive (id, cost, timestamp, total tokens) is filled in there.
#[derive(Debug, Clone, Default)]
pub struct UsageParams {
    pub agent_id: String,
    pub session_id: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    /// Defaults to input + output when not supplied.
    pub total_tokens: Option<u64>,
    pub task_type: Option<String>,
    pub duration_ms: u64,
    /// Defaults to true.
    pub success: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
}

/// Per provider → model leaf of an aggregate.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BreakdownEntry {
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
}

impl BreakdownEntry {
    pub fn accumulate(&mut self, cost: f64, tokens: u64) {
        self.cost += cost;
        self.tokens += tokens;
        self.requests += 1;
    }
}

/// Rollup for one period bucket. The breakdown leaves sum exactly to the
/// bucket totals.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageAggregate {
    pub period: String,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub request_count: u64,
    pub avg_cost_per_request: f64,
    pub breakdown: BTreeMap<String, BTreeMap<String, BreakdownEntry>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetAlert {
    pub level: AlertLevel,
    /// Percentage threshold that fired (80 or 100).
    pub threshold: f64,
    /// Current spend as a percentage of the budget.
    pub current: f64,
    pub message: String,
}

/// Point-in-time evaluation of spend against an optional ceiling.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub period: Period,
    pub budget: Option<f64>,
    pub spent: f64,
    pub remaining: Option<f64>,
    pub percentage: Option<f64>,
    pub over_budget: bool,
    pub alerts: Vec<BudgetAlert>,
}

/// A memoized LLM response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    pub response: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: u64,
    pub hit_count: u64,
}

impl CachedResponse {
    /// Logically expired once `now - created_at > ttl`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Duration::seconds(self.ttl_secs as i64)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub total_hits: u64,
    /// Cost avoided by serving hits instead of re-invoking the model:
    /// Σ(entry.cost × entry.hit_count).
    pub total_cost_saved: f64,
    pub average_hit_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub text: bool,
    pub image: bool,
    pub reasoning: bool,
    pub code: bool,
    pub translation: bool,
    pub summary: bool,
}

impl Capabilities {
    pub fn supports(&self, task: TaskType) -> bool {
        match task {
            TaskType::Text => self.text,
            TaskType::Image => self.image,
            TaskType::Reasoning => self.reasoning,
            TaskType::Code => self.code,
            TaskType::Translation => self.translation,
            TaskType::Summary => self.summary,
        }
    }

    /// True if every capability `other` has is present here too.
    pub fn covers(&self, other: &Capabilities) -> bool {
        (!other.text || self.text)
            && (!other.image || self.image)
            && (!other.reasoning || self.reasoning)
            && (!other.code || self.code)
            && (!other.translation || self.translation)
            && (!other.summary || self.summary)
    }
}

/// Static descriptive record for one known model. Seeded from config over
/// built-in defaults; read-only during operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProfile {
    pub provider: String,
    /// USD per 1,000,000 input tokens.
    pub input_price: f64,
    /// USD per 1,000,000 output tokens.
    pub output_price: f64,
    /// 1–10 scores.
    pub speed: u8,
    pub quality: u8,
    pub reasoning: u8,
    #[serde(default)]
    pub capabilities: Capabilities,
    pub context_window: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Text,
    Image,
    Code,
    Reasoning,
    Translation,
    Summary,
}

/// Low/medium/high knob used for complexity, urgency, and cost sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn weight(self) -> f64 {
        match self {
            Level::Low => 1.0,
            Level::Medium => 2.0,
            Level::High => 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    pub task_type: TaskType,
    pub complexity: Level,
    pub urgency: Level,
    pub cost_sensitivity: Level,
    pub requires_multimodal: bool,
    pub requires_reasoning: bool,
    pub min_context_window: Option<u64>,
    pub budget_remaining: Option<f64>,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            task_type: TaskType::Text,
            complexity: Level::Medium,
            urgency: Level::Medium,
            cost_sensitivity: Level::Medium,
            requires_multimodal: false,
            requires_reasoning: false,
            min_context_window: None,
            budget_remaining: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

/// One provider:model entry of a top-cost ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopModel {
    pub provider: String,
    pub model: String,
    pub cost: f64,
    pub requests: u64,
    pub avg_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub cost_trend: Trend,
    pub token_trend: Trend,
    pub daily_avg_cost: f64,
    pub projected_monthly_cost: f64,
}

/// Summed totals over one canonical period window.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PeriodSummary {
    pub cost: f64,
    pub tokens: u64,
    pub requests: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub today: PeriodSummary,
    pub week: PeriodSummary,
    pub month: PeriodSummary,
    pub top_models: Vec<TopModel>,
    pub budgets: Vec<BudgetStatus>,
    pub trends: TrendAnalysis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    ModelSubstitution,
    EnableCaching,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub message: String,
    /// Heuristic estimate, not a measurement.
    pub estimated_savings: f64,
}

/// Outcome of a pre-call budget check.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetDecision {
    pub allowed: bool,
    pub reason: Option<String>,
    pub alternative_model: Option<String>,
}

impl BudgetDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            alternative_model: None,
        }
    }
}
