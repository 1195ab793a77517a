use std::collections::HashMap;

use tracing::debug;

use crate::tracker::UsageTracker;
use crate::types::{BudgetDecision, Period};

/// Budget ceilings and per-model thresholds, from configuration.
#[derive(Debug, Clone, Default)]
pub struct BudgetSettings {
    /// Hard daily ceiling in USD; `None` disables ceiling enforcement.
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
    /// Per-model estimated-cost thresholds; breaching one attaches a
    /// cheaper-alternative suggestion without blocking the request.
    pub model_cost_thresholds: HashMap<String, f64>,
    /// model → cheaper substitute.
    pub cheaper_alternatives: HashMap<String, String>,
}

/// Pre-call enforcement of the daily ceiling, plus advisory cheaper-model
/// suggestions. Spend is read from the tracker at check time; nothing is
/// cached here.
pub struct BudgetEnforcer {
    settings: BudgetSettings,
}

impl BudgetEnforcer {
    pub fn new(settings: BudgetSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BudgetSettings {
        &self.settings
    }

    /// Deny when the agent's current-day spend plus the projected cost
    /// breaches the daily ceiling. Threshold breaches below the ceiling
    /// stay allowed but carry an alternative-model suggestion.
    pub fn check_request(
        &self,
        tracker: &UsageTracker,
        agent_id: &str,
        model: &str,
        estimated_cost: f64,
    ) -> BudgetDecision {
        if let Some(ceiling) = self.settings.daily {
            let status = tracker.check_budget(Some(agent_id), Period::Day, Some(ceiling));
            if status.spent + estimated_cost > ceiling {
                debug!(
                    agent_id,
                    spent = status.spent,
                    estimated_cost,
                    ceiling,
                    "denying request over daily budget"
                );
                return BudgetDecision {
                    allowed: false,
                    reason: Some(format!(
                        "daily budget exceeded: ${:.2} spent + ${:.4} projected > ${:.2} ceiling",
                        status.spent, estimated_cost, ceiling
                    )),
                    alternative_model: self.settings.cheaper_alternatives.get(model).cloned(),
                };
            }
        }

        let mut decision = BudgetDecision::allow();
        if let Some(alternative) = self.cheaper_alternative(model, estimated_cost) {
            decision.reason = Some(format!(
                "estimated cost ${estimated_cost:.4} exceeds the threshold for {model}"
            ));
            decision.alternative_model = Some(alternative);
        }
        decision
    }

    /// The configured cheaper substitute for a model whose estimated cost
    /// breaches its threshold, if both are configured.
    pub fn cheaper_alternative(&self, model: &str, estimated_cost: f64) -> Option<String> {
        let threshold = self.settings.model_cost_thresholds.get(model)?;
        if estimated_cost > *threshold {
            self.settings.cheaper_alternatives.get(model).cloned()
        } else {
            None
        }
    }
}
