use crate::error::{CostopsError, Result};
use crate::registry::ModelRegistry;
use crate::types::{Level, ModelProfile, ModelRef, SelectionCriteria};

/// Reference request used for affordability checks: 1000 input + 500
/// output tokens.
const REFERENCE_INPUT_TOKENS: u64 = 1000;
const REFERENCE_OUTPUT_TOKENS: u64 = 500;

/// Picks the best affordable model for a task by a weighted multi-criteria
/// score over the registry's profiles.
pub struct ModelSelector {
    registry: ModelRegistry,
}

#[derive(Debug, Clone)]
pub struct UpgradeQuery {
    pub current_model: String,
    pub task_complexity: Level,
    pub cost_sensitivity: Level,
    pub budget_remaining: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct UpgradeAdvice {
    pub should_upgrade: bool,
    pub recommended: Option<ModelRef>,
}

impl UpgradeAdvice {
    fn none() -> Self {
        Self {
            should_upgrade: false,
            recommended: None,
        }
    }
}

fn estimate(profile: &ModelProfile, input_tokens: u64, output_tokens: u64) -> f64 {
    input_tokens as f64 / 1_000_000.0 * profile.input_price
        + output_tokens as f64 / 1_000_000.0 * profile.output_price
}

fn reference_cost(profile: &ModelProfile) -> f64 {
    estimate(profile, REFERENCE_INPUT_TOKENS, REFERENCE_OUTPUT_TOKENS)
}

/// Weighted score. Cheaper models score higher on the cost axis, clamped
/// at zero; an average of $50/1M tokens scores 0.
fn score(profile: &ModelProfile, criteria: &SelectionCriteria) -> f64 {
    let avg_price = (profile.input_price + profile.output_price) / 2.0;
    let cost_score = (10.0 - avg_price / 5.0).max(0.0);

    let mut total = profile.quality as f64 * criteria.complexity.weight()
        + profile.speed as f64 * criteria.urgency.weight()
        + cost_score * criteria.cost_sensitivity.weight();
    if criteria.requires_reasoning {
        total += profile.reasoning as f64 * 2.0;
    }
    total
}

impl ModelSelector {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Select the highest-scoring capability-eligible model that fits the
    /// remaining budget. An empty capability-eligible set is a hard error;
    /// an empty *affordable* set falls back to the cheapest eligible model
    /// by raw price sum.
    pub fn select_optimal_model(&self, criteria: &SelectionCriteria) -> Result<ModelRef> {
        let min_context = criteria.min_context_window.unwrap_or(0);
        let eligible: Vec<(&String, &ModelProfile)> = self
            .registry
            .iter()
            .filter(|(_, p)| {
                p.capabilities.supports(criteria.task_type)
                    && (!criteria.requires_multimodal || p.capabilities.image)
                    && (!criteria.requires_reasoning || p.capabilities.reasoning)
                    && p.context_window >= min_context
            })
            .collect();

        if eligible.is_empty() {
            return Err(CostopsError::NoEligibleModel);
        }

        let mut scored: Vec<(f64, &String, &ModelProfile)> = eligible
            .iter()
            .map(|(id, p)| (score(p, criteria), *id, *p))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(b.1))
        });

        if let Some(budget) = criteria.budget_remaining {
            if let Some((_, id, p)) = scored.iter().find(|(_, _, p)| reference_cost(p) <= budget) {
                return Ok(ModelRef {
                    provider: p.provider.clone(),
                    model: (*id).clone(),
                });
            }
            // Nothing affordable: the cheapest eligible model by raw price
            // sum still gets returned rather than failing the request.
            let cheapest = eligible.iter().min_by(|a, b| {
                (a.1.input_price + a.1.output_price)
                    .partial_cmp(&(b.1.input_price + b.1.output_price))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(b.0))
            });
            return match cheapest {
                Some((id, p)) => Ok(ModelRef {
                    provider: p.provider.clone(),
                    model: (*id).clone(),
                }),
                None => Err(CostopsError::NoEligibleModel),
            };
        }

        let (_, id, p) = &scored[0];
        Ok(ModelRef {
            provider: p.provider.clone(),
            model: (*id).clone(),
        })
    }

    /// Suggest a strictly higher-quality model for high-complexity work on
    /// a mediocre current model, if the upgrade fits the remaining budget.
    /// An unknown current model is not an error; no upgrade is suggested.
    pub fn should_upgrade_model(&self, query: &UpgradeQuery) -> UpgradeAdvice {
        let Some(current) = self.registry.get(&query.current_model) else {
            return UpgradeAdvice::none();
        };
        if current.quality >= 7 || query.task_complexity != Level::High {
            return UpgradeAdvice::none();
        }

        let mut candidates: Vec<(&String, &ModelProfile)> = self
            .registry
            .iter()
            .filter(|(_, p)| {
                p.quality > current.quality && p.capabilities.covers(&current.capabilities)
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.1.quality
                .cmp(&a.1.quality)
                .then_with(|| {
                    (a.1.input_price + a.1.output_price)
                        .partial_cmp(&(b.1.input_price + b.1.output_price))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.0.cmp(b.0))
        });

        let Some((id, p)) = candidates.first() else {
            return UpgradeAdvice::none();
        };
        if let Some(budget) = query.budget_remaining {
            if reference_cost(p) > budget {
                return UpgradeAdvice::none();
            }
        }
        UpgradeAdvice {
            should_upgrade: true,
            recommended: Some(ModelRef {
                provider: p.provider.clone(),
                model: (*id).clone(),
            }),
        }
    }

    /// Advisory cost estimate; unknown models estimate to zero.
    pub fn model_cost_estimate(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.registry.get(model) {
            Some(p) => estimate(p, input_tokens, output_tokens),
            None => 0.0,
        }
    }
}
