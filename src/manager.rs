use tracing::debug;

use crate::budget::{BudgetEnforcer, BudgetSettings};
use crate::cache::{CacheInsert, CacheKeyConfig, DiskBackend, MemoryBackend, ResponseCache};
use crate::config::{CacheBackendKind, Config, DefaultModel, OptimizationConfig};
use crate::dashboard;
use crate::error::{CostopsError, Result};
use crate::pricing::TablePricing;
use crate::registry::ModelRegistry;
use crate::selector::{ModelSelector, UpgradeAdvice, UpgradeQuery};
use crate::tracker::{HistoryQuery, UsageTracker};
use crate::types::{
    BudgetDecision, CacheStats, CachedResponse, DashboardMetrics, ModelRef, Period,
    SelectionCriteria, Suggestion, SuggestionKind, UsageAggregate, UsageParams, UsageRecord,
};

const FALLBACK_PROVIDER: &str = "anthropic";
const FALLBACK_MODEL: &str = "claude-sonnet-4-5";

/// Façade composing tracker, cache, budget enforcer, and model selector
/// behind per-subsystem enable flags. A disabled subsystem degrades every
/// method touching it to a neutral value; disabling tracking or caching
/// must never break callers.
pub struct CostOptimizationManager {
    tracker: Option<UsageTracker>,
    cache: Option<ResponseCache>,
    enforcer: Option<BudgetEnforcer>,
    selector: Option<ModelSelector>,
    budget_settings: BudgetSettings,
    optimization: OptimizationConfig,
    default_model: Option<DefaultModel>,
}

impl CostOptimizationManager {
    pub fn from_config(config: Config) -> Self {
        let tracker = config.tracking.enabled.then(|| {
            UsageTracker::new(
                config.records_dir(),
                Box::new(TablePricing::new(config.pricing.clone())),
            )
        });

        let cache = config.cache.enabled.then(|| {
            let backend: Box<dyn crate::cache::CacheBackend> = match config.cache.backend {
                CacheBackendKind::Memory => Box::new(MemoryBackend::new()),
                CacheBackendKind::Disk => Box::new(DiskBackend::new(config.cache_dir())),
            };
            ResponseCache::new(
                backend,
                config.cache.max_entries,
                config.cache.default_ttl_secs,
                config.cache.model_ttl_secs.clone(),
                CacheKeyConfig {
                    include_temperature: config.cache.include_temperature,
                    include_max_tokens: config.cache.include_max_tokens,
                },
            )
        });

        let budget_settings = config.budget.settings();
        let enforcer = config
            .budget
            .enabled
            .then(|| BudgetEnforcer::new(budget_settings.clone()));

        let selector = config
            .optimization
            .enabled
            .then(|| ModelSelector::new(ModelRegistry::new(config.models.clone())));

        Self {
            tracker,
            cache,
            enforcer,
            selector,
            budget_settings,
            optimization: config.optimization,
            default_model: config.default_model,
        }
    }

    pub fn tracking_enabled(&self) -> bool {
        self.tracker.is_some()
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Record one call's usage. No-op returning `None` when tracking is
    /// disabled.
    pub fn track_usage(&self, params: UsageParams) -> Result<Option<UsageRecord>> {
        match &self.tracker {
            Some(tracker) => tracker.record_usage(params).map(Some),
            None => Ok(None),
        }
    }

    /// Pre-call budget check. Allowed unconditionally when budget
    /// enforcement or tracking is disabled.
    pub fn check_budget_constraints(
        &self,
        agent_id: &str,
        model: &str,
        estimated_cost: f64,
    ) -> BudgetDecision {
        match (&self.enforcer, &self.tracker) {
            (Some(enforcer), Some(tracker)) => {
                enforcer.check_request(tracker, agent_id, model, estimated_cost)
            }
            _ => BudgetDecision::allow(),
        }
    }

    /// Cache lookup; a disabled cache is a permanent miss.
    pub fn cached_response(
        &mut self,
        prompt: &str,
        temperature: Option<f64>,
        max_tokens: Option<u64>,
    ) -> Option<CachedResponse> {
        let cache = self.cache.as_mut()?;
        let key = cache.cache_key(prompt, temperature, max_tokens);
        cache.get(&key)
    }

    /// Memoize a completed call's response. No-op when caching is disabled.
    pub fn cache_response(
        &mut self,
        prompt: &str,
        temperature: Option<f64>,
        max_tokens: Option<u64>,
        insert: CacheInsert,
    ) {
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let key = cache.cache_key(prompt, temperature, max_tokens);
        cache.set(&key, insert);
    }

    /// Pick the best model for the task, or fall back to the configured
    /// default when no selector is enabled.
    pub fn select_optimal_model(&self, criteria: &SelectionCriteria) -> Result<ModelRef> {
        match &self.selector {
            Some(selector) => selector.select_optimal_model(criteria),
            None => Ok(self.default_model()),
        }
    }

    pub fn should_upgrade_model(&self, query: &UpgradeQuery) -> UpgradeAdvice {
        match &self.selector {
            Some(selector) => selector.should_upgrade_model(query),
            None => UpgradeAdvice {
                should_upgrade: false,
                recommended: None,
            },
        }
    }

    /// The configured `"provider/model"` default, else a fixed pair.
    pub fn default_model(&self) -> ModelRef {
        if let Some(ref configured) = self.default_model {
            if let Some((provider, model)) = configured.spec().split_once('/') {
                return ModelRef {
                    provider: provider.to_string(),
                    model: model.to_string(),
                };
            }
            // No provider component: treat the whole spec as a model name.
            return ModelRef {
                provider: FALLBACK_PROVIDER.to_string(),
                model: configured.spec().to_string(),
            };
        }
        ModelRef {
            provider: FALLBACK_PROVIDER.to_string(),
            model: FALLBACK_MODEL.to_string(),
        }
    }

    pub fn usage_dashboard(&self, agent_id: Option<&str>) -> Result<DashboardMetrics> {
        let tracker = self.tracker.as_ref().ok_or(CostopsError::TrackingDisabled)?;
        Ok(dashboard::metrics(tracker, &self.budget_settings, agent_id))
    }

    pub fn usage_history(
        &self,
        query: &HistoryQuery,
        period: Period,
    ) -> Result<Vec<UsageAggregate>> {
        let tracker = self.tracker.as_ref().ok_or(CostopsError::TrackingDisabled)?;
        Ok(tracker.usage_history(query, period))
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(ResponseCache::stats)
    }

    pub fn clear_cache(&mut self) -> bool {
        match self.cache.as_mut() {
            Some(cache) => {
                cache.clear();
                true
            }
            None => false,
        }
    }

    /// Heuristic cost-cutting proposals from this month's usage: cheaper
    /// substitutes for expensive models, and enabling the cache under high
    /// request volume. Savings figures are estimates, not measurements.
    pub fn optimization_suggestions(&self) -> Vec<Suggestion> {
        if !self.optimization.enabled {
            return Vec::new();
        }
        let Some(tracker) = &self.tracker else {
            return Vec::new();
        };

        let mut suggestions = Vec::new();

        for top in tracker.top_cost_models(None, Period::Month, 5) {
            if top.cost <= self.optimization.cost_threshold {
                continue;
            }
            if let Some(alternative) = self.budget_settings.cheaper_alternatives.get(&top.model) {
                suggestions.push(Suggestion {
                    kind: SuggestionKind::ModelSubstitution,
                    message: format!(
                        "{}/{} cost ${:.2} this month; consider {alternative}",
                        top.provider, top.model, top.cost
                    ),
                    estimated_savings: top.cost * 0.5,
                });
            }
        }

        let month = tracker.period_summary(None, Period::Month);
        if self.cache.is_none() && month.requests > self.optimization.volume_threshold {
            suggestions.push(Suggestion {
                kind: SuggestionKind::EnableCaching,
                message: format!(
                    "{} requests this month with caching disabled; enabling the response cache could avoid repeat calls",
                    month.requests
                ),
                estimated_savings: month.cost * 0.2,
            });
        }

        debug!(count = suggestions.len(), "computed optimization suggestions");
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn disabled_config() -> Config {
        Config::parse(
            r#"
[tracking]
enabled = false

[cache]
enabled = false

[budget]
enabled = false

[optimization]
enabled = false
"#,
        )
        .unwrap()
    }

    #[test]
    fn disabled_subsystems_degrade_to_neutral_values() {
        let mut manager = CostOptimizationManager::from_config(disabled_config());

        assert!(manager
            .track_usage(UsageParams::default())
            .unwrap()
            .is_none());
        assert!(manager.check_budget_constraints("a", "m", 100.0).allowed);
        assert!(manager.cached_response("prompt", None, None).is_none());
        manager.cache_response("prompt", None, None, CacheInsert::default());
        assert!(manager.cache_stats().is_none());
        assert!(!manager.clear_cache());
        assert!(manager.optimization_suggestions().is_empty());
        assert!(manager.usage_dashboard(None).is_err());

        let fallback = manager
            .select_optimal_model(&SelectionCriteria::default())
            .unwrap();
        assert_eq!(fallback.provider, FALLBACK_PROVIDER);
        assert_eq!(fallback.model, FALLBACK_MODEL);
    }

    #[test]
    fn default_model_parses_provider_slash_model() {
        let config = Config::parse(r#"default_model = "openai/gpt-4o""#).unwrap();
        let manager = CostOptimizationManager::from_config(config);
        let m = manager.default_model();
        assert_eq!(m.provider, "openai");
        assert_eq!(m.model, "gpt-4o");
    }

    #[test]
    fn default_model_table_form_and_bare_name() {
        let config = Config::parse(
            r#"
[default_model]
primary = "bare-model"
"#,
        )
        .unwrap();
        let manager = CostOptimizationManager::from_config(config);
        let m = manager.default_model();
        assert_eq!(m.provider, FALLBACK_PROVIDER);
        assert_eq!(m.model, "bare-model");
    }
}
