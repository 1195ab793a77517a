use std::collections::HashMap;

use serde::Deserialize;

/// Per-model pricing, USD per 1,000,000 tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
    #[serde(default)]
    pub cache_read: Option<f64>,
    #[serde(default)]
    pub cache_write: Option<f64>,
}

/// Trait for looking up pricing by provider and model name.
pub trait PricingMap {
    fn get(&self, provider: &str, model: &str) -> Option<&ModelPricing>;

    /// Derived cost for one call. Unknown models cost zero: pricing is
    /// advisory, never an error.
    fn cost_for_usage(
        &self,
        provider: &str,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
        cache_read_tokens: u64,
        cache_write_tokens: u64,
    ) -> f64 {
        let Some(p) = self.get(provider, model) else {
            return 0.0;
        };
        let mut cost = 0.0;
        cost += input_tokens as f64 / 1_000_000.0 * p.input;
        cost += output_tokens as f64 / 1_000_000.0 * p.output;
        if let Some(cr) = p.cache_read {
            cost += cache_read_tokens as f64 / 1_000_000.0 * cr;
        }
        if let Some(cw) = p.cache_write {
            cost += cache_write_tokens as f64 / 1_000_000.0 * cw;
        }
        cost
    }
}

/// Pricing table loaded from configuration, keyed `provider/model` with a
/// bare-model fallback so entries can omit the provider.
#[derive(Debug, Clone, Default)]
pub struct TablePricing {
    map: HashMap<String, ModelPricing>,
}

impl TablePricing {
    pub fn new(map: HashMap<String, ModelPricing>) -> Self {
        Self { map }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl PricingMap for TablePricing {
    fn get(&self, provider: &str, model: &str) -> Option<&ModelPricing> {
        self.map
            .get(&format!("{provider}/{model}"))
            .or_else(|| self.map.get(model))
    }
}
