use std::collections::HashMap;

use crate::types::{Capabilities, ModelProfile};

/// Immutable model-profile table, seeded once at construction from config
/// entries merged over built-in defaults for a handful of known commercial
/// models. The built-in numbers are seed data, not authoritative pricing.
pub struct ModelRegistry {
    profiles: HashMap<String, ModelProfile>,
}

impl ModelRegistry {
    /// Config-supplied profiles override built-in ones with the same id.
    pub fn new(overrides: HashMap<String, ModelProfile>) -> Self {
        let mut profiles = default_profiles();
        profiles.extend(overrides);
        Self { profiles }
    }

    pub fn with_defaults() -> Self {
        Self::new(HashMap::new())
    }

    /// Build a registry from explicit profiles only, without the built-in
    /// seed set. Used in tests and by callers with a curated table.
    pub fn from_profiles(profiles: HashMap<String, ModelProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, model: &str) -> Option<&ModelProfile> {
        self.profiles.get(model)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ModelProfile)> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn profile(
    provider: &str,
    input_price: f64,
    output_price: f64,
    speed: u8,
    quality: u8,
    reasoning: u8,
    capabilities: Capabilities,
    context_window: u64,
) -> ModelProfile {
    ModelProfile {
        provider: provider.to_string(),
        input_price,
        output_price,
        speed,
        quality,
        reasoning,
        capabilities,
        context_window,
    }
}

const TEXT_CODE: Capabilities = Capabilities {
    text: true,
    image: false,
    reasoning: true,
    code: true,
    translation: true,
    summary: true,
};

const FULL_MULTIMODAL: Capabilities = Capabilities {
    text: true,
    image: true,
    reasoning: true,
    code: true,
    translation: true,
    summary: true,
};

const LIGHT: Capabilities = Capabilities {
    text: true,
    image: false,
    reasoning: false,
    code: true,
    translation: true,
    summary: true,
};

const SEARCH: Capabilities = Capabilities {
    text: true,
    image: false,
    reasoning: false,
    code: false,
    translation: false,
    summary: true,
};

fn default_profiles() -> HashMap<String, ModelProfile> {
    let mut map = HashMap::new();
    map.insert(
        "claude-opus-4-1".to_string(),
        profile("anthropic", 15.0, 75.0, 5, 10, 10, FULL_MULTIMODAL, 200_000),
    );
    map.insert(
        "claude-sonnet-4-5".to_string(),
        profile("anthropic", 3.0, 15.0, 7, 9, 9, FULL_MULTIMODAL, 200_000),
    );
    map.insert(
        "claude-haiku-4-5".to_string(),
        profile("anthropic", 1.0, 5.0, 9, 7, 7, TEXT_CODE, 200_000),
    );
    map.insert(
        "gpt-4o".to_string(),
        profile("openai", 2.5, 10.0, 7, 8, 7, FULL_MULTIMODAL, 128_000),
    );
    map.insert(
        "gpt-4o-mini".to_string(),
        profile("openai", 0.15, 0.6, 9, 6, 5, LIGHT, 128_000),
    );
    map.insert(
        "gemini-2.5-pro".to_string(),
        profile("google", 1.25, 10.0, 6, 8, 8, FULL_MULTIMODAL, 1_000_000),
    );
    map.insert(
        "gemini-2.5-flash".to_string(),
        profile("google", 0.15, 0.6, 9, 6, 6, TEXT_CODE, 1_000_000),
    );
    map.insert(
        "sonar-pro".to_string(),
        profile("perplexity", 3.0, 15.0, 7, 7, 5, SEARCH, 200_000),
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_seeded() {
        let registry = ModelRegistry::with_defaults();
        assert!(!registry.is_empty());
        assert!(registry.get("claude-sonnet-4-5").is_some());
        assert!(registry.get("made-up-model").is_none());
    }

    #[test]
    fn config_overrides_win() {
        let mut overrides = HashMap::new();
        overrides.insert(
            "gpt-4o-mini".to_string(),
            profile("openai", 0.05, 0.2, 10, 6, 5, LIGHT, 128_000),
        );
        let registry = ModelRegistry::new(overrides);
        let p = registry.get("gpt-4o-mini").unwrap();
        assert_eq!(p.input_price, 0.05);
    }
}
