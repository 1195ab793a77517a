use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::budget::BudgetSettings;
use crate::pricing::ModelPricing;
use crate::types::ModelProfile;

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "costops")
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub cache: CacheConfig,
    pub budget: BudgetConfig,
    pub optimization: OptimizationConfig,
    /// `"provider/model"` or `{ primary = "provider/model" }`.
    pub default_model: Option<DefaultModel>,
    /// Pricing table keyed `provider/model` (or bare model), USD per 1M tokens.
    pub pricing: HashMap<String, ModelPricing>,
    /// Model profile overrides merged over the built-in registry defaults.
    pub models: HashMap<String, ModelProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    pub data_dir: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Disk,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackendKind,
    pub dir: Option<PathBuf>,
    pub max_entries: usize,
    pub default_ttl_secs: u64,
    /// Whether sampling parameters participate in the cache key.
    pub include_temperature: bool,
    pub include_max_tokens: bool,
    pub model_ttl_secs: HashMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            dir: None,
            max_entries: 1000,
            default_ttl_secs: 3600,
            include_temperature: true,
            include_max_tokens: true,
            model_ttl_secs: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub enabled: bool,
    pub daily: Option<f64>,
    pub weekly: Option<f64>,
    pub monthly: Option<f64>,
    pub model_cost_thresholds: HashMap<String, f64>,
    pub cheaper_alternatives: HashMap<String, String>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily: None,
            weekly: None,
            monthly: None,
            model_cost_thresholds: HashMap::new(),
            cheaper_alternatives: HashMap::new(),
        }
    }
}

impl BudgetConfig {
    pub fn settings(&self) -> BudgetSettings {
        BudgetSettings {
            daily: self.daily,
            weekly: self.weekly,
            monthly: self.monthly,
            model_cost_thresholds: self.model_cost_thresholds.clone(),
            cheaper_alternatives: self.cheaper_alternatives.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    pub enabled: bool,
    /// Absolute monthly per-model cost above which a substitution is suggested.
    pub cost_threshold: f64,
    /// Monthly request volume above which enabling caching is suggested.
    pub volume_threshold: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cost_threshold: 10.0,
            volume_threshold: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefaultModel {
    Spec(String),
    Primary { primary: String },
}

impl DefaultModel {
    pub fn spec(&self) -> &str {
        match self {
            DefaultModel::Spec(s) => s,
            DefaultModel::Primary { primary } => primary,
        }
    }
}

impl Config {
    /// Directory holding the per-day usage record files.
    pub fn records_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.tracking.data_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|d| d.data_dir().join("records"))
            .unwrap_or_else(|| PathBuf::from("records"))
    }

    /// Directory holding disk-backend cache entry files.
    pub fn cache_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.cache.dir {
            return dir.clone();
        }
        project_dirs()
            .map(|d| d.cache_dir().join("responses"))
            .unwrap_or_else(|| PathBuf::from("cache"))
    }

    pub fn parse(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }
}

fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|d| d.config_dir().join("config.toml"))
}

/// Load the config from the given path, or the platform default location.
/// A missing file yields defaults; an invalid file warns and yields
/// defaults rather than failing the caller.
pub fn load_config(path: Option<&Path>) -> Config {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Config::default(),
        },
    };

    let Ok(data) = fs::read_to_string(&path) else {
        return Config::default();
    };

    match Config::parse(&data) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: invalid config at {}: {}", path.display(), e);
            Config::default()
        }
    }
}
