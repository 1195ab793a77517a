use costops::cache::CacheInsert;
use costops::config::Config;
use costops::manager::CostOptimizationManager;
use costops::tracker::HistoryQuery;
use costops::types::{Period, SuggestionKind, UsageParams};
use tempfile::TempDir;

fn config_with_data_dir(dir: &TempDir, extra: &str) -> Config {
    let toml = format!(
        r#"
[tracking]
data_dir = "{}"

[pricing."acme/writer"]
input = 1000000.0
output = 0.0

{extra}
"#,
        dir.path().display()
    );
    Config::parse(&toml).unwrap()
}

fn usage(agent: &str, model: &str, input_tokens: u64) -> UsageParams {
    UsageParams {
        agent_id: agent.to_string(),
        provider: "acme".to_string(),
        model: model.to_string(),
        input_tokens,
        output_tokens: 0,
        ..UsageParams::default()
    }
}

#[test]
fn tracked_usage_flows_into_history_and_dashboard() {
    let dir = TempDir::new().unwrap();
    let manager = CostOptimizationManager::from_config(config_with_data_dir(&dir, ""));

    // $1 per token under the test pricing table.
    manager.track_usage(usage("agent-1", "writer", 3)).unwrap();
    manager.track_usage(usage("agent-1", "writer", 2)).unwrap();
    manager.track_usage(usage("agent-2", "writer", 10)).unwrap();

    let history = manager
        .usage_history(
            &HistoryQuery {
                agent_id: Some("agent-1".to_string()),
                ..HistoryQuery::default()
            },
            Period::Day,
        )
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].request_count, 2);
    assert!((history[0].total_cost - 5.0).abs() < 1e-9);

    let metrics = manager.usage_dashboard(None).unwrap();
    assert_eq!(metrics.today.requests, 3);
    assert!((metrics.today.cost - 15.0).abs() < 1e-9);
    assert_eq!(metrics.top_models.len(), 1);
    assert_eq!(metrics.top_models[0].model, "writer");

    let scoped = manager.usage_dashboard(Some("agent-2")).unwrap();
    assert_eq!(scoped.today.requests, 1);
    assert!((scoped.today.cost - 10.0).abs() < 1e-9);
}

#[test]
fn budget_ceiling_denies_through_the_facade() {
    let dir = TempDir::new().unwrap();
    let manager = CostOptimizationManager::from_config(config_with_data_dir(
        &dir,
        r#"
[budget]
daily = 10.0

[budget.cheaper_alternatives]
"writer" = "drafter"
"#,
    ));

    manager.track_usage(usage("agent-1", "writer", 9)).unwrap();

    let denied = manager.check_budget_constraints("agent-1", "writer", 2.0);
    assert!(!denied.allowed);
    assert_eq!(denied.alternative_model.as_deref(), Some("drafter"));

    // Another agent has no spend today, so the same request passes.
    let other = manager.check_budget_constraints("agent-2", "writer", 2.0);
    assert!(other.allowed);
}

#[test]
fn repeated_prompts_hit_the_cache() {
    let dir = TempDir::new().unwrap();
    let mut manager = CostOptimizationManager::from_config(config_with_data_dir(&dir, ""));

    assert!(manager.cached_response("summarize x", None, None).is_none());

    manager.cache_response(
        "summarize x",
        None,
        None,
        CacheInsert {
            response: "a summary".to_string(),
            cost: 0.25,
            ..CacheInsert::default()
        },
    );

    let first = manager.cached_response("summarize x", None, None).unwrap();
    assert_eq!(first.response, "a summary");
    let second = manager.cached_response("summarize x", None, None).unwrap();
    assert_eq!(second.hit_count, 2);

    // Different prompt text is a different key.
    assert!(manager.cached_response("summarize y", None, None).is_none());

    let stats = manager.cache_stats().unwrap();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.total_hits, 2);
    assert!((stats.total_cost_saved - 0.5).abs() < 1e-9);

    assert!(manager.clear_cache());
    assert!(manager.cached_response("summarize x", None, None).is_none());
}

#[test]
fn expensive_models_yield_substitution_suggestions() {
    let dir = TempDir::new().unwrap();
    let manager = CostOptimizationManager::from_config(config_with_data_dir(
        &dir,
        r#"
[optimization]
cost_threshold = 10.0

[budget.cheaper_alternatives]
"writer" = "drafter"
"#,
    ));

    manager.track_usage(usage("agent-1", "writer", 20)).unwrap();

    let suggestions = manager.optimization_suggestions();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].kind, SuggestionKind::ModelSubstitution);
    assert!(suggestions[0].message.contains("drafter"));
    assert!((suggestions[0].estimated_savings - 10.0).abs() < 1e-9);
}

#[test]
fn high_volume_without_cache_suggests_enabling_it() {
    let dir = TempDir::new().unwrap();
    let manager = CostOptimizationManager::from_config(config_with_data_dir(
        &dir,
        r#"
[cache]
enabled = false

[optimization]
volume_threshold = 2
"#,
    ));

    for _ in 0..3 {
        manager.track_usage(usage("agent-1", "writer", 1)).unwrap();
    }

    let suggestions = manager.optimization_suggestions();
    assert!(suggestions
        .iter()
        .any(|s| s.kind == SuggestionKind::EnableCaching));
}
