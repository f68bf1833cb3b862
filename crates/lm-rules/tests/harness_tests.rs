use lm_rules::builtin::{self, BUDGET_PACING, GEO_TARGETING};
use lm_rules::prelude::*;
use lm_rules::EntityStatus;
use lm_rules::Flight;
use lm_test_utils::{day, grid, CountingRule, FailingRule, FakeDataSource};
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;

fn ctx() -> RunContext {
    RunContext::new(day(2024, 3, 6))
}

#[tokio::test]
async fn test_disabled_rule_is_never_invoked() {
    let counting = CountingRule::new();
    let source = Arc::new(
        FakeDataSource::new().with_entities(Granularity::Campaign, vec![Entity::new("c1")]),
    );
    let harness = RuleHarness::new(
        source.clone(),
        vec![RuleDefinition::new("Counting", Granularity::Campaign, counting.clone())],
    )
    .unwrap();

    let toggles = RuleToggles::disabled(["Counting"]);
    let output = harness.validate(&RuleRange::new(), &toggles, &ctx()).await.unwrap();

    assert_eq!(counting.count(), 0);
    assert_eq!(source.calls.total(), 0);
    assert_eq!(output.results["Counting"], ExecutorResult::default());
    assert!(output.rules.contains_key("Counting"));
}

#[tokio::test]
async fn test_pacing_scenario_flags_sixty_percent() {
    let persisted = grid(&[
        &["", "", "", "", BUDGET_PACING, ""],
        &["", "", "", "", "", ""],
        &[
            "ID",
            "Name",
            "Advertiser ID",
            "Advertiser Name",
            "Min. Percent Ahead/Behind",
            "Max. Percent Ahead/Behind",
        ],
        &["default", "", "", "", "0", "0.5"],
        &["io1", "IO 1", "a1", "Adv", "0.2", ""],
    ]);
    let mut range = RuleRange::from_grid(&persisted);

    let io1 = Entity::new("io1")
        .with_name("IO 1")
        .with_advertiser("a1", "Adv")
        .with_budget(1000.0)
        .with_flight(Flight::new(day(2024, 3, 1), day(2024, 3, 11)));
    let source = FakeDataSource::new()
        .with_entities(Granularity::InsertionOrder, vec![io1])
        .with_spend("io1", 800.0);
    let harness = RuleHarness::new(Arc::new(source), vec![builtin::budget_pacing()]).unwrap();

    harness.fill_rule_values(&mut range, &ctx()).await.unwrap();
    let output = harness
        .validate(&range, &RuleToggles::all_enabled(), &ctx())
        .await
        .unwrap();

    let value = output.results[BUDGET_PACING].get("io1").unwrap();
    assert_eq!(value.value, "60%");
    assert!(value.anomalous);
    assert_eq!(output.status(BUDGET_PACING, "io1"), EntityStatus::Fail);
}

#[tokio::test]
async fn test_missing_field_aborts_the_pass() {
    let counting = CountingRule::new();
    let source = FakeDataSource::new()
        .with_entities(Granularity::LineItem, vec![Entity::new("li1")])
        .with_entities(Granularity::Campaign, vec![Entity::new("c1")]);
    let harness = RuleHarness::new(
        Arc::new(source),
        vec![
            builtin::geo_targeting(),
            RuleDefinition::new("Counting", Granularity::Campaign, counting.clone()),
        ],
    )
    .unwrap();

    let err = harness
        .validate(&RuleRange::new(), &RuleToggles::all_enabled(), &ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, RuleError::MissingField { ref field, .. } if field == "display_name"));
    assert_eq!(counting.count(), 0);

    // the failing rule can be switched off to let the rest run
    let output = harness
        .validate(&RuleRange::new(), &RuleToggles::disabled([GEO_TARGETING]), &ctx())
        .await
        .unwrap();
    assert_eq!(counting.count(), 1);
    assert!(output.results[GEO_TARGETING].is_empty());
}

#[tokio::test]
async fn test_evaluation_error_propagates_unchanged() {
    let harness = RuleHarness::new(
        Arc::new(FakeDataSource::new()),
        vec![RuleDefinition::new(
            "Broken",
            Granularity::Campaign,
            FailingRule("Broken".to_string()),
        )],
    )
    .unwrap();
    let err = harness
        .validate(&RuleRange::new(), &RuleToggles::all_enabled(), &ctx())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "rule 'Broken' failed: boom");
}

#[tokio::test]
async fn test_cached_client_fetches_each_list_once() {
    let client = Arc::new(CachedClient::new(
        FakeDataSource::new().with_entities(Granularity::Campaign, vec![Entity::new("c1")]),
    ));
    let harness = RuleHarness::new(
        client.clone(),
        vec![
            RuleDefinition::new("First", Granularity::Campaign, CountingRule::new()),
            RuleDefinition::new("Second", Granularity::Campaign, CountingRule::new()),
        ],
    )
    .unwrap();

    let output = harness
        .validate(&RuleRange::new(), &RuleToggles::all_enabled(), &ctx())
        .await
        .unwrap();
    assert_eq!(output.results.len(), 2);
    assert_eq!(client.inner().calls.list_entities.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_data_source_failure_is_retryable() {
    let harness = RuleHarness::new(
        Arc::new(FakeDataSource::new().failing("quota exceeded")),
        builtin::default_rules(),
    )
    .unwrap();
    let mut range = RuleRange::new();
    let err = harness.fill_rule_values(&mut range, &ctx()).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(range.section_count(), 0);
}
