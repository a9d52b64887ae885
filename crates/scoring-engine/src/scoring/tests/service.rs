use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::scoring::domain::{
    ConfigId, NewScoreCategory, QuestionnaireId, ResponseId, RiskLevel, RuleId, ScoringRuleUpdate,
    UpdateScoringConfig,
};
use crate::scoring::repository::{RepositoryError, ScoringRepository};
use crate::scoring::{
    LifecycleError, NoopAlertPublisher, ScoringError, ScoringOptions, ScoringService,
    ScoringServiceError,
};

fn default_create() -> crate::scoring::CreateScoringConfig {
    let mut data = gad7_create();
    data.is_default = true;
    data
}

fn defaults_for(service: &MemoryService) -> Vec<ConfigId> {
    service
        .get_by_questionnaire(&questionnaire_id())
        .expect("list succeeds")
        .into_iter()
        .filter(|config| config.is_default)
        .map(|config| config.id)
        .collect()
}

#[test]
fn create_assigns_ids_and_records_author() {
    let (service, repository, _) = build_service();

    let config = service.create(gad7_create(), "clinician-7").expect("creates");

    assert!(config.id.0.starts_with("cfg-"));
    assert_eq!(config.created_by, "clinician-7");
    assert_eq!(config.rules.len(), 4);
    assert!(config.rules.iter().all(|rule| rule.id.0.starts_with("rule-")));
    let stored = repository
        .fetch_config(&config.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored, config);
}

#[test]
fn get_propagates_not_found() {
    let (service, _, _) = build_service();

    match service.get(&ConfigId::from("cfg-missing")) {
        Err(ScoringServiceError::Lifecycle(LifecycleError::ConfigurationNotFound(id))) => {
            assert_eq!(id.0, "cfg-missing");
        }
        other => panic!("expected not found, got {other:?}"),
    }
}

#[test]
fn configurations_are_listed_newest_first() {
    let (service, _, _) = build_service();
    let first = service.create(gad7_create(), "a").expect("first");
    let second = service.create(gad7_create(), "b").expect("second");

    let listed: Vec<ConfigId> = service
        .get_by_questionnaire(&questionnaire_id())
        .expect("list succeeds")
        .into_iter()
        .map(|config| config.id)
        .collect();

    assert_eq!(listed, vec![second.id, first.id]);
}

#[test]
fn only_one_default_per_questionnaire() {
    let (service, _, _) = build_service();

    let first = service.create(default_create(), "a").expect("first");
    let second = service.create(default_create(), "b").expect("second");
    assert_eq!(defaults_for(&service), vec![second.id.clone()]);

    service.set_default(&first.id).expect("promote first");
    assert_eq!(defaults_for(&service), vec![first.id.clone()]);

    let third = service.create(gad7_create(), "c").expect("third");
    service
        .update(
            &third.id,
            UpdateScoringConfig {
                is_default: Some(true),
                ..UpdateScoringConfig::default()
            },
        )
        .expect("promote third");
    assert_eq!(defaults_for(&service), vec![third.id.clone()]);

    let fetched = service
        .get_default(&questionnaire_id())
        .expect("lookup succeeds")
        .expect("default present");
    assert_eq!(fetched.id, third.id);
}

#[test]
fn concurrent_promotions_leave_a_single_default() {
    let (service, _, _) = build_service();
    let service = Arc::new(service);
    let ids: Vec<ConfigId> = (0..6)
        .map(|index| {
            service
                .create(gad7_create(), &format!("author-{index}"))
                .expect("creates")
                .id
        })
        .collect();

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.set_default(&id).expect("promotion succeeds"))
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread completes");
    }

    assert_eq!(defaults_for(&service).len(), 1);
}

#[test]
fn other_questionnaires_keep_their_default() {
    let (service, _, _) = build_service();
    let mut other = default_create();
    other.questionnaire_id = "phq-9".into();
    let other = service.create(other, "a").expect("other questionnaire");

    service.create(default_create(), "b").expect("gad default");

    let still_default = service.get(&other.id).expect("fetch");
    assert!(still_default.is_default);
}

#[test]
fn invalid_configuration_cannot_become_default() {
    let (service, _, _) = build_service();
    let mut data = default_create();
    data.rules.clear();

    match service.create(data, "a") {
        Err(ScoringServiceError::Lifecycle(LifecycleError::DefaultRequiresValid {
            errors, ..
        })) => {
            assert_eq!(errors, vec!["At least one scoring rule is required".to_string()]);
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(service
        .get_by_questionnaire(&questionnaire_id())
        .expect("list succeeds")
        .is_empty());
}

#[test]
fn inactive_configuration_cannot_become_default() {
    let (service, _, _) = build_service();
    let mut data = gad7_create();
    data.is_active = false;
    let config = service.create(data, "a").expect("creates inactive");

    assert!(matches!(
        service.set_default(&config.id),
        Err(ScoringServiceError::Lifecycle(LifecycleError::DefaultRequiresActive(_)))
    ));
}

#[test]
fn default_configuration_cannot_be_deactivated() {
    let (service, _, _) = build_service();
    let config = service.create(default_create(), "a").expect("creates");

    let outcome = service.update(
        &config.id,
        UpdateScoringConfig {
            is_active: Some(false),
            ..UpdateScoringConfig::default()
        },
    );

    assert!(matches!(
        outcome,
        Err(ScoringServiceError::Lifecycle(LifecycleError::DefaultRequiresActive(_)))
    ));
    assert!(service.get(&config.id).expect("fetch").is_active);
}

#[test]
fn update_merges_only_supplied_fields() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");

    let updated = service
        .update(
            &config.id,
            UpdateScoringConfig {
                name: Some("GAD-7 (revised)".to_string()),
                passing_score: Some(5),
                ..UpdateScoringConfig::default()
            },
        )
        .expect("updates");

    assert_eq!(updated.name, "GAD-7 (revised)");
    assert_eq!(updated.passing_score, Some(5));
    assert_eq!(updated.description, config.description);
    assert_eq!(updated.rules, config.rules);
    assert!(updated.updated_at >= config.updated_at);
    assert_eq!(service.get(&config.id).expect("fetch"), updated);
}

#[test]
fn add_then_delete_rule_restores_rule_set() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");

    let added = service
        .add_rule(&config.id, new_rule(22, 30, RiskLevel::Critical, "Off the chart"))
        .expect("adds rule");
    assert_eq!(service.get(&config.id).expect("fetch").rules.len(), 5);
    assert_eq!(
        service.validate(&config.id).expect("validates"),
        vec!["Last rule must end at max score 21 (ends at 30)".to_string()]
    );

    let removed = service.delete_rule(&config.id, &added.id).expect("deletes");
    assert_eq!(removed, added);
    assert_eq!(service.get(&config.id).expect("fetch").rules, config.rules);
}

#[test]
fn update_rule_changes_classification() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");
    let low = config.rules[0].id.clone();

    let updated = service
        .update_rule(
            &config.id,
            &low,
            ScoringRuleUpdate {
                label: Some("None to minimal".to_string()),
                actions: Some(vec!["Rescreen in 12 months".to_string()]),
                ..ScoringRuleUpdate::default()
            },
        )
        .expect("updates rule");

    assert_eq!(updated.label, "None to minimal");
    assert_eq!(updated.min_score, 0);

    let result = service
        .score_response(&config.id, &score_request("resp-rule", &[0.0; 7]))
        .expect("scores");
    assert_eq!(result.risk_label, "None to minimal");
    assert_eq!(result.actions, vec!["Rescreen in 12 months".to_string()]);
}

#[test]
fn rule_operations_report_unknown_rule() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");
    let missing = RuleId::from("rule-missing");

    assert!(matches!(
        service.delete_rule(&config.id, &missing),
        Err(ScoringServiceError::Lifecycle(LifecycleError::RuleNotFound { .. }))
    ));
    assert!(matches!(
        service.update_rule(&config.id, &missing, ScoringRuleUpdate::default()),
        Err(ScoringServiceError::Lifecycle(LifecycleError::RuleNotFound { .. }))
    ));
}

#[test]
fn delete_removes_configuration() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");

    let removed = service.delete(&config.id).expect("deletes");
    assert_eq!(removed.id, config.id);
    assert!(matches!(
        service.delete(&config.id),
        Err(ScoringServiceError::Lifecycle(LifecycleError::ConfigurationNotFound(_)))
    ));
}

#[test]
fn score_response_persists_and_alerts_on_elevated_risk() {
    let (service, repository, alerts) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");

    let critical = service
        .score_response(&config.id, &score_request("resp-critical", &[3.0; 7]))
        .expect("scores");
    service
        .score_response(&config.id, &score_request("resp-low", &[0.0; 7]))
        .expect("scores");

    assert_eq!(critical.risk_level, RiskLevel::Critical);
    let stored = repository
        .results_for_config(&config.id)
        .expect("results readable");
    assert_eq!(stored.len(), 2);

    let events = alerts.events();
    assert_eq!(events.len(), 1, "only elevated results should alert");
    assert_eq!(events[0].response_id, ResponseId::from("resp-critical"));
    assert_eq!(events[0].normalized_score, 21);
    assert_eq!(events[0].actions.len(), 2);
}

#[test]
fn undeliverable_alert_keeps_the_stored_result() {
    let repository = Arc::new(crate::scoring::InMemoryScoringRepository::default());
    let service = ScoringService::new(
        repository.clone(),
        Arc::new(UnreachableAlerts),
        ScoringOptions::default(),
    );
    let config = service.create(gad7_create(), "a").expect("creates");

    let result = service
        .score_response(&config.id, &score_request("resp-critical", &[3.0; 7]))
        .expect("alert failure does not fail scoring");

    assert_eq!(result.risk_level, RiskLevel::Critical);
    let stored = repository
        .results_for_config(&config.id)
        .expect("results readable");
    assert_eq!(stored.len(), 1);
}

#[test]
fn idle_questionnaire_locks_are_released() {
    let (service, _, _) = build_service();

    for questionnaire in ["gad-7", "phq-9", "audit-c"] {
        let mut data = gad7_create();
        data.questionnaire_id = QuestionnaireId::from(questionnaire);
        service.create(data, "a").expect("creates");
    }

    assert_eq!(service.tracked_questionnaire_locks(), 1);
}

#[test]
fn inactive_configuration_is_not_used_for_scoring() {
    let (service, _, _) = build_service();
    let mut data = gad7_create();
    data.is_active = false;
    let config = service.create(data, "a").expect("creates");

    assert!(matches!(
        service.score_response(&config.id, &score_request("resp-1", &[1.0; 7])),
        Err(ScoringServiceError::Lifecycle(LifecycleError::InactiveConfiguration(_)))
    ));
}

#[test]
fn batch_scoring_continues_past_failures() {
    let (service, repository, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");

    let mut foreign = score_request("resp-foreign", &[1.0; 7]);
    foreign.response.questionnaire_id = "phq-9".into();
    let requests = vec![
        score_request("resp-a", &[1.0; 7]),
        foreign,
        score_request("resp-b", &[2.0; 7]),
    ];

    let outcomes = service.score_batch(&config.id, &requests);

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_ok());
    assert!(matches!(
        outcomes[1],
        Err(ScoringServiceError::Scoring(ScoringError::QuestionnaireMismatch { .. }))
    ));
    assert_eq!(
        outcomes[2].as_ref().expect("third scores").normalized_score,
        14
    );
    assert_eq!(
        repository
            .results_for_config(&config.id)
            .expect("results readable")
            .len(),
        2
    );
}

#[test]
fn scores_for_response_returns_every_configuration_result() {
    let (service, _, _) = build_service();
    let sum = service.create(gad7_create(), "a").expect("sum config");
    let mut average = gad7_create();
    average.scoring_method = crate::scoring::ScoringMethod::Average;
    average.max_score = 3;
    average.rules = vec![
        new_rule(0, 1, RiskLevel::Low, "Low"),
        new_rule(2, 3, RiskLevel::High, "High"),
    ];
    let average = service.create(average, "a").expect("average config");

    let request = score_request("resp-shared", &[2.0; 7]);
    service.score_response(&sum.id, &request).expect("sum scores");
    service
        .score_response(&average.id, &request)
        .expect("average scores");

    let results = service
        .scores_for_response(&ResponseId::from("resp-shared"))
        .expect("results present");
    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|result| result.config_id == sum.id));
    assert!(results.iter().any(|result| result.config_id == average.id));

    assert!(matches!(
        service.scores_for_response(&ResponseId::from("resp-unknown")),
        Err(ScoringServiceError::Lifecycle(LifecycleError::ScoresNotFound(_)))
    ));
}

#[test]
fn categories_feed_category_scores() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");
    let somatic = service
        .create_category(NewScoreCategory {
            questionnaire_id: questionnaire_id(),
            name: "Somatic".to_string(),
            description: None,
            question_ids: vec!["1".into(), "2".into()],
            weight: 1.5,
            color: "#F59E0B".to_string(),
            order_num: 0,
        })
        .expect("creates category");

    let listed = service
        .categories_for_questionnaire(&questionnaire_id())
        .expect("lists");
    assert_eq!(listed, vec![somatic.clone()]);

    let result = service
        .score_response(&config.id, &score_request("resp-cat", &[2.0; 7]))
        .expect("scores");
    let scores = result.category_scores.expect("category scores present");
    assert_eq!(scores[0].category_id, somatic.id);
    assert_eq!(scores[0].score, 4.0);
    assert_eq!(scores[0].weighted_score, 6.0);

    service.delete_category(&somatic.id).expect("deletes");
    assert!(matches!(
        service.delete_category(&somatic.id),
        Err(ScoringServiceError::Lifecycle(LifecycleError::CategoryNotFound(_)))
    ));
}

#[test]
fn analytics_summarize_stored_results() {
    let (service, _, _) = build_service();
    let config = service.create(gad7_create(), "a").expect("creates");

    for (id, values) in [
        ("resp-1", [3.0; 7]),
        ("resp-2", [0.0; 7]),
        ("resp-3", [1.0, 1.0, 2.0, 1.0, 0.0, 1.0, 1.0]),
    ] {
        service
            .score_response(&config.id, &score_request(id, &values))
            .expect("scores");
    }

    let analytics = service.get_analytics(&config.id).expect("analytics");
    assert_eq!(analytics.total_responses, 3);
    assert_eq!(analytics.average_score, 9.33);
    assert_eq!(analytics.risk_distribution[&RiskLevel::Critical], 1);
    assert_eq!(analytics.risk_distribution[&RiskLevel::Medium], 1);
    assert_eq!(analytics.risk_distribution[&RiskLevel::Low], 1);
    assert_eq!(analytics.risk_distribution[&RiskLevel::High], 0);
    assert_eq!(analytics.risk_distribution[&RiskLevel::None], 0);
    let trended: usize = analytics.trend.iter().map(|point| point.responses).sum();
    assert_eq!(trended, 3);
}

#[test]
fn analytics_for_unscored_configuration_are_empty() {
    let (service, _, _) = build_service();
    let analytics = service
        .get_analytics(&ConfigId::from("cfg-unscored"))
        .expect("analytics");

    assert_eq!(analytics.total_responses, 0);
    assert_eq!(analytics.average_score, 0.0);
    assert!(analytics.trend.is_empty());
}

#[test]
fn repository_failures_propagate() {
    let service = ScoringService::new(
        Arc::new(UnavailableRepository),
        Arc::new(NoopAlertPublisher),
        ScoringOptions::default(),
    );

    assert!(matches!(
        service.create(gad7_create(), "a"),
        Err(ScoringServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        service.get(&ConfigId::from("cfg-1")),
        Err(ScoringServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
}
