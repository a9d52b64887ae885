use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response as HttpResponse;
use chrono::Utc;
use serde_json::Value;

use crate::scoring::domain::{
    Answer, CategoryId, ConfigId, CreateScoringConfig, NewScoringRule, Question, QuestionId,
    QuestionMetadata, QuestionScoring, QuestionType, QuestionnaireId, Response, ResponseId,
    RiskLevel, RuleId, ScoreCategory, ScoreRequest, ScoreResult, ScoringConfiguration,
    ScoringMethod, VisualizationType,
};
use crate::scoring::repository::{
    AlertError, RepositoryError, RiskAlert, RiskAlertPublisher, ScoringRepository,
};
use crate::scoring::{InMemoryScoringRepository, ScoringOptions, ScoringService};

pub(super) const QUESTIONNAIRE: &str = "gad-7";

pub(super) fn questionnaire_id() -> QuestionnaireId {
    QuestionnaireId::from(QUESTIONNAIRE)
}

pub(super) fn likert_options() -> Vec<String> {
    [
        "Not at all",
        "Several days",
        "More than half the days",
        "Nearly every day",
    ]
    .iter()
    .map(|option| option.to_string())
    .collect()
}

pub(super) fn likert_question(id: &str) -> Question {
    Question {
        id: QuestionId::from(id),
        questionnaire_id: questionnaire_id(),
        question_type: QuestionType::Likert,
        options: Some(likert_options()),
        metadata: None,
    }
}

pub(super) fn question_of(id: &str, question_type: QuestionType) -> Question {
    Question {
        id: QuestionId::from(id),
        questionnaire_id: questionnaire_id(),
        question_type,
        options: None,
        metadata: None,
    }
}

pub(super) fn with_scoring(mut question: Question, scoring: QuestionScoring) -> Question {
    question.metadata = Some(QuestionMetadata {
        scoring: Some(scoring),
    });
    question
}

/// Seven Likert items with ids "1" through "7".
pub(super) fn gad7_questions() -> Vec<Question> {
    (1..=7).map(|id| likert_question(&id.to_string())).collect()
}

pub(super) fn numeric_answer(question_id: &str, value: f64) -> Answer {
    Answer {
        question_id: QuestionId::from(question_id),
        value: None,
        numeric_value: Some(value),
        boolean_value: None,
    }
}

pub(super) fn text_answer(question_id: &str, value: &str) -> Answer {
    Answer {
        question_id: QuestionId::from(question_id),
        value: Some(value.to_string()),
        numeric_value: None,
        boolean_value: None,
    }
}

pub(super) fn boolean_answer(question_id: &str, value: bool) -> Answer {
    Answer {
        question_id: QuestionId::from(question_id),
        value: None,
        numeric_value: None,
        boolean_value: Some(value),
    }
}

/// Numeric answers for questions "1", "2", ... in order.
pub(super) fn likert_answers(values: &[f64]) -> Vec<Answer> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| numeric_answer(&(index + 1).to_string(), *value))
        .collect()
}

pub(super) fn response(id: &str) -> Response {
    Response {
        id: ResponseId::from(id),
        questionnaire_id: questionnaire_id(),
        score: None,
        risk_level: None,
        completion_time: Some(95),
        submitted_at: Some(Utc::now()),
    }
}

pub(super) fn score_request(response_id: &str, values: &[f64]) -> ScoreRequest {
    ScoreRequest {
        response: response(response_id),
        answers: likert_answers(values),
        questions: gad7_questions(),
    }
}

pub(super) fn new_rule(min: i32, max: i32, level: RiskLevel, label: &str) -> NewScoringRule {
    NewScoringRule {
        min_score: min,
        max_score: max,
        risk_level: level,
        label: label.to_string(),
        description: None,
        color: "#10B981".to_string(),
        actions: Vec::new(),
        order_num: 0,
    }
}

pub(super) fn gad7_rules() -> Vec<NewScoringRule> {
    let mut critical = new_rule(15, 21, RiskLevel::Critical, "Severe anxiety");
    critical.color = "#DC2626".to_string();
    critical.actions = vec![
        "Refer to clinician".to_string(),
        "Schedule follow-up".to_string(),
    ];
    critical.order_num = 3;

    let mut high = new_rule(10, 14, RiskLevel::High, "Moderate anxiety");
    high.order_num = 2;
    let mut medium = new_rule(5, 9, RiskLevel::Medium, "Mild anxiety");
    medium.order_num = 1;

    vec![
        new_rule(0, 4, RiskLevel::Low, "Minimal anxiety"),
        medium,
        high,
        critical,
    ]
}

pub(super) fn gad7_create() -> CreateScoringConfig {
    CreateScoringConfig {
        questionnaire_id: questionnaire_id(),
        name: "GAD-7".to_string(),
        description: Some("Generalized anxiety screener".to_string()),
        scoring_method: ScoringMethod::Sum,
        weights: BTreeMap::new(),
        formula: None,
        formula_variables: BTreeMap::new(),
        max_score: 21,
        min_score: 0,
        passing_score: None,
        visualization_type: VisualizationType::Gauge,
        visualization_config: None,
        is_active: true,
        is_default: false,
        rules: gad7_rules(),
    }
}

/// Stored configuration built directly, without the lifecycle service.
pub(super) fn gad7_config() -> ScoringConfiguration {
    config_from(gad7_create())
}

pub(super) fn config_from(data: CreateScoringConfig) -> ScoringConfiguration {
    let mut sequence = 0;
    data.into_configuration(ConfigId::from("cfg-fixture"), "fixture", Utc::now(), || {
        sequence += 1;
        RuleId(format!("rule-fixture-{sequence}"))
    })
}

pub(super) fn category(
    id: &str,
    name: &str,
    questions: &[&str],
    weight: f64,
    order: u32,
) -> ScoreCategory {
    ScoreCategory {
        id: CategoryId::from(id),
        questionnaire_id: questionnaire_id(),
        name: name.to_string(),
        description: None,
        question_ids: questions.iter().map(|id| QuestionId::from(*id)).collect(),
        weight,
        color: "#6366F1".to_string(),
        order_num: order,
        created_at: Utc::now(),
    }
}

pub(super) type MemoryService = ScoringService<InMemoryScoringRepository, MemoryAlerts>;

pub(super) fn build_service() -> (
    MemoryService,
    Arc<InMemoryScoringRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(InMemoryScoringRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = ScoringService::new(
        repository.clone(),
        alerts.clone(),
        ScoringOptions::default(),
    );
    (service, repository, alerts)
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<RiskAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<RiskAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl RiskAlertPublisher for MemoryAlerts {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

/// Publisher whose transport is down.
pub(super) struct UnreachableAlerts;

impl RiskAlertPublisher for UnreachableAlerts {
    fn publish(&self, _alert: RiskAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("pager offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

fn offline() -> RepositoryError {
    RepositoryError::Unavailable("database offline".to_string())
}

impl ScoringRepository for UnavailableRepository {
    fn insert_config(
        &self,
        _config: ScoringConfiguration,
    ) -> Result<ScoringConfiguration, RepositoryError> {
        Err(offline())
    }

    fn update_config(&self, _config: ScoringConfiguration) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn fetch_config(&self, _id: &ConfigId) -> Result<Option<ScoringConfiguration>, RepositoryError> {
        Err(offline())
    }

    fn configs_for_questionnaire(
        &self,
        _questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoringConfiguration>, RepositoryError> {
        Err(offline())
    }

    fn remove_config(
        &self,
        _id: &ConfigId,
    ) -> Result<Option<ScoringConfiguration>, RepositoryError> {
        Err(offline())
    }

    fn insert_category(&self, _category: ScoreCategory) -> Result<ScoreCategory, RepositoryError> {
        Err(offline())
    }

    fn categories_for_questionnaire(
        &self,
        _questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoreCategory>, RepositoryError> {
        Err(offline())
    }

    fn remove_category(&self, _id: &CategoryId) -> Result<Option<ScoreCategory>, RepositoryError> {
        Err(offline())
    }

    fn save_result(&self, _result: ScoreResult) -> Result<(), RepositoryError> {
        Err(offline())
    }

    fn results_for_config(&self, _id: &ConfigId) -> Result<Vec<ScoreResult>, RepositoryError> {
        Err(offline())
    }

    fn results_for_response(&self, _id: &ResponseId) -> Result<Vec<ScoreResult>, RepositoryError> {
        Err(offline())
    }
}

pub(super) async fn read_json_body(response: HttpResponse) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
