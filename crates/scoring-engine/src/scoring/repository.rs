use serde::{Deserialize, Serialize};

use super::domain::{
    CategoryId, ConfigId, QuestionnaireId, ResponseId, RiskLevel, ScoreCategory, ScoreResult,
    ScoringConfiguration,
};

/// Storage abstraction for configurations, categories and computed results.
///
/// Implementations return owned snapshots; the service serializes writers per
/// questionnaire on top of this trait.
pub trait ScoringRepository: Send + Sync {
    fn insert_config(
        &self,
        config: ScoringConfiguration,
    ) -> Result<ScoringConfiguration, RepositoryError>;
    fn update_config(&self, config: ScoringConfiguration) -> Result<(), RepositoryError>;
    fn fetch_config(&self, id: &ConfigId) -> Result<Option<ScoringConfiguration>, RepositoryError>;
    fn configs_for_questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoringConfiguration>, RepositoryError>;
    fn remove_config(&self, id: &ConfigId)
        -> Result<Option<ScoringConfiguration>, RepositoryError>;

    fn insert_category(&self, category: ScoreCategory) -> Result<ScoreCategory, RepositoryError>;
    fn categories_for_questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoreCategory>, RepositoryError>;
    fn remove_category(&self, id: &CategoryId) -> Result<Option<ScoreCategory>, RepositoryError>;

    fn save_result(&self, result: ScoreResult) -> Result<(), RepositoryError>;
    fn results_for_config(&self, id: &ConfigId) -> Result<Vec<ScoreResult>, RepositoryError>;
    fn results_for_response(&self, id: &ResponseId) -> Result<Vec<ScoreResult>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for risk-driven automation (alerts, e-mail, case management).
pub trait RiskAlertPublisher: Send + Sync {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError>;
}

/// Payload emitted when a response is classified at an elevated risk level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub response_id: ResponseId,
    pub config_id: ConfigId,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub normalized_score: i32,
    pub actions: Vec<String>,
}

impl RiskAlert {
    pub fn from_result(result: &ScoreResult) -> Self {
        Self {
            response_id: result.response_id.clone(),
            config_id: result.config_id.clone(),
            risk_level: result.risk_level,
            risk_label: result.risk_label.clone(),
            normalized_score: result.normalized_score,
            actions: result.actions.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Publisher that drops every alert, for hosts without risk automation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAlertPublisher;

impl RiskAlertPublisher for NoopAlertPublisher {
    fn publish(&self, _alert: RiskAlert) -> Result<(), AlertError> {
        Ok(())
    }
}
