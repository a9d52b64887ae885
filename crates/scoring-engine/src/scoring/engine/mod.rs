mod aggregation;
mod categories;
pub mod formula;
mod matcher;
mod options;
mod projection;
mod resolver;

pub use aggregation::{aggregate, Aggregate, QuestionScore};
pub use formula::{Formula, FormulaError};
pub use matcher::{match_rule, RiskMatch};
pub use options::ScoringOptions;
pub use projection::{project, to_percentage};
pub use resolver::resolve_score;

pub(crate) use projection::round2;

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use super::domain::{
    Answer, ConfigId, Question, QuestionId, QuestionnaireId, Response, ResponseId,
    ScoreCategory, ScoreResult, ScoringConfiguration,
};

/// Hard failures that stop one response from being scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("unsupported scoring method '{0}'")]
    UnsupportedMethod(String),
    #[error("custom scoring method requires a formula")]
    MissingFormula,
    #[error("configuration {config_id} has an invalid score range ({min_score}..={max_score})")]
    InvalidRange {
        config_id: ConfigId,
        min_score: i32,
        max_score: i32,
    },
    #[error(
        "response {response_id} belongs to questionnaire {response_questionnaire}, configuration targets {config_questionnaire}"
    )]
    QuestionnaireMismatch {
        response_id: ResponseId,
        response_questionnaire: QuestionnaireId,
        config_questionnaire: QuestionnaireId,
    },
}

/// Stateless engine turning answers and a configuration into a [`ScoreResult`].
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    options: ScoringOptions,
}

impl ScoringEngine {
    pub fn new(options: ScoringOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    pub fn score(
        &self,
        response: &Response,
        answers: &[Answer],
        questions: &[Question],
        config: &ScoringConfiguration,
        categories: &[ScoreCategory],
    ) -> Result<ScoreResult, ScoringError> {
        if response.questionnaire_id != config.questionnaire_id {
            return Err(ScoringError::QuestionnaireMismatch {
                response_id: response.id.clone(),
                response_questionnaire: response.questionnaire_id.clone(),
                config_questionnaire: config.questionnaire_id.clone(),
            });
        }
        if config.max_score <= config.min_score {
            return Err(ScoringError::InvalidRange {
                config_id: config.id.clone(),
                min_score: config.min_score,
                max_score: config.max_score,
            });
        }

        let answers_by_question: HashMap<&QuestionId, &Answer> = answers
            .iter()
            .map(|answer| (&answer.question_id, answer))
            .collect();

        let aggregate = aggregate(config, questions, &answers_by_question, &self.options)?;
        let normalized_score = normalize(aggregate.raw_total, config.min_score, config.max_score);
        let percentage = to_percentage(normalized_score, config.min_score, config.max_score);
        let risk = match_rule(normalized_score, &config.rules);
        let visualization_data = project(normalized_score, &risk, config);

        let category_scores = if categories.is_empty() {
            None
        } else {
            Some(categories::category_scores(
                categories,
                &aggregate.question_scores,
            ))
        };

        debug!(
            response_id = %response.id,
            config_id = %config.id,
            method = config.scoring_method.label(),
            raw_total = aggregate.raw_total,
            normalized_score,
            risk_level = risk.risk_level.label(),
            "scored response"
        );

        Ok(ScoreResult {
            response_id: response.id.clone(),
            config_id: config.id.clone(),
            total_score: aggregate.raw_total,
            normalized_score,
            percentage,
            risk_level: risk.risk_level,
            risk_label: risk.label,
            risk_color: risk.color,
            actions: risk.actions,
            category_scores,
            visualization_data,
            calculated_at: Utc::now(),
            evaluation_error: aggregate.evaluation_error,
        })
    }
}

/// Clamp into the configured bounds and round half up to the nearest integer.
///
/// A NaN total has no position in the range and lands on `min_score`.
pub fn normalize(raw_total: f64, min_score: i32, max_score: i32) -> i32 {
    if max_score < min_score || raw_total.is_nan() {
        return min_score;
    }
    let clamped = raw_total.clamp(f64::from(min_score), f64::from(max_score));
    (clamped + 0.5).floor() as i32
}
