//! Questionnaire scoring, risk classification and configuration lifecycle.
//!
//! The [`engine`] is pure: answers plus a configuration in, a [`ScoreResult`] out. The
//! [`ScoringService`] owns configuration state behind a [`ScoringRepository`] and is the
//! only place that mutates it.

pub mod analytics;
pub mod domain;
pub mod engine;
pub mod export;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use analytics::{ScoreAnalytics, TrendPoint};
pub use domain::{
    Answer, CategoryId, CategoryScore, ConfigId, CreateScoringConfig, NewScoreCategory,
    NewScoringRule, Question, QuestionId, QuestionMetadata, QuestionScoring, QuestionType,
    QuestionnaireId, Response, ResponseId, RiskLevel, RuleId, ScoreCategory, ScoreRequest,
    ScoreResult, ScoringConfiguration, ScoringMethod, ScoringPoints, ScoringRule,
    ScoringRuleUpdate, UpdateScoringConfig, VisualizationData, VisualizationType,
    VisualizationZone,
};
pub use engine::{RiskMatch, ScoringEngine, ScoringError, ScoringOptions};
pub use export::write_results_csv;
pub use memory::InMemoryScoringRepository;
pub use repository::{
    AlertError, NoopAlertPublisher, RepositoryError, RiskAlert, RiskAlertPublisher,
    ScoringRepository,
};
pub use router::scoring_router;
pub use service::{LifecycleError, ScoringService, ScoringServiceError};
pub use validation::{validate, validate_draft};
