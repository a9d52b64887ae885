use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::json;

use super::domain::{
    CategoryId, ConfigId, CreateScoringConfig, NewScoreCategory, NewScoringRule,
    QuestionnaireId, ResponseId, RuleId, ScoreRequest, ScoringRuleUpdate, UpdateScoringConfig,
};
use super::repository::{RepositoryError, RiskAlertPublisher, ScoringRepository};
use super::service::{LifecycleError, ScoringService, ScoringServiceError};

/// Header naming the author recorded on created configurations.
pub const CREATED_BY_HEADER: &str = "x-user-id";

type SharedService<R, A> = State<Arc<ScoringService<R, A>>>;

/// Router builder exposing configuration lifecycle, scoring and analytics endpoints.
pub fn scoring_router<R, A>(service: Arc<ScoringService<R, A>>) -> Router
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/scoring/configs", post(create_config_handler::<R, A>))
        .route(
            "/api/v1/scoring/configs/:config_id",
            get(get_config_handler::<R, A>)
                .patch(update_config_handler::<R, A>)
                .delete(delete_config_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/configs/:config_id/validation",
            get(validate_config_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/configs/:config_id/default",
            post(set_default_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/configs/:config_id/rules",
            post(add_rule_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/configs/:config_id/rules/:rule_id",
            delete(delete_rule_handler::<R, A>).patch(update_rule_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/configs/:config_id/score",
            post(score_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/configs/:config_id/analytics",
            get(analytics_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/categories",
            post(create_category_handler::<R, A>),
        )
        .route(
            "/api/v1/scoring/categories/:category_id",
            delete(delete_category_handler::<R, A>),
        )
        .route(
            "/api/v1/questionnaires/:questionnaire_id/scoring/configs",
            get(questionnaire_configs_handler::<R, A>),
        )
        .route(
            "/api/v1/questionnaires/:questionnaire_id/scoring/default",
            get(questionnaire_default_handler::<R, A>),
        )
        .route(
            "/api/v1/questionnaires/:questionnaire_id/scoring/categories",
            get(questionnaire_categories_handler::<R, A>),
        )
        .route(
            "/api/v1/responses/:response_id/scores",
            get(response_scores_handler::<R, A>),
        )
        .with_state(service)
}

pub(crate) async fn create_config_handler<R, A>(
    State(service): SharedService<R, A>,
    headers: HeaderMap,
    Json(data): Json<CreateScoringConfig>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    let created_by = headers
        .get(CREATED_BY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous");
    respond(StatusCode::CREATED, service.create(data, created_by))
}

pub(crate) async fn get_config_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(StatusCode::OK, service.get(&ConfigId(config_id)))
}

pub(crate) async fn update_config_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
    Json(changes): Json<UpdateScoringConfig>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(StatusCode::OK, service.update(&ConfigId(config_id), changes))
}

pub(crate) async fn delete_config_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    match service.delete(&ConfigId(config_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn validate_config_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    let id = ConfigId(config_id);
    match service.validate(&id) {
        Ok(errors) => {
            let payload = json!({
                "config_id": id,
                "valid": errors.is_empty(),
                "errors": errors,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn set_default_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(StatusCode::OK, service.set_default(&ConfigId(config_id)))
}

pub(crate) async fn add_rule_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
    Json(rule): Json<NewScoringRule>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(
        StatusCode::CREATED,
        service.add_rule(&ConfigId(config_id), rule),
    )
}

pub(crate) async fn update_rule_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((config_id, rule_id)): Path<(String, String)>,
    Json(changes): Json<ScoringRuleUpdate>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.update_rule(&ConfigId(config_id), &RuleId(rule_id), changes),
    )
}

pub(crate) async fn delete_rule_handler<R, A>(
    State(service): SharedService<R, A>,
    Path((config_id, rule_id)): Path<(String, String)>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    match service.delete_rule(&ConfigId(config_id), &RuleId(rule_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn score_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.score_response(&ConfigId(config_id), &request),
    )
}

pub(crate) async fn analytics_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(config_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(StatusCode::OK, service.get_analytics(&ConfigId(config_id)))
}

pub(crate) async fn create_category_handler<R, A>(
    State(service): SharedService<R, A>,
    Json(data): Json<NewScoreCategory>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(StatusCode::CREATED, service.create_category(data))
}

pub(crate) async fn delete_category_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(category_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    match service.delete_category(&CategoryId(category_id)) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn questionnaire_configs_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.get_by_questionnaire(&QuestionnaireId(questionnaire_id)),
    )
}

pub(crate) async fn questionnaire_default_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    let id = QuestionnaireId(questionnaire_id);
    match service.get_default(&id) {
        Ok(Some(config)) => (StatusCode::OK, Json(config)).into_response(),
        Ok(None) => {
            let payload = json!({
                "error": format!("questionnaire {id} has no default scoring configuration"),
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn questionnaire_categories_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(questionnaire_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.categories_for_questionnaire(&QuestionnaireId(questionnaire_id)),
    )
}

pub(crate) async fn response_scores_handler<R, A>(
    State(service): SharedService<R, A>,
    Path(response_id): Path<String>,
) -> Response
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.scores_for_response(&ResponseId(response_id)),
    )
}

fn respond<T: Serialize>(status: StatusCode, outcome: Result<T, ScoringServiceError>) -> Response {
    match outcome {
        Ok(body) => (status, Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

/// HTTP status for a service failure, shared by the router and [`crate::error::AppError`].
pub fn status_for(err: &ScoringServiceError) -> StatusCode {
    match err {
        ScoringServiceError::Lifecycle(
            LifecycleError::ConfigurationNotFound(_)
            | LifecycleError::RuleNotFound { .. }
            | LifecycleError::CategoryNotFound(_)
            | LifecycleError::ScoresNotFound(_),
        ) => StatusCode::NOT_FOUND,
        ScoringServiceError::Lifecycle(
            LifecycleError::DefaultRequiresActive(_) | LifecycleError::InactiveConfiguration(_),
        ) => StatusCode::CONFLICT,
        ScoringServiceError::Lifecycle(LifecycleError::DefaultRequiresValid { .. })
        | ScoringServiceError::Scoring(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScoringServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScoringServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ScoringServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub(crate) fn error_response(err: ScoringServiceError) -> Response {
    let status = status_for(&err);

    let payload = match &err {
        ScoringServiceError::Lifecycle(LifecycleError::DefaultRequiresValid { errors, .. }) => {
            json!({
                "error": err.to_string(),
                "validation_errors": errors,
            })
        }
        _ => json!({ "error": err.to_string() }),
    };

    (status, Json(payload)).into_response()
}
