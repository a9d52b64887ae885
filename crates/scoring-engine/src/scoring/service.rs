use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};

use super::analytics::{summarize, ScoreAnalytics};
use super::domain::{
    CategoryId, ConfigId, CreateScoringConfig, NewScoreCategory, NewScoringRule,
    QuestionnaireId, ResponseId, RuleId, ScoreCategory, ScoreRequest, ScoreResult,
    ScoringConfiguration, ScoringRule, ScoringRuleUpdate, UpdateScoringConfig,
};
use super::engine::{ScoringEngine, ScoringError, ScoringOptions};
use super::repository::{RepositoryError, RiskAlert, RiskAlertPublisher, ScoringRepository};
use super::validation::validate;

static CONFIG_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static RULE_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static CATEGORY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_config_id() -> ConfigId {
    let id = CONFIG_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ConfigId(format!("cfg-{id:06}"))
}

fn next_rule_id() -> RuleId {
    let id = RULE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RuleId(format!("rule-{id:06}"))
}

fn next_category_id() -> CategoryId {
    let id = CATEGORY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CategoryId(format!("cat-{id:06}"))
}

/// Configuration lifecycle manager plus scoring entry points.
///
/// Every mutation runs under a per-questionnaire lock so the "one default per
/// questionnaire" check and the following writes are not interleaved with another writer.
pub struct ScoringService<R, A> {
    repository: Arc<R>,
    alerts: Arc<A>,
    engine: ScoringEngine,
    questionnaire_locks: Mutex<HashMap<QuestionnaireId, Arc<Mutex<()>>>>,
}

impl<R, A> ScoringService<R, A>
where
    R: ScoringRepository + 'static,
    A: RiskAlertPublisher + 'static,
{
    pub fn new(repository: Arc<R>, alerts: Arc<A>, options: ScoringOptions) -> Self {
        Self {
            repository,
            alerts,
            engine: ScoringEngine::new(options),
            questionnaire_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// Store a new configuration and its rules.
    ///
    /// Rule coverage is not enforced here; callers run [`Self::validate`] before use.
    pub fn create(
        &self,
        data: CreateScoringConfig,
        created_by: &str,
    ) -> Result<ScoringConfiguration, ScoringServiceError> {
        let config = data.into_configuration(next_config_id(), created_by, Utc::now(), next_rule_id);

        let lock = self.questionnaire_lock(&config.questionnaire_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| poisoned(&config.questionnaire_id))?;

        if config.is_default {
            ensure_default_eligible(&config)?;
            self.clear_other_defaults(&config.questionnaire_id, &config.id)?;
        }

        let stored = self.repository.insert_config(config)?;
        info!(
            config_id = %stored.id,
            questionnaire_id = %stored.questionnaire_id,
            method = stored.scoring_method.label(),
            rules = stored.rules.len(),
            is_default = stored.is_default,
            "created scoring configuration"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ConfigId) -> Result<ScoringConfiguration, ScoringServiceError> {
        self.repository
            .fetch_config(id)?
            .ok_or_else(|| LifecycleError::ConfigurationNotFound(id.clone()).into())
    }

    /// Configurations of a questionnaire, newest first.
    pub fn get_by_questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoringConfiguration>, ScoringServiceError> {
        let mut configs = self.repository.configs_for_questionnaire(questionnaire_id)?;
        configs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(configs)
    }

    pub fn get_default(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Option<ScoringConfiguration>, ScoringServiceError> {
        Ok(self
            .get_by_questionnaire(questionnaire_id)?
            .into_iter()
            .find(|config| config.is_default))
    }

    /// Validation messages for a stored configuration; empty means valid.
    pub fn validate(&self, id: &ConfigId) -> Result<Vec<String>, ScoringServiceError> {
        Ok(validate(&self.get(id)?))
    }

    /// Merge `changes` onto the stored configuration.
    pub fn update(
        &self,
        id: &ConfigId,
        changes: UpdateScoringConfig,
    ) -> Result<ScoringConfiguration, ScoringServiceError> {
        self.with_config_locked(id, |service, mut config| {
            let was_default = config.is_default;
            apply_update(&mut config, changes);

            if config.is_default && !was_default {
                ensure_default_eligible(&config)?;
                service.clear_other_defaults(&config.questionnaire_id, &config.id)?;
            } else if config.is_default && !config.is_active {
                return Err(LifecycleError::DefaultRequiresActive(config.id.clone()).into());
            }

            config.updated_at = Utc::now();
            service.repository.update_config(config.clone())?;
            info!(
                config_id = %config.id,
                is_active = config.is_active,
                is_default = config.is_default,
                "updated scoring configuration"
            );
            Ok(config)
        })
    }

    pub fn set_default(&self, id: &ConfigId) -> Result<ScoringConfiguration, ScoringServiceError> {
        self.update(
            id,
            UpdateScoringConfig {
                is_default: Some(true),
                ..UpdateScoringConfig::default()
            },
        )
    }

    /// Remove a configuration and its rules. Stored results referencing it become stale.
    pub fn delete(&self, id: &ConfigId) -> Result<ScoringConfiguration, ScoringServiceError> {
        self.with_config_locked(id, |service, config| {
            let removed = service
                .repository
                .remove_config(&config.id)?
                .ok_or_else(|| LifecycleError::ConfigurationNotFound(config.id.clone()))?;
            info!(config_id = %removed.id, "deleted scoring configuration");
            Ok(removed)
        })
    }

    pub fn add_rule(
        &self,
        config_id: &ConfigId,
        rule: NewScoringRule,
    ) -> Result<ScoringRule, ScoringServiceError> {
        self.with_config_locked(config_id, |service, mut config| {
            let now = Utc::now();
            let rule = rule.into_rule(next_rule_id(), now);
            config.rules.push(rule.clone());
            config.updated_at = now;
            service.repository.update_config(config)?;
            info!(config_id = %config_id, rule_id = %rule.id, "added scoring rule");
            Ok(rule)
        })
    }

    pub fn update_rule(
        &self,
        config_id: &ConfigId,
        rule_id: &RuleId,
        changes: ScoringRuleUpdate,
    ) -> Result<ScoringRule, ScoringServiceError> {
        self.with_config_locked(config_id, |service, mut config| {
            let now = Utc::now();
            let rule = config
                .rules
                .iter_mut()
                .find(|rule| &rule.id == rule_id)
                .ok_or_else(|| LifecycleError::RuleNotFound {
                    config_id: config_id.clone(),
                    rule_id: rule_id.clone(),
                })?;
            changes.apply(rule, now);
            let updated = rule.clone();
            config.updated_at = now;
            service.repository.update_config(config)?;
            info!(config_id = %config_id, rule_id = %rule_id, "updated scoring rule");
            Ok(updated)
        })
    }

    pub fn delete_rule(
        &self,
        config_id: &ConfigId,
        rule_id: &RuleId,
    ) -> Result<ScoringRule, ScoringServiceError> {
        self.with_config_locked(config_id, |service, mut config| {
            let position = config
                .rules
                .iter()
                .position(|rule| &rule.id == rule_id)
                .ok_or_else(|| LifecycleError::RuleNotFound {
                    config_id: config_id.clone(),
                    rule_id: rule_id.clone(),
                })?;
            let removed = config.rules.remove(position);
            config.updated_at = Utc::now();
            service.repository.update_config(config)?;
            info!(config_id = %config_id, rule_id = %rule_id, "deleted scoring rule");
            Ok(removed)
        })
    }

    pub fn create_category(
        &self,
        data: NewScoreCategory,
    ) -> Result<ScoreCategory, ScoringServiceError> {
        let category = ScoreCategory {
            id: next_category_id(),
            questionnaire_id: data.questionnaire_id,
            name: data.name,
            description: data.description,
            question_ids: data.question_ids,
            weight: data.weight,
            color: data.color,
            order_num: data.order_num,
            created_at: Utc::now(),
        };
        let stored = self.repository.insert_category(category)?;
        info!(
            category_id = %stored.id,
            questionnaire_id = %stored.questionnaire_id,
            "created score category"
        );
        Ok(stored)
    }

    pub fn categories_for_questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoreCategory>, ScoringServiceError> {
        Ok(self.repository.categories_for_questionnaire(questionnaire_id)?)
    }

    pub fn delete_category(&self, id: &CategoryId) -> Result<ScoreCategory, ScoringServiceError> {
        self.repository
            .remove_category(id)?
            .ok_or_else(|| LifecycleError::CategoryNotFound(id.clone()).into())
    }

    /// Score one response, persist the result and notify risk automation.
    pub fn score_response(
        &self,
        config_id: &ConfigId,
        request: &ScoreRequest,
    ) -> Result<ScoreResult, ScoringServiceError> {
        let config = self.get(config_id)?;
        if !config.is_active {
            return Err(LifecycleError::InactiveConfiguration(config.id).into());
        }
        let categories = self
            .repository
            .categories_for_questionnaire(&config.questionnaire_id)?;

        let result = self.engine.score(
            &request.response,
            &request.answers,
            &request.questions,
            &config,
            &categories,
        )?;
        self.repository.save_result(result.clone())?;

        if result.risk_level.is_elevated() {
            // The result is already stored; a retry would record it twice.
            if let Err(err) = self.alerts.publish(RiskAlert::from_result(&result)) {
                warn!(
                    response_id = %result.response_id,
                    config_id = %result.config_id,
                    risk_level = result.risk_level.label(),
                    error = %err,
                    "risk alert could not be delivered"
                );
            }
        }

        Ok(result)
    }

    /// Score many responses; one failure never aborts the others.
    pub fn score_batch(
        &self,
        config_id: &ConfigId,
        requests: &[ScoreRequest],
    ) -> Vec<Result<ScoreResult, ScoringServiceError>> {
        requests
            .iter()
            .map(|request| {
                let outcome = self.score_response(config_id, request);
                if let Err(err) = &outcome {
                    warn!(
                        config_id = %config_id,
                        response_id = %request.response.id,
                        error = %err,
                        "response could not be scored"
                    );
                }
                outcome
            })
            .collect()
    }

    pub fn scores_for_response(
        &self,
        response_id: &ResponseId,
    ) -> Result<Vec<ScoreResult>, ScoringServiceError> {
        let results = self.repository.results_for_response(response_id)?;
        if results.is_empty() {
            return Err(LifecycleError::ScoresNotFound(response_id.clone()).into());
        }
        Ok(results)
    }

    /// Aggregate already-computed results; performs no scoring.
    pub fn get_analytics(&self, config_id: &ConfigId) -> Result<ScoreAnalytics, ScoringServiceError> {
        let results = self.repository.results_for_config(config_id)?;
        Ok(summarize(config_id, &results))
    }

    fn questionnaire_lock(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Arc<Mutex<()>>, ScoringServiceError> {
        let mut locks = self
            .questionnaire_locks
            .lock()
            .map_err(|_| poisoned(questionnaire_id))?;
        // Entries only the map still references are idle.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(locks.entry(questionnaire_id.clone()).or_default().clone())
    }

    #[cfg(test)]
    pub(crate) fn tracked_questionnaire_locks(&self) -> usize {
        self.questionnaire_locks
            .lock()
            .map(|locks| locks.len())
            .unwrap_or_default()
    }

    /// Run `apply` on a fresh copy of the configuration while holding its questionnaire lock.
    fn with_config_locked<T>(
        &self,
        id: &ConfigId,
        apply: impl FnOnce(&Self, ScoringConfiguration) -> Result<T, ScoringServiceError>,
    ) -> Result<T, ScoringServiceError> {
        let questionnaire_id = self.get(id)?.questionnaire_id;
        let lock = self.questionnaire_lock(&questionnaire_id)?;
        let _guard = lock.lock().map_err(|_| poisoned(&questionnaire_id))?;
        // Re-read under the lock; the record may have changed or vanished meanwhile.
        let config = self.get(id)?;
        apply(self, config)
    }

    fn clear_other_defaults(
        &self,
        questionnaire_id: &QuestionnaireId,
        keep: &ConfigId,
    ) -> Result<(), ScoringServiceError> {
        let now = Utc::now();
        for mut other in self.repository.configs_for_questionnaire(questionnaire_id)? {
            if other.is_default && &other.id != keep {
                other.is_default = false;
                other.updated_at = now;
                info!(config_id = %other.id, "cleared previous default configuration");
                self.repository.update_config(other)?;
            }
        }
        Ok(())
    }
}

fn poisoned(questionnaire_id: &QuestionnaireId) -> ScoringServiceError {
    RepositoryError::Unavailable(format!("lock for questionnaire {questionnaire_id} poisoned"))
        .into()
}

fn ensure_default_eligible(config: &ScoringConfiguration) -> Result<(), ScoringServiceError> {
    if !config.is_active {
        return Err(LifecycleError::DefaultRequiresActive(config.id.clone()).into());
    }
    let errors = validate(config);
    if !errors.is_empty() {
        return Err(LifecycleError::DefaultRequiresValid {
            config_id: config.id.clone(),
            errors,
        }
        .into());
    }
    Ok(())
}

fn apply_update(config: &mut ScoringConfiguration, changes: UpdateScoringConfig) {
    let UpdateScoringConfig {
        name,
        description,
        scoring_method,
        weights,
        formula,
        formula_variables,
        max_score,
        min_score,
        passing_score,
        visualization_type,
        visualization_config,
        is_active,
        is_default,
    } = changes;

    if let Some(name) = name {
        config.name = name;
    }
    if description.is_some() {
        config.description = description;
    }
    if let Some(method) = scoring_method {
        config.scoring_method = method;
    }
    if let Some(weights) = weights {
        config.weights = weights;
    }
    if formula.is_some() {
        config.formula = formula;
    }
    if let Some(variables) = formula_variables {
        config.formula_variables = variables;
    }
    if let Some(max_score) = max_score {
        config.max_score = max_score;
    }
    if let Some(min_score) = min_score {
        config.min_score = min_score;
    }
    if passing_score.is_some() {
        config.passing_score = passing_score;
    }
    if let Some(visualization_type) = visualization_type {
        config.visualization_type = visualization_type;
    }
    if visualization_config.is_some() {
        config.visualization_config = visualization_config;
    }
    if let Some(is_active) = is_active {
        config.is_active = is_active;
    }
    if let Some(is_default) = is_default {
        config.is_default = is_default;
    }
}

/// Lifecycle failures that are caller bugs or violated preconditions.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("scoring configuration {0} not found")]
    ConfigurationNotFound(ConfigId),
    #[error("scoring rule {rule_id} not found in configuration {config_id}")]
    RuleNotFound { config_id: ConfigId, rule_id: RuleId },
    #[error("score category {0} not found")]
    CategoryNotFound(CategoryId),
    #[error("no scores recorded for response {0}")]
    ScoresNotFound(ResponseId),
    #[error("configuration {0} must be active to be the default")]
    DefaultRequiresActive(ConfigId),
    #[error("configuration {config_id} must pass validation to become the default: {}", .errors.join("; "))]
    DefaultRequiresValid {
        config_id: ConfigId,
        errors: Vec<String>,
    },
    #[error("configuration {0} is inactive and cannot be used for scoring")]
    InactiveConfiguration(ConfigId),
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringServiceError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
