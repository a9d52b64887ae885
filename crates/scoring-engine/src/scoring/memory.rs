use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    CategoryId, ConfigId, QuestionnaireId, ResponseId, ScoreCategory, ScoreResult,
    ScoringConfiguration,
};
use super::repository::{RepositoryError, ScoringRepository};

/// Mutex-guarded in-process store, suitable for tests, the CLI and single-node hosts.
#[derive(Default, Clone)]
pub struct InMemoryScoringRepository {
    configs: Arc<Mutex<HashMap<ConfigId, ScoringConfiguration>>>,
    categories: Arc<Mutex<HashMap<CategoryId, ScoreCategory>>>,
    results: Arc<Mutex<Vec<ScoreResult>>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{name} store lock poisoned")))
}

impl ScoringRepository for InMemoryScoringRepository {
    fn insert_config(
        &self,
        config: ScoringConfiguration,
    ) -> Result<ScoringConfiguration, RepositoryError> {
        let mut guard = lock(&self.configs, "configuration")?;
        if guard.contains_key(&config.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(config.id.clone(), config.clone());
        Ok(config)
    }

    fn update_config(&self, config: ScoringConfiguration) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.configs, "configuration")?;
        match guard.get_mut(&config.id) {
            Some(existing) => {
                *existing = config;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_config(&self, id: &ConfigId) -> Result<Option<ScoringConfiguration>, RepositoryError> {
        let guard = lock(&self.configs, "configuration")?;
        Ok(guard.get(id).cloned())
    }

    fn configs_for_questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoringConfiguration>, RepositoryError> {
        let guard = lock(&self.configs, "configuration")?;
        Ok(guard
            .values()
            .filter(|config| &config.questionnaire_id == questionnaire_id)
            .cloned()
            .collect())
    }

    fn remove_config(
        &self,
        id: &ConfigId,
    ) -> Result<Option<ScoringConfiguration>, RepositoryError> {
        let mut guard = lock(&self.configs, "configuration")?;
        Ok(guard.remove(id))
    }

    fn insert_category(&self, category: ScoreCategory) -> Result<ScoreCategory, RepositoryError> {
        let mut guard = lock(&self.categories, "category")?;
        if guard.contains_key(&category.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(category.id.clone(), category.clone());
        Ok(category)
    }

    fn categories_for_questionnaire(
        &self,
        questionnaire_id: &QuestionnaireId,
    ) -> Result<Vec<ScoreCategory>, RepositoryError> {
        let guard = lock(&self.categories, "category")?;
        let mut categories: Vec<ScoreCategory> = guard
            .values()
            .filter(|category| &category.questionnaire_id == questionnaire_id)
            .cloned()
            .collect();
        categories.sort_by_key(|category| category.order_num);
        Ok(categories)
    }

    fn remove_category(&self, id: &CategoryId) -> Result<Option<ScoreCategory>, RepositoryError> {
        let mut guard = lock(&self.categories, "category")?;
        Ok(guard.remove(id))
    }

    fn save_result(&self, result: ScoreResult) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.results, "result")?;
        guard.push(result);
        Ok(())
    }

    fn results_for_config(&self, id: &ConfigId) -> Result<Vec<ScoreResult>, RepositoryError> {
        let guard = lock(&self.results, "result")?;
        Ok(guard
            .iter()
            .filter(|result| &result.config_id == id)
            .cloned()
            .collect())
    }

    fn results_for_response(&self, id: &ResponseId) -> Result<Vec<ScoreResult>, RepositoryError> {
        let guard = lock(&self.results, "result")?;
        Ok(guard
            .iter()
            .filter(|result| &result.response_id == id)
            .cloned()
            .collect())
    }
}
