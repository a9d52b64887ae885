use std::collections::HashMap;

use super::super::domain::{CategoryScore, QuestionId, ScoreCategory};
use super::aggregation::QuestionScore;

/// Sub-scores for each category, ordered by `order_num`.
pub(crate) fn category_scores(
    categories: &[ScoreCategory],
    question_scores: &[QuestionScore],
) -> Vec<CategoryScore> {
    let by_question: HashMap<&QuestionId, f64> = question_scores
        .iter()
        .map(|entry| (&entry.question_id, entry.score))
        .collect();

    let mut ordered: Vec<&ScoreCategory> = categories.iter().collect();
    ordered.sort_by_key(|category| category.order_num);

    ordered
        .into_iter()
        .map(|category| {
            let scores: Vec<f64> = category
                .question_ids
                .iter()
                .filter_map(|id| by_question.get(id).copied())
                .collect();
            let score: f64 = scores.iter().sum();
            CategoryScore {
                category_id: category.id.clone(),
                name: category.name.clone(),
                score,
                weighted_score: score * category.weight,
                answered: scores.len(),
                color: category.color.clone(),
            }
        })
        .collect()
}
