use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::super::domain::{Answer, Question, QuestionId, ScoringConfiguration, ScoringMethod};
use super::formula;
use super::options::ScoringOptions;
use super::resolver::resolve_score;
use super::ScoringError;

/// Resolved score for one answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionScore {
    pub question_id: QuestionId,
    pub score: f64,
    pub weight: f64,
}

/// Raw aggregate before clamping, with the per-question trail used to build it.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub raw_total: f64,
    pub question_scores: Vec<QuestionScore>,
    pub evaluation_error: Option<String>,
}

/// Combine per-question scores with the configuration's method.
///
/// Questions without an answer are skipped rather than scored as zero. A failing custom
/// formula degrades to a raw total of 0 and reports the cause in `evaluation_error`.
pub fn aggregate(
    config: &ScoringConfiguration,
    questions: &[Question],
    answers: &HashMap<&QuestionId, &Answer>,
    options: &ScoringOptions,
) -> Result<Aggregate, ScoringError> {
    let question_scores: Vec<QuestionScore> = questions
        .iter()
        .filter_map(|question| {
            answers.get(&question.id).map(|answer| QuestionScore {
                question_id: question.id.clone(),
                score: resolve_score(question, answer, options),
                weight: weight_for(config, question),
            })
        })
        .collect();

    let total: f64 = question_scores.iter().map(|entry| entry.score).sum();
    let count = question_scores.len();
    let average = if count > 0 { total / count as f64 } else { 0.0 };

    let mut evaluation_error = None;
    let raw_total = match config.scoring_method {
        ScoringMethod::Sum => total,
        ScoringMethod::Average => average,
        ScoringMethod::Weighted => {
            let total_weight: f64 = question_scores.iter().map(|entry| entry.weight).sum();
            if total_weight == 0.0 {
                0.0
            } else {
                question_scores
                    .iter()
                    .map(|entry| entry.score * entry.weight)
                    .sum::<f64>()
                    / total_weight
            }
        }
        ScoringMethod::Custom => {
            let source = config
                .formula
                .as_deref()
                .filter(|formula| !formula.trim().is_empty())
                .ok_or(ScoringError::MissingFormula)?;
            let variables = variable_bag(config, &question_scores, total, count, average);
            match formula::evaluate(source, &variables) {
                Ok(value) => value,
                Err(err) => {
                    warn!(
                        config_id = %config.id,
                        formula = source,
                        error = %err,
                        "custom formula evaluation failed, scoring as 0"
                    );
                    evaluation_error = Some(err.to_string());
                    0.0
                }
            }
        }
    };

    Ok(Aggregate {
        raw_total,
        question_scores,
        evaluation_error,
    })
}

/// Weight lookup: `question_{id}`, then `q_{id}` in the configuration, then the question's
/// own metadata weight, then 1.
fn weight_for(config: &ScoringConfiguration, question: &Question) -> f64 {
    config
        .weights
        .get(&format!("question_{}", question.id))
        .or_else(|| config.weights.get(&format!("q_{}", question.id)))
        .copied()
        .or_else(|| question.scoring().and_then(|scoring| scoring.weight))
        .unwrap_or(1.0)
}

fn variable_bag(
    config: &ScoringConfiguration,
    question_scores: &[QuestionScore],
    total: f64,
    count: usize,
    average: f64,
) -> BTreeMap<String, f64> {
    let mut variables = BTreeMap::new();
    variables.insert("total".to_string(), total);
    variables.insert("count".to_string(), count as f64);
    variables.insert("average".to_string(), average);
    variables.extend(
        config
            .formula_variables
            .iter()
            .map(|(name, value)| (name.clone(), *value)),
    );
    for entry in question_scores {
        variables.insert(format!("q_{}", entry.question_id), entry.score);
    }
    variables
}
