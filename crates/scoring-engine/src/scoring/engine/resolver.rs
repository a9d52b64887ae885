use super::super::domain::{Answer, Question, QuestionType, ScoringPoints};
use super::options::ScoringOptions;

/// Resolve the point value of one answered question.
///
/// Explicit point tables on the question take priority over type-based scoring. Missing
/// or unresolvable data scores 0. When reverse scoring is enabled and the question asks
/// for it, option-indexed values are mirrored (`max_index - index`); free numeric values
/// without a known option count are left untouched.
pub fn resolve_score(question: &Question, answer: &Answer, options: &ScoringOptions) -> f64 {
    let scoring = question.scoring();
    let reverse =
        options.apply_reverse_scoring && scoring.map(|scoring| scoring.reverse_score).unwrap_or(false);

    match scoring.and_then(|scoring| scoring.points.as_ref()) {
        Some(ScoringPoints::PerOption(points)) => {
            return selected_index(question, answer)
                .and_then(|index| orient(index, points.len(), reverse))
                .and_then(|index| points.get(index).copied())
                .unwrap_or(0.0);
        }
        Some(ScoringPoints::Fixed(points)) => return *points,
        None => {}
    }

    match question.question_type {
        QuestionType::SingleChoice | QuestionType::MultipleChoice => answer
            .value
            .as_deref()
            .and_then(|value| question.option_index(value))
            .and_then(|index| orient(index, question.option_count().unwrap_or(0), reverse))
            .map(|index| index as f64)
            .unwrap_or(0.0),
        QuestionType::Rating | QuestionType::Slider => answer.numeric_value.unwrap_or(0.0),
        QuestionType::Boolean => {
            let truthy = answer.boolean_value.unwrap_or(false);
            match (truthy, reverse) {
                (true, false) | (false, true) => 1.0,
                _ => 0.0,
            }
        }
        QuestionType::Likert => likert_score(question, answer, reverse),
        QuestionType::Text | QuestionType::Other => 0.0,
    }
}

fn likert_score(question: &Question, answer: &Answer, reverse: bool) -> f64 {
    if let Some(value) = answer.numeric_value {
        return match (reverse, question.option_count()) {
            (true, Some(count)) if count > 0 => (count - 1) as f64 - value,
            _ => value,
        };
    }

    answer
        .value
        .as_deref()
        .and_then(|value| question.option_index(value))
        .and_then(|index| orient(index, question.option_count().unwrap_or(0), reverse))
        .map(|index| index as f64)
        .unwrap_or(0.0)
}

/// Position of the selected option, falling back to an integral numeric answer.
fn selected_index(question: &Question, answer: &Answer) -> Option<usize> {
    if let Some(index) = answer
        .value
        .as_deref()
        .and_then(|value| question.option_index(value))
    {
        return Some(index);
    }

    answer
        .numeric_value
        .filter(|value| *value >= 0.0 && value.fract() == 0.0)
        .map(|value| value as usize)
}

fn orient(index: usize, count: usize, reverse: bool) -> Option<usize> {
    if !reverse {
        return Some(index);
    }
    if index >= count {
        return None;
    }
    Some(count - 1 - index)
}
