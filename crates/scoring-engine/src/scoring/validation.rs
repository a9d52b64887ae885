use chrono::Utc;

use super::domain::{ConfigId, CreateScoringConfig, RuleId, ScoringConfiguration, ScoringMethod};
use super::engine::Formula;

/// Collect every configuration problem as a human-readable message.
///
/// An empty list means the configuration is valid. Rule coverage is checked on rules
/// sorted by `min_score`; the first gap or overlap ends the adjacency scan.
pub fn validate(config: &ScoringConfiguration) -> Vec<String> {
    let mut errors = Vec::new();

    if config.name.trim().is_empty() {
        errors.push("Configuration name is required".to_string());
    }

    let range_valid = config.max_score > config.min_score;
    if !range_valid {
        errors.push(format!(
            "Max score ({}) must be greater than min score ({})",
            config.max_score, config.min_score
        ));
    }

    if let Some(passing) = config.passing_score {
        if passing < config.min_score || passing > config.max_score {
            errors.push(format!(
                "Passing score ({passing}) must be between min score ({}) and max score ({})",
                config.min_score, config.max_score
            ));
        }
    }

    if config.rules.is_empty() {
        errors.push("At least one scoring rule is required".to_string());
    } else {
        errors.extend(coverage_errors(config));
    }

    errors.extend(method_errors(config));
    errors
}

pub fn is_valid(config: &ScoringConfiguration) -> bool {
    validate(config).is_empty()
}

/// Validate an authoring payload before anything is stored.
pub fn validate_draft(data: &CreateScoringConfig) -> Vec<String> {
    let mut index = 0;
    let draft = data
        .clone()
        .into_configuration(ConfigId::from("draft"), "draft", Utc::now(), || {
            index += 1;
            RuleId(format!("draft-rule-{index}"))
        });
    validate(&draft)
}

fn coverage_errors(config: &ScoringConfiguration) -> Vec<String> {
    let mut errors = Vec::new();
    let rules = config.sorted_rules();

    for rule in &rules {
        if rule.min_score > rule.max_score {
            errors.push(format!(
                "Rule '{}' has min score {} greater than max score {}",
                rule.label, rule.min_score, rule.max_score
            ));
        }
    }

    if let Some(first) = rules.first() {
        if first.min_score != config.min_score {
            errors.push(format!(
                "First rule must start at min score {} (starts at {})",
                config.min_score, first.min_score
            ));
        }
    }

    for pair in rules.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if current.max_score.checked_add(1) == Some(next.min_score) {
            continue;
        }
        if next.min_score <= current.max_score {
            errors.push(format!(
                "Rules '{}' and '{}' overlap between {} and {}",
                current.label, next.label, next.min_score, current.max_score
            ));
        } else {
            errors.push(format!(
                "Gap in rule coverage between {} and {}",
                current.max_score, next.min_score
            ));
        }
        break;
    }

    if let Some(last) = rules.last() {
        if last.max_score != config.max_score {
            errors.push(format!(
                "Last rule must end at max score {} (ends at {})",
                config.max_score, last.max_score
            ));
        }
    }

    errors
}

fn method_errors(config: &ScoringConfiguration) -> Vec<String> {
    if config.scoring_method != ScoringMethod::Custom {
        return Vec::new();
    }

    match config.formula.as_deref().map(str::trim) {
        None | Some("") => vec!["Custom scoring requires a formula".to_string()],
        Some(source) => match Formula::parse(source) {
            Ok(_) => Vec::new(),
            Err(err) => vec![format!("Formula is invalid: {err}")],
        },
    }
}
