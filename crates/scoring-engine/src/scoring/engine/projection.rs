use super::super::domain::{ScoringConfiguration, VisualizationData, VisualizationZone};
use super::matcher::RiskMatch;

/// Linear position of `score` between `min` and `max`, in percent with two decimals.
///
/// Degenerate ranges map to 0. Scores outside the range are not clamped so zones of a
/// misconfigured rule stay visible to the renderer.
pub fn to_percentage(score: i32, min: i32, max: i32) -> f64 {
    if max <= min {
        return 0.0;
    }
    let span = f64::from(max) - f64::from(min);
    round2((f64::from(score) - f64::from(min)) / span * 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Project a classified score and its rule set into percentage space.
pub fn project(
    score: i32,
    risk: &RiskMatch,
    config: &ScoringConfiguration,
) -> VisualizationData {
    let zones = config
        .sorted_rules()
        .into_iter()
        .map(|rule| VisualizationZone {
            min: to_percentage(rule.min_score, config.min_score, config.max_score),
            max: to_percentage(rule.max_score, config.min_score, config.max_score),
            color: rule.color.clone(),
            label: rule.label.clone(),
            risk_level: rule.risk_level,
        })
        .collect();

    VisualizationData {
        score,
        min_score: config.min_score,
        max_score: config.max_score,
        passing_score: config.passing_score,
        passed: config.passing_score.map(|passing| score >= passing),
        risk_level: risk.risk_level,
        risk_label: risk.label.clone(),
        risk_color: risk.color.clone(),
        visualization_type: config.visualization_type,
        visualization_config: config.visualization_config.clone(),
        percentage: to_percentage(score, config.min_score, config.max_score),
        zones,
    }
}
