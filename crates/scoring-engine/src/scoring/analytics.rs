use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ConfigId, RiskLevel, ScoreResult};
use super::engine::round2;

/// Read model over stored results for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAnalytics {
    pub config_id: ConfigId,
    pub total_responses: usize,
    pub average_score: f64,
    pub risk_distribution: BTreeMap<RiskLevel, usize>,
    pub trend: Vec<TrendPoint>,
}

/// Mean score and volume for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub average_score: f64,
    pub responses: usize,
}

pub fn summarize(config_id: &ConfigId, results: &[ScoreResult]) -> ScoreAnalytics {
    let mut risk_distribution: BTreeMap<RiskLevel, usize> =
        RiskLevel::ALL.iter().map(|level| (*level, 0)).collect();
    let mut daily: BTreeMap<NaiveDate, (i64, usize)> = BTreeMap::new();
    let mut score_sum: i64 = 0;

    let mut total_responses = 0;
    for result in results.iter().filter(|result| &result.config_id == config_id) {
        total_responses += 1;
        score_sum += i64::from(result.normalized_score);
        *risk_distribution.entry(result.risk_level).or_insert(0) += 1;

        let bucket = daily
            .entry(result.calculated_at.date_naive())
            .or_insert((0, 0));
        bucket.0 += i64::from(result.normalized_score);
        bucket.1 += 1;
    }

    let trend = daily
        .into_iter()
        .map(|(date, (sum, responses))| TrendPoint {
            date,
            average_score: mean(sum, responses),
            responses,
        })
        .collect();

    ScoreAnalytics {
        config_id: config_id.clone(),
        total_responses,
        average_score: mean(score_sum, total_responses),
        risk_distribution,
        trend,
    }
}

fn mean(sum: i64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    round2(sum as f64 / count as f64)
}
