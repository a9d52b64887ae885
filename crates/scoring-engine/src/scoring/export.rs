use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ConfigId, ResponseId, RiskLevel, ScoreResult};

/// Flat row written per result; nested visualization data is omitted.
#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    response_id: &'a ResponseId,
    config_id: &'a ConfigId,
    total_score: f64,
    normalized_score: i32,
    percentage: f64,
    risk_level: RiskLevel,
    risk_label: &'a str,
    actions: String,
    calculated_at: DateTime<Utc>,
    evaluation_error: Option<&'a str>,
}

/// Write results as CSV with a header row. Actions are joined with `; `.
pub fn write_results_csv<W: Write>(writer: W, results: &[ScoreResult]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for result in results {
        csv_writer.serialize(ResultRow {
            response_id: &result.response_id,
            config_id: &result.config_id,
            total_score: result.total_score,
            normalized_score: result.normalized_score,
            percentage: result.percentage,
            risk_level: result.risk_level,
            risk_label: &result.risk_label,
            actions: result.actions.join("; "),
            calculated_at: result.calculated_at,
            evaluation_error: result.evaluation_error.as_deref(),
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}
