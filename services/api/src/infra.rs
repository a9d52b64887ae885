use metrics_exporter_prometheus::PrometheusHandle;
use scoring_engine::scoring::{AlertError, RiskAlert, RiskAlertPublisher};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Hands elevated-risk classifications to the log pipeline, where alerting picks them up.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LogAlertPublisher;

impl RiskAlertPublisher for LogAlertPublisher {
    fn publish(&self, alert: RiskAlert) -> Result<(), AlertError> {
        warn!(
            response_id = %alert.response_id,
            config_id = %alert.config_id,
            risk_level = alert.risk_level.label(),
            risk_label = %alert.risk_label,
            score = alert.normalized_score,
            actions = ?alert.actions,
            "elevated risk classification"
        );
        Ok(())
    }
}
