use serde::{Deserialize, Serialize};

use super::super::domain::{RiskLevel, ScoringRule, NEUTRAL_COLOR, NO_RISK_LABEL};

/// Classification copied from the rule that covers a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMatch {
    pub risk_level: RiskLevel,
    pub label: String,
    pub color: String,
    pub actions: Vec<String>,
}

impl RiskMatch {
    /// Sentinel returned when no rule covers the score, e.g. while rules are being edited.
    pub fn fallback() -> Self {
        Self {
            risk_level: RiskLevel::None,
            label: NO_RISK_LABEL.to_string(),
            color: NEUTRAL_COLOR.to_string(),
            actions: Vec::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.risk_level == RiskLevel::None && self.label == NO_RISK_LABEL
    }
}

impl From<&ScoringRule> for RiskMatch {
    fn from(rule: &ScoringRule) -> Self {
        Self {
            risk_level: rule.risk_level,
            label: rule.label.clone(),
            color: rule.color.clone(),
            actions: rule.actions.clone(),
        }
    }
}

pub fn match_rule(score: i32, rules: &[ScoringRule]) -> RiskMatch {
    rules
        .iter()
        .find(|rule| rule.contains(score))
        .map(RiskMatch::from)
        .unwrap_or_else(RiskMatch::fallback)
}
