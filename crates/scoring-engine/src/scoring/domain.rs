use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::engine::ScoringError;

/// Color used when no rule classifies a score.
pub const NEUTRAL_COLOR: &str = "#9CA3AF";

/// Label used when no rule classifies a score.
pub const NO_RISK_LABEL: &str = "No Risk Assessment";

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for scoring configurations.
    ConfigId
);
identifier!(
    /// Identifier wrapper for rules owned by a configuration.
    RuleId
);
identifier!(
    /// Identifier wrapper for score categories.
    CategoryId
);
identifier!(
    /// Identifier of the questionnaire a configuration or category is bound to.
    QuestionnaireId
);
identifier!(QuestionId);
identifier!(ResponseId);

/// Algorithm used to combine per-question scores into one raw total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    Sum,
    Average,
    Weighted,
    Custom,
}

impl ScoringMethod {
    pub const fn label(self) -> &'static str {
        match self {
            ScoringMethod::Sum => "sum",
            ScoringMethod::Average => "average",
            ScoringMethod::Weighted => "weighted",
            ScoringMethod::Custom => "custom",
        }
    }
}

impl FromStr for ScoringMethod {
    type Err = ScoringError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "average" => Ok(Self::Average),
            "weighted" => Ok(Self::Weighted),
            "custom" => Ok(Self::Custom),
            other => Err(ScoringError::UnsupportedMethod(other.to_string())),
        }
    }
}

/// Risk taxonomy shared by rules, results and analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::None,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RiskLevel::None => "none",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Levels that warrant a follow-up from risk-driven automation.
    pub const fn is_elevated(self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Chart family a renderer should use for the visualization payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualizationType {
    #[default]
    Gauge,
    Bar,
    Line,
    Radar,
    Pie,
    Heatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    Rating,
    Slider,
    Boolean,
    Likert,
    Text,
    #[serde(other)]
    Other,
}

/// Question as supplied by the questionnaire collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub questionnaire_id: QuestionnaireId,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QuestionMetadata>,
}

impl Question {
    pub fn scoring(&self) -> Option<&QuestionScoring> {
        self.metadata
            .as_ref()
            .and_then(|metadata| metadata.scoring.as_ref())
    }

    pub fn option_index(&self, value: &str) -> Option<usize> {
        self.options
            .as_ref()
            .and_then(|options| options.iter().position(|option| option == value))
    }

    pub fn option_count(&self) -> Option<usize> {
        self.options.as_ref().map(Vec::len)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scoring: Option<QuestionScoring>,
}

/// Per-question scoring overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuestionScoring {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<ScoringPoints>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub reverse_score: bool,
}

/// Either a fixed value for the question or one value per option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoringPoints {
    Fixed(f64),
    PerOption(Vec<f64>),
}

/// Answer captured for one question; exactly one typed value is expected per question type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: QuestionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean_value: Option<bool>,
}

/// Completed questionnaire submission metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: ResponseId,
    pub questionnaire_id: QuestionnaireId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Everything needed to score one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub response: Response,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// One inclusive score band of a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub id: RuleId,
    pub min_score: i32,
    pub max_score: i32,
    pub risk_level: RiskLevel,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub order_num: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoringRule {
    pub fn contains(&self, score: i32) -> bool {
        self.min_score <= score && score <= self.max_score
    }
}

/// Named, versioned scoring definition bound to a single questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfiguration {
    pub id: ConfigId,
    pub questionnaire_id: QuestionnaireId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scoring_method: ScoringMethod,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(default)]
    pub formula_variables: BTreeMap<String, f64>,
    pub max_score: i32,
    pub min_score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<i32>,
    pub visualization_type: VisualizationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_config: Option<Value>,
    pub is_active: bool,
    pub is_default: bool,
    pub rules: Vec<ScoringRule>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScoringConfiguration {
    pub fn rule(&self, id: &RuleId) -> Option<&ScoringRule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }

    /// Rules ordered by their lower bound, the order used for coverage checks and zones.
    pub fn sorted_rules(&self) -> Vec<&ScoringRule> {
        let mut rules: Vec<&ScoringRule> = self.rules.iter().collect();
        rules.sort_by_key(|rule| (rule.min_score, rule.order_num));
        rules
    }
}

/// Named grouping of questions producing a sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCategory {
    pub id: CategoryId,
    pub questionnaire_id: QuestionnaireId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub question_ids: Vec<QuestionId>,
    pub weight: f64,
    pub color: String,
    pub order_num: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category_id: CategoryId,
    pub name: String,
    pub score: f64,
    pub weighted_score: f64,
    pub answered: usize,
    pub color: String,
}

/// Percentage-space band for one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationZone {
    pub min: f64,
    pub max: f64,
    pub color: String,
    pub label: String,
    pub risk_level: RiskLevel,
}

/// Renderer-agnostic chart payload derived from a result and its rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualizationData {
    pub score: i32,
    pub min_score: i32,
    pub max_score: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passing_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub risk_color: String,
    pub visualization_type: VisualizationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization_config: Option<Value>,
    pub percentage: f64,
    pub zones: Vec<VisualizationZone>,
}

/// Immutable outcome of scoring one response against one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub response_id: ResponseId,
    pub config_id: ConfigId,
    pub total_score: f64,
    pub normalized_score: i32,
    pub percentage: f64,
    pub risk_level: RiskLevel,
    pub risk_label: String,
    pub risk_color: String,
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_scores: Option<Vec<CategoryScore>>,
    pub visualization_data: VisualizationData,
    pub calculated_at: DateTime<Utc>,
    /// Set when a custom formula failed and the raw total degraded to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_color() -> String {
    NEUTRAL_COLOR.to_string()
}

fn default_weight() -> f64 {
    1.0
}

/// Authoring payload for a new configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateScoringConfig {
    pub questionnaire_id: QuestionnaireId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scoring_method: ScoringMethod,
    #[serde(default)]
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub formula_variables: BTreeMap<String, f64>,
    pub max_score: i32,
    pub min_score: i32,
    #[serde(default)]
    pub passing_score: Option<i32>,
    #[serde(default)]
    pub visualization_type: VisualizationType,
    #[serde(default)]
    pub visualization_config: Option<Value>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub rules: Vec<NewScoringRule>,
}

impl CreateScoringConfig {
    /// Materialize the payload as a stored configuration, minting rule ids with `rule_id`.
    pub fn into_configuration(
        self,
        id: ConfigId,
        created_by: &str,
        now: DateTime<Utc>,
        mut rule_id: impl FnMut() -> RuleId,
    ) -> ScoringConfiguration {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| rule.into_rule(rule_id(), now))
            .collect();

        ScoringConfiguration {
            id,
            questionnaire_id: self.questionnaire_id,
            name: self.name,
            description: self.description,
            scoring_method: self.scoring_method,
            weights: self.weights,
            formula: self.formula,
            formula_variables: self.formula_variables,
            max_score: self.max_score,
            min_score: self.min_score,
            passing_score: self.passing_score,
            visualization_type: self.visualization_type,
            visualization_config: self.visualization_config,
            is_active: self.is_active,
            is_default: self.is_default,
            rules,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update merged onto an existing configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateScoringConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub scoring_method: Option<ScoringMethod>,
    #[serde(default)]
    pub weights: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub formula_variables: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub max_score: Option<i32>,
    #[serde(default)]
    pub min_score: Option<i32>,
    #[serde(default)]
    pub passing_score: Option<i32>,
    #[serde(default)]
    pub visualization_type: Option<VisualizationType>,
    #[serde(default)]
    pub visualization_config: Option<Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScoringRule {
    pub min_score: i32,
    pub max_score: i32,
    pub risk_level: RiskLevel,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub order_num: u32,
}

impl NewScoringRule {
    pub(crate) fn into_rule(self, id: RuleId, now: DateTime<Utc>) -> ScoringRule {
        ScoringRule {
            id,
            min_score: self.min_score,
            max_score: self.max_score,
            risk_level: self.risk_level,
            label: self.label,
            description: self.description,
            color: self.color,
            actions: self.actions,
            order_num: self.order_num,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoringRuleUpdate {
    #[serde(default)]
    pub min_score: Option<i32>,
    #[serde(default)]
    pub max_score: Option<i32>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub actions: Option<Vec<String>>,
    #[serde(default)]
    pub order_num: Option<u32>,
}

impl ScoringRuleUpdate {
    pub(crate) fn apply(self, rule: &mut ScoringRule, now: DateTime<Utc>) {
        if let Some(min_score) = self.min_score {
            rule.min_score = min_score;
        }
        if let Some(max_score) = self.max_score {
            rule.max_score = max_score;
        }
        if let Some(risk_level) = self.risk_level {
            rule.risk_level = risk_level;
        }
        if let Some(label) = self.label {
            rule.label = label;
        }
        if self.description.is_some() {
            rule.description = self.description;
        }
        if let Some(color) = self.color {
            rule.color = color;
        }
        if let Some(actions) = self.actions {
            rule.actions = actions;
        }
        if let Some(order_num) = self.order_num {
            rule.order_num = order_num;
        }
        rule.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewScoreCategory {
    pub questionnaire_id: QuestionnaireId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub question_ids: Vec<QuestionId>,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub order_num: u32,
}
