use serde::{Deserialize, Serialize};

/// Engine switches that are not part of an individual scoring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringOptions {
    /// Honor `metadata.scoring.reverse_score` on questions.
    pub apply_reverse_scoring: bool,
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            apply_reverse_scoring: true,
        }
    }
}
