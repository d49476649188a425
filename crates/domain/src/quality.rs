use serde::{Deserialize, Serialize};

/// Result of a single heuristic check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterResult {
    pub passed: bool,
    pub detail: String,
}

impl FilterResult {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
        }
    }
}

/// The six heuristic filters run over a dialogue before LLM scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicFilters {
    pub length: FilterResult,
    pub repetition: FilterResult,
    pub profanity: FilterResult,
    pub coherence: FilterResult,
    pub goal_mention: FilterResult,
    pub empty_response: FilterResult,
}

impl HeuristicFilters {
    /// Fraction of the six filters that passed.
    pub fn score(&self) -> f64 {
        let checks = [
            &self.length,
            &self.repetition,
            &self.profanity,
            &self.coherence,
            &self.goal_mention,
            &self.empty_response,
        ];
        let passed = checks.iter().filter(|c| c.passed).count();
        passed as f64 / checks.len() as f64
    }
}

/// Scores returned by the three independent LLM rubric prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmEvaluation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coherence_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_relevance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LlmEvaluation {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            coherence_score: None,
            goal_relevance: None,
            overall_score: None,
            error: Some(error.into()),
        }
    }
}

/// The full quality verdict recorded on a dialogue's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub heuristic_filters: HeuristicFilters,
    pub heuristic_score: f64,
    pub llm_evaluation: LlmEvaluation,
    pub overall_score: f64,
    pub passed_filters: bool,
}

impl QualityAssessment {
    /// `0.3*heuristic + 0.3*(coherence/5) + 0.4*(overall/5)`.
    pub fn compute_overall_score(heuristic_score: f64, llm: &LlmEvaluation) -> f64 {
        let coherence = llm.coherence_score.unwrap_or(0) as f64 / 5.0;
        let overall = llm.overall_score.unwrap_or(0) as f64 / 5.0;
        0.3 * heuristic_score + 0.3 * coherence + 0.4 * overall
    }

    /// Strict-mode acceptance: heuristic >= 0.5 OR (coherence>=3 AND
    /// overall>=3 AND goal_relevance). On LLM error, heuristic >= 0.5 only.
    pub fn decide_pass(heuristic_score: f64, llm: &LlmEvaluation) -> bool {
        if llm.error.is_some() {
            return heuristic_score >= 0.5;
        }
        let heuristic_ok = heuristic_score >= 0.5;
        let llm_ok = llm.coherence_score.unwrap_or(0) >= 3
            && llm.overall_score.unwrap_or(0) >= 3
            && llm.goal_relevance.unwrap_or(false);
        heuristic_ok || llm_ok
    }
}
