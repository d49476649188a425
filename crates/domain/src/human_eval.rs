use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dimensions a human annotator can score, 1-5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationDimension {
    Coherence,
    Naturalness,
    TaskSuccess,
    Fluency,
    Relevance,
    OverallQuality,
}

impl EvaluationDimension {
    pub const ALL: [EvaluationDimension; 6] = [
        EvaluationDimension::Coherence,
        EvaluationDimension::Naturalness,
        EvaluationDimension::TaskSuccess,
        EvaluationDimension::Fluency,
        EvaluationDimension::Relevance,
        EvaluationDimension::OverallQuality,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationDimension::Coherence => "coherence",
            EvaluationDimension::Naturalness => "naturalness",
            EvaluationDimension::TaskSuccess => "task_success",
            EvaluationDimension::Fluency => "fluency",
            EvaluationDimension::Relevance => "relevance",
            EvaluationDimension::OverallQuality => "overall_quality",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HumanAnnotation {
    pub annotation_id: String,
    pub dialogue_id: String,
    pub annotator_id: String,
    pub timestamp: DateTime<Utc>,
    pub dimensions: std::collections::HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_completed: Option<bool>,
    #[serde(default)]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationTask {
    pub task_id: String,
    pub dialogue_id: String,
    pub dialogue_data: serde_json::Value,
    pub assigned_to: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub status: TaskStatus,
}

/// Inter-annotator agreement for one dialogue/dimension pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgreementReport {
    pub dimension: String,
    pub annotation_count: usize,
    pub scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
    pub agreement_rate: f64,
    pub min: f64,
    pub max: f64,
}
