use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An immutable, content-addressed snapshot of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetVersion {
    pub version_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub description: String,
    pub metadata: VersionSummary,
    pub dialogue_count: usize,
    pub domain_distribution: HashMap<String, usize>,
    pub generation_config: serde_json::Value,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_version: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub total_dialogues: usize,
    pub avg_turns: f64,
    pub domains: Vec<String>,
}

/// Result of comparing two versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparison {
    pub version_a: String,
    pub version_b: String,
    pub dialogue_count: CountDiff,
    pub domain_distribution: DomainDistributionDiff,
    pub avg_turns_diff: f64,
    pub checksum_match: bool,
    pub config_diff: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountDiff {
    pub a: usize,
    pub b: usize,
    pub difference: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainDistributionDiff {
    pub a: HashMap<String, usize>,
    pub b: HashMap<String, usize>,
}

/// Export target formats named in the spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Jsonl,
    Hf,
    Rasa,
}
