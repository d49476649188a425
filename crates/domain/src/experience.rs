use serde::{Deserialize, Serialize};

/// The structured expansion of a seed goal used to condition the simulator.
/// Created per goal draw, consumed once by the simulator, then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    pub goal: String,
    pub domain: String,
    pub context: String,
    pub first_utterance: String,
    pub user_persona: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subgoals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_persona_traits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supportbot_style: Option<String>,
}

impl Experience {
    /// A minimal, always-constructible Experience used when LLM-backed
    /// generation fails entirely.
    pub fn fallback(goal: &str, domain: &str) -> Self {
        Self {
            goal: goal.to_string(),
            domain: domain.to_string(),
            context: format!("A customer needs help with a {domain} request."),
            first_utterance: format!("Hi, I need help with: {goal}"),
            user_persona: "a polite customer".to_string(),
            subgoals: Vec::new(),
            constraints: Vec::new(),
            user_persona_traits: None,
            supportbot_style: None,
        }
    }
}
