use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quality::QualityAssessment;

/// A speaker in a dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    SupportBot,
    System,
}

impl Role {
    /// The counterpart role in the two-agent loop. `System` has none.
    pub fn counterpart(self) -> Option<Role> {
        match self {
            Role::User => Some(Role::SupportBot),
            Role::SupportBot => Some(Role::User),
            Role::System => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::SupportBot => "SupportBot",
            Role::System => "System",
        }
    }
}

/// A single utterance in a dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp,
        }
    }

    /// Non-empty after trimming, per the Turn invariant.
    pub fn has_nonempty_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Per-dialogue metadata recorded alongside the turn sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueMetadata {
    pub num_turns: usize,
    pub generated_at: DateTime<Local>,
    pub model_version: String,
    pub max_turns_reached: bool,
    pub min_turns_met: bool,
    pub generation_time_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_assessment: Option<QualityAssessment>,
    #[serde(default)]
    pub improved_by_quality_judge: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

/// A complete synthesized dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dialogue {
    pub dialogue_id: Uuid,
    pub goal: String,
    pub domain: String,
    pub context: String,
    pub user_persona: String,
    pub turns: Vec<Turn>,
    pub metadata: DialogueMetadata,
}

impl Dialogue {
    /// Non-System roles strictly alternate User/SupportBot starting with
    /// User, and every turn has non-empty trimmed text.
    pub fn is_well_formed(&self) -> bool {
        let mut expected = Role::User;
        for turn in &self.turns {
            if !turn.has_nonempty_text() {
                return false;
            }
            if turn.role == Role::System {
                continue;
            }
            if turn.role != expected {
                return false;
            }
            expected = expected.counterpart().unwrap_or(Role::User);
        }
        true
    }

    pub fn within_turn_bounds(&self, min_turns: usize, max_turns: usize) -> bool {
        self.turns.len() >= min_turns && self.turns.len() <= max_turns
    }

    /// Concatenated text of all turns, used by GCR/TSR/keyword checks.
    pub fn concatenated_text(&self) -> String {
        self.turns
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn turn(role: Role, text: &str) -> Turn {
        Turn::new(role, text, Local::now())
    }

    #[test]
    fn well_formed_requires_alternation_starting_with_user() {
        let d = Dialogue {
            dialogue_id: Uuid::new_v4(),
            goal: "g".into(),
            domain: "hotel".into(),
            context: "c".into(),
            user_persona: "p".into(),
            turns: vec![
                turn(Role::User, "hi"),
                turn(Role::SupportBot, "hello"),
                turn(Role::User, "thanks"),
            ],
            metadata: DialogueMetadata {
                num_turns: 3,
                generated_at: Local::now(),
                model_version: "stub".into(),
                max_turns_reached: false,
                min_turns_met: true,
                generation_time_seconds: 0.0,
                quality_score: None,
                quality_assessment: None,
                improved_by_quality_judge: false,
                rejection_reason: None,
            },
        };
        assert!(d.is_well_formed());
    }

    #[test]
    fn rejects_supportbot_first() {
        let mut d_turns = vec![turn(Role::SupportBot, "hi"), turn(Role::User, "hey")];
        let d = Dialogue {
            dialogue_id: Uuid::new_v4(),
            goal: "g".into(),
            domain: "hotel".into(),
            context: "c".into(),
            user_persona: "p".into(),
            turns: std::mem::take(&mut d_turns),
            metadata: DialogueMetadata {
                num_turns: 2,
                generated_at: Local::now(),
                model_version: "stub".into(),
                max_turns_reached: false,
                min_turns_met: false,
                generation_time_seconds: 0.0,
                quality_score: None,
                quality_assessment: None,
                improved_by_quality_judge: false,
                rejection_reason: None,
            },
        };
        assert!(!d.is_well_formed());
    }
}
