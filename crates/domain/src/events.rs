use serde::Serialize;

/// Structured events streamed to clients and mirrored into the log, one per
/// pipeline run. The `event` tag matches the wire contract clients key their
/// UI off of.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    PipelineStart {
        run_id: String,
        num_dialogues: usize,
        timestamp: String,
    },
    StepStart {
        run_id: String,
        step: String,
        step_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        domain: Option<String>,
        message: String,
    },
    StepData {
        run_id: String,
        step: String,
        data: serde_json::Value,
    },
    LiveDialogue {
        run_id: String,
        current_turns: usize,
        step_message: String,
        dialogue_index: usize,
        total_dialogues: usize,
        goal: String,
    },
    Log {
        run_id: String,
        level: String,
        message: String,
        step: String,
    },
    PipelineComplete {
        run_id: String,
        stats: serde_json::Value,
        evaluation: serde_json::Value,
        final_data: serde_json::Value,
    },
    PipelineError {
        run_id: String,
        message: String,
        error: String,
    },
}

impl PipelineEvent {
    /// Log the event and return it so it can also be pushed onto a session
    /// room's outbound channel.
    pub fn emit(self) -> Self {
        let json = serde_json::to_string(&self).unwrap_or_default();
        tracing::info!(goalconvo_event = %json, "goalconvo_event");
        self
    }

    pub fn run_id(&self) -> &str {
        match self {
            PipelineEvent::PipelineStart { run_id, .. }
            | PipelineEvent::StepStart { run_id, .. }
            | PipelineEvent::StepData { run_id, .. }
            | PipelineEvent::LiveDialogue { run_id, .. }
            | PipelineEvent::Log { run_id, .. }
            | PipelineEvent::PipelineComplete { run_id, .. }
            | PipelineEvent::PipelineError { run_id, .. } => run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = PipelineEvent::Log {
            run_id: "r1".into(),
            level: "info".into(),
            message: "hello".into(),
            step: "saving".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "log");
        assert_eq!(json["message"], "hello");
    }
}
