//! Pipeline orchestrator: the one entry point that wires Experience
//! Generator, Dialogue Simulator, Quality Judge, Evaluator, and the
//! store crate's persistence/versioning into a single `RunPipeline`
//! operation, streaming progress into a session's event room.

use std::collections::HashMap;
use std::sync::Arc;

use goalconvo_domain::config::{Config, RunOverrides};
use goalconvo_domain::dialogue::Dialogue;
use goalconvo_domain::error::{Error, Result};
use goalconvo_domain::events::PipelineEvent;
use goalconvo_domain::fallback_responses::FallbackCatalog;
use goalconvo_llm::LlmGateway;
use goalconvo_store::{DatasetStore, FewShotHub, HumanEvalStore, SeedGoalPool, VersionManager};
use serde::{Deserialize, Serialize};

use crate::evaluator::Evaluator;
use crate::experience_generator::{default_seed_goals, ExperienceGenerator};
use crate::quality_judge::QualityJudge;
use crate::room_registry::RoomRegistry;
use crate::simulator::DialogueSimulator;

/// The process-wide, `Arc`-backed handle to every shared resource a
/// pipeline run touches. Constructed once in `main.rs`; cheap to clone
/// into axum handlers and orchestrator tasks.
#[derive(Clone)]
pub struct PipelineContext {
    pub config: Arc<Config>,
    pub gateway: Arc<LlmGateway>,
    pub dataset_store: Arc<DatasetStore>,
    pub few_shot_hub: Arc<FewShotHub>,
    pub version_manager: Arc<VersionManager>,
    pub human_eval_store: Arc<HumanEvalStore>,
    pub seed_goals: Arc<SeedGoalPool>,
    pub fallbacks: Arc<FallbackCatalog>,
    pub rooms: Arc<RoomRegistry>,
}

impl PipelineContext {
    /// Build the default seed-goal table (one entry per configured
    /// domain, `default_seed_goals`) used to bootstrap `SeedGoalPool`
    /// on a fresh data directory.
    pub fn default_seed_goal_table(domains: &[String]) -> HashMap<String, Vec<String>> {
        domains
            .iter()
            .map(|d| (d.clone(), default_seed_goals(d).into_iter().map(str::to_string).collect()))
            .collect()
    }
}

/// Request body for `RunPipeline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPipelineRequest {
    pub num_dialogues: usize,
    #[serde(default)]
    pub domains: Option<Vec<String>>,
    pub session_id: String,
    #[serde(default)]
    pub experiment_tag: Option<String>,
    #[serde(default)]
    pub overrides: Option<RunOverrides>,
    /// A previously created version id to use as the evaluator's
    /// reference corpus, if any.
    #[serde(default)]
    pub reference_version_id: Option<String>,
}

pub struct PipelineOrchestrator {
    ctx: PipelineContext,
}

impl PipelineOrchestrator {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Validate the request and spawn the run as an independent task
    /// that streams its progress into `req.session_id`'s room. Returns
    /// as soon as validation passes; the caller should subscribe to the
    /// room (via `/ws`) to observe `pipeline_complete`/`pipeline_error`.
    pub fn start(&self, req: RunPipelineRequest) -> Result<()> {
        let domains = match &req.domains {
            Some(requested) => {
                for d in requested {
                    if !self.ctx.config.domains.contains(d) {
                        return Err(Error::InvalidDialogue(format!(
                            "domain '{d}' is not in the allowed set {:?}",
                            self.ctx.config.domains
                        )));
                    }
                }
                requested.clone()
            }
            None => self.ctx.config.domains.clone(),
        };
        if domains.is_empty() {
            return Err(Error::InvalidDialogue("no domains selected".into()));
        }

        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            run(ctx, req, domains).await;
        });
        Ok(())
    }
}

/// Split `n` across `domains.len()` slots: `base = n / |domains|`, the
/// first `n % |domains|` domains get one extra.
fn distribute(n: usize, domains: &[String]) -> Vec<(String, usize)> {
    let count = domains.len();
    let base = n / count;
    let remainder = n % count;
    domains
        .iter()
        .enumerate()
        .map(|(i, d)| (d.clone(), base + usize::from(i < remainder)))
        .collect()
}

async fn run(ctx: PipelineContext, req: RunPipelineRequest, domains: Vec<String>) {
    let run_id = req.session_id.clone();
    let rooms = ctx.rooms.clone();

    rooms.emit(
        &run_id,
        PipelineEvent::PipelineStart {
            run_id: run_id.clone(),
            num_dialogues: req.num_dialogues,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
        .emit(),
    );

    let overrides = req.overrides.clone().unwrap_or_default();
    let temperature = overrides.temperature.unwrap_or(ctx.config.temperature);
    let few_shot_examples = overrides.few_shot_examples.unwrap_or(ctx.config.few_shot_examples);
    let quality_judge_enabled = overrides.quality_judge.unwrap_or(true);
    let quality_improve_on_fail = overrides.quality_improve_on_fail.unwrap_or(ctx.config.quality_improve_on_fail);

    let experience_gen = ExperienceGenerator::new(
        ctx.gateway.clone(),
        ctx.few_shot_hub.clone(),
        few_shot_examples,
        temperature,
        ctx.config.top_p,
        ctx.config.max_tokens_user_turn,
    );
    let simulator = DialogueSimulator::new(
        ctx.gateway.clone(),
        ctx.config.min_turns,
        ctx.config.max_turns,
        temperature,
        ctx.config.top_p,
        ctx.config.max_tokens_user_turn,
        ctx.config.max_tokens_supportbot_turn,
        ctx.config.prompt_max_words,
        ctx.config.prompt_instruction_words,
        ctx.config.prompt_last_k_turns,
        "goalconvo",
        ctx.fallbacks.clone(),
    );
    let judge = QualityJudge::new(ctx.gateway.clone(), ctx.config.min_turns, ctx.config.max_turns, quality_improve_on_fail);

    let mut accepted: Vec<Dialogue> = Vec::new();
    let mut discarded: usize = 0;
    let total = req.num_dialogues;
    let mut generated = 0usize;
    let mut by_domain: HashMap<String, serde_json::Value> = HashMap::new();

    for (domain, slots) in distribute(total, &domains) {
        rooms.emit(
            &run_id,
            PipelineEvent::StepStart {
                run_id: run_id.clone(),
                step: "experience_generation".into(),
                step_name: "Experience Generation".into(),
                domain: Some(domain.clone()),
                message: format!("Starting experience generation for domain: {domain}"),
            }
            .emit(),
        );

        let mut raw = Vec::with_capacity(slots);
        for i in 0..slots {
            generated += 1;
            let goal = ctx
                .seed_goals
                .draw(&domain)
                .unwrap_or_else(|| format!("Get help with a {domain} request"));

            rooms.emit(
                &run_id,
                PipelineEvent::Log {
                    run_id: run_id.clone(),
                    level: "info".into(),
                    message: format!("Generating experience {}/{slots} for goal: {goal}", i + 1),
                    step: "experience_generation".into(),
                }
                .emit(),
            );

            let experience = experience_gen.generate_experience(&goal, Some(&domain)).await;
            rooms.emit(
                &run_id,
                PipelineEvent::StepData {
                    run_id: run_id.clone(),
                    step: "experience_generation".into(),
                    data: serde_json::json!({"experience": experience}),
                }
                .emit(),
            );

            rooms.emit(
                &run_id,
                PipelineEvent::StepStart {
                    run_id: run_id.clone(),
                    step: "dialogue_simulation".into(),
                    step_name: "Dialogue Simulation".into(),
                    domain: Some(domain.clone()),
                    message: format!("Simulating dialogue {}/{slots}...", i + 1),
                }
                .emit(),
            );

            let dialogue = simulator.simulate_dialogue(&experience).await;
            rooms.emit(
                &run_id,
                PipelineEvent::LiveDialogue {
                    run_id: run_id.clone(),
                    current_turns: dialogue.turns.len(),
                    step_message: format!("Dialogue {}/{slots} simulated", i + 1),
                    dialogue_index: i + 1,
                    total_dialogues: slots,
                    goal: experience.goal.chars().take(80).collect(),
                }
                .emit(),
            );
            rooms.emit(
                &run_id,
                PipelineEvent::StepData {
                    run_id: run_id.clone(),
                    step: "dialogue_simulation".into(),
                    data: serde_json::json!({"dialogue": dialogue}),
                }
                .emit(),
            );
            raw.push(dialogue);
        }

        rooms.emit(
            &run_id,
            PipelineEvent::StepStart {
                run_id: run_id.clone(),
                step: "quality_filtering".into(),
                step_name: "Quality Filtering".into(),
                domain: Some(domain.clone()),
                message: if quality_judge_enabled {
                    format!("Filtering {} dialogues for quality...", raw.len())
                } else {
                    "Quality judge disabled (ablation): accepting all dialogues".into()
                },
            }
            .emit(),
        );

        let domain_generated = raw.len();
        let (domain_accepted, domain_rejected) = if quality_judge_enabled {
            judge.filter_dialogues(raw, ctx.config.discard_rate).await
        } else {
            (raw, Vec::new())
        };

        rooms.emit(
            &run_id,
            PipelineEvent::StepData {
                run_id: run_id.clone(),
                step: "quality_filtering".into(),
                data: serde_json::json!({
                    "accepted": domain_accepted.len(),
                    "rejected": domain_rejected.len(),
                    "accepted_dialogues": domain_accepted.iter().map(|d| serde_json::json!({
                        "dialogue_id": d.dialogue_id,
                        "quality_score": d.metadata.quality_score,
                        "turns": d.turns.len(),
                    })).collect::<Vec<_>>(),
                }),
            }
            .emit(),
        );

        rooms.emit(
            &run_id,
            PipelineEvent::StepStart {
                run_id: run_id.clone(),
                step: "saving".into(),
                step_name: "Saving Dialogues".into(),
                domain: None,
                message: format!("Saving {} accepted dialogues...", domain_accepted.len()),
            }
            .emit(),
        );

        let mut domain_accepted_count = 0usize;
        for dialogue in domain_accepted {
            match ctx.dataset_store.save(dialogue) {
                Ok(saved) => {
                    rooms.emit(
                        &run_id,
                        PipelineEvent::Log {
                            run_id: run_id.clone(),
                            level: "success".into(),
                            message: format!("Saved dialogue: {}", saved.dialogue_id),
                            step: "saving".into(),
                        }
                        .emit(),
                    );
                    domain_accepted_count += 1;
                    accepted.push(saved);
                }
                Err(e) => {
                    discarded += 1;
                    rooms.emit(
                        &run_id,
                        PipelineEvent::Log {
                            run_id: run_id.clone(),
                            level: "error".into(),
                            message: format!("Failed to save dialogue: {e}"),
                            step: "saving".into(),
                        }
                        .emit(),
                    );
                }
            }
        }
        discarded += domain_rejected.len();
        for rejected in &domain_rejected {
            rooms.emit(
                &run_id,
                PipelineEvent::StepData {
                    run_id: run_id.clone(),
                    step: "quality_filtering".into(),
                    data: serde_json::json!({
                        "rejected": rejected.dialogue_id,
                        "reason": rejected.metadata.rejection_reason,
                    }),
                }
                .emit(),
            );
        }

        by_domain.insert(
            domain.clone(),
            serde_json::json!({
                "generated": domain_generated,
                "accepted": domain_accepted_count,
                "rejected": domain_rejected.len(),
            }),
        );

        if accepted.len() % 100 == 0 && !accepted.is_empty() {
            if let Err(e) = ctx.few_shot_hub.promote_top_quality(&accepted, 0.1) {
                tracing::warn!(error = %e, "hub promotion failed mid-run");
            }
        }
    }

    if !accepted.is_empty() {
        if let Err(e) = ctx.few_shot_hub.promote_top_quality(&accepted, 0.1) {
            tracing::warn!(error = %e, "final hub promotion failed");
        }
    }

    rooms.emit(
        &run_id,
        PipelineEvent::StepStart {
            run_id: run_id.clone(),
            step: "evaluation".into(),
            step_name: "Evaluation".into(),
            domain: None,
            message: "Computing evaluation metrics...".into(),
        }
        .emit(),
    );

    let evaluator = Evaluator::new(
        Some(ctx.gateway.clone()),
        ctx.config.bertscore_model.clone(),
        ctx.config.bertscore_fallback_model.clone(),
    );
    let reference = req
        .reference_version_id
        .as_deref()
        .and_then(|id| ctx.version_manager.load_dialogues(id).ok());
    let report = evaluator.evaluate(&accepted, reference.as_deref()).await;
    let evaluation = serde_json::to_value(&report).unwrap_or(serde_json::Value::Null);

    let generation_config = serde_json::json!({
        "temperature": temperature,
        "top_p": ctx.config.top_p,
        "min_turns": ctx.config.min_turns,
        "max_turns": ctx.config.max_turns,
        "few_shot_examples": few_shot_examples,
        "quality_judge": quality_judge_enabled,
        "quality_improve_on_fail": quality_improve_on_fail,
        "discard_rate": ctx.config.discard_rate,
        "overrides": overrides,
        "model_version": "goalconvo",
    });

    let mut tags = vec!["pipeline".to_string(), "auto-generated".to_string()];
    if let Some(tag) = &req.experiment_tag {
        tags.push(tag.clone());
    }

    let stats = serde_json::json!({
        "total_generated": generated,
        "total_accepted": accepted.len(),
        "total_rejected": discarded,
        "by_domain": by_domain,
    });

    match ctx
        .version_manager
        .create_version(&accepted, &format!("pipeline run for session {run_id}"), generation_config, None, tags)
    {
        Ok(version_id) => {
            let mut final_data = stats.clone();
            final_data["version_id"] = serde_json::json!(version_id);
            rooms.emit(
                &run_id,
                PipelineEvent::PipelineComplete {
                    run_id: run_id.clone(),
                    stats,
                    evaluation,
                    final_data,
                }
                .emit(),
            );
        }
        Err(e) => {
            rooms.emit(
                &run_id,
                PipelineEvent::PipelineError {
                    run_id: run_id.clone(),
                    message: format!("Pipeline failed: failed to create version snapshot: {e}"),
                    error: e.to_string(),
                }
                .emit(),
            );
        }
    }

    rooms.close(&run_id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distribute_gives_remainder_to_first_domains() {
        let domains = vec!["hotel".to_string(), "taxi".to_string(), "train".to_string()];
        let plan = distribute(7, &domains);
        assert_eq!(plan, vec![("hotel".to_string(), 3), ("taxi".to_string(), 2), ("train".to_string(), 2)]);
    }

    #[test]
    fn distribute_handles_fewer_dialogues_than_domains() {
        let domains = vec!["hotel".to_string(), "taxi".to_string()];
        let plan = distribute(1, &domains);
        assert_eq!(plan, vec![("hotel".to_string(), 1), ("taxi".to_string(), 0)]);
    }
}
