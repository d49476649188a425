//! Quality judging: six fast heuristic filters plus three LLM rubric calls,
//! combined into the [`QualityAssessment`] recorded on a dialogue's
//! metadata and used to accept or reject it.

use std::sync::Arc;

use chrono::Local;
use goalconvo_domain::dialogue::{Dialogue, Role, Turn};
use goalconvo_domain::lexicon::{jaccard_similarity, PROFANITY_WORDS};
use goalconvo_domain::quality::{FilterResult, HeuristicFilters, LlmEvaluation, QualityAssessment};
use goalconvo_llm::{CompletionRequest, LlmGateway};

const REPETITION_THRESHOLD: f64 = 0.7;
const MIN_RESPONSE_CHARS: usize = 3;

pub struct QualityJudge {
    gateway: Arc<LlmGateway>,
    min_turns: usize,
    max_turns: usize,
    improve_on_fail: bool,
}

impl QualityJudge {
    pub fn new(gateway: Arc<LlmGateway>, min_turns: usize, max_turns: usize, improve_on_fail: bool) -> Self {
        Self { gateway, min_turns, max_turns, improve_on_fail }
    }

    /// Run every heuristic filter plus the three LLM rubric prompts and
    /// combine them into a full assessment.
    pub async fn judge_dialogue(&self, dialogue: &Dialogue) -> QualityAssessment {
        let heuristic_filters = self.apply_heuristic_filters(dialogue);
        let heuristic_score = heuristic_filters.score();
        let llm_evaluation = self.apply_llm_evaluation(dialogue).await;
        let overall_score = QualityAssessment::compute_overall_score(heuristic_score, &llm_evaluation);
        let passed_filters = QualityAssessment::decide_pass(heuristic_score, &llm_evaluation);

        QualityAssessment {
            heuristic_filters,
            heuristic_score,
            llm_evaluation,
            overall_score,
            passed_filters,
        }
    }

    /// Judge one dialogue; on rejection, if `improve_on_fail` is set, ask
    /// the LLM for a rejection reason and a same-length rewrite, re-judge
    /// the rewrite once, and keep whichever version is accepted (preferring
    /// the repaired one). Never retries the repair itself a second time.
    pub async fn judge_with_repair(&self, mut dialogue: Dialogue) -> Dialogue {
        let assessment = self.judge_dialogue(&dialogue).await;

        if assessment.passed_filters {
            dialogue.metadata.quality_score = Some(assessment.overall_score);
            dialogue.metadata.quality_assessment = Some(assessment);
            return dialogue;
        }

        if !self.improve_on_fail {
            dialogue.metadata.rejection_reason = Some(rejection_reason(&assessment));
            dialogue.metadata.quality_score = Some(assessment.overall_score);
            dialogue.metadata.quality_assessment = Some(assessment);
            return dialogue;
        }

        match self.repair_dialogue(&dialogue).await {
            Some(repaired_turns) => {
                let mut repaired = dialogue.clone();
                repaired.turns = repaired_turns;
                repaired.metadata.num_turns = repaired.turns.len();
                let repaired_assessment = self.judge_dialogue(&repaired).await;
                if repaired_assessment.passed_filters {
                    repaired.metadata.improved_by_quality_judge = true;
                    repaired.metadata.quality_score = Some(repaired_assessment.overall_score);
                    repaired.metadata.quality_assessment = Some(repaired_assessment);
                    return repaired;
                }
                dialogue.metadata.rejection_reason = Some(rejection_reason(&assessment));
                dialogue.metadata.quality_score = Some(assessment.overall_score);
                dialogue.metadata.quality_assessment = Some(assessment);
                dialogue
            }
            None => {
                dialogue.metadata.rejection_reason = Some(rejection_reason(&assessment));
                dialogue.metadata.quality_score = Some(assessment.overall_score);
                dialogue.metadata.quality_assessment = Some(assessment);
                dialogue
            }
        }
    }

    /// Ask the LLM for a rejection reason (free text, logged only), then a
    /// rewrite constrained to exactly `len(turns)` `User:`/`SupportBot:`
    /// lines preserving the original role order. Returns `None` if the LLM
    /// call fails or the rewrite doesn't parse back into the same turn
    /// count with correct role alternation.
    async fn repair_dialogue(&self, dialogue: &Dialogue) -> Option<Vec<Turn>> {
        let history = format_history(dialogue);
        let reason_prompt = format!(
            "In one short paragraph, explain why this conversation fails a quality check \
             (consider coherence, relevance to the goal, and naturalness).\n\n\
             Goal: {}\nConversation:\n{history}",
            dialogue.goal
        );
        let reason = self
            .gateway
            .complete(&CompletionRequest { prompt: reason_prompt, temperature: 0.3, top_p: 0.9, max_tokens: 120 })
            .await
            .ok()?;
        tracing::info!(dialogue_id = %dialogue.dialogue_id, %reason, "quality judge rejection reason");

        let improve_prompt = format!(
            "Rewrite this conversation so it is coherent, natural, and fully addresses the \
             goal. You MUST keep exactly {} lines, alternating starting with `User:`, in the \
             form `User: ...` / `SupportBot: ...` with no other text before, between, or after \
             the lines.\n\nGoal: {}\nOriginal conversation:\n{history}",
            dialogue.turns.len(),
            dialogue.goal,
        );
        let rewrite = self
            .gateway
            .complete(&CompletionRequest {
                prompt: improve_prompt,
                temperature: 0.5,
                top_p: 0.9,
                max_tokens: 60 * dialogue.turns.len() as u32,
            })
            .await
            .ok()?;

        let turns = parse_strict_turns(&rewrite)?;
        if turns.len() != dialogue.turns.len() {
            return None;
        }
        let mut expected = Role::User;
        for t in &turns {
            if t.role != expected {
                return None;
            }
            expected = expected.counterpart().unwrap_or(Role::User);
        }
        Some(turns)
    }

    /// Judge a batch of dialogues, splitting them into accepted and
    /// rejected sets. If fewer than `target_discard_rate` were rejected by
    /// the filters, the lowest-scoring accepted dialogues are demoted to
    /// rejected until the target is met.
    pub async fn filter_dialogues(
        &self,
        dialogues: Vec<Dialogue>,
        target_discard_rate: f64,
    ) -> (Vec<Dialogue>, Vec<Dialogue>) {
        let total = dialogues.len();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for dialogue in dialogues {
            let judged = self.judge_with_repair(dialogue).await;
            let passed = judged
                .metadata
                .quality_assessment
                .as_ref()
                .map(|a| a.passed_filters)
                .unwrap_or(false);
            if passed {
                accepted.push(judged);
            } else {
                rejected.push(judged);
            }
        }

        if total > 0 {
            let current_rate = rejected.len() as f64 / total as f64;
            if current_rate < target_discard_rate {
                accepted.sort_by(|a, b| {
                    a.metadata
                        .quality_score
                        .unwrap_or(0.0)
                        .partial_cmp(&b.metadata.quality_score.unwrap_or(0.0))
                        .unwrap()
                });
                let num_to_discard = (accepted.len() as f64 * (target_discard_rate - current_rate)) as usize;
                for _ in 0..num_to_discard.min(accepted.len()) {
                    let mut demoted = accepted.remove(0);
                    demoted.metadata.rejection_reason =
                        Some("discarded to meet target discard rate".to_string());
                    rejected.push(demoted);
                }
            }
        }

        (accepted, rejected)
    }

    fn apply_heuristic_filters(&self, dialogue: &Dialogue) -> HeuristicFilters {
        HeuristicFilters {
            length: self.check_length(dialogue),
            repetition: check_repetition(dialogue),
            profanity: check_profanity(dialogue),
            coherence: check_coherence(dialogue),
            goal_mention: check_goal_mention(dialogue),
            empty_response: check_empty_responses(dialogue),
        }
    }

    fn check_length(&self, dialogue: &Dialogue) -> FilterResult {
        let n = dialogue.turns.len();
        if n >= self.min_turns && n <= self.max_turns {
            FilterResult::pass(format!("{n} turns (required: {}-{})", self.min_turns, self.max_turns))
        } else {
            FilterResult::fail(format!("{n} turns (required: {}-{})", self.min_turns, self.max_turns))
        }
    }

    async fn apply_llm_evaluation(&self, dialogue: &Dialogue) -> LlmEvaluation {
        if dialogue.turns.is_empty() {
            return LlmEvaluation::failed("no turns to evaluate");
        }
        let history = format_history(dialogue);

        let coherence = self.evaluate_score(&coherence_prompt(&history)).await;
        let goal_relevance = self.evaluate_goal_relevance(&dialogue.goal, &history).await;
        let overall = self.evaluate_score(&overall_quality_prompt(&dialogue.goal, &history)).await;

        match (coherence, goal_relevance, overall) {
            (Ok(c), Ok(g), Ok(o)) => LlmEvaluation {
                coherence_score: Some(c),
                goal_relevance: Some(g),
                overall_score: Some(o),
                error: None,
            },
            (c, g, o) => {
                let err = [c.err(), None, o.err()]
                    .into_iter()
                    .flatten()
                    .next()
                    .unwrap_or_else(|| goalconvo_domain::error::Error::BadLlmResponse("llm evaluation failed".into()));
                tracing::warn!(dialogue_id = %dialogue.dialogue_id, error = %err, "llm quality evaluation failed");
                let _ = g;
                LlmEvaluation::failed(err.to_string())
            }
        }
    }

    async fn evaluate_score(&self, prompt: &str) -> goalconvo_domain::error::Result<u8> {
        let req = CompletionRequest { prompt: prompt.to_string(), temperature: 0.1, top_p: 0.9, max_tokens: 10 };
        let response = self.gateway.complete(&req).await?;
        Ok(extract_score(&response).unwrap_or(3))
    }

    async fn evaluate_goal_relevance(&self, goal: &str, history: &str) -> goalconvo_domain::error::Result<bool> {
        let prompt = goal_relevance_prompt(goal, history);
        let req = CompletionRequest { prompt, temperature: 0.1, top_p: 0.9, max_tokens: 10 };
        let response = self.gateway.complete(&req).await?;
        Ok(response.to_uppercase().contains("YES"))
    }
}

fn rejection_reason(assessment: &QualityAssessment) -> String {
    if let Some(err) = &assessment.llm_evaluation.error {
        format!("heuristic_score={:.2}, llm_error={err}", assessment.heuristic_score)
    } else {
        format!(
            "heuristic_score={:.2}, coherence={:?}, overall={:?}, goal_relevance={:?}",
            assessment.heuristic_score,
            assessment.llm_evaluation.coherence_score,
            assessment.llm_evaluation.overall_score,
            assessment.llm_evaluation.goal_relevance
        )
    }
}

fn check_repetition(dialogue: &Dialogue) -> FilterResult {
    for window in dialogue.turns.windows(2) {
        if jaccard_similarity(&window[0].text, &window[1].text) > REPETITION_THRESHOLD {
            return FilterResult::fail("repeated utterances detected");
        }
    }
    FilterResult::pass("no repeated utterances detected")
}

fn check_profanity(dialogue: &Dialogue) -> FilterResult {
    let offenders: Vec<usize> = dialogue
        .turns
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            let lower = t.text.to_lowercase();
            PROFANITY_WORDS.iter().any(|w| lower.contains(w))
        })
        .map(|(i, _)| i)
        .collect();

    if offenders.is_empty() {
        FilterResult::pass("no profanity detected")
    } else {
        FilterResult::fail(format!("found profanity in {} turns", offenders.len()))
    }
}

/// Roles must strictly alternate User/SupportBot starting with User, and no
/// turn may be empty after trimming.
fn check_coherence(dialogue: &Dialogue) -> FilterResult {
    if dialogue.turns.len() < 2 {
        return FilterResult::fail("too few turns for coherence check");
    }
    let mut expected = Role::User;
    let mut role_coherent = true;
    for turn in &dialogue.turns {
        if turn.role != expected {
            role_coherent = false;
            break;
        }
        expected = expected.counterpart().unwrap_or(Role::User);
    }
    let has_empty = dialogue.turns.iter().any(|t| !t.has_nonempty_text());

    if role_coherent && !has_empty {
        FilterResult::pass("dialogue structure is coherent")
    } else {
        FilterResult::fail("dialogue structure issues detected")
    }
}

fn check_goal_mention(dialogue: &Dialogue) -> FilterResult {
    let keywords: Vec<&str> = dialogue.goal.to_lowercase().split_whitespace().collect();
    let text = dialogue.concatenated_text().to_lowercase();
    let mentioned = keywords.iter().any(|k| text.contains(k));
    if mentioned {
        FilterResult::pass("goal mentioned in dialogue")
    } else {
        FilterResult::fail("goal not mentioned")
    }
}

fn check_empty_responses(dialogue: &Dialogue) -> FilterResult {
    let short: Vec<usize> = dialogue
        .turns
        .iter()
        .enumerate()
        .filter(|(_, t)| t.text.trim().len() < MIN_RESPONSE_CHARS)
        .map(|(i, _)| i)
        .collect();

    if short.is_empty() {
        FilterResult::pass("all responses have sufficient content")
    } else {
        FilterResult::fail(format!("found {} empty/short responses", short.len()))
    }
}

fn format_history(dialogue: &Dialogue) -> String {
    dialogue
        .turns
        .iter()
        .map(|t| format!("{}: {}", t.role.as_str(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn coherence_prompt(history: &str) -> String {
    format!(
        "Rate the coherence of this conversation on a scale of 1-5, where 5 means the \
         turns build on each other naturally and 1 means they are disjointed.\n\n\
         Conversation:\n{history}\n\nRespond with only a number from 1-5."
    )
}

fn goal_relevance_prompt(goal: &str, history: &str) -> String {
    format!(
        "Does this conversation stay focused on and address the stated goal?\n\n\
         Goal: {goal}\nConversation:\n{history}\n\nRespond with only YES or NO."
    )
}

fn overall_quality_prompt(goal: &str, history: &str) -> String {
    format!(
        "Rate the overall quality of this conversation on a scale of 1-5, considering \
         naturalness, completeness, and whether the goal was addressed.\n\n\
         Goal: {goal}\nConversation:\n{history}\n\n\
         Score guide: 5 excellent, 4 good, 3 acceptable, 2 poor, 1 very poor.\n\
         Respond with only a number from 1-5."
    )
}

fn extract_score(response: &str) -> Option<u8> {
    response.chars().find(|c| ('1'..='5').contains(c)).and_then(|c| c.to_digit(10)).map(|d| d as u8)
}

/// Parse a repair rewrite into turns, accepting only lines of the strict
/// `User: ...` / `SupportBot: ...` form. Any other non-blank line makes the
/// whole rewrite unusable.
fn parse_strict_turns(rewrite: &str) -> Option<Vec<Turn>> {
    let mut turns = Vec::new();
    for line in rewrite.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (role, text) = if let Some(rest) = line.strip_prefix("User:") {
            (Role::User, rest.trim())
        } else if let Some(rest) = line.strip_prefix("SupportBot:") {
            (Role::SupportBot, rest.trim())
        } else {
            return None;
        };
        if text.is_empty() {
            return None;
        }
        turns.push(Turn::new(role, text, Local::now()));
    }
    if turns.is_empty() {
        None
    } else {
        Some(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use goalconvo_domain::dialogue::Turn;
    use goalconvo_llm::providers::StubProvider;
    use std::sync::Arc;

    fn dialogue(turns: Vec<Turn>, goal: &str) -> Dialogue {
        Dialogue {
            dialogue_id: uuid::Uuid::new_v4(),
            goal: goal.into(),
            domain: "hotel".into(),
            context: "c".into(),
            user_persona: "p".into(),
            turns,
            metadata: goalconvo_domain::dialogue::DialogueMetadata {
                num_turns: 0,
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
        }
    }

    #[test]
    fn check_profanity_flags_known_words() {
        let turns = vec![Turn::new(Role::User, "this is stupid", Local::now())];
        let d = dialogue(turns, "g");
        assert!(!check_profanity(&d).passed);
    }

    #[test]
    fn check_goal_mention_passes_when_keyword_present() {
        let turns = vec![Turn::new(Role::User, "I need a hotel room", Local::now())];
        let d = dialogue(turns, "hotel room booking");
        assert!(check_goal_mention(&d).passed);
    }

    #[test]
    fn extract_score_finds_digit() {
        assert_eq!(extract_score("I'd say 4 out of 5"), Some(4));
        assert_eq!(extract_score("no digits here"), None);
    }

    #[tokio::test]
    async fn judge_dialogue_falls_back_on_llm_error() {
        let provider = Arc::new(StubProvider::always_err(
            "stub",
            goalconvo_domain::error::Error::BadLlmResponse("down".into()),
        ));
        let gateway = Arc::new(goalconvo_llm::LlmGateway::from_providers(
            vec![provider],
            std::time::Duration::from_secs(1),
            0,
        ));
        let judge = QualityJudge::new(gateway, 1, 10, false);
        let turns = vec![
            Turn::new(Role::User, "I need a hotel room", Local::now()),
            Turn::new(Role::SupportBot, "Sure, what dates?", Local::now()),
        ];
        let d = dialogue(turns, "hotel room");
        let assessment = judge.judge_dialogue(&d).await;
        assert!(assessment.llm_evaluation.error.is_some());
    }

    #[test]
    fn parse_strict_turns_rejects_stray_text() {
        let rewrite = "Sure, here you go:\nUser: hi\nSupportBot: hello";
        assert!(parse_strict_turns(rewrite).is_none());
    }

    #[test]
    fn parse_strict_turns_accepts_alternating_lines() {
        let rewrite = "User: I need a room\nSupportBot: What dates?\nUser: Next week\nSupportBot: Booked.";
        let turns = parse_strict_turns(rewrite).unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::SupportBot);
        assert_eq!(turns[2].text, "Next week");
    }

    #[tokio::test]
    async fn judge_with_repair_accepts_successful_rewrite() {
        // First call: coherence prompt -> "2" (fails). Second: goal_relevance -> "NO".
        // Third: overall -> "2". These three make up the first judge_dialogue call.
        // Fourth: rejection reason text. Fifth: the improve rewrite.
        // Sixth..eighth: the re-judge of the repaired dialogue, all passing.
        let provider = Arc::new(StubProvider::sequence(
            "stub",
            vec![
                Ok("2".to_string()),
                Ok("NO".to_string()),
                Ok("2".to_string()),
                Ok("The dialogue repeats itself and ignores the goal.".to_string()),
                Ok("User: I need a hotel room\nSupportBot: Sure, what dates work for you?".to_string()),
                Ok("4".to_string()),
                Ok("YES".to_string()),
                Ok("4".to_string()),
            ],
        ));
        let gateway = Arc::new(goalconvo_llm::LlmGateway::from_providers(
            vec![provider],
            std::time::Duration::from_secs(1),
            0,
        ));
        let judge = QualityJudge::new(gateway, 1, 10, true);
        let turns = vec![
            Turn::new(Role::User, "this is stupid", Local::now()),
            Turn::new(Role::User, "this is stupid", Local::now()),
        ];
        let d = dialogue(turns, "hotel room booking");
        let result = judge.judge_with_repair(d).await;
        assert!(result.metadata.improved_by_quality_judge);
        assert_eq!(result.turns.len(), 2);
        assert!(result.metadata.quality_assessment.unwrap().passed_filters);
    }

    #[tokio::test]
    async fn judge_with_repair_keeps_original_when_rewrite_unparseable() {
        let provider = Arc::new(StubProvider::sequence(
            "stub",
            vec![
                Ok("2".to_string()),
                Ok("NO".to_string()),
                Ok("2".to_string()),
                Ok("Not coherent enough.".to_string()),
                Ok("Sorry, I can't do that.".to_string()),
            ],
        ));
        let gateway = Arc::new(goalconvo_llm::LlmGateway::from_providers(
            vec![provider],
            std::time::Duration::from_secs(1),
            0,
        ));
        let judge = QualityJudge::new(gateway, 1, 10, true);
        let turns = vec![
            Turn::new(Role::User, "this is stupid", Local::now()),
            Turn::new(Role::User, "this is stupid", Local::now()),
        ];
        let d = dialogue(turns, "hotel room booking");
        let result = judge.judge_with_repair(d).await;
        assert!(!result.metadata.improved_by_quality_judge);
        assert!(result.metadata.rejection_reason.is_some());
    }
}
