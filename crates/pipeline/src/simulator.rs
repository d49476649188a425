//! Two-agent dialogue simulator: alternates a User agent and a SupportBot
//! agent, both driven by the same LLM gateway, until the goal is satisfied
//! or the turn budget runs out.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use goalconvo_domain::dialogue::{Dialogue, DialogueMetadata, Role, Turn};
use goalconvo_domain::experience::Experience;
use goalconvo_domain::fallback_responses::FallbackCatalog;
use goalconvo_domain::lexicon::{jaccard_similarity, COMPLETION_KEYWORDS, SUPPORTBOT_FALLBACK_VARIANTS, TSR_SATISFACTION_KEYWORDS, USER_FALLBACK_VARIANTS};
use goalconvo_llm::{CompletionRequest, LlmGateway};
use uuid::Uuid;

const REPETITION_WINDOW: usize = 6;
const REPETITION_THRESHOLD: f64 = 0.5;
const GOAL_CHECK_INTERVAL: usize = 3;

pub struct DialogueSimulator {
    gateway: Arc<LlmGateway>,
    min_turns: usize,
    max_turns: usize,
    temperature: f32,
    top_p: f32,
    max_tokens_user_turn: u32,
    max_tokens_supportbot_turn: u32,
    prompt_max_words: usize,
    prompt_instruction_words: usize,
    prompt_last_k_turns: usize,
    model_version: String,
    fallbacks: Arc<FallbackCatalog>,
}

impl DialogueSimulator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<LlmGateway>,
        min_turns: usize,
        max_turns: usize,
        temperature: f32,
        top_p: f32,
        max_tokens_user_turn: u32,
        max_tokens_supportbot_turn: u32,
        prompt_max_words: usize,
        prompt_instruction_words: usize,
        prompt_last_k_turns: usize,
        model_version: impl Into<String>,
        fallbacks: Arc<FallbackCatalog>,
    ) -> Self {
        Self {
            gateway,
            min_turns,
            max_turns,
            temperature,
            top_p,
            max_tokens_user_turn,
            max_tokens_supportbot_turn,
            prompt_max_words,
            prompt_instruction_words,
            prompt_last_k_turns,
            model_version: model_version.into(),
            fallbacks,
        }
    }

    /// Simulate a full dialogue for one experience. Never fails: LLM errors
    /// degrade to deterministic fallback turns so the minimum turn count is
    /// always met.
    pub async fn simulate_dialogue(&self, experience: &Experience) -> Dialogue {
        let start = Instant::now();
        let dialogue_id = Uuid::new_v4();
        let mut turns: Vec<Turn> = Vec::new();

        if experience.first_utterance.trim().is_empty() {
            let text = self.generate_user_turn(experience, &turns).await;
            turns.push(Turn::new(Role::User, text, Local::now()));
        } else {
            turns.push(Turn::new(Role::User, experience.first_utterance.clone(), Local::now()));
        }

        let mut last_goal_check_turn = 0usize;

        for turn_num in 1..=self.max_turns {
            let supportbot_text = self.generate_supportbot_turn(experience, &turns).await;
            turns.push(Turn::new(Role::SupportBot, supportbot_text, Local::now()));

            let user_text = self.generate_user_turn(experience, &turns).await;
            turns.push(Turn::new(Role::User, user_text, Local::now()));

            if turns.len() < self.min_turns {
                continue;
            }

            if self.detect_repetition_loop(&turns) {
                tracing::info!(%dialogue_id, turns = turns.len(), "repetition loop detected, forcing completion");
                let venue = venue_from_goal(&experience.goal, &experience.domain);
                let confirm = match experience.domain.as_str() {
                    "hotel" => format!("Your booking at {venue} is confirmed. Is there anything else?"),
                    "restaurant" => format!("Your reservation at {venue} is confirmed. Is there anything else?"),
                    _ => format!("All set with your request for {}. Anything else I can help with?", experience.goal),
                };
                turns.push(Turn::new(Role::SupportBot, confirm, Local::now()));
                turns.push(Turn::new(Role::User, "Thank you, that's perfect! I'm all set.".to_string(), Local::now()));
                break;
            }

            let check_due = turns.len() - last_goal_check_turn >= GOAL_CHECK_INTERVAL && turn_num < self.max_turns;
            if check_due {
                if self.check_completion_keywords(&turns) {
                    tracing::debug!(%dialogue_id, turns = turns.len(), "goal satisfied (keyword check)");
                    break;
                }
                match self.check_goal_satisfied(&experience.goal, &turns).await {
                    Ok(true) => {
                        tracing::debug!(%dialogue_id, turns = turns.len(), "goal satisfied (llm check)");
                        break;
                    }
                    Ok(false) => {}
                    Err(e) => tracing::warn!(%dialogue_id, error = %e, "goal satisfaction check failed, continuing"),
                }
                last_goal_check_turn = turns.len();
            }
        }

        while turns.len() < self.min_turns {
            let supportbot_count = turns.iter().filter(|t| t.role == Role::SupportBot).count();
            if supportbot_count < self.min_turns / 2 {
                let text = self.fallback_supportbot_response(experience, &turns);
                turns.push(Turn::new(Role::SupportBot, text, Local::now()));
            }
            if turns.len() < self.min_turns {
                let text = self.fallback_user_response(experience, &turns);
                turns.push(Turn::new(Role::User, text, Local::now()));
            }
        }

        let generation_time_seconds = start.elapsed().as_secs_f64();
        let max_turns_reached = turns.len() >= self.max_turns;
        let min_turns_met = turns.len() >= self.min_turns;

        Dialogue {
            dialogue_id,
            goal: experience.goal.clone(),
            domain: experience.domain.clone(),
            context: experience.context.clone(),
            user_persona: experience.user_persona.clone(),
            metadata: DialogueMetadata {
                num_turns: turns.len(),
                generated_at: Local::now(),
                model_version: self.model_version.clone(),
                max_turns_reached,
                min_turns_met,
                generation_time_seconds,
                quality_score: None,
                quality_assessment: None,
                improved_by_quality_judge: false,
                rejection_reason: None,
            },
            turns,
        }
    }

    async fn generate_user_turn(&self, experience: &Experience, turns: &[Turn]) -> String {
        let prompt = self.build_user_prompt(experience, turns);
        let req = CompletionRequest {
            prompt,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens_user_turn,
        };
        let text = match self.gateway.complete(&req).await {
            Ok(text) => clean_response(&text),
            Err(e) => {
                tracing::warn!(error = %e, "user turn generation failed, using fallback");
                return self.fallback_user_response(experience, turns);
            }
        };
        if text.is_empty() {
            return "I need help with this.".to_string();
        }
        if turns.iter().any(|t| t.role == Role::User && t.text.eq_ignore_ascii_case(&text)) {
            return vary_response(&text, turns.len());
        }
        text
    }

    async fn generate_supportbot_turn(&self, experience: &Experience, turns: &[Turn]) -> String {
        let prompt = self.build_supportbot_prompt(experience, turns);
        let req = CompletionRequest {
            prompt,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens_supportbot_turn,
        };
        let text = match self.gateway.complete(&req).await {
            Ok(text) => clean_response(&text),
            Err(e) => {
                tracing::warn!(error = %e, "supportbot turn generation failed, using fallback");
                return self.fallback_supportbot_response(experience, turns);
            }
        };
        if text.is_empty() {
            return "I can help you with that.".to_string();
        }
        if turns.iter().any(|t| t.role == Role::SupportBot && t.text.eq_ignore_ascii_case(&text)) {
            return vary_response(&text, turns.len());
        }
        text
    }

    fn build_user_prompt(&self, experience: &Experience, turns: &[Turn]) -> String {
        let history = format_history(self.recent_turns(turns));
        let structured = format_structured_goal(experience);
        let traits = experience
            .user_persona_traits
            .as_deref()
            .map(|t| format!("Communication style: {t}\n"))
            .unwrap_or_default();

        let prompt = format!(
            "You are a user with a specific goal you want a support assistant to fully resolve. \
             When the goal is completely achieved you must express explicit satisfaction in your \
             next turn (e.g. \"Thank you, that's perfect!\"), not a bare \"okay\". Vary your wording \
             turn to turn and never repeat a question you already asked. Respond to the last \
             assistant message directly.\n\n\
             Domain: {}\nGoal: {}\nContext: {}\nUser persona: {}\n{structured}{traits}\n\
             Conversation so far:\n{history}\n\n\
             Reply with only your next message (1-2 sentences), no role label.",
            experience.domain, experience.goal, experience.context, experience.user_persona,
        );
        self.truncate_prompt(&prompt)
    }

    fn build_supportbot_prompt(&self, experience: &Experience, turns: &[Turn]) -> String {
        let history = format_history(self.recent_turns(turns));
        let structured = format_structured_goal(experience);
        let style = experience
            .supportbot_style
            .as_deref()
            .map(|s| format!("Style: {s}\n"))
            .unwrap_or_default();

        let prompt = format!(
            "You are a helpful support assistant. Respond directly to the user's last message and \
             help them reach their goal. When the goal is fully addressed, explicitly confirm \
             completion so the user can naturally thank you.\n\n\
             Domain: {}\nUser goal: {}\nContext: {}\n{structured}{style}\n\
             Conversation so far:\n{history}\n\n\
             Reply with only your next message (1-3 sentences), no role label.",
            experience.domain, experience.goal, experience.context,
        );
        self.truncate_prompt(&prompt)
    }

    fn recent_turns<'a>(&self, turns: &'a [Turn]) -> &'a [Turn] {
        let k = self.prompt_last_k_turns;
        if turns.len() > k {
            &turns[turns.len() - k..]
        } else {
            turns
        }
    }

    fn truncate_prompt(&self, prompt: &str) -> String {
        let words: Vec<&str> = prompt.split_whitespace().collect();
        if words.len() <= self.prompt_max_words {
            return prompt.to_string();
        }
        let first = words[..self.prompt_instruction_words.min(words.len())].join(" ");
        let tail_len = self.prompt_max_words.saturating_sub(self.prompt_instruction_words);
        let last = words[words.len().saturating_sub(tail_len)..].join(" ");
        format!("{first}... [truncated] ...{last}")
    }

    /// True if the last `REPETITION_WINDOW` turns closely mirror the
    /// `REPETITION_WINDOW` before them.
    fn detect_repetition_loop(&self, turns: &[Turn]) -> bool {
        if turns.len() < 2 * REPETITION_WINDOW {
            return false;
        }
        let recent = &turns[turns.len() - REPETITION_WINDOW..];
        let previous = &turns[turns.len() - 2 * REPETITION_WINDOW..turns.len() - REPETITION_WINDOW];
        let avg = (0..REPETITION_WINDOW)
            .map(|i| jaccard_similarity(&recent[i].text, &previous[i].text))
            .sum::<f64>()
            / REPETITION_WINDOW as f64;
        avg >= REPETITION_THRESHOLD
    }

    /// Fast keyword check over the last few User turns, tried before the
    /// slower LLM-backed check.
    fn check_completion_keywords(&self, turns: &[Turn]) -> bool {
        let recent = if turns.len() >= 4 { &turns[turns.len() - 4..] } else { turns };
        recent.iter().filter(|t| t.role == Role::User).any(|t| {
            let lower = t.text.to_lowercase();
            TSR_SATISFACTION_KEYWORDS.iter().any(|k| lower.contains(k))
                || COMPLETION_KEYWORDS.iter().any(|k| lower.contains(k))
        })
    }

    async fn check_goal_satisfied(&self, goal: &str, turns: &[Turn]) -> goalconvo_domain::error::Result<bool> {
        let user_turns = turns.iter().filter(|t| t.role == Role::User).count();
        let supportbot_turns = turns.iter().filter(|t| t.role == Role::SupportBot).count();
        if user_turns < 2 || supportbot_turns < 2 {
            return Ok(false);
        }

        let history = format_history(turns);
        let prompt = format!(
            "Has the user's goal been fully and completely achieved, with the assistant explicitly \
             confirming completion and the user expressing clear satisfaction in their last turn?\n\n\
             Goal: {goal}\nConversation:\n{history}\n\n\
             Answer with only YES or NO."
        );
        let req = CompletionRequest {
            prompt,
            temperature: 0.1,
            top_p: self.top_p,
            max_tokens: 3,
        };
        let response = self.gateway.complete(&req).await?;
        let upper = response.trim().to_uppercase();
        Ok(upper.starts_with("YES") || (upper.contains("YES") && !upper.contains("NO")))
    }

    fn fallback_user_response(&self, experience: &Experience, turns: &[Turn]) -> String {
        if !experience.goal.trim().is_empty() {
            return format!("I still need help with {}.", experience.goal.trim());
        }
        if turns.len() < 2 {
            return "I need help with this.".to_string();
        }
        USER_FALLBACK_VARIANTS[turns.len() % USER_FALLBACK_VARIANTS.len()].to_string()
    }

    fn fallback_supportbot_response(&self, experience: &Experience, turns: &[Turn]) -> String {
        let venue = venue_from_goal(&experience.goal, &experience.domain);
        let render = |template: &str| template.replace("{venue}", &venue).replace("{goal}", &experience.goal);
        let domain_fallbacks = self.fallbacks.for_domain(&experience.domain);

        if turns.len() < 2 {
            return match domain_fallbacks {
                Some(d) => render(&d.opening),
                None => format!("I'd be happy to help you with {}. How can I assist?", experience.goal),
            };
        }

        let last_user = turns.iter().rev().find(|t| t.role == Role::User).map(|t| t.text.to_lowercase());
        let Some(last_user) = last_user else {
            return format!("I can help you with {}. What would you like to know?", experience.goal);
        };
        let Some(d) = domain_fallbacks else {
            return render(&self.fallbacks.default_generic);
        };

        if (last_user.contains("price") || last_user.contains("cost") || last_user.contains("fare") || last_user.contains("ticket"))
        {
            return render(&d.price);
        }
        if let Some(veg) = &d.vegetarian {
            if last_user.contains("vegetarian") || last_user.contains("vegan") {
                return render(veg);
            }
        }
        if last_user.contains("available") || last_user.contains("book") || last_user.contains("reserv") {
            return render(&d.availability);
        }
        if last_user.contains('?') {
            return "Let me check that information for you.".to_string();
        }
        if last_user.contains("thank") {
            return "You're welcome! Is there anything else I can help with?".to_string();
        }
        render(&d.generic)
    }
}

/// Render turns as `Role: text` lines for prompt construction.
fn format_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.as_str(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_structured_goal(experience: &Experience) -> String {
    let mut parts = Vec::new();
    if !experience.subgoals.is_empty() {
        parts.push(format!("Subgoals: {}", experience.subgoals.join("; ")));
    }
    if !experience.constraints.is_empty() {
        parts.push(format!("Constraints: {}", experience.constraints.join(", ")));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{}\n", parts.join("\n"))
    }
}

/// Strip role-label prefixes and surrounding quotes the LLM sometimes adds.
fn clean_response(response: &str) -> String {
    const PREFIXES: &[&str] = &["User:", "SupportBot:", "System:", "Assistant:"];

    let mut lines_out = Vec::new();
    for line in response.trim().lines() {
        let mut line = line.trim();
        for prefix in PREFIXES {
            if line.to_lowercase().starts_with(&prefix.to_lowercase()) {
                line = line[prefix.len()..].trim();
            }
        }
        if line.is_empty() || PREFIXES.iter().any(|p| line.eq_ignore_ascii_case(p.trim_end_matches(':'))) {
            continue;
        }
        lines_out.push(line);
    }
    let mut joined = lines_out.join(" ").trim().to_string();

    if (joined.starts_with('"') && joined.ends_with('"') && joined.len() >= 2)
        || (joined.starts_with('\'') && joined.ends_with('\'') && joined.len() >= 2)
    {
        joined = joined[1..joined.len() - 1].trim().to_string();
    }
    joined
}

/// Deterministic paraphrase picked by turn index, used when a generated
/// response exactly repeats an earlier turn.
fn vary_response(original: &str, turn_index: usize) -> String {
    let variants = if original.len() % 2 == 0 { USER_FALLBACK_VARIANTS } else { SUPPORTBOT_FALLBACK_VARIANTS };
    variants[turn_index % variants.len()].to_string()
}

/// Pull a venue/entity name out of a normalized goal for goal-aware
/// fallback responses, e.g. "Book a room at Worth House" -> "Worth House".
fn venue_from_goal(goal: &str, domain: &str) -> String {
    const PREFIXES: &[&str] = &["book a room at ", "find information about ", "make a reservation at "];
    let lower = goal.to_lowercase();
    for prefix in PREFIXES {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let start = goal.len() - rest.len();
            let name = goal[start..].trim();
            if !name.is_empty() {
                return title_case(name);
            }
        }
    }
    match domain {
        "hotel" => "our property".to_string(),
        "restaurant" => "that restaurant".to_string(),
        _ => title_case(goal),
    }
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_response_strips_role_prefix_and_quotes() {
        assert_eq!(clean_response("User: \"Hi there\""), "Hi there");
    }

    #[test]
    fn venue_from_goal_extracts_named_property() {
        assert_eq!(venue_from_goal("Book a room at Worth House", "hotel"), "Worth House");
    }

    #[test]
    fn venue_from_goal_falls_back_by_domain() {
        assert_eq!(venue_from_goal("Get help", "restaurant"), "That Restaurant");
    }

    #[test]
    fn format_history_renders_role_text_lines() {
        let turns = vec![Turn::new(Role::User, "hi", Local::now())];
        assert_eq!(format_history(&turns), "User: hi");
    }
}
