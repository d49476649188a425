//! Experience generation: turns a seed goal into a structured [`Experience`]
//! that conditions the two-agent simulator, calling out to an LLM for the
//! creative parts (persona, context, opening line) and falling back to a
//! deterministic construction if the call or the parse fails.

use std::sync::Arc;

use goalconvo_domain::experience::Experience;
use goalconvo_llm::{CompletionRequest, LlmGateway};
use goalconvo_store::FewShotHub;
use serde_json::Value;

use crate::goal_norm::{looks_like_slot_format, normalize_goal};

/// Default seed goals used when a run doesn't supply its own goal list,
/// five per domain, one entry per line below.
pub fn default_seed_goals(domain: &str) -> Vec<&'static str> {
    match domain {
        "hotel" => vec![
            "Book a hotel room for tonight in the city centre",
            "Find a budget hotel for the weekend with free wifi",
            "Reserve a hotel room for 2 nights with a swimming pool",
            "Book accommodation near the city center for one night",
            "Find a 4-star hotel with parking for a business stay",
        ],
        "restaurant" => vec![
            "Book a table for dinner tonight at an Italian restaurant",
            "Find a restaurant with vegetarian options near the hotel",
            "Reserve a table for a birthday dinner for six people",
            "Find a cheap restaurant that serves breakfast",
            "Book a table for lunch tomorrow in the city centre",
        ],
        "taxi" => vec![
            "Book a taxi to the airport for tomorrow morning",
            "Find a taxi from the train station to the hotel",
            "Book a taxi for a group of four to a restaurant",
            "Arrange a taxi pickup after a late dinner",
            "Book a taxi to the hospital as soon as possible",
        ],
        "train" => vec![
            "Book a train ticket to London for next Friday",
            "Find the earliest train to Cambridge tomorrow",
            "Book a return train ticket for the weekend",
            "Find a train arriving before 9am on Monday",
            "Book train tickets for a family of four",
        ],
        "attraction" => vec![
            "Find tourist attractions and book tickets for the museum",
            "Find a family-friendly attraction for this afternoon",
            "Book tickets for a gallery tour this weekend",
            "Find free attractions in the city centre",
            "Find an attraction with wheelchair access",
        ],
        _ => vec!["Get help with a general customer service request"],
    }
}

pub struct ExperienceGenerator {
    gateway: Arc<LlmGateway>,
    few_shot_hub: Arc<FewShotHub>,
    few_shot_examples: usize,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

impl ExperienceGenerator {
    pub fn new(
        gateway: Arc<LlmGateway>,
        few_shot_hub: Arc<FewShotHub>,
        few_shot_examples: usize,
        temperature: f32,
        top_p: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            gateway,
            few_shot_hub,
            few_shot_examples,
            temperature,
            top_p,
            max_tokens,
        }
    }

    /// Generate one experience for `goal`, inferring the domain from the
    /// goal text if `domain` is `None`. Never fails: any LLM or parse error
    /// degrades to a deterministic fallback experience.
    pub async fn generate_experience(&self, goal: &str, domain: Option<&str>) -> Experience {
        let normalized_goal = normalize_goal(goal);
        let domain = domain
            .map(str::to_string)
            .unwrap_or_else(|| goalconvo_domain::lexicon::infer_domain(&normalized_goal).to_string());

        let examples = self
            .few_shot_hub
            .load_few_shot_examples(&domain, self.few_shot_examples);
        let prompt = self.build_prompt(&normalized_goal, &domain, &examples);

        let req = CompletionRequest {
            prompt,
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        match self.gateway.complete(&req).await {
            Ok(text) => self.parse_response(&text, &normalized_goal, &domain),
            Err(e) => {
                tracing::warn!(error = %e, goal = %normalized_goal, "experience generation failed, using fallback");
                Experience::fallback(&normalized_goal, &domain)
            }
        }
    }

    /// Generate experiences for a batch of goals, each optionally paired
    /// with a domain override.
    pub async fn generate_batch_experiences(
        &self,
        goals: &[(String, Option<String>)],
    ) -> Vec<Experience> {
        let mut out = Vec::with_capacity(goals.len());
        for (goal, domain) in goals {
            out.push(self.generate_experience(goal, domain.as_deref()).await);
        }
        out
    }

    fn build_prompt(
        &self,
        goal: &str,
        domain: &str,
        examples: &[goalconvo_store::few_shot_hub::FewShotExample],
    ) -> String {
        let mut prompt = String::new();
        prompt.push_str(
            "You design short customer-service scenarios for a dialogue dataset. \
             Given a customer goal, invent a plausible persona, a one-sentence context, \
             and a natural first message the customer would send. Respond with a single \
             JSON object with keys: user_persona, goal, context, first_utterance, and \
             optionally subgoals (array), constraints (array), user_persona_traits \
             (string), supportbot_style (string).\n\n",
        );

        for (i, ex) in examples.iter().enumerate() {
            prompt.push_str(&format!(
                "Example {}:\nGoal: {}\nContext: {}\nFirst utterance: {}\n\n",
                i + 1,
                ex.goal,
                ex.context,
                ex.first_utterance
            ));
        }

        prompt.push_str(&format!(
            "Domain: {domain}\nGoal: {goal}\n\nRespond with the JSON object only.",
        ));
        prompt
    }

    fn parse_response(&self, text: &str, goal: &str, domain: &str) -> Experience {
        match extract_json_object(text) {
            Some(value) => experience_from_json(&value, goal, domain),
            None => extract_info_from_text(text, goal, domain),
        }
    }
}

fn experience_from_json(value: &Value, fallback_goal: &str, domain: &str) -> Experience {
    let mut goal = value
        .get("goal")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback_goal.to_string());
    if looks_like_slot_format(&goal) {
        goal = normalize_goal(&goal);
    }

    let context = value
        .get("context")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("A customer needs help with a {domain} request."));
    let first_utterance = value
        .get("first_utterance")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Hi, I need help with: {goal}"));
    let user_persona = user_persona_to_string(value.get("user_persona"));

    let subgoals = string_array(value.get("subgoals"));
    let constraints = string_array(value.get("constraints"));
    let user_persona_traits = value
        .get("user_persona_traits")
        .and_then(Value::as_str)
        .map(str::to_string);
    let supportbot_style = value
        .get("supportbot_style")
        .and_then(Value::as_str)
        .map(str::to_string);

    Experience {
        goal,
        domain: domain.to_string(),
        context,
        first_utterance,
        user_persona,
        subgoals,
        constraints,
        user_persona_traits,
        supportbot_style,
    }
}

/// Accepts either a plain string persona or an object with `name`/
/// `user_persona` and `user_persona_traits`/`traits` fields.
fn user_persona_to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Object(map)) => {
            let name = map
                .get("name")
                .or_else(|| map.get("user_persona"))
                .and_then(Value::as_str)
                .unwrap_or("a customer");
            let traits = map
                .get("user_persona_traits")
                .or_else(|| map.get("traits"))
                .map(traits_to_string);
            match traits {
                Some(t) if !t.is_empty() => format!("{name} ({t})"),
                _ => name.to_string(),
            }
        }
        _ => "a polite customer".to_string(),
    }
}

fn traits_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Extract the JSON object between the first `{` and the last `}`, which
/// tolerates LLMs that wrap the object in prose or a markdown fence.
fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// Line-prefix fallback parser for responses that never produced valid
/// JSON: looks for "Context:", "First utterance:", "User persona:" lines.
fn extract_info_from_text(text: &str, goal: &str, domain: &str) -> Experience {
    let mut context = None;
    let mut first_utterance = None;
    let mut user_persona = None;

    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = strip_prefix_ci(line, "context:") {
            context = Some(rest.trim().to_string());
        } else if let Some(rest) = strip_prefix_ci(line, "first utterance:") {
            first_utterance = Some(rest.trim().to_string());
        } else if let Some(rest) = strip_prefix_ci(line, "user persona:") {
            user_persona = Some(rest.trim().to_string());
        }
    }

    Experience {
        goal: goal.to_string(),
        domain: domain.to_string(),
        context: context.unwrap_or_else(|| format!("A customer needs help with a {domain} request.")),
        first_utterance: first_utterance.unwrap_or_else(|| format!("Hi, I need help with: {goal}")),
        user_persona: user_persona.unwrap_or_else(|| "a polite customer".to_string()),
        subgoals: Vec::new(),
        constraints: Vec::new(),
        user_persona_traits: None,
        supportbot_style: None,
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() >= prefix.len() && line[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

/// `len(subgoals) + len(constraints)`, a cheap proxy for how much the
/// simulator has to juggle in a single run.
pub fn goal_complexity(experience: &Experience) -> usize {
    experience.subgoals.len() + experience.constraints.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_object_skips_surrounding_prose() {
        let text = "Sure, here you go:\n{\"goal\": \"g\", \"context\": \"c\"}\nhope that helps";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["goal"], "g");
    }

    #[test]
    fn user_persona_object_with_traits_list() {
        let value = serde_json::json!({"name": "Alex", "traits": ["polite", "in a hurry"]});
        assert_eq!(user_persona_to_string(Some(&value)), "Alex (polite, in a hurry)");
    }

    #[test]
    fn text_fallback_extracts_labeled_lines() {
        let text = "Context: needs a room\nFirst utterance: Hi there\nUser persona: tourist";
        let exp = extract_info_from_text(text, "goal", "hotel");
        assert_eq!(exp.context, "needs a room");
        assert_eq!(exp.first_utterance, "Hi there");
        assert_eq!(exp.user_persona, "tourist");
    }

    #[test]
    fn goal_complexity_counts_subgoals_and_constraints() {
        let mut exp = Experience::fallback("g", "hotel");
        exp.subgoals = vec!["a".into(), "b".into()];
        exp.constraints = vec!["c".into()];
        assert_eq!(goal_complexity(&exp), 3);
    }
}
