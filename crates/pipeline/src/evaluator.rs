//! Multi-metric evaluator: a pure function over a dialogue set plus an
//! optional reference corpus and optional LLM access. Every stage degrades
//! gracefully when its dependency is missing rather than failing the run.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use goalconvo_domain::dialogue::{Dialogue, Role};
use goalconvo_domain::lexicon::{
    CONTRADICTION_PHRASES, GCR_REQUESTABLES, GCR_SYNONYMS, INTENT_CATEGORIES, SLOT_TIME_TOKENS,
    TSR_INTENT_KEYWORDS, TSR_SATISFACTION_KEYWORDS,
};
use goalconvo_llm::{CompletionRequest, LlmGateway};
use serde::{Deserialize, Serialize};

/// Presentation-layer target values shown alongside the measured figures;
/// not pass/fail gates.
pub const BERTSCORE_TARGET: f64 = 0.71;
pub const DIVERSITY_TARGET: f64 = 0.46;
pub const RESPONSE_TIME_TARGET_SECONDS: f64 = 2.1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

impl MeanStd {
    /// Sample mean/stddev (`ddof=1`); stddev is `0` for `n <= 1`.
    fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        if n == 0 {
            return Self::default();
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        if n == 1 {
            return Self { mean, std: 0.0 };
        }
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Self { mean, std: variance.sqrt() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateReport {
    pub overall: f64,
    pub per_domain: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogueLengthReport {
    pub turns: MeanStd,
    pub words: MeanStd,
    pub chars: MeanStd,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepetitionReport {
    pub overall: MeanStd,
    pub per_domain: HashMap<String, MeanStd>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiversityReport {
    pub per_domain: HashMap<String, f64>,
    pub combined: f64,
    /// `combined / reference_combined`, present only when a reference
    /// corpus was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmJudgeScores {
    pub task_success: f64,
    pub coherence: f64,
    pub diversity: f64,
    pub fluency: f64,
    pub groundedness: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmJudgeReport {
    pub overall: LlmJudgeScores,
    pub per_domain: HashMap<String, LlmJudgeScores>,
    pub judged_count: usize,
    pub skipped_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdvancedMetrics {
    pub intent_consistency: f64,
    pub slot_coverage: f64,
    pub state_tracking_consistency: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub dialogue_count: usize,
    pub gcr: RateReport,
    pub tsr: RateReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bleu: Option<RateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bertscore: Option<RateReport>,
    pub diversity: DiversityReport,
    pub length: DialogueLengthReport,
    pub repetition: RepetitionReport,
    pub response_time_seconds: MeanStd,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_judge: Option<LlmJudgeReport>,
    pub advanced: AdvancedMetrics,
}

pub struct Evaluator {
    gateway: Option<Arc<LlmGateway>>,
    similarity_model: String,
    similarity_fallback_model: String,
}

impl Evaluator {
    pub fn new(gateway: Option<Arc<LlmGateway>>, similarity_model: impl Into<String>, similarity_fallback_model: impl Into<String>) -> Self {
        Self {
            gateway,
            similarity_model: similarity_model.into(),
            similarity_fallback_model: similarity_fallback_model.into(),
        }
    }

    /// Evaluate `candidates`, optionally comparing against `reference`
    /// dialogues for BLEU/BERTScore/diversity-ratio. LLM judge scores run
    /// only when a gateway was configured.
    pub async fn evaluate(&self, candidates: &[Dialogue], reference: Option<&[Dialogue]>) -> EvaluationReport {
        let gcr = compute_gcr(candidates);
        let tsr = compute_tsr(candidates);
        let length = compute_length(candidates);
        let repetition = compute_repetition(candidates);
        let response_time_seconds = compute_response_time(candidates);
        let diversity = compute_diversity(candidates, reference);
        let advanced = compute_advanced(candidates);

        let bleu = reference.map(|refs| compute_bleu(candidates, refs));
        let bertscore = match (reference, &self.gateway) {
            (Some(refs), Some(gateway)) => {
                Some(self.compute_bertscore(candidates, refs, gateway).await)
            }
            _ => None,
        };

        let llm_judge = match &self.gateway {
            Some(gateway) => Some(self.compute_llm_judge(candidates, gateway).await),
            None => None,
        };

        EvaluationReport {
            dialogue_count: candidates.len(),
            gcr,
            tsr,
            bleu,
            bertscore,
            diversity,
            length,
            repetition,
            response_time_seconds,
            llm_judge,
            advanced,
        }
    }

    async fn compute_llm_judge(&self, candidates: &[Dialogue], gateway: &Arc<LlmGateway>) -> LlmJudgeReport {
        let mut per_domain_acc: HashMap<String, Vec<LlmJudgeScores>> = HashMap::new();
        let mut all = Vec::new();
        let mut skipped = 0;

        for d in candidates {
            match self.judge_one(d, gateway).await {
                Some(scores) => {
                    per_domain_acc.entry(d.domain.clone()).or_default().push(scores.clone());
                    all.push(scores);
                }
                None => skipped += 1,
            }
        }

        let overall = average_scores(&all);
        let per_domain = per_domain_acc.into_iter().map(|(k, v)| (k, average_scores(&v))).collect();

        LlmJudgeReport { overall, per_domain, judged_count: all.len(), skipped_count: skipped }
    }

    async fn judge_one(&self, dialogue: &Dialogue, gateway: &Arc<LlmGateway>) -> Option<LlmJudgeScores> {
        let history = dialogue
            .turns
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.text))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Rate this conversation with a JSON object containing integer scores from 0 to \
             100 for each of: task_success, coherence, diversity, fluency, groundedness.\n\n\
             Goal: {}\nConversation:\n{history}\n\nRespond with only the JSON object.",
            dialogue.goal
        );
        let req = CompletionRequest { prompt, temperature: 0.1, top_p: 0.9, max_tokens: 120 };
        let response = gateway.complete(&req).await.ok()?;
        let start = response.find('{')?;
        let end = response.rfind('}')?;
        if end < start {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&response[start..=end]).ok()?;
        let field = |name: &str| value.get(name).and_then(serde_json::Value::as_f64).unwrap_or(0.0);
        Some(LlmJudgeScores {
            task_success: field("task_success"),
            coherence: field("coherence"),
            diversity: field("diversity"),
            fluency: field("fluency"),
            groundedness: field("groundedness"),
        })
    }

    /// Embedding-backed stand-in for BERTScore: cosine similarity between
    /// candidate and same-domain reference embeddings, with the source's
    /// truncation/fallback-model degradation ladder.
    async fn compute_bertscore(&self, candidates: &[Dialogue], reference: &[Dialogue], gateway: &Arc<LlmGateway>) -> RateReport {
        let mut by_domain: HashMap<&str, Vec<&Dialogue>> = HashMap::new();
        for r in reference {
            by_domain.entry(r.domain.as_str()).or_default().push(r);
        }

        let mut scores = Vec::new();
        let mut per_domain_scores: HashMap<String, Vec<f64>> = HashMap::new();

        for c in candidates {
            let refs: Vec<&&Dialogue> = by_domain.get(c.domain.as_str()).map(|v| v.iter().take(10).collect()).unwrap_or_default();
            if refs.is_empty() {
                continue;
            }
            let cand_text = c.concatenated_text();
            let ref_texts: Vec<String> = refs.iter().map(|r| r.concatenated_text()).collect();
            if let Some(best) = self.best_similarity(gateway, &cand_text, &ref_texts).await {
                scores.push(best);
                per_domain_scores.entry(c.domain.clone()).or_default().push(best);
            }
        }

        RateReport {
            overall: mean_or_zero(&scores),
            per_domain: per_domain_scores.into_iter().map(|(k, v)| (k, mean_or_zero(&v))).collect(),
        }
    }

    /// Truncate to 1000 chars, degrading to 400 then 200 on failure, and
    /// finally retry once at 512 chars with the fallback model.
    async fn best_similarity(&self, gateway: &Arc<LlmGateway>, candidate: &str, references: &[String]) -> Option<f64> {
        for limit in [1000usize, 400, 200] {
            if let Some(score) = self.try_similarity(gateway, candidate, references, limit, &self.similarity_model).await {
                return Some(score);
            }
        }
        self.try_similarity(gateway, candidate, references, 512, &self.similarity_fallback_model).await
    }

    async fn try_similarity(&self, gateway: &Arc<LlmGateway>, candidate: &str, references: &[String], limit: usize, _model: &str) -> Option<f64> {
        let mut texts = vec![truncate_chars(candidate, limit)];
        texts.extend(references.iter().map(|r| truncate_chars(r, limit)));
        let embeddings = gateway.embed(&texts).await.ok()?;
        let (cand_emb, ref_embs) = embeddings.split_first()?;
        ref_embs
            .iter()
            .map(|r| cosine_similarity(cand_emb, r))
            .fold(None, |acc, v| Some(acc.map_or(v, |a: f64| a.max(v))))
    }
}

fn truncate_chars(s: &str, limit: usize) -> String {
    s.chars().take(limit).collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let len = a.len().min(b.len());
    if len == 0 {
        return 0.0;
    }
    let dot: f64 = (0..len).map(|i| a[i] as f64 * b[i] as f64).sum();
    let norm_a: f64 = a.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

fn average_scores(scores: &[LlmJudgeScores]) -> LlmJudgeScores {
    if scores.is_empty() {
        return LlmJudgeScores::default();
    }
    let n = scores.len() as f64;
    LlmJudgeScores {
        task_success: scores.iter().map(|s| s.task_success).sum::<f64>() / n,
        coherence: scores.iter().map(|s| s.coherence).sum::<f64>() / n,
        diversity: scores.iter().map(|s| s.diversity).sum::<f64>() / n,
        fluency: scores.iter().map(|s| s.fluency).sum::<f64>() / n,
        groundedness: scores.iter().map(|s| s.groundedness).sum::<f64>() / n,
    }
}

/// Constraint values (from goal text) plus ≥50% of requestables present in
/// the dialogue, plus at least one completion keyword.
fn compute_gcr(dialogues: &[Dialogue]) -> RateReport {
    let mut per_domain: HashMap<String, (usize, usize)> = HashMap::new();
    let mut completed_total = 0;

    for d in dialogues {
        let text = d.concatenated_text().to_lowercase();
        let goal_lower = d.goal.to_lowercase();

        let constraints = extract_constraint_values(&goal_lower);
        let constraints_met = constraints.iter().all(|c| text.contains(c.as_str()));

        let requestables_present = GCR_REQUESTABLES
            .iter()
            .filter(|slot| {
                GCR_SYNONYMS
                    .iter()
                    .find(|(name, _)| name == *slot)
                    .map(|(_, syns)| syns.iter().any(|s| text.contains(s)))
                    .unwrap_or(false)
            })
            .count();
        let requestables_ok = requestables_present as f64 >= GCR_REQUESTABLES.len() as f64 * 0.5;

        let has_completion_keyword = goalconvo_domain::lexicon::COMPLETION_KEYWORDS.iter().any(|k| text.contains(k));

        let completed = constraints_met && requestables_ok && has_completion_keyword;
        if completed {
            completed_total += 1;
        }
        let entry = per_domain.entry(d.domain.clone()).or_insert((0, 0));
        entry.1 += 1;
        if completed {
            entry.0 += 1;
        }
    }

    RateReport {
        overall: rate(completed_total, dialogues.len()),
        per_domain: per_domain.into_iter().map(|(k, (c, t))| (k, rate(c, t))).collect(),
    }
}

/// Goal text fragments that look like explicit constraint values: anything
/// after `area`/`price`/`type` keywords up to the next punctuation.
fn extract_constraint_values(goal_lower: &str) -> Vec<String> {
    let mut out = Vec::new();
    for marker in ["area", "price range", "type"] {
        if let Some(idx) = goal_lower.find(marker) {
            let rest = &goal_lower[idx + marker.len()..];
            let value: String = rest
                .trim_start_matches([':', ' '])
                .split(|c: char| c == ',' || c == '.' || c == ';')
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            if !value.is_empty() && value.len() < 30 {
                out.push(value);
            }
        }
    }
    out
}

/// Intent keyword present, followed within 200 chars by a confirmation
/// token, `num_turns >= 4`, and the last User turn has a satisfaction word.
fn compute_tsr(dialogues: &[Dialogue]) -> RateReport {
    const CONFIRMATION_TOKENS: &[&str] = &["yes", "confirmed", "booked", "found", "done"];
    let mut per_domain: HashMap<String, (usize, usize)> = HashMap::new();
    let mut success_total = 0;

    for d in dialogues {
        let text = d.concatenated_text().to_lowercase();
        let intent_keywords = TSR_INTENT_KEYWORDS
            .iter()
            .find(|(domain, _)| domain == &d.domain)
            .map(|(_, k)| *k)
            .unwrap_or(&[]);

        let intent_followed_by_confirmation = intent_keywords.iter().any(|kw| {
            text.find(kw).is_some_and(|idx| {
                let window_end = (idx + kw.len() + 200).min(text.len());
                CONFIRMATION_TOKENS.iter().any(|tok| text[idx..window_end].contains(tok))
            })
        });

        let enough_turns = d.turns.len() >= 4;
        let last_user_satisfied = d
            .turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| {
                let lower = t.text.to_lowercase();
                TSR_SATISFACTION_KEYWORDS.iter().any(|k| lower.contains(k))
            })
            .unwrap_or(false);

        let success = intent_followed_by_confirmation && enough_turns && last_user_satisfied;
        if success {
            success_total += 1;
        }
        let entry = per_domain.entry(d.domain.clone()).or_insert((0, 0));
        entry.1 += 1;
        if success {
            entry.0 += 1;
        }
    }

    RateReport {
        overall: rate(success_total, dialogues.len()),
        per_domain: per_domain.into_iter().map(|(k, (c, t))| (k, rate(c, t))).collect(),
    }
}

fn rate(count: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

/// Sentence-BLEU against up to 10 same-domain references, falling back to a
/// plain word-overlap ratio when smoothing would be needed (any n-gram
/// precision is zero).
fn compute_bleu(candidates: &[Dialogue], reference: &[Dialogue]) -> RateReport {
    let mut by_domain: HashMap<&str, Vec<&Dialogue>> = HashMap::new();
    for r in reference {
        by_domain.entry(r.domain.as_str()).or_default().push(r);
    }

    let mut scores = Vec::new();
    let mut per_domain_scores: HashMap<String, Vec<f64>> = HashMap::new();

    for c in candidates {
        let refs = by_domain.get(c.domain.as_str()).map(|v| v.iter().take(10)).into_iter().flatten();
        let cand_tokens: Vec<&str> = c.concatenated_text().split_whitespace().collect();
        let best = refs
            .map(|r| {
                let ref_tokens: Vec<&str> = r.concatenated_text().split_whitespace().collect();
                sentence_bleu(&cand_tokens, &ref_tokens)
            })
            .fold(0.0_f64, f64::max);
        scores.push(best);
        per_domain_scores.entry(c.domain.clone()).or_default().push(best);
    }

    RateReport {
        overall: mean_or_zero(&scores),
        per_domain: per_domain_scores.into_iter().map(|(k, v)| (k, mean_or_zero(&v))).collect(),
    }
}

/// 4-gram BLEU with a word-overlap fallback when any n-gram precision is 0
/// (avoids needing a full smoothing-function implementation).
fn sentence_bleu(candidate: &[&str], reference: &[&str]) -> f64 {
    if candidate.is_empty() || reference.is_empty() {
        return 0.0;
    }
    let mut precisions = Vec::new();
    for n in 1..=4 {
        let cand_ngrams = ngrams(candidate, n);
        let ref_ngrams = ngrams(reference, n);
        if cand_ngrams.is_empty() {
            precisions.push(0.0);
            continue;
        }
        let mut ref_counts: HashMap<Vec<&str>, usize> = HashMap::new();
        for g in &ref_ngrams {
            *ref_counts.entry(g.clone()).or_insert(0) += 1;
        }
        let mut matched = 0;
        for g in &cand_ngrams {
            if let Some(count) = ref_counts.get_mut(g) {
                if *count > 0 {
                    matched += 1;
                    *count -= 1;
                }
            }
        }
        precisions.push(matched as f64 / cand_ngrams.len() as f64);
    }

    if precisions.iter().any(|p| *p == 0.0) {
        return word_overlap_ratio(candidate, reference);
    }

    let log_mean = precisions.iter().map(|p| p.ln()).sum::<f64>() / precisions.len() as f64;
    let brevity_penalty = if candidate.len() >= reference.len() {
        1.0
    } else {
        (1.0 - reference.len() as f64 / candidate.len() as f64).exp()
    };
    brevity_penalty * log_mean.exp()
}

fn ngrams<'a>(tokens: &[&'a str], n: usize) -> Vec<Vec<&'a str>> {
    if tokens.len() < n {
        return Vec::new();
    }
    (0..=tokens.len() - n).map(|i| tokens[i..i + n].to_vec()).collect()
}

fn word_overlap_ratio(candidate: &[&str], reference: &[&str]) -> f64 {
    let cand_set: HashSet<&str> = candidate.iter().copied().collect();
    let ref_set: HashSet<&str> = reference.iter().copied().collect();
    if cand_set.is_empty() {
        return 0.0;
    }
    cand_set.intersection(&ref_set).count() as f64 / cand_set.len() as f64
}

fn compute_length(dialogues: &[Dialogue]) -> DialogueLengthReport {
    let turns: Vec<f64> = dialogues.iter().map(|d| d.turns.len() as f64).collect();
    let words: Vec<f64> = dialogues.iter().map(|d| d.concatenated_text().split_whitespace().count() as f64).collect();
    let chars: Vec<f64> = dialogues.iter().map(|d| d.concatenated_text().chars().count() as f64).collect();

    DialogueLengthReport {
        turns: MeanStd::from_values(&turns),
        words: MeanStd::from_values(&words),
        chars: MeanStd::from_values(&chars),
    }
}

/// `1 - |unique turn texts| / |turn texts|` for dialogues with >= 2 turns.
fn compute_repetition(dialogues: &[Dialogue]) -> RepetitionReport {
    let mut per_domain: HashMap<String, Vec<f64>> = HashMap::new();
    let mut all = Vec::new();

    for d in dialogues {
        if d.turns.len() < 2 {
            continue;
        }
        let unique: HashSet<&str> = d.turns.iter().map(|t| t.text.as_str()).collect();
        let rep = 1.0 - unique.len() as f64 / d.turns.len() as f64;
        all.push(rep);
        per_domain.entry(d.domain.clone()).or_default().push(rep);
    }

    RepetitionReport {
        overall: MeanStd::from_values(&all),
        per_domain: per_domain.into_iter().map(|(k, v)| (k, MeanStd::from_values(&v))).collect(),
    }
}

/// Inter-turn gaps, ignoring any outside `[0, 24h)`, floored at 0.1s.
fn compute_response_time(dialogues: &[Dialogue]) -> MeanStd {
    const MAX_GAP_SECONDS: f64 = 24.0 * 3600.0;
    let mut gaps = Vec::new();
    for d in dialogues {
        for window in d.turns.windows(2) {
            let gap = (window[1].timestamp - window[0].timestamp).num_milliseconds() as f64 / 1000.0;
            if (0.0..MAX_GAP_SECONDS).contains(&gap) {
                gaps.push(gap.max(0.1));
            }
        }
    }
    MeanStd::from_values(&gaps)
}

/// Per-dialogue distinct-1/distinct-2 averaged into a combined score, plus
/// a ratio against reference diversity when a reference corpus is given.
fn compute_diversity(dialogues: &[Dialogue], reference: Option<&[Dialogue]>) -> DiversityReport {
    let mut per_domain: HashMap<String, Vec<f64>> = HashMap::new();
    let mut all = Vec::new();

    for d in dialogues {
        let score = distinct_combined(&d.concatenated_text());
        all.push(score);
        per_domain.entry(d.domain.clone()).or_default().push(score);
    }

    let combined = mean_or_zero(&all);
    let reference_ratio = reference.map(|refs| {
        let ref_scores: Vec<f64> = refs.iter().map(|r| distinct_combined(&r.concatenated_text())).collect();
        let ref_combined = mean_or_zero(&ref_scores);
        if ref_combined == 0.0 { 0.0 } else { combined / ref_combined }
    });

    DiversityReport {
        per_domain: per_domain.into_iter().map(|(k, v)| (k, mean_or_zero(&v))).collect(),
        combined,
        reference_ratio,
    }
}

fn distinct_combined(text: &str) -> f64 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }
    let unigrams: HashSet<&str> = tokens.iter().copied().collect();
    let distinct_1 = unigrams.len() as f64 / tokens.len() as f64;

    let distinct_2 = if tokens.len() < 2 {
        0.0
    } else {
        let bigrams: HashSet<(&str, &str)> = tokens.windows(2).map(|w| (w[0], w[1])).collect();
        bigrams.len() as f64 / (tokens.len() - 1) as f64
    };

    (distinct_1 + distinct_2) / 2.0
}

/// Intent-keyword match, digit/time-token slot coverage, and absence of
/// contradiction phrases, averaged across the dialogue set.
fn compute_advanced(dialogues: &[Dialogue]) -> AdvancedMetrics {
    if dialogues.is_empty() {
        return AdvancedMetrics::default();
    }

    let mut intent_hits = 0;
    let mut slot_hits = 0.0;
    let mut state_ok = 0;

    for d in dialogues {
        let goal_lower = d.goal.to_lowercase();
        let text = d.concatenated_text().to_lowercase();

        let category = INTENT_CATEGORIES.iter().find(|(_, keywords)| keywords.iter().any(|k| goal_lower.contains(k)));
        if let Some((_, keywords)) = category {
            if keywords.iter().any(|k| text.contains(k)) {
                intent_hits += 1;
            }
        }

        let has_digit = goal_lower.chars().any(|c| c.is_ascii_digit()) && text.chars().any(|c| c.is_ascii_digit());
        let has_time_token = SLOT_TIME_TOKENS.iter().any(|t| text.contains(t));
        slot_hits += match (has_digit, has_time_token) {
            (true, true) => 1.0,
            (true, false) | (false, true) => 0.5,
            (false, false) => 0.0,
        };

        if !CONTRADICTION_PHRASES.iter().any(|p| text.contains(p)) {
            state_ok += 1;
        }
    }

    let n = dialogues.len() as f64;
    AdvancedMetrics {
        intent_consistency: intent_hits as f64 / n,
        slot_coverage: slot_hits / n,
        state_tracking_consistency: state_ok as f64 / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use goalconvo_domain::dialogue::{DialogueMetadata, Turn};
    use uuid::Uuid;

    fn dialogue(domain: &str, goal: &str, turns: Vec<(Role, &str)>) -> Dialogue {
        Dialogue {
            dialogue_id: Uuid::new_v4(),
            goal: goal.into(),
            domain: domain.into(),
            context: "c".into(),
            user_persona: "p".into(),
            turns: turns.into_iter().map(|(r, t)| Turn::new(r, t, Local::now())).collect(),
            metadata: DialogueMetadata {
                num_turns: 0,
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
        }
    }

    #[test]
    fn length_stddev_is_zero_for_single_dialogue() {
        let d = dialogue("hotel", "g", vec![(Role::User, "hi"), (Role::SupportBot, "hello")]);
        let report = compute_length(&[d]);
        assert_eq!(report.turns.std, 0.0);
    }

    #[test]
    fn repetition_rate_detects_duplicate_turns() {
        let d = dialogue(
            "hotel",
            "g",
            vec![(Role::User, "hi there"), (Role::SupportBot, "hi there"), (Role::User, "hi there")],
        );
        let report = compute_repetition(&[d]);
        assert!(report.overall.mean > 0.0);
    }

    #[test]
    fn gcr_requires_constraints_requestables_and_completion_keyword() {
        let d = dialogue(
            "hotel",
            "Book a hotel in the centre area",
            vec![
                (Role::User, "I need a hotel in the centre area"),
                (Role::SupportBot, "The price is £50, address is 1 Main St, phone 012345, postcode AB1, reference REF123, type guesthouse"),
                (Role::User, "Great"),
                (Role::SupportBot, "Your booking is confirmed."),
            ],
        );
        let report = compute_gcr(&[d]);
        assert_eq!(report.overall, 1.0);
    }

    #[test]
    fn distinct_combined_is_one_for_all_unique_tokens() {
        assert_eq!(distinct_combined("a b c d"), 1.0);
    }

    #[test]
    fn sentence_bleu_identical_sequences_is_one() {
        let tokens = vec!["the", "quick", "brown", "fox", "jumps"];
        assert!((sentence_bleu(&tokens, &tokens) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bleu_falls_back_to_word_overlap_on_zero_ngram_precision() {
        let candidate = vec!["completely", "different", "words"];
        let reference = vec!["totally", "unrelated", "text"];
        let score = sentence_bleu(&candidate, &reference);
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn empty_candidate_set_produces_zeroed_report() {
        let evaluator = Evaluator::new(None, "model", "fallback-model");
        let report = evaluator.evaluate(&[], None).await;
        assert_eq!(report.dialogue_count, 0);
        assert!(report.llm_judge.is_none());
        assert!(report.bleu.is_none());
    }
}
