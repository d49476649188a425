//! Few-shot example hub: a domain-partitioned store of high-quality
//! dialogues used as in-context examples, on disk at
//! `few_shot_hub/<domain>/<dialogue_id>.json`.
//!
//! Ordering is explicit (Design Notes §9): candidates are sorted by
//! `hub_metadata.quality_score` descending, then `added_to_hub_at`
//! descending, before the top K are handed to the prompt builder —
//! replacing "whichever file the directory listing returns first".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use goalconvo_domain::dialogue::Dialogue;
use goalconvo_domain::error::Result;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::seed_dialogues::{seed_dialogues_by_domain, MIN_EXAMPLES_PER_DOMAIN};

/// Where a hub entry came from: a real accepted dialogue promoted by
/// quality rank, or the built-in seed corpus used to bootstrap an empty
/// domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubSource {
    Promoted,
    Seed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubMetadata {
    pub added_to_hub_at: DateTime<Utc>,
    pub quality_score: f64,
    pub source: HubSource,
}

/// A Dialogue plus its hub provenance, the on-disk shape of one
/// `few_shot_hub/<domain>/<id>.json` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubEntry {
    #[serde(flatten)]
    pub dialogue: Dialogue,
    pub hub_metadata: HubMetadata,
}

/// Flattened view of a hub entry, shaped for the prompt templates that
/// consume it (the experience generator, the simulator's few-shot block).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FewShotExample {
    pub goal: String,
    pub domain: String,
    pub context: String,
    pub user_persona: String,
    pub first_utterance: String,
    pub turns: Vec<(String, String)>,
}

impl FewShotExample {
    fn from_dialogue(d: &Dialogue) -> Self {
        let first_utterance = d.turns.first().map(|t| t.text.clone()).unwrap_or_default();
        Self {
            goal: d.goal.clone(),
            domain: d.domain.clone(),
            context: d.context.clone(),
            user_persona: d.user_persona.clone(),
            first_utterance,
            turns: d.turns.iter().map(|t| (t.role.as_str().to_string(), t.text.clone())).collect(),
        }
    }
}

pub struct FewShotHub {
    root: PathBuf,
    entries: RwLock<HashMap<String, Vec<HubEntry>>>,
}

impl FewShotHub {
    /// Load or create the hub at `data_dir/few_shot_hub/`, seeding any
    /// domain whose folder has fewer than [`MIN_EXAMPLES_PER_DOMAIN`]
    /// entries from the built-in corpus. Seeding is compare-and-write: a
    /// domain already at or above the threshold is left untouched, and no
    /// existing file is ever overwritten.
    pub fn new(data_dir: &Path, domains: &[String]) -> Result<Self> {
        let root = data_dir.join("few_shot_hub");
        std::fs::create_dir_all(&root)?;

        let mut entries: HashMap<String, Vec<HubEntry>> = HashMap::new();
        for domain_entry in std::fs::read_dir(&root)?.flatten() {
            if !domain_entry.path().is_dir() {
                continue;
            }
            let domain = domain_entry.file_name().to_string_lossy().to_string();
            let mut loaded = Vec::new();
            for file in std::fs::read_dir(domain_entry.path())?.flatten() {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                if let Ok(raw) = std::fs::read_to_string(&path) {
                    if let Ok(entry) = serde_json::from_str::<HubEntry>(&raw) {
                        loaded.push(entry);
                    }
                }
            }
            entries.insert(domain, loaded);
        }

        let hub = Self { root, entries: RwLock::new(entries) };
        for domain in domains {
            hub.ensure_seed(domain)?;
        }
        tracing::info!(domains = domains.len(), "few-shot hub ready");
        Ok(hub)
    }

    /// Ensure `domain` has at least [`MIN_EXAMPLES_PER_DOMAIN`] entries,
    /// writing built-in seed dialogues if it doesn't. Safe to call
    /// repeatedly: existing entries (real or seed) are never touched.
    pub fn ensure_seed(&self, domain: &str) -> Result<()> {
        let current = self.entries.read().get(domain).map(Vec::len).unwrap_or(0);
        if current >= MIN_EXAMPLES_PER_DOMAIN {
            return Ok(());
        }

        let domain_dir = self.root.join(domain);
        std::fs::create_dir_all(&domain_dir)?;
        let mut new_entries = Vec::new();

        for seed in seed_dialogues_by_domain(domain) {
            let dialogue_id = uuid::Uuid::new_v4();
            let path = domain_dir.join(format!("{dialogue_id}.json"));
            if path.exists() {
                continue;
            }
            let turns: Vec<goalconvo_domain::dialogue::Turn> = seed
                .turns
                .into_iter()
                .map(|t| {
                    let role = match t.role.as_str() {
                        "User" => goalconvo_domain::dialogue::Role::User,
                        "SupportBot" => goalconvo_domain::dialogue::Role::SupportBot,
                        _ => goalconvo_domain::dialogue::Role::System,
                    };
                    goalconvo_domain::dialogue::Turn::new(role, t.text, chrono::Local::now())
                })
                .collect();
            let num_turns = turns.len();
            let dialogue = Dialogue {
                dialogue_id,
                goal: seed.goal,
                domain: seed.domain,
                context: seed.context,
                user_persona: seed.user_persona,
                turns,
                metadata: goalconvo_domain::dialogue::DialogueMetadata {
                    num_turns,
                    generated_at: chrono::Local::now(),
                    model_version: "seed".into(),
                    max_turns_reached: false,
                    min_turns_met: true,
                    generation_time_seconds: 0.0,
                    quality_score: Some(1.0),
                    quality_assessment: None,
                    improved_by_quality_judge: false,
                    rejection_reason: None,
                },
            };
            let entry = HubEntry {
                dialogue,
                hub_metadata: HubMetadata {
                    added_to_hub_at: Utc::now(),
                    quality_score: 1.0,
                    source: HubSource::Seed,
                },
            };
            self.write_file(domain, &entry)?;
            new_entries.push(entry);
        }

        self.entries.write().entry(domain.to_string()).or_default().extend(new_entries);
        Ok(())
    }

    /// Return up to `n` examples for a domain, ordered by quality score
    /// descending then recency descending.
    pub fn load_few_shot_examples(&self, domain: &str, n: usize) -> Vec<FewShotExample> {
        let entries = self.entries.read();
        let mut candidates: Vec<&HubEntry> = entries.get(domain).map(|v| v.iter().collect()).unwrap_or_default();
        candidates.sort_by(|a, b| {
            b.hub_metadata
                .quality_score
                .partial_cmp(&a.hub_metadata.quality_score)
                .unwrap()
                .then_with(|| b.hub_metadata.added_to_hub_at.cmp(&a.hub_metadata.added_to_hub_at))
        });
        candidates.into_iter().take(n).map(|e| FewShotExample::from_dialogue(&e.dialogue)).collect()
    }

    /// Promote an accepted dialogue into the hub for its domain.
    pub fn promote(&self, dialogue: &Dialogue, quality_score: f64) -> Result<()> {
        let entry = HubEntry {
            dialogue: dialogue.clone(),
            hub_metadata: HubMetadata {
                added_to_hub_at: Utc::now(),
                quality_score,
                source: HubSource::Promoted,
            },
        };
        self.write_file(&dialogue.domain, &entry)?;
        self.entries.write().entry(dialogue.domain.clone()).or_default().push(entry);
        Ok(())
    }

    /// Promote the top `top_percentage` (e.g. `0.1` for 10%) of `dialogues`
    /// within each domain, ranked by `metadata.quality_score` descending.
    pub fn promote_top_quality(&self, dialogues: &[Dialogue], top_percentage: f64) -> Result<usize> {
        let mut by_domain: HashMap<&str, Vec<&Dialogue>> = HashMap::new();
        for d in dialogues {
            by_domain.entry(d.domain.as_str()).or_default().push(d);
        }

        let mut promoted = 0;
        for (_, mut group) in by_domain {
            group.sort_by(|a, b| {
                b.metadata
                    .quality_score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.metadata.quality_score.unwrap_or(0.0))
                    .unwrap()
            });
            let take = (((group.len() as f64) * top_percentage).ceil() as usize).max(1).min(group.len());
            for d in group.into_iter().take(take) {
                self.promote(d, d.metadata.quality_score.unwrap_or(0.0))?;
                promoted += 1;
            }
        }
        Ok(promoted)
    }

    pub fn count(&self, domain: &str) -> usize {
        self.entries.read().get(domain).map(Vec::len).unwrap_or(0)
    }

    fn write_file(&self, domain: &str, entry: &HubEntry) -> Result<()> {
        let domain_dir = self.root.join(domain);
        std::fs::create_dir_all(&domain_dir)?;
        let final_path = domain_dir.join(format!("{}.json", entry.dialogue.dialogue_id));
        let tmp_path = domain_dir.join(format!("{}.json.tmp", entry.dialogue.dialogue_id));
        std::fs::write(&tmp_path, serde_json::to_string_pretty(entry)?)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<String> {
        vec!["hotel".into(), "taxi".into()]
    }

    #[test]
    fn seeds_domains_below_minimum() {
        let tmp = tempfile::tempdir().unwrap();
        let hub = FewShotHub::new(tmp.path(), &domains()).unwrap();
        assert!(hub.count("hotel") >= MIN_EXAMPLES_PER_DOMAIN);
    }

    #[test]
    fn reseeding_does_not_duplicate_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let hub = FewShotHub::new(tmp.path(), &domains()).unwrap();
        let before = hub.count("hotel");
        hub.ensure_seed("hotel").unwrap();
        assert_eq!(hub.count("hotel"), before);
    }

    #[test]
    fn promote_adds_an_entry_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let hub = FewShotHub::new(tmp.path(), &domains()).unwrap();
        let before = hub.count("taxi");
        let d = Dialogue {
            dialogue_id: uuid::Uuid::new_v4(),
            goal: "g".into(),
            domain: "taxi".into(),
            context: "c".into(),
            user_persona: "p".into(),
            turns: vec![goalconvo_domain::dialogue::Turn::new(
                goalconvo_domain::dialogue::Role::User,
                "hi",
                chrono::Local::now(),
            )],
            metadata: goalconvo_domain::dialogue::DialogueMetadata {
                num_turns: 1,
                generated_at: chrono::Local::now(),
                model_version: "stub".into(),
                max_turns_reached: false,
                min_turns_met: false,
                generation_time_seconds: 0.0,
                quality_score: Some(0.95),
                quality_assessment: None,
                improved_by_quality_judge: false,
                rejection_reason: None,
            },
        };
        hub.promote(&d, 0.95).unwrap();
        assert_eq!(hub.count("taxi"), before + 1);

        let reloaded = FewShotHub::new(tmp.path(), &domains()).unwrap();
        assert_eq!(reloaded.count("taxi"), before + 1);
    }

    #[test]
    fn load_few_shot_examples_orders_by_quality_then_recency() {
        let tmp = tempfile::tempdir().unwrap();
        let hub = FewShotHub::new(tmp.path(), &domains()).unwrap();
        let examples = hub.load_few_shot_examples("hotel", 2);
        assert!(examples.len() <= 2);
    }
}
