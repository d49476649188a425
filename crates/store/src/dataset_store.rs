//! Accepted-dialogue store: one JSON file per dialogue, partitioned by
//! domain directory, matching the on-disk layout every other tool in the
//! pipeline (and an operator poking around with `ls`) expects:
//! `synthetic/<domain>/<dialogue_id>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use goalconvo_domain::dialogue::Dialogue;
use goalconvo_domain::error::{Error, Result};
use parking_lot::RwLock;

/// Aggregate counts/averages over a (possibly filtered) set of dialogues.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatasetStatistics {
    pub total_dialogues: usize,
    pub avg_turns: f64,
    pub domain_distribution: HashMap<String, usize>,
    pub quality_distribution: QualityDistribution,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct QualityDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unscored: usize,
}

/// Filters accepted by [`DatasetStore::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadFilter {
    pub domain: Option<String>,
    pub limit: Option<usize>,
    pub min_quality: Option<f64>,
}

pub struct DatasetStore {
    root: PathBuf,
    /// In-memory mirror kept for fast `all`/`statistics`/`domain_distribution`
    /// calls; rebuilt from disk at startup, kept in sync on every write.
    dialogues: RwLock<HashMap<uuid::Uuid, Dialogue>>,
}

impl DatasetStore {
    /// Load (or create) the store at `data_dir/synthetic/`, reading every
    /// `<domain>/<uuid>.json` file under it into memory.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let root = data_dir.join("synthetic");
        std::fs::create_dir_all(&root)?;

        let mut dialogues = HashMap::new();
        for domain_entry in std::fs::read_dir(&root)?.flatten() {
            if !domain_entry.path().is_dir() {
                continue;
            }
            for file in std::fs::read_dir(domain_entry.path())?.flatten() {
                let path = file.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let raw = std::fs::read_to_string(&path)?;
                match serde_json::from_str::<Dialogue>(&raw) {
                    Ok(d) => {
                        dialogues.insert(d.dialogue_id, d);
                    }
                    Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping malformed dialogue file"),
                }
            }
        }

        tracing::info!(count = dialogues.len(), path = %root.display(), "dataset store loaded");

        Ok(Self {
            root,
            dialogues: RwLock::new(dialogues),
        })
    }

    /// Validate, assign an id if absent (never happens in practice since
    /// the simulator always sets one, but cheap to guarantee), and write
    /// the dialogue atomically to `<domain>/<id>.json`.
    pub fn save(&self, dialogue: Dialogue) -> Result<Dialogue> {
        if !dialogue.is_well_formed() {
            return Err(Error::InvalidDialogue(format!(
                "dialogue {} fails the turn-alternation/non-empty-text invariant",
                dialogue.dialogue_id
            )));
        }
        self.write_file(&dialogue)?;
        self.dialogues.write().insert(dialogue.dialogue_id, dialogue.clone());
        Ok(dialogue)
    }

    /// Save a batch, returning the saved dialogues in the same order.
    pub fn save_batch(&self, batch: Vec<Dialogue>) -> Result<Vec<Dialogue>> {
        batch.into_iter().map(|d| self.save(d)).collect()
    }

    /// Load a single dialogue by domain + id, matching what [`Self::save`]
    /// wrote (the round-trip law in spec §8).
    pub fn load(&self, domain: &str, id: uuid::Uuid) -> Result<Dialogue> {
        self.dialogues
            .read()
            .get(&id)
            .filter(|d| d.domain == domain)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("dialogue {id} in domain {domain}")))
    }

    /// Load all dialogues matching the filter, most-recently-generated
    /// first.
    pub fn load_filtered(&self, filter: &LoadFilter) -> Vec<Dialogue> {
        let mut out: Vec<Dialogue> = self
            .dialogues
            .read()
            .values()
            .filter(|d| filter.domain.as_deref().map(|dom| dom == d.domain).unwrap_or(true))
            .filter(|d| {
                filter
                    .min_quality
                    .map(|mq| d.metadata.quality_score.unwrap_or(0.0) >= mq)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.metadata.generated_at.cmp(&a.metadata.generated_at));
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        out
    }

    pub fn all(&self) -> Vec<Dialogue> {
        self.dialogues.read().values().cloned().collect()
    }

    pub fn by_domain(&self, domain: &str) -> Vec<Dialogue> {
        self.dialogues.read().values().filter(|d| d.domain == domain).cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.dialogues.read().len()
    }

    pub fn domain_distribution(&self) -> HashMap<String, usize> {
        let mut dist = HashMap::new();
        for d in self.dialogues.read().values() {
            *dist.entry(d.domain.clone()).or_insert(0) += 1;
        }
        dist
    }

    /// Aggregate counts, average turns, and a coarse quality-score
    /// histogram (`high` >= 0.8, `medium` >= 0.5, else `low`).
    pub fn statistics(&self) -> DatasetStatistics {
        let dialogues = self.dialogues.read();
        let total_dialogues = dialogues.len();
        let avg_turns = if total_dialogues == 0 {
            0.0
        } else {
            dialogues.values().map(|d| d.turns.len()).sum::<usize>() as f64 / total_dialogues as f64
        };

        let mut domain_distribution = HashMap::new();
        let mut quality_distribution = QualityDistribution::default();
        for d in dialogues.values() {
            *domain_distribution.entry(d.domain.clone()).or_insert(0) += 1;
            match d.metadata.quality_score {
                Some(q) if q >= 0.8 => quality_distribution.high += 1,
                Some(q) if q >= 0.5 => quality_distribution.medium += 1,
                Some(_) => quality_distribution.low += 1,
                None => quality_distribution.unscored += 1,
            }
        }

        DatasetStatistics {
            total_dialogues,
            avg_turns,
            domain_distribution,
            quality_distribution,
        }
    }

    fn write_file(&self, dialogue: &Dialogue) -> Result<()> {
        let domain_dir = self.root.join(&dialogue.domain);
        std::fs::create_dir_all(&domain_dir)?;
        let final_path = domain_dir.join(format!("{}.json", dialogue.dialogue_id));
        let tmp_path = domain_dir.join(format!("{}.json.tmp", dialogue.dialogue_id));
        std::fs::write(&tmp_path, serde_json::to_string_pretty(dialogue)?)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use goalconvo_domain::dialogue::{DialogueMetadata, Role, Turn};
    use uuid::Uuid;

    fn sample(domain: &str) -> Dialogue {
        Dialogue {
            dialogue_id: Uuid::new_v4(),
            goal: "test goal".into(),
            domain: domain.into(),
            context: "ctx".into(),
            user_persona: "a polite customer".into(),
            turns: vec![
                Turn::new(Role::User, "hi", Local::now()),
                Turn::new(Role::SupportBot, "hello", Local::now()),
            ],
            metadata: DialogueMetadata {
                num_turns: 2,
                generated_at: Local::now(),
                model_version: "stub".into(),
                max_turns_reached: false,
                min_turns_met: true,
                generation_time_seconds: 0.0,
                quality_score: Some(0.9),
                quality_assessment: None,
                improved_by_quality_judge: false,
                rejection_reason: None,
            },
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(tmp.path()).unwrap();
        let saved = store.save(sample("hotel")).unwrap();

        let reloaded_store = DatasetStore::new(tmp.path()).unwrap();
        let loaded = reloaded_store.load("hotel", saved.dialogue_id).unwrap();
        assert_eq!(loaded.dialogue_id, saved.dialogue_id);
        assert_eq!(loaded.turns.len(), saved.turns.len());
    }

    #[test]
    fn save_rejects_malformed_dialogue() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(tmp.path()).unwrap();
        let mut bad = sample("hotel");
        bad.turns.push(Turn::new(Role::SupportBot, "", Local::now()));
        assert!(store.save(bad).is_err());
    }

    #[test]
    fn domain_distribution_counts_per_domain() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(tmp.path()).unwrap();
        store.save_batch(vec![sample("hotel"), sample("hotel"), sample("taxi")]).unwrap();
        let dist = store.domain_distribution();
        assert_eq!(dist["hotel"], 2);
        assert_eq!(dist["taxi"], 1);
    }

    #[test]
    fn load_filtered_respects_domain_and_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(tmp.path()).unwrap();
        store.save_batch(vec![sample("hotel"), sample("hotel"), sample("taxi")]).unwrap();
        let filtered = store.load_filtered(&LoadFilter {
            domain: Some("hotel".into()),
            limit: Some(1),
            min_quality: None,
        });
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].domain, "hotel");
    }

    #[test]
    fn statistics_reports_quality_buckets() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DatasetStore::new(tmp.path()).unwrap();
        store.save(sample("hotel")).unwrap();
        let stats = store.statistics();
        assert_eq!(stats.total_dialogues, 1);
        assert_eq!(stats.quality_distribution.high, 1);
    }
}
