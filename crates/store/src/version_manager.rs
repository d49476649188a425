//! Dataset version control: content-addressed snapshots, comparison,
//! tagging, and export to downstream training formats.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use goalconvo_domain::dialogue::Dialogue;
use goalconvo_domain::error::{Error, Result};
use goalconvo_domain::version::{
    CountDiff, DatasetVersion, DomainDistributionDiff, ExportFormat, VersionComparison,
    VersionSummary,
};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

pub struct VersionManager {
    data_dir: PathBuf,
    versions_dir: PathBuf,
    metadata_path: PathBuf,
    versions: RwLock<HashMap<String, DatasetVersion>>,
}

impl VersionManager {
    /// Load or create the version manager at `data_dir/versions/`.
    pub fn new(data_dir: &Path) -> Result<Self> {
        let versions_dir = data_dir.join("versions");
        std::fs::create_dir_all(&versions_dir)?;
        let metadata_path = versions_dir.join("version_metadata.json");

        let versions: HashMap<String, DatasetVersion> = if metadata_path.exists() {
            let raw = std::fs::read_to_string(&metadata_path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        tracing::info!(count = versions.len(), "dataset versions loaded");

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            versions_dir,
            metadata_path,
            versions: RwLock::new(versions),
        })
    }

    fn flush(&self) -> Result<()> {
        let versions = self.versions.read();
        let json = serde_json::to_string_pretty(&*versions)?;
        std::fs::write(&self.metadata_path, json)?;
        Ok(())
    }

    /// Create an immutable snapshot: sha256-over-sorted-JSON checksum,
    /// per-domain counts, and the dialogues themselves written alongside
    /// the metadata entry. Version ids are timestamp-based so they sort
    /// chronologically without an extra index.
    pub fn create_version(
        &self,
        dialogues: &[Dialogue],
        description: &str,
        generation_config: serde_json::Value,
        parent_version: Option<String>,
        tags: Vec<String>,
    ) -> Result<String> {
        let version_id = Utc::now().format("%Y%m%d_%H%M%S").to_string();

        let canonical = canonical_json(dialogues)?;
        let checksum = hex::encode(Sha256::digest(canonical.as_bytes()))[..16].to_string();

        let mut domain_distribution: HashMap<String, usize> = HashMap::new();
        for d in dialogues {
            *domain_distribution.entry(d.domain.clone()).or_insert(0) += 1;
        }

        let avg_turns = if dialogues.is_empty() {
            0.0
        } else {
            dialogues.iter().map(|d| d.turns.len()).sum::<usize>() as f64 / dialogues.len() as f64
        };

        let version = DatasetVersion {
            version_id: version_id.clone(),
            timestamp: Utc::now(),
            description: description.to_string(),
            metadata: VersionSummary {
                total_dialogues: dialogues.len(),
                avg_turns,
                domains: domain_distribution.keys().cloned().collect(),
            },
            dialogue_count: dialogues.len(),
            domain_distribution,
            generation_config,
            checksum,
            parent_version,
            tags,
        };

        let version_dir = self.versions_dir.join(&version_id);
        std::fs::create_dir_all(&version_dir)?;
        let dialogues_json = serde_json::to_string_pretty(dialogues)?;
        std::fs::write(version_dir.join("dialogues.json"), dialogues_json)?;

        self.versions.write().insert(version_id.clone(), version);
        self.flush()?;

        tracing::info!(version_id = %version_id, count = dialogues.len(), "created dataset version");
        Ok(version_id)
    }

    pub fn get_version(&self, version_id: &str) -> Option<DatasetVersion> {
        self.versions.read().get(version_id).cloned()
    }

    pub fn load_dialogues(&self, version_id: &str) -> Result<Vec<Dialogue>> {
        let path = self.versions_dir.join(version_id).join("dialogues.json");
        if !path.exists() {
            return Err(Error::NotFound(format!("version {version_id}")));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// List versions, optionally filtered by tag, newest first.
    pub fn list_versions(&self, tags: Option<&[String]>) -> Vec<DatasetVersion> {
        let mut versions: Vec<DatasetVersion> = self.versions.read().values().cloned().collect();
        if let Some(tags) = tags {
            versions.retain(|v| tags.iter().any(|t| v.tags.contains(t)));
        }
        versions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        versions
    }

    pub fn compare_versions(&self, version_a: &str, version_b: &str) -> Result<VersionComparison> {
        let a = self
            .get_version(version_a)
            .ok_or_else(|| Error::NotFound(format!("version {version_a}")))?;
        let b = self
            .get_version(version_b)
            .ok_or_else(|| Error::NotFound(format!("version {version_b}")))?;

        Ok(VersionComparison {
            version_a: version_a.to_string(),
            version_b: version_b.to_string(),
            dialogue_count: CountDiff {
                a: a.dialogue_count,
                b: b.dialogue_count,
                difference: b.dialogue_count as i64 - a.dialogue_count as i64,
            },
            domain_distribution: DomainDistributionDiff {
                a: a.domain_distribution.clone(),
                b: b.domain_distribution.clone(),
            },
            avg_turns_diff: b.metadata.avg_turns - a.metadata.avg_turns,
            checksum_match: a.checksum == b.checksum,
            config_diff: diff_configs(&a.generation_config, &b.generation_config),
        })
    }

    pub fn tag_version(&self, version_id: &str, tags: Vec<String>) -> Result<()> {
        {
            let mut versions = self.versions.write();
            let version = versions
                .get_mut(version_id)
                .ok_or_else(|| Error::NotFound(format!("version {version_id}")))?;
            for tag in tags {
                if !version.tags.contains(&tag) {
                    version.tags.push(tag);
                }
            }
        }
        self.flush()
    }

    pub fn delete_version(&self, version_id: &str) -> Result<()> {
        {
            let mut versions = self.versions.write();
            if versions.remove(version_id).is_none() {
                return Err(Error::NotFound(format!("version {version_id}")));
            }
        }
        let dir = self.versions_dir.join(version_id);
        if dir.exists() {
            std::fs::remove_dir_all(dir)?;
        }
        self.flush()?;
        tracing::info!(version_id = %version_id, "deleted dataset version");
        Ok(())
    }

    /// Export a version to an external training format. `output_path` is a
    /// file for `json`/`jsonl`, a directory for `hf`/`rasa`.
    pub fn export_version(
        &self,
        version_id: &str,
        output_path: &Path,
        format: ExportFormat,
    ) -> Result<()> {
        let version = self
            .get_version(version_id)
            .ok_or_else(|| Error::NotFound(format!("version {version_id}")))?;
        let dialogues = self.load_dialogues(version_id)?;

        match format {
            ExportFormat::Json => {
                let payload = serde_json::json!({
                    "version_id": version_id,
                    "metadata": version,
                    "dialogues": dialogues,
                });
                std::fs::write(output_path, serde_json::to_string_pretty(&payload)?)?;
            }
            ExportFormat::Jsonl => {
                let mut out = String::new();
                for d in &dialogues {
                    out.push_str(&serde_json::to_string(d)?);
                    out.push('\n');
                }
                std::fs::write(output_path, out)?;
            }
            ExportFormat::Hf => {
                std::fs::create_dir_all(output_path)?;
                let mut train = String::new();
                for d in &dialogues {
                    train.push_str(&serde_json::to_string(d)?);
                    train.push('\n');
                }
                std::fs::write(output_path.join("train.jsonl"), train)?;

                let info = serde_json::json!({
                    "version_id": version_id,
                    "description": version.description,
                    "created_at": Utc::now().to_rfc3339(),
                    "num_dialogues": dialogues.len(),
                    "domain_distribution": version.domain_distribution,
                    "config": version.generation_config,
                });
                std::fs::write(
                    output_path.join("dataset_info.json"),
                    serde_json::to_string_pretty(&info)?,
                )?;
            }
            ExportFormat::Rasa => {
                std::fs::create_dir_all(output_path)?;
                write_rasa_stories(&dialogues, &output_path.join("stories.yml"))?;

                let info = serde_json::json!({
                    "version_id": version_id,
                    "description": version.description,
                    "num_dialogues": dialogues.len(),
                    "config": version.generation_config,
                });
                std::fs::write(
                    output_path.join("dataset_info.json"),
                    serde_json::to_string_pretty(&info)?,
                )?;
            }
        }

        tracing::info!(version_id = %version_id, ?format, path = %output_path.display(), "exported dataset version");
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn canonical_json(dialogues: &[Dialogue]) -> Result<String> {
    let mut value = serde_json::to_value(dialogues)?;
    sort_json_keys(&mut value);
    Ok(serde_json::to_string(&value)?)
}

fn sort_json_keys(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Array(arr) => arr.iter_mut().for_each(sort_json_keys),
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = std::mem::take(map).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, v) in entries.iter_mut() {
                sort_json_keys(v);
            }
            map.extend(entries);
        }
        _ => {}
    }
}

fn diff_configs(a: &serde_json::Value, b: &serde_json::Value) -> serde_json::Value {
    let empty = serde_json::Map::new();
    let map_a = a.as_object().unwrap_or(&empty);
    let map_b = b.as_object().unwrap_or(&empty);
    let mut keys: Vec<&String> = map_a.keys().chain(map_b.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut diff = serde_json::Map::new();
    for key in keys {
        let va = map_a.get(key).cloned().unwrap_or(serde_json::Value::Null);
        let vb = map_b.get(key).cloned().unwrap_or(serde_json::Value::Null);
        if va != vb {
            diff.insert(key.clone(), serde_json::json!({"a": va, "b": vb}));
        }
    }
    serde_json::Value::Object(diff)
}

fn write_rasa_stories(dialogues: &[Dialogue], path: &Path) -> Result<()> {
    fn escape(s: &str) -> String {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', " "))
    }

    let mut lines = vec!["version: \"3.0\"".to_string(), "stories:".to_string()];
    for (i, d) in dialogues.iter().enumerate() {
        let story_name = format!("dialogue_{}", d.dialogue_id);
        let _ = i;
        lines.push(format!("- story: {story_name}"));
        lines.push("  steps:".to_string());
        for turn in &d.turns {
            let text = turn.text.trim();
            if text.is_empty() {
                continue;
            }
            match turn.role {
                goalconvo_domain::dialogue::Role::User => {
                    lines.push(format!("  - user: {}", escape(text)));
                }
                _ => {
                    lines.push(format!("  - bot: {}", escape(text)));
                }
            }
        }
    }
    lines.push(String::new());
    std::fs::write(path, lines.join("\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use goalconvo_domain::dialogue::{DialogueMetadata, Role, Turn};
    use uuid::Uuid;

    fn sample(domain: &str) -> Dialogue {
        Dialogue {
            dialogue_id: Uuid::new_v4(),
            goal: "g".into(),
            domain: domain.into(),
            context: "c".into(),
            user_persona: "p".into(),
            turns: vec![
                Turn::new(Role::User, "hi", chrono::Local::now()),
                Turn::new(Role::SupportBot, "hello", chrono::Local::now()),
            ],
            metadata: DialogueMetadata {
                num_turns: 2,
                generated_at: chrono::Local::now(),
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
    fn create_and_reload_version() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = VersionManager::new(tmp.path()).unwrap();
        let id = mgr
            .create_version(&[sample("hotel")], "first run", serde_json::json!({}), None, vec![])
            .unwrap();
        let reloaded = VersionManager::new(tmp.path()).unwrap();
        let version = reloaded.get_version(&id).unwrap();
        assert_eq!(version.dialogue_count, 1);
        assert_eq!(reloaded.load_dialogues(&id).unwrap().len(), 1);
    }

    #[test]
    fn compare_versions_reports_count_difference() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = VersionManager::new(tmp.path()).unwrap();
        let v1 = mgr
            .create_version(&[sample("hotel")], "v1", serde_json::json!({}), None, vec![])
            .unwrap();
        let v2 = mgr
            .create_version(
                &[sample("hotel"), sample("taxi")],
                "v2",
                serde_json::json!({}),
                Some(v1.clone()),
                vec![],
            )
            .unwrap();
        let cmp = mgr.compare_versions(&v1, &v2).unwrap();
        assert_eq!(cmp.dialogue_count.difference, 1);
        assert!(!cmp.checksum_match);
    }

    #[test]
    fn export_jsonl_writes_one_line_per_dialogue() {
        let tmp = tempfile::tempdir().unwrap();
        let mgr = VersionManager::new(tmp.path()).unwrap();
        let id = mgr
            .create_version(&[sample("hotel"), sample("taxi")], "d", serde_json::json!({}), None, vec![])
            .unwrap();
        let out = tmp.path().join("out.jsonl");
        mgr.export_version(&id, &out, ExportFormat::Jsonl).unwrap();
        let content = std::fs::read_to_string(out).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
