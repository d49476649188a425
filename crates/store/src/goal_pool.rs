//! Seed goal pool: `map<domain, Vec<String>>` on disk at
//! `data_dir/seed_goals.json`, the pool the Pipeline Orchestrator draws
//! from before experience generation. If the file is absent, it is
//! written once from the caller's default table so a fresh data
//! directory is self-seeding, matching the hub's `ensure_seed` posture.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use goalconvo_domain::error::Result;
use parking_lot::RwLock;
use rand::seq::SliceRandom;

pub struct SeedGoalPool {
    path: PathBuf,
    goals: RwLock<HashMap<String, Vec<String>>>,
}

impl SeedGoalPool {
    /// Load `data_dir/seed_goals.json`, writing it from `defaults` the
    /// first time it doesn't exist. Domains present in `defaults` but
    /// missing from an existing file are merged in without overwriting
    /// what's already on disk.
    pub fn load(data_dir: &Path, defaults: &HashMap<String, Vec<String>>) -> Result<Self> {
        let path = data_dir.join("seed_goals.json");

        let mut goals: HashMap<String, Vec<String>> = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).unwrap_or_default()
        } else {
            HashMap::new()
        };

        let mut changed = !path.exists();
        for (domain, domain_goals) in defaults {
            goals.entry(domain.clone()).or_insert_with(|| {
                changed = true;
                domain_goals.clone()
            });
        }

        let pool = Self {
            path,
            goals: RwLock::new(goals),
        };
        if changed {
            pool.flush()?;
        }
        tracing::info!(domains = pool.goals.read().len(), "seed goal pool ready");
        Ok(pool)
    }

    fn flush(&self) -> Result<()> {
        let goals = self.goals.read();
        std::fs::write(&self.path, serde_json::to_string_pretty(&*goals)?)?;
        Ok(())
    }

    /// Draw a random goal for `domain`, or `None` if the domain has no
    /// goals registered.
    pub fn draw(&self, domain: &str) -> Option<String> {
        let goals = self.goals.read();
        goals.get(domain)?.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn domain_goals(&self, domain: &str) -> Vec<String> {
        self.goals.read().get(domain).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> HashMap<String, Vec<String>> {
        let mut m = HashMap::new();
        m.insert("hotel".to_string(), vec!["book a hotel".to_string()]);
        m
    }

    #[test]
    fn writes_defaults_on_first_load() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = SeedGoalPool::load(tmp.path(), &defaults()).unwrap();
        assert_eq!(pool.draw("hotel").as_deref(), Some("book a hotel"));
        assert!(tmp.path().join("seed_goals.json").exists());
    }

    #[test]
    fn preserves_existing_file_contents() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("seed_goals.json"),
            r#"{"hotel": ["custom goal"]}"#,
        )
        .unwrap();
        let pool = SeedGoalPool::load(tmp.path(), &defaults()).unwrap();
        assert_eq!(pool.draw("hotel").as_deref(), Some("custom goal"));
    }

    #[test]
    fn unknown_domain_draws_none() {
        let tmp = tempfile::tempdir().unwrap();
        let pool = SeedGoalPool::load(tmp.path(), &defaults()).unwrap();
        assert!(pool.draw("unknown").is_none());
    }
}
