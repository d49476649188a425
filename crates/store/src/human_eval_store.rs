//! Human-evaluation task queue and annotation store, for the manual
//! spot-check layer that runs alongside the automatic evaluator.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use goalconvo_domain::error::{Error, Result};
use goalconvo_domain::human_eval::{AgreementReport, EvaluationDimension, EvaluationTask, HumanAnnotation, TaskStatus};
use parking_lot::RwLock;

pub struct HumanEvalStore {
    tasks_path: PathBuf,
    annotations_path: PathBuf,
    tasks: RwLock<HashMap<String, EvaluationTask>>,
    annotations: RwLock<HashMap<String, HumanAnnotation>>,
}

impl HumanEvalStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("human_evaluations");
        std::fs::create_dir_all(&dir)?;
        let tasks_path = dir.join("tasks.json");
        let annotations_path = dir.join("annotations.json");

        let tasks = load_or_default(&tasks_path)?;
        let annotations = load_or_default(&annotations_path)?;

        tracing::info!(tasks = tasks.len(), annotations = annotations.len(), "human eval store loaded");

        Ok(Self {
            tasks_path,
            annotations_path,
            tasks: RwLock::new(tasks),
            annotations: RwLock::new(annotations),
        })
    }

    fn flush_tasks(&self) -> Result<()> {
        let tasks = self.tasks.read();
        std::fs::write(&self.tasks_path, serde_json::to_string_pretty(&*tasks)?)?;
        Ok(())
    }

    fn flush_annotations(&self) -> Result<()> {
        let annotations = self.annotations.read();
        std::fs::write(&self.annotations_path, serde_json::to_string_pretty(&*annotations)?)?;
        Ok(())
    }

    pub fn create_task(
        &self,
        dialogue_id: &str,
        dialogue_data: serde_json::Value,
        assigned_to: &str,
    ) -> Result<String> {
        let task_id = format!("task_{dialogue_id}_{}", Utc::now().format("%Y%m%d_%H%M%S"));
        let task = EvaluationTask {
            task_id: task_id.clone(),
            dialogue_id: dialogue_id.to_string(),
            dialogue_data,
            assigned_to: assigned_to.to_string(),
            created_at: Utc::now(),
            completed_at: None,
            status: TaskStatus::Pending,
        };
        self.tasks.write().insert(task_id.clone(), task);
        self.flush_tasks()?;
        Ok(task_id)
    }

    /// Create tasks for a batch of `(dialogue_id, dialogue_data)` pairs.
    pub fn create_tasks_batch(
        &self,
        items: &[(String, serde_json::Value)],
        assigned_to: &str,
    ) -> Result<Vec<String>> {
        items
            .iter()
            .map(|(id, data)| self.create_task(id, data.clone(), assigned_to))
            .collect()
    }

    pub fn list_tasks(&self, assigned_to: Option<&str>) -> Vec<EvaluationTask> {
        let mut tasks: Vec<EvaluationTask> = self
            .tasks
            .read()
            .values()
            .filter(|t| assigned_to.map(|a| t.assigned_to == a).unwrap_or(true))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Submit an annotation for a task. Scores must be in `[1.0, 5.0]` and
    /// keyed by a recognized [`EvaluationDimension`].
    pub fn submit_annotation(
        &self,
        task_id: &str,
        annotator_id: &str,
        dimensions: HashMap<String, f64>,
        comments: Option<String>,
        task_completed: Option<bool>,
        issues: Vec<String>,
    ) -> Result<String> {
        for (dim, score) in &dimensions {
            if EvaluationDimension::from_str_loose(dim).is_none() {
                return Err(Error::InvalidDialogue(format!("invalid evaluation dimension: {dim}")));
            }
            if !(1.0..=5.0).contains(score) {
                return Err(Error::InvalidDialogue(format!(
                    "score for {dim} must be between 1 and 5, got {score}"
                )));
            }
        }

        let dialogue_id = {
            let mut tasks = self.tasks.write();
            let task = tasks
                .get_mut(task_id)
                .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
            if task.assigned_to != annotator_id {
                return Err(Error::InvalidDialogue(format!(
                    "task assigned to {}, not {annotator_id}",
                    task.assigned_to
                )));
            }
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            task.dialogue_id.clone()
        };
        self.flush_tasks()?;

        let annotation_id = format!(
            "ann_{dialogue_id}_{annotator_id}_{}",
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let annotation = HumanAnnotation {
            annotation_id: annotation_id.clone(),
            dialogue_id,
            annotator_id: annotator_id.to_string(),
            timestamp: Utc::now(),
            dimensions,
            comments,
            task_completed,
            issues,
        };
        self.annotations.write().insert(annotation_id.clone(), annotation);
        self.flush_annotations()?;
        Ok(annotation_id)
    }

    pub fn annotations_for_dialogue(&self, dialogue_id: &str) -> Vec<HumanAnnotation> {
        self.annotations
            .read()
            .values()
            .filter(|a| a.dialogue_id == dialogue_id)
            .cloned()
            .collect()
    }

    pub fn annotations_by_annotator(&self, annotator_id: &str) -> Vec<HumanAnnotation> {
        self.annotations
            .read()
            .values()
            .filter(|a| a.annotator_id == annotator_id)
            .cloned()
            .collect()
    }

    /// Agreement rate: share of scores within one point of the mean. Needs
    /// at least two annotations for the dialogue/dimension pair.
    pub fn compute_agreement(&self, dialogue_id: &str, dimension: &str) -> Result<AgreementReport> {
        let scores: Vec<f64> = self
            .annotations_for_dialogue(dialogue_id)
            .iter()
            .filter_map(|a| a.dimensions.get(dimension).copied())
            .collect();

        if scores.len() < 2 {
            return Err(Error::InvalidDialogue(format!(
                "need at least 2 annotations for agreement analysis, got {}",
                scores.len()
            )));
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        let std = variance.sqrt();
        let within_one = scores.iter().filter(|s| (*s - mean).abs() <= 1.0).count();

        Ok(AgreementReport {
            dimension: dimension.to_string(),
            annotation_count: scores.len(),
            scores: scores.clone(),
            mean,
            std,
            agreement_rate: within_one as f64 / scores.len() as f64,
            min: scores.iter().cloned().fold(f64::INFINITY, f64::min),
            max: scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    pub fn get_task(&self, task_id: &str) -> Option<EvaluationTask> {
        self.tasks.read().get(task_id).cloned()
    }

    /// Aggregate task and annotation counts plus the per-dimension mean
    /// score across every submitted annotation.
    pub fn statistics(&self) -> serde_json::Value {
        let tasks = self.tasks.read();
        let annotations = self.annotations.read();

        let total_tasks = tasks.len();
        let completed_tasks = tasks.values().filter(|t| t.status == TaskStatus::Completed).count();

        let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
        for annotation in annotations.values() {
            for (dim, score) in &annotation.dimensions {
                let entry = sums.entry(dim.clone()).or_insert((0.0, 0));
                entry.0 += score;
                entry.1 += 1;
            }
        }
        let dimension_means: HashMap<String, f64> = sums
            .into_iter()
            .map(|(dim, (sum, count))| (dim, sum / count as f64))
            .collect();

        serde_json::json!({
            "total_tasks": total_tasks,
            "completed_tasks": completed_tasks,
            "pending_tasks": total_tasks - completed_tasks,
            "total_annotations": annotations.len(),
            "dimension_means": dimension_means,
        })
    }

    /// Write every task and annotation to a single JSON snapshot under
    /// `results/comprehensive_evaluation_<ts>.json`, returning its path.
    pub fn export(&self, data_dir: &Path) -> Result<PathBuf> {
        let results_dir = data_dir.join("results");
        std::fs::create_dir_all(&results_dir)?;
        let path = results_dir.join(format!(
            "comprehensive_evaluation_{}.json",
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        let payload = serde_json::json!({
            "tasks": self.tasks.read().values().collect::<Vec<_>>(),
            "annotations": self.annotations.read().values().collect::<Vec<_>>(),
            "statistics": self.statistics(),
        });
        std::fs::write(&path, serde_json::to_string_pretty(&payload)?)?;
        Ok(path)
    }
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if path.exists() {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw).unwrap_or_default())
    } else {
        Ok(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_annotation_requires_matching_annotator() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HumanEvalStore::new(tmp.path()).unwrap();
        let task_id = store
            .create_task("d1", serde_json::json!({}), "alice")
            .unwrap();
        let mut dims = HashMap::new();
        dims.insert("coherence".to_string(), 4.0);
        let err = store
            .submit_annotation(&task_id, "bob", dims, None, Some(true), vec![])
            .unwrap_err();
        assert!(err.to_string().contains("assigned to"));
    }

    #[test]
    fn submit_annotation_rejects_out_of_range_score() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HumanEvalStore::new(tmp.path()).unwrap();
        let task_id = store.create_task("d1", serde_json::json!({}), "alice").unwrap();
        let mut dims = HashMap::new();
        dims.insert("coherence".to_string(), 6.0);
        assert!(store
            .submit_annotation(&task_id, "alice", dims, None, Some(true), vec![])
            .is_err());
    }

    #[test]
    fn agreement_needs_two_annotations() {
        let tmp = tempfile::tempdir().unwrap();
        let store = HumanEvalStore::new(tmp.path()).unwrap();
        assert!(store.compute_agreement("d1", "coherence").is_err());
    }
}
