pub mod dataset_store;
pub mod few_shot_hub;
pub mod goal_pool;
pub mod human_eval_store;
pub mod seed_dialogues;
pub mod version_manager;

pub use dataset_store::{DatasetStatistics, DatasetStore, LoadFilter, QualityDistribution};
pub use few_shot_hub::{FewShotExample, FewShotHub, HubEntry, HubMetadata, HubSource};
pub use goal_pool::SeedGoalPool;
pub use human_eval_store::HumanEvalStore;
pub use version_manager::VersionManager;
