//! Generation-verification-repair pipeline stages: the experience generator,
//! the two-agent dialogue simulator, and the quality judge. Orchestrated
//! end-to-end by the `goalconvo` binary's pipeline orchestrator, which
//! composes these with the store crate's persistence and versioning.

pub mod evaluator;
pub mod experience_generator;
pub mod goal_norm;
pub mod orchestrator;
pub mod quality_judge;
pub mod room_registry;
pub mod simulator;

pub use evaluator::{EvaluationReport, Evaluator};
pub use experience_generator::{default_seed_goals, goal_complexity, ExperienceGenerator};
pub use goal_norm::{looks_like_slot_format, normalize_goal};
pub use orchestrator::{PipelineContext, PipelineOrchestrator, RunPipelineRequest};
pub use quality_judge::QualityJudge;
pub use room_registry::RoomRegistry;
pub use simulator::DialogueSimulator;
