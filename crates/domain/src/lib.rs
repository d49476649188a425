pub mod config;
pub mod dialogue;
pub mod error;
pub mod events;
pub mod experience;
pub mod fallback_responses;
pub mod human_eval;
pub mod lexicon;
pub mod quality;
pub mod version;

pub use config::{Config, ProviderCredential, ProviderCredentials, RunOverrides};
pub use dialogue::{Dialogue, DialogueMetadata, Role, Turn};
pub use error::{Error, Result};
pub use events::PipelineEvent;
pub use experience::Experience;
pub use fallback_responses::{DomainFallbacks, FallbackCatalog};
pub use human_eval::{AgreementReport, EvaluationDimension, EvaluationTask, HumanAnnotation, TaskStatus};
pub use quality::{FilterResult, HeuristicFilters, LlmEvaluation, QualityAssessment};
pub use version::{CountDiff, DatasetVersion, DomainDistributionDiff, ExportFormat, VersionComparison, VersionSummary};
