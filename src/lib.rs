//! fxfuse fuses visual-effect source code with weighted enhancement modules.
//!
//! A fusion runs source text through a fixed pipeline:
//!
//! - Extract an [`EffectEssence`] with pattern heuristics
//! - Select and score modules for the requested level
//! - Build and moderate a [`FusionBlueprint`]
//! - Synthesize a [`FusedEssence`], generate code and compress it
//!
//! [`FusionOrchestrator::fuse`] sequences the stages and records each result.
#![forbid(unsafe_code)]

mod foundation;

pub mod blueprint;
pub mod compat;
pub mod config;
pub mod essence;
pub mod moderate;
pub mod orchestrator;
pub mod policy;
pub mod reconstruct;
pub mod registry;
pub mod report;
pub mod synth;

pub use crate::blueprint::{ExpectedTransformation, FusionBlueprint, FusionOptions};
pub use crate::compat::{FusionAlgorithm, ModuleFusionProfile};
pub use crate::config::FusionConfig;
pub use crate::essence::{AnimationType, EffectEssence, EssenceExtractor};
pub use crate::foundation::error::{FuseError, FuseResult};
pub use crate::moderate::{ClampModerator, Moderator, PassthroughModerator};
pub use crate::orchestrator::{
    FusionHistory, FusionOrchestrator, FusionRecord, IdGenerator, ReconstructedArtifact,
    SequentialIds, UuidIds,
};
pub use crate::policy::{LevelPolicy, LevelPolicyTable, Strategy};
pub use crate::reconstruct::{CodeReconstructor, CompressionStats, Reconstruction};
pub use crate::registry::{ModuleDescriptor, ModuleRegistry, Specialization};
pub use crate::report::{
    CreativeEvolutionSummary, EnhancementMetrics, ModuleContribution, TransformationReport,
};
pub use crate::synth::{EvolutionMetrics, FusedEssence, FusionSynthesizer};
