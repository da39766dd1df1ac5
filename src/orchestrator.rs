use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    blueprint::{BlueprintBuilder, FusionBlueprint, FusionOptions},
    compat::CompatibilityAnalyzer,
    config::FusionConfig,
    essence::EssenceExtractor,
    foundation::error::{FuseError, FuseResult},
    moderate::{BlueprintShape, ClampModerator, Moderator},
    policy::{LevelPolicy, LevelPolicyTable},
    reconstruct::CodeReconstructor,
    registry::{ModuleDescriptor, ModuleRegistry},
    report::{CreativeEvolutionSummary, ReportGenerator, TransformationReport},
    synth::FusionSynthesizer,
};

/// Source of fusion ids. Must never hand out the same id twice within one history.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Monotonic `fusion-<n>` ids, starting at 1.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("fusion-{n}")
    }
}

/// Random UUID v4 ids.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReconstructedArtifact {
    pub fusion_id: String,
    pub code: String,
    pub transformation_report: TransformationReport,
    pub creative_evolution_summary: CreativeEvolutionSummary,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FusionRecord {
    pub blueprint: FusionBlueprint,
    pub artifact: ReconstructedArtifact,
}

/// Shared record of completed fusions, keyed by fusion id.
///
/// The store also issues the default `fusion-<n>` ids, so orchestrators sharing a store draw
/// from one sequence.
#[derive(Debug, Default)]
pub struct FusionHistory {
    records: Mutex<BTreeMap<String, Arc<FusionRecord>>>,
    sequence: SequentialIds,
}

impl FusionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<FusionRecord>>> {
        // Records are inserted whole, so a poisoned map is still consistent.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next id from the store's own sequence.
    pub fn next_id(&self) -> String {
        self.sequence.next_id()
    }

    /// Store `record` under `id`. A taken id is rejected and the existing record kept.
    pub fn insert(&self, id: impl Into<String>, record: FusionRecord) -> FuseResult<()> {
        let mut map = self.lock();
        let id = id.into();
        if map.contains_key(&id) {
            return Err(FuseError::duplicate_id(id));
        }
        map.insert(id, Arc::new(record));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<FusionRecord>> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ids in lexicographic order.
    pub fn ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

/// Entry point: sequences extraction, scoring, moderation, synthesis and reconstruction.
///
/// The orchestrator is `Send + Sync`; concurrent [`fuse`](Self::fuse) calls share only the
/// history store.
pub struct FusionOrchestrator {
    registry: ModuleRegistry,
    policies: LevelPolicyTable,
    moderator: Arc<dyn Moderator>,
    // `None` draws ids from the history store.
    ids: Option<Arc<dyn IdGenerator>>,
    history: Arc<FusionHistory>,
}

impl std::fmt::Debug for FusionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FusionOrchestrator")
            .field("modules", &self.registry.len())
            .field("levels", &self.policies.levels().collect::<Vec<_>>())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl FusionOrchestrator {
    pub fn new(registry: ModuleRegistry, policies: LevelPolicyTable) -> Self {
        Self {
            registry,
            policies,
            moderator: Arc::new(ClampModerator::default()),
            ids: None,
            history: Arc::new(FusionHistory::new()),
        }
    }

    pub fn builtin() -> Self {
        Self::new(ModuleRegistry::builtin(), LevelPolicyTable::reference())
    }

    pub fn from_config(config: FusionConfig) -> FuseResult<Self> {
        let (registry, policies) = config.into_parts()?;
        Ok(Self::new(registry, policies))
    }

    pub fn with_moderator(mut self, moderator: impl Moderator + 'static) -> Self {
        self.moderator = Arc::new(moderator);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    /// Share a history store between orchestrators. Unless an id generator was injected, ids
    /// come from this store's sequence.
    pub fn with_history(mut self, history: Arc<FusionHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &Arc<FusionHistory> {
        &self.history
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn policies(&self) -> &LevelPolicyTable {
        &self.policies
    }

    pub fn level_policy(&self, level: u8) -> FuseResult<&LevelPolicy> {
        self.policies.get(level)
    }

    /// Modules active at `level`, in fusion order.
    pub fn select_modules(&self, level: u8) -> FuseResult<Vec<&ModuleDescriptor>> {
        self.policies.get(level)?;
        Ok(self.registry.select_modules(level))
    }

    #[tracing::instrument(skip(self, source, options), fields(source_len = source.len()))]
    pub fn fuse(
        &self,
        source: &str,
        level: u8,
        options: &FusionOptions,
    ) -> FuseResult<ReconstructedArtifact> {
        let policy = self.policies.get(level)?;
        check_options(options)?;

        let essence = EssenceExtractor::extract(source);
        let modules = self.registry.select_modules(level);
        tracing::debug!(
            animation = essence.core_behavior.animation_type.as_str(),
            modules = modules.len(),
            "essence extracted"
        );

        let profiles = CompatibilityAnalyzer::analyze(&essence, &modules);
        let blueprint = BlueprintBuilder::build(essence, profiles, policy, options);

        let shape = BlueprintShape::of(&blueprint);
        let blueprint = self.moderator.moderate(blueprint)?;
        shape.verify(&blueprint)?;

        let fused = FusionSynthesizer::synthesize(&blueprint);
        let output = CodeReconstructor::reconstruct(&fused)?;
        let report = ReportGenerator::generate(&blueprint.original_essence, &blueprint, &output);
        let summary = ReportGenerator::summarize_evolution(&fused);

        let fusion_id = match &self.ids {
            Some(ids) => ids.next_id(),
            None => self.history.next_id(),
        };
        let artifact = ReconstructedArtifact {
            fusion_id,
            code: output.code,
            transformation_report: report,
            creative_evolution_summary: summary,
        };

        self.history.insert(
            artifact.fusion_id.clone(),
            FusionRecord {
                blueprint,
                artifact: artifact.clone(),
            },
        )?;

        tracing::info!(
            fusion_id = %artifact.fusion_id,
            strategy = policy.strategy.as_str(),
            bytes = artifact.code.len(),
            "fusion complete"
        );
        Ok(artifact)
    }
}

fn check_options(options: &FusionOptions) -> FuseResult<()> {
    let fields = [
        ("creativity_boost", options.creativity_boost),
        ("performance_priority", options.performance_priority),
        ("innovation_level", options.innovation_level),
    ];
    match fields.iter().find(|(_, v)| !v.is_finite()) {
        Some((name, v)) => Err(FuseError::validation(format!(
            "fusion option {name} must be finite, got {v}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_from_one() {
        let ids = SequentialIds::default();
        assert_eq!(ids.next_id(), "fusion-1");
        assert_eq!(ids.next_id(), "fusion-2");
    }

    #[test]
    fn uuid_ids_are_distinct() {
        let ids = UuidIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }

    #[test]
    fn history_rejects_taken_ids() {
        let orch = FusionOrchestrator::builtin();
        let a = orch.fuse("particle", 1, &FusionOptions::default()).unwrap();
        let record = orch.history().get(&a.fusion_id).unwrap();

        let other = FusionRecord {
            blueprint: record.blueprint.clone(),
            artifact: ReconstructedArtifact {
                code: "changed".to_owned(),
                ..record.artifact.clone()
            },
        };
        assert!(matches!(
            orch.history().insert(a.fusion_id.clone(), other),
            Err(FuseError::DuplicateFusionId(id)) if id == a.fusion_id
        ));
        assert_eq!(orch.history().get(&a.fusion_id).unwrap().artifact.code, a.code);
        assert_eq!(orch.history().len(), 1);
    }

    #[test]
    fn select_modules_rejects_unknown_level() {
        let orch = FusionOrchestrator::builtin();
        assert!(matches!(
            orch.select_modules(0),
            Err(FuseError::InvalidLevel { level: 0, .. })
        ));
        assert_eq!(orch.select_modules(1).unwrap().len(), 4);
    }

    #[test]
    fn non_finite_options_are_rejected() {
        let orch = FusionOrchestrator::builtin();
        let opts = FusionOptions {
            innovation_level: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            orch.fuse("x", 1, &opts),
            Err(FuseError::Validation(_))
        ));
        assert!(orch.history().is_empty());
    }

    #[test]
    fn orchestrator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FusionOrchestrator>();
    }
}
