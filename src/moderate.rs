use std::collections::BTreeSet;

use crate::{
    blueprint::FusionBlueprint,
    compat::FusionAlgorithm,
    essence::{
        AestheticSignature, CompatTag, CoreBehavior, EffectEssence, EmotionalImpact, ResourceTier,
    },
    foundation::{
        error::{FuseError, FuseResult},
        math::{clamp, clamp01},
    },
    policy::Strategy,
    registry::Specialization,
};

/// External adjustment applied to a blueprint before synthesis.
///
/// Implementations may scale or clamp numeric fields only. Module identity and order, module
/// specializations and fusion algorithms, the strategy, the reconstruction level and the
/// essence's tags must come back unchanged; the orchestrator rejects anything else with
/// [`FuseError::ModerationContractViolation`].
pub trait Moderator: Send + Sync {
    fn moderate(&self, blueprint: FusionBlueprint) -> FuseResult<FusionBlueprint>;
}

/// Leaves the blueprint untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughModerator;

impl Moderator for PassthroughModerator {
    fn moderate(&self, blueprint: FusionBlueprint) -> FuseResult<FusionBlueprint> {
        Ok(blueprint)
    }
}

/// Clamps fusion weights and contribution maps to `[0, 1]` and projections to
/// `[0, projection_max]`.
#[derive(Clone, Copy, Debug)]
pub struct ClampModerator {
    pub projection_max: f64,
}

impl Default for ClampModerator {
    fn default() -> Self {
        Self {
            projection_max: 100.0,
        }
    }
}

impl Moderator for ClampModerator {
    fn moderate(&self, mut bp: FusionBlueprint) -> FuseResult<FusionBlueprint> {
        bp.fusion_intensity = clamp01(bp.fusion_intensity);
        for p in &mut bp.active_modules {
            p.fusion_weight = clamp01(p.fusion_weight);
            p.compatibility = clamp01(p.compatibility);
            for v in p
                .creative_contribution
                .values_mut()
                .chain(p.behavioral_influence.values_mut())
                .chain(p.technical_enhancement.values_mut())
            {
                *v = clamp01(*v);
            }
        }
        let x = &mut bp.expected_transformation;
        for v in [
            &mut x.visual_enhancement,
            &mut x.performance_gain,
            &mut x.creative_evolution,
            &mut x.behavioral_complexity,
        ] {
            *v = clamp(*v, 0.0, self.projection_max);
        }
        Ok(bp)
    }
}

/// The parts of a blueprint a moderator is not allowed to touch: every identity and tag field,
/// in module order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct BlueprintShape {
    modules: Vec<ModuleTags>,
    strategy: Strategy,
    reconstruction_level: u8,
    essence: EssenceTags,
}

#[derive(Clone, Debug, PartialEq)]
struct ModuleTags {
    id: String,
    specialization: Specialization,
    fusion_algorithm: FusionAlgorithm,
}

#[derive(Clone, Debug, PartialEq)]
struct EssenceTags {
    core_behavior: CoreBehavior,
    aesthetic_signature: AestheticSignature,
    emotional_impact: EmotionalImpact,
    compatibility: BTreeSet<CompatTag>,
    memory_tier: ResourceTier,
    cpu_tier: ResourceTier,
}

impl EssenceTags {
    fn of(e: &EffectEssence) -> Self {
        let perf = &e.technical_aspects.performance;
        Self {
            core_behavior: e.core_behavior.clone(),
            aesthetic_signature: e.creative_dna.aesthetic_signature,
            emotional_impact: e.creative_dna.emotional_impact,
            compatibility: e.technical_aspects.compatibility.clone(),
            memory_tier: perf.memory_tier,
            cpu_tier: perf.cpu_tier,
        }
    }
}

impl BlueprintShape {
    pub(crate) fn of(bp: &FusionBlueprint) -> Self {
        Self {
            modules: bp
                .active_modules
                .iter()
                .map(|p| ModuleTags {
                    id: p.module_id.clone(),
                    specialization: p.specialization,
                    fusion_algorithm: p.fusion_algorithm,
                })
                .collect(),
            strategy: bp.strategy,
            reconstruction_level: bp.reconstruction_level,
            essence: EssenceTags::of(&bp.original_essence),
        }
    }

    pub(crate) fn verify(&self, moderated: &FusionBlueprint) -> FuseResult<()> {
        let after = Self::of(moderated);
        let ids = |s: &Self| s.modules.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
        if ids(&after) != ids(self) {
            return Err(FuseError::moderation(format!(
                "module list changed from {:?} to {:?}",
                ids(self),
                ids(&after)
            )));
        }
        for (before, now) in self.modules.iter().zip(&after.modules) {
            if now.specialization != before.specialization {
                return Err(FuseError::moderation(format!(
                    "module {} specialization changed from {} to {}",
                    before.id,
                    before.specialization.as_str(),
                    now.specialization.as_str()
                )));
            }
            if now.fusion_algorithm != before.fusion_algorithm {
                return Err(FuseError::moderation(format!(
                    "module {} fusion algorithm changed from {} to {}",
                    before.id,
                    before.fusion_algorithm.as_str(),
                    now.fusion_algorithm.as_str()
                )));
            }
        }
        if after.strategy != self.strategy {
            return Err(FuseError::moderation(format!(
                "strategy changed from {} to {}",
                self.strategy.as_str(),
                after.strategy.as_str()
            )));
        }
        if after.reconstruction_level != self.reconstruction_level {
            return Err(FuseError::moderation(format!(
                "reconstruction level changed from {} to {}",
                self.reconstruction_level, after.reconstruction_level
            )));
        }
        let (before, now) = (&self.essence, &after.essence);
        if now.core_behavior.animation_type != before.core_behavior.animation_type {
            return Err(FuseError::moderation(format!(
                "animation type changed from {} to {}",
                before.core_behavior.animation_type.as_str(),
                now.core_behavior.animation_type.as_str()
            )));
        }
        if now != before {
            return Err(FuseError::moderation(
                "essence tags changed; only numeric fields may be moderated",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{BlueprintBuilder, FusionOptions},
        compat::CompatibilityAnalyzer,
        essence::{AnimationType, EssenceExtractor},
        policy::LevelPolicyTable,
        registry::ModuleRegistry,
    };

    fn blueprint(level: u8, options: FusionOptions) -> FusionBlueprint {
        let reg = ModuleRegistry::builtin();
        let table = LevelPolicyTable::reference();
        let policy = table.get(level).unwrap();
        let essence = EssenceExtractor::extract("particle burst with glow");
        let profiles = CompatibilityAnalyzer::analyze(&essence, &reg.select_modules(level));
        BlueprintBuilder::build(essence, profiles, policy, &options)
    }

    #[test]
    fn clamp_bounds_projections() {
        let bp = blueprint(
            3,
            FusionOptions {
                creativity_boost: 400.0,
                performance_priority: -50.0,
                innovation_level: 80.0,
            },
        );
        let shape = BlueprintShape::of(&bp);
        let out = ClampModerator::default().moderate(bp).unwrap();
        shape.verify(&out).unwrap();
        for (name, v) in out.expected_transformation.fields() {
            assert!((0.0..=100.0).contains(&v), "{name} = {v}");
        }
    }

    #[test]
    fn reordering_is_detected() {
        let bp = blueprint(2, FusionOptions::default());
        let shape = BlueprintShape::of(&bp);
        let mut bad = bp.clone();
        bad.active_modules.reverse();
        assert!(matches!(
            shape.verify(&bad),
            Err(FuseError::ModerationContractViolation(_))
        ));

        let mut dropped = bp.clone();
        dropped.active_modules.pop();
        assert!(shape.verify(&dropped).is_err());

        let mut restrategized = bp;
        restrategized.strategy = Strategy::Aggressive;
        assert!(shape.verify(&restrategized).is_err());
    }

    fn violation(shape: &BlueprintShape, bp: &FusionBlueprint) -> String {
        match shape.verify(bp) {
            Err(FuseError::ModerationContractViolation(msg)) => msg,
            other => panic!("expected a contract violation, got {other:?}"),
        }
    }

    #[test]
    fn module_tags_are_part_of_the_shape() {
        let bp = blueprint(3, FusionOptions::default());
        let shape = BlueprintShape::of(&bp);

        let mut algo = bp.clone();
        algo.active_modules[0].fusion_algorithm = match algo.active_modules[0].fusion_algorithm {
            FusionAlgorithm::Quantum => FusionAlgorithm::Harmonic,
            _ => FusionAlgorithm::Quantum,
        };
        let msg = violation(&shape, &algo);
        assert!(msg.contains("fusion algorithm changed"), "{msg}");

        let mut spec = bp.clone();
        spec.active_modules[0].specialization = match spec.active_modules[0].specialization {
            Specialization::Performance => Specialization::Creativity,
            _ => Specialization::Performance,
        };
        let msg = violation(&shape, &spec);
        assert!(msg.contains("specialization changed"), "{msg}");

        let mut weights = bp;
        weights.active_modules[0].fusion_weight = 0.0;
        shape.verify(&weights).unwrap();
    }

    #[test]
    fn essence_tags_are_part_of_the_shape() {
        let bp = blueprint(2, FusionOptions::default());
        let shape = BlueprintShape::of(&bp);

        let mut retyped = bp.clone();
        retyped.original_essence.core_behavior.animation_type = AnimationType::TextAnimation;
        let msg = violation(&shape, &retyped);
        assert!(msg.contains("animation type changed"), "{msg}");

        let mut tiers = bp.clone();
        let perf = &mut tiers.original_essence.technical_aspects.performance;
        perf.cpu_tier = match perf.cpu_tier {
            ResourceTier::High => ResourceTier::Low,
            _ => ResourceTier::High,
        };
        let msg = violation(&shape, &tiers);
        assert!(msg.contains("essence tags changed"), "{msg}");

        let mut flags = bp.clone();
        flags
            .original_essence
            .core_behavior
            .visual_properties
            .insert("hologram".to_owned(), true);
        let msg = violation(&shape, &flags);
        assert!(msg.contains("essence tags changed"), "{msg}");

        let mut energy = bp;
        energy.original_essence.creative_dna.energy_level = 0.0;
        shape.verify(&energy).unwrap();
    }
}
