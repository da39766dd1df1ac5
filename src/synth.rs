use std::collections::BTreeMap;

use crate::{
    blueprint::FusionBlueprint,
    compat::{FusionAlgorithm, ModuleFusionProfile},
    essence::EffectEssence,
    foundation::math::{clamp01, round4},
    policy::Strategy,
    registry::Specialization,
};

pub const REVOLUTIONARY_INNOVATION_CAP: f64 = 0.9;
pub const DEFAULT_INNOVATION_CAP: f64 = 0.7;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnhancedProperty {
    pub algorithm: FusionAlgorithm,
    pub intensity: f64,
    pub aesthetic: f64,
    pub innovation: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModuleIntegration {
    pub rank: usize, // position in the blueprint, 0 = heaviest
    pub specialization: Specialization,
    pub algorithm: FusionAlgorithm,
    pub weight: f64,
    pub behavioral: BTreeMap<String, f64>,
    pub technical: BTreeMap<String, f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EvolutionMetrics {
    pub aesthetic_evolution: f64,
    pub behavioral_sophistication: f64,
    pub innovation_breakthrough: f64,
    pub fusion_harmony: f64,
    pub fusion_coherence: f64,
}

impl EvolutionMetrics {
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("aesthetic_evolution", self.aesthetic_evolution),
            ("behavioral_sophistication", self.behavioral_sophistication),
            ("innovation_breakthrough", self.innovation_breakthrough),
            ("fusion_harmony", self.fusion_harmony),
            ("fusion_coherence", self.fusion_coherence),
        ]
    }
}

/// Aggregated enhancement data for a blueprint. Carries no code.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusedEssence {
    pub original_essence: EffectEssence,
    pub strategy: Strategy,
    pub reconstruction_level: u8,
    pub fusion_intensity: f64,
    pub enhanced_properties: BTreeMap<String, EnhancedProperty>,
    pub module_integrations: BTreeMap<String, ModuleIntegration>,
    pub evolution: EvolutionMetrics,
}

pub struct FusionSynthesizer;

impl FusionSynthesizer {
    #[tracing::instrument(skip_all, fields(strategy = blueprint.strategy.as_str()))]
    pub fn synthesize(blueprint: &FusionBlueprint) -> FusedEssence {
        let mut enhanced_properties = BTreeMap::new();
        let mut module_integrations = BTreeMap::new();

        for (rank, p) in blueprint.active_modules.iter().enumerate() {
            if p.fusion_algorithm.is_expressive() {
                enhanced_properties.insert(
                    p.module_id.clone(),
                    EnhancedProperty {
                        algorithm: p.fusion_algorithm,
                        intensity: round4(clamp01(p.fusion_weight * blueprint.fusion_intensity)),
                        aesthetic: entry(&p.creative_contribution, "aesthetic"),
                        innovation: entry(&p.creative_contribution, "innovation"),
                    },
                );
            }
            module_integrations.insert(
                p.module_id.clone(),
                ModuleIntegration {
                    rank,
                    specialization: p.specialization,
                    algorithm: p.fusion_algorithm,
                    weight: p.fusion_weight,
                    behavioral: p.behavioral_influence.clone(),
                    technical: p.technical_enhancement.clone(),
                },
            );
        }

        let evolution = evolution_metrics(blueprint);
        tracing::debug!(
            enhanced = enhanced_properties.len(),
            integrated = module_integrations.len(),
            innovation = evolution.innovation_breakthrough,
            "fused essence synthesized"
        );

        FusedEssence {
            original_essence: blueprint.original_essence.clone(),
            strategy: blueprint.strategy,
            reconstruction_level: blueprint.reconstruction_level,
            fusion_intensity: blueprint.fusion_intensity,
            enhanced_properties,
            module_integrations,
            evolution,
        }
    }
}

fn entry(map: &BTreeMap<String, f64>, key: &str) -> f64 {
    map.get(key).copied().unwrap_or(0.0)
}

/// Mean of `f` over the profiles, weighted by fusion weight. 0 when all weights are 0.
fn weighted_mean(
    profiles: &[ModuleFusionProfile],
    f: impl Fn(&ModuleFusionProfile) -> f64,
) -> f64 {
    let total: f64 = profiles.iter().map(|p| p.fusion_weight).sum();
    if total <= 0.0 {
        return 0.0;
    }
    profiles.iter().map(|p| p.fusion_weight * f(p)).sum::<f64>() / total
}

pub fn innovation_cap(strategy: Strategy) -> f64 {
    match strategy {
        Strategy::Revolutionary => REVOLUTIONARY_INNOVATION_CAP,
        _ => DEFAULT_INNOVATION_CAP,
    }
}

fn evolution_metrics(bp: &FusionBlueprint) -> EvolutionMetrics {
    let profiles = &bp.active_modules;
    let intensity = clamp01(bp.fusion_intensity);

    let aesthetic = weighted_mean(profiles, |p| entry(&p.creative_contribution, "aesthetic"));
    let movement = weighted_mean(profiles, |p| entry(&p.behavioral_influence, "movement"));
    let rhythm = weighted_mean(profiles, |p| entry(&p.behavioral_influence, "rhythm"));

    let creative_evolution = bp.expected_transformation.creative_evolution / 100.0;
    let innovation_breakthrough = creative_evolution.min(innovation_cap(bp.strategy));

    let (harmony, coherence) = if profiles.is_empty() {
        (0.5, 0.5)
    } else {
        let n = profiles.len() as f64;
        let mean_w = profiles.iter().map(|p| p.fusion_weight).sum::<f64>() / n;
        let var = profiles
            .iter()
            .map(|p| (p.fusion_weight - mean_w).powi(2))
            .sum::<f64>()
            / n;
        let spread = profiles
            .iter()
            .map(|p| p.fusion_weight)
            .fold(f64::NEG_INFINITY, f64::max)
            - profiles
                .iter()
                .map(|p| p.fusion_weight)
                .fold(f64::INFINITY, f64::min);
        let mean_compat = profiles.iter().map(|p| p.compatibility).sum::<f64>() / n;
        (
            1.0 - var.sqrt() * 2.0,
            0.4 + mean_compat * 0.6 - spread * 0.5,
        )
    };

    EvolutionMetrics {
        aesthetic_evolution: round4(clamp01(0.3 + aesthetic * 0.6 * (0.5 + intensity / 2.0))),
        behavioral_sophistication: round4(clamp01(0.2 + movement * 0.5 + rhythm * 0.3)),
        innovation_breakthrough: round4(clamp01(innovation_breakthrough)),
        fusion_harmony: round4(clamp01(harmony)),
        fusion_coherence: round4(clamp01(coherence)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        blueprint::{BlueprintBuilder, FusionOptions},
        compat::CompatibilityAnalyzer,
        essence::EssenceExtractor,
        policy::LevelPolicyTable,
        registry::ModuleRegistry,
    };

    fn blueprint(src: &str, level: u8, options: FusionOptions) -> FusionBlueprint {
        let reg = ModuleRegistry::builtin();
        let table = LevelPolicyTable::reference();
        let policy = table.get(level).unwrap();
        let essence = EssenceExtractor::extract(src);
        let profiles = CompatibilityAnalyzer::analyze(&essence, &reg.select_modules(level));
        BlueprintBuilder::build(essence, profiles, policy, &options)
    }

    #[test]
    fn every_module_is_integrated_and_only_expressive_ones_enhance() {
        let bp = blueprint("particle shader noise", 3, FusionOptions::default());
        let fused = FusionSynthesizer::synthesize(&bp);
        assert_eq!(fused.module_integrations.len(), bp.active_modules.len());
        for p in &bp.active_modules {
            assert_eq!(
                fused.enhanced_properties.contains_key(&p.module_id),
                p.fusion_algorithm.is_expressive(),
                "{}",
                p.module_id
            );
        }
        assert!(!fused.enhanced_properties.is_empty());
        assert_eq!(fused.module_integrations[&bp.active_modules[0].module_id].rank, 0);
    }

    #[test]
    fn revolutionary_caps_innovation_at_point_nine() {
        let bp = blueprint("", 3, FusionOptions::default());
        let fused = FusionSynthesizer::synthesize(&bp);
        assert_eq!(fused.evolution.innovation_breakthrough, 0.9);

        let bp = blueprint(
            "",
            3,
            FusionOptions {
                innovation_level: -40.0,
                ..Default::default()
            },
        );
        assert_eq!(FusionSynthesizer::synthesize(&bp).evolution.innovation_breakthrough, 0.5);
    }

    #[test]
    fn other_strategies_cap_at_point_seven() {
        let bp = blueprint(
            "",
            2,
            FusionOptions {
                innovation_level: 30.0,
                ..Default::default()
            },
        );
        assert_eq!(bp.strategy, Strategy::Balanced);
        assert_eq!(FusionSynthesizer::synthesize(&bp).evolution.innovation_breakthrough, 0.7);

        let bp = blueprint("", 1, FusionOptions::default());
        assert_eq!(FusionSynthesizer::synthesize(&bp).evolution.innovation_breakthrough, 0.3);
    }

    #[test]
    fn metrics_stay_bounded_for_wild_options() {
        for opts in [
            FusionOptions {
                creativity_boost: 1e6,
                performance_priority: -1e6,
                innovation_level: 1e6,
            },
            FusionOptions {
                creativity_boost: -1e6,
                performance_priority: 1e6,
                innovation_level: -1e6,
            },
        ] {
            for level in 1..=3 {
                let fused =
                    FusionSynthesizer::synthesize(&blueprint("fast wave glow", level, opts));
                for (name, v) in fused.evolution.fields() {
                    assert!((0.0..=1.0).contains(&v), "{name} = {v}");
                }
            }
        }
    }

    #[test]
    fn empty_module_list_uses_neutral_harmony() {
        let mut bp = blueprint("", 1, FusionOptions::default());
        bp.active_modules.clear();
        let fused = FusionSynthesizer::synthesize(&bp);
        assert_eq!(fused.evolution.fusion_harmony, 0.5);
        assert_eq!(fused.evolution.fusion_coherence, 0.5);
        assert!(fused.module_integrations.is_empty());
    }
}
