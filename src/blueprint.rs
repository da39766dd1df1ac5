use crate::{
    compat::ModuleFusionProfile,
    essence::EffectEssence,
    policy::{LevelPolicy, Strategy},
};

/// Caller adjustments to the projected transformation. All default to 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FusionOptions {
    pub creativity_boost: f64,
    pub performance_priority: f64,
    pub innovation_level: f64,
}

/// Projected outcome of a fusion, in percentage-like units. Unbounded until moderated.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExpectedTransformation {
    pub visual_enhancement: f64,
    pub performance_gain: f64,
    pub creative_evolution: f64,
    pub behavioral_complexity: f64,
}

impl ExpectedTransformation {
    pub fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("visual_enhancement", self.visual_enhancement),
            ("performance_gain", self.performance_gain),
            ("creative_evolution", self.creative_evolution),
            ("behavioral_complexity", self.behavioral_complexity),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusionBlueprint {
    pub original_essence: EffectEssence,
    pub active_modules: Vec<ModuleFusionProfile>, // heaviest first
    pub strategy: Strategy,
    pub reconstruction_level: u8,
    pub fusion_intensity: f64,
    pub expected_transformation: ExpectedTransformation,
}

impl FusionBlueprint {
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.active_modules.iter().map(|p| p.module_id.as_str())
    }
}

pub struct BlueprintBuilder;

impl BlueprintBuilder {
    #[tracing::instrument(skip_all, fields(level = policy.level, modules = profiles.len()))]
    pub fn build(
        essence: EffectEssence,
        profiles: Vec<ModuleFusionProfile>,
        policy: &LevelPolicy,
        options: &FusionOptions,
    ) -> FusionBlueprint {
        FusionBlueprint {
            original_essence: essence,
            active_modules: profiles,
            strategy: policy.strategy,
            reconstruction_level: policy.level,
            fusion_intensity: policy.fusion_intensity,
            expected_transformation: project(policy, options),
        }
    }
}

/// Linear projections of policy coefficients and caller options. No clamping.
pub fn project(policy: &LevelPolicy, options: &FusionOptions) -> ExpectedTransformation {
    ExpectedTransformation {
        visual_enhancement: policy.creativity_factor * 100.0 + options.creativity_boost,
        performance_gain: policy.technical_focus * 100.0 + options.performance_priority,
        creative_evolution: policy.fusion_intensity * 100.0 + options.innovation_level,
        behavioral_complexity: (policy.fusion_intensity + policy.creativity_factor) * 50.0
            + (options.creativity_boost + options.innovation_level) / 2.0,
    }
}
