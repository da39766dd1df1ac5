use std::collections::BTreeMap;

use crate::{
    essence::EffectEssence,
    foundation::math::{clamp01, round4},
    registry::{ModuleDescriptor, Specialization},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionAlgorithm {
    Harmonic,
    Quantum,
    Creative,
    Technical,
    Hybrid,
}

impl FusionAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Harmonic => "harmonic",
            Self::Quantum => "quantum",
            Self::Creative => "creative",
            Self::Technical => "technical",
            Self::Hybrid => "hybrid",
        }
    }

    /// Algorithms whose modules contribute enhanced properties to the fused output.
    pub fn is_expressive(self) -> bool {
        matches!(self, Self::Creative | Self::Quantum)
    }
}

/// Scored influence of one module over one essence.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModuleFusionProfile {
    pub module_id: String,
    pub specialization: Specialization,
    pub compatibility: f64,
    pub fusion_weight: f64, // 0..1
    pub creative_contribution: BTreeMap<String, f64>,
    pub behavioral_influence: BTreeMap<String, f64>,
    pub technical_enhancement: BTreeMap<String, f64>,
    pub fusion_algorithm: FusionAlgorithm,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AlgorithmInputs {
    pub creative_weight: f64,
    pub technical_weight: f64,
    pub innovation: f64,
}

pub struct AlgorithmRule {
    pub algorithm: FusionAlgorithm,
    pub applies: fn(&AlgorithmInputs) -> bool,
}

/// Evaluated top to bottom; the first rule that applies wins. `Harmonic` is the fallback.
pub const ALGORITHM_RULES: &[AlgorithmRule] = &[
    AlgorithmRule {
        algorithm: FusionAlgorithm::Quantum,
        applies: |i| i.creative_weight > 0.8 && i.technical_weight > 0.8 && i.innovation > 0.5,
    },
    AlgorithmRule {
        algorithm: FusionAlgorithm::Creative,
        applies: |i| i.creative_weight > 0.7 && i.innovation > 0.4,
    },
    AlgorithmRule {
        algorithm: FusionAlgorithm::Technical,
        applies: |i| i.technical_weight > 0.7,
    },
    AlgorithmRule {
        algorithm: FusionAlgorithm::Hybrid,
        applies: |i| i.creative_weight >= 0.5 && i.technical_weight >= 0.5,
    },
];

pub fn select_algorithm(inputs: &AlgorithmInputs) -> FusionAlgorithm {
    ALGORITHM_RULES
        .iter()
        .find(|r| (r.applies)(inputs))
        .map(|r| r.algorithm)
        .unwrap_or(FusionAlgorithm::Harmonic)
}

pub const BASE_COMPATIBILITY: f64 = 0.7;

struct CompatibilityBonus {
    specialization: Specialization,
    bonus: f64,
    applies: fn(&EffectEssence) -> bool,
}

// Every applicable bonus is added.
const COMPATIBILITY_BONUSES: &[CompatibilityBonus] = &[
    CompatibilityBonus {
        specialization: Specialization::Creativity,
        bonus: 0.2,
        applies: |e| e.creative_dna.innovation_index > 0.7,
    },
    CompatibilityBonus {
        specialization: Specialization::Performance,
        bonus: 0.15,
        applies: |e| e.technical_aspects.optimization_potential > 0.6,
    },
    CompatibilityBonus {
        specialization: Specialization::Visual,
        bonus: 0.1,
        applies: |e| e.active_visual_properties().count() >= 2,
    },
    CompatibilityBonus {
        specialization: Specialization::Motion,
        bonus: 0.1,
        applies: |e| !e.core_behavior.movement_patterns.is_empty(),
    },
    CompatibilityBonus {
        specialization: Specialization::Visualization,
        bonus: 0.1,
        applies: |e| e.creative_dna.innovation_index > 0.5,
    },
    CompatibilityBonus {
        specialization: Specialization::Harmony,
        bonus: 0.05,
        applies: |e| e.fusion_compatibility.adaptation_flexibility > 0.5,
    },
];

pub fn compatibility(essence: &EffectEssence, module: &ModuleDescriptor) -> f64 {
    let bonus: f64 = COMPATIBILITY_BONUSES
        .iter()
        .filter(|b| b.specialization == module.specialization && (b.applies)(essence))
        .map(|b| b.bonus)
        .sum();
    clamp01(BASE_COMPATIBILITY + bonus)
}

pub struct CompatibilityAnalyzer;

impl CompatibilityAnalyzer {
    /// Score every module against `essence`, heaviest first. Ties keep input order.
    #[tracing::instrument(skip_all, fields(modules = modules.len()))]
    pub fn analyze(
        essence: &EffectEssence,
        modules: &[&ModuleDescriptor],
    ) -> Vec<ModuleFusionProfile> {
        let mut profiles = modules
            .iter()
            .map(|m| profile(essence, m))
            .collect::<Vec<_>>();
        profiles.sort_by(|a, b| b.fusion_weight.total_cmp(&a.fusion_weight));
        profiles
    }
}

fn profile(essence: &EffectEssence, module: &ModuleDescriptor) -> ModuleFusionProfile {
    let dna = &essence.creative_dna;
    let innovation = dna.innovation_index;
    let optimization = essence.technical_aspects.optimization_potential;
    let flexibility = essence.fusion_compatibility.adaptation_flexibility;
    let cw = module.creative_weight;
    let tw = module.technical_weight;

    let compat = compatibility(essence, module);
    let weight = round4(clamp01(
        compat * 0.5 + cw * innovation * 0.3 + tw * optimization * 0.2,
    ));

    let map = |entries: [(&str, f64); 2]| {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), round4(v)))
            .collect::<BTreeMap<_, _>>()
    };

    let mut creative_contribution = map([
        ("aesthetic", cw * weight),
        ("innovation", cw * innovation),
    ]);
    creative_contribution.insert("energy".to_owned(), round4(cw * dna.energy_level));

    ModuleFusionProfile {
        module_id: module.id.clone(),
        specialization: module.specialization,
        compatibility: round4(compat),
        fusion_weight: weight,
        creative_contribution,
        behavioral_influence: map([
            ("movement", weight * flexibility),
            ("rhythm", weight * dna.energy_level),
        ]),
        technical_enhancement: map([
            ("performance", tw * optimization),
            ("efficiency", tw * weight),
        ]),
        fusion_algorithm: select_algorithm(&AlgorithmInputs {
            creative_weight: cw,
            technical_weight: tw,
            innovation,
        }),
    }
}
