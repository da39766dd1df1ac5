use std::fmt::Write as _;

use crate::{
    blueprint::FusionBlueprint,
    compat::FusionAlgorithm,
    essence::EffectEssence,
    foundation::math::{fingerprint_str, round4},
    policy::Strategy,
    reconstruct::Reconstruction,
    registry::Specialization,
    synth::{EvolutionMetrics, FusedEssence},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModuleContribution {
    pub module_id: String,
    pub specialization: Specialization,
    pub algorithm: FusionAlgorithm,
    pub fusion_weight: f64,
    pub summary: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnhancementMetrics {
    pub generated_bytes: usize,
    pub compressed_bytes: usize,
    pub compression_ratio: f64,
    pub module_count: usize,
    pub average_fusion_weight: f64,
    pub visual_enhancement: f64,
    pub performance_gain: f64,
    pub creative_evolution: f64,
    pub behavioral_complexity: f64,
    /// FNV-1a digest of the final code, hex encoded.
    pub output_fingerprint: String,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformationReport {
    pub strategy: Strategy,
    pub reconstruction_level: u8,
    pub original_characteristics: Vec<String>,
    pub module_contributions: Vec<ModuleContribution>,
    pub innovations: Vec<String>,
    pub metrics: EnhancementMetrics,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CreativeEvolutionSummary {
    pub strategy: Strategy,
    pub metrics: EvolutionMetrics,
    pub headline: String,
}

pub struct ReportGenerator;

impl ReportGenerator {
    /// Describe a finished fusion. Pure: no I/O, no clock.
    pub fn generate(
        original: &EffectEssence,
        blueprint: &FusionBlueprint,
        output: &Reconstruction,
    ) -> TransformationReport {
        let x = &blueprint.expected_transformation;
        let module_count = blueprint.active_modules.len();
        let average_fusion_weight = if module_count == 0 {
            0.0
        } else {
            round4(
                blueprint
                    .active_modules
                    .iter()
                    .map(|p| p.fusion_weight)
                    .sum::<f64>()
                    / module_count as f64,
            )
        };

        TransformationReport {
            strategy: blueprint.strategy,
            reconstruction_level: blueprint.reconstruction_level,
            original_characteristics: characteristics(original),
            module_contributions: blueprint
                .active_modules
                .iter()
                .map(|p| ModuleContribution {
                    module_id: p.module_id.clone(),
                    specialization: p.specialization,
                    algorithm: p.fusion_algorithm,
                    fusion_weight: p.fusion_weight,
                    summary: format!(
                        "{} module fused via {} at weight {:.2}",
                        p.specialization.as_str(),
                        p.fusion_algorithm.as_str(),
                        p.fusion_weight
                    ),
                })
                .collect(),
            innovations: innovations(original, blueprint),
            metrics: EnhancementMetrics {
                generated_bytes: output.generated.len(),
                compressed_bytes: output.code.len(),
                compression_ratio: round4(output.stats.ratio()),
                module_count,
                average_fusion_weight,
                visual_enhancement: x.visual_enhancement,
                performance_gain: x.performance_gain,
                creative_evolution: x.creative_evolution,
                behavioral_complexity: x.behavioral_complexity,
                output_fingerprint: format!("{:016x}", fingerprint_str(&output.code)),
            },
        }
    }

    pub fn summarize_evolution(fused: &FusedEssence) -> CreativeEvolutionSummary {
        let m = fused.evolution;
        let (name, peak) = m
            .fields()
            .into_iter()
            .fold(("", f64::NEG_INFINITY), |best, (k, v)| {
                if v > best.1 { (k, v) } else { best }
            });
        CreativeEvolutionSummary {
            strategy: fused.strategy,
            metrics: m,
            headline: format!(
                "{} fusion of {} module(s); strongest gain in {} ({:.2})",
                fused.strategy.as_str(),
                fused.module_integrations.len(),
                name.replace('_', " "),
                peak
            ),
        }
    }
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a str>) -> String {
    let v = items.collect::<Vec<_>>();
    if v.is_empty() {
        "none detected".to_owned()
    } else {
        v.join(", ")
    }
}

fn characteristics(e: &EffectEssence) -> Vec<String> {
    let core = &e.core_behavior;
    let dna = &e.creative_dna;
    let perf = &e.technical_aspects.performance;
    let movement = core
        .movement_patterns
        .iter()
        .map(|m| serde_plain_name(m))
        .collect::<Vec<_>>();
    let compat = e
        .technical_aspects
        .compatibility
        .iter()
        .map(|c| serde_plain_name(c))
        .collect::<Vec<_>>();

    vec![
        format!("animation type: {}", core.animation_type.as_str()),
        format!(
            "movement patterns: {}",
            join_or_none(movement.iter().map(String::as_str))
        ),
        format!(
            "visual properties: {}",
            join_or_none(e.active_visual_properties())
        ),
        format!(
            "mathematical foundation: {}",
            join_or_none(e.active_math_foundations())
        ),
        format!(
            "creative dna: energy {:.2}, complexity {:.2}, innovation {:.2}",
            dna.energy_level, dna.complexity_factor, dna.innovation_index
        ),
        format!(
            "aesthetic: {}, emotional impact: {}",
            serde_plain_name(&dna.aesthetic_signature),
            serde_plain_name(&dna.emotional_impact)
        ),
        format!(
            "performance: ~{:.0} fps, memory {}, cpu {}",
            perf.estimated_fps,
            serde_plain_name(&perf.memory_tier),
            serde_plain_name(&perf.cpu_tier)
        ),
        format!(
            "platform: {}",
            join_or_none(compat.iter().map(String::as_str))
        ),
    ]
}

/// The serialized name of a unit enum variant.
fn serde_plain_name<T: serde::Serialize>(v: &T) -> String {
    match serde_json::to_value(v) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::from("unknown"),
    }
}

fn innovations(original: &EffectEssence, bp: &FusionBlueprint) -> Vec<String> {
    let mut out = Vec::new();
    for p in &bp.active_modules {
        match p.fusion_algorithm {
            FusionAlgorithm::Quantum => out.push(format!(
                "{}: quantum fusion reshapes the {} core",
                p.module_id,
                original.core_behavior.animation_type.as_str()
            )),
            FusionAlgorithm::Creative => out.push(format!(
                "{}: creative enhancement at weight {:.2}",
                p.module_id, p.fusion_weight
            )),
            _ => {}
        }
    }
    if bp.strategy == Strategy::Revolutionary {
        out.push("revolutionary restructuring of the original behaviour".to_owned());
    }
    if bp.expected_transformation.creative_evolution >= 80.0 {
        out.push(format!(
            "high creative evolution projected ({:.0}%)",
            bp.expected_transformation.creative_evolution
        ));
    }
    out
}

impl TransformationReport {
    /// Human-readable rendering of the report.
    pub fn render_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(
            s,
            "Fusion report: {} strategy, level {}",
            self.strategy.as_str(),
            self.reconstruction_level
        );
        let _ = writeln!(s, "\nOriginal characteristics:");
        for c in &self.original_characteristics {
            let _ = writeln!(s, "  - {c}");
        }
        let _ = writeln!(s, "\nModule contributions:");
        for m in &self.module_contributions {
            let _ = writeln!(s, "  - {}: {}", m.module_id, m.summary);
        }
        let _ = writeln!(s, "\nInnovations:");
        if self.innovations.is_empty() {
            let _ = writeln!(s, "  (none)");
        }
        for i in &self.innovations {
            let _ = writeln!(s, "  - {i}");
        }
        let m = &self.metrics;
        let _ = writeln!(s, "\nMetrics:");
        let _ = writeln!(
            s,
            "  code: {} -> {} bytes (ratio {:.3}), fingerprint {}",
            m.generated_bytes, m.compressed_bytes, m.compression_ratio, m.output_fingerprint
        );
        let _ = writeln!(
            s,
            "  modules: {} (average weight {:.3})",
            m.module_count, m.average_fusion_weight
        );
        let _ = writeln!(
            s,
            "  projected: visual {:.1}, performance {:.1}, creative {:.1}, behavioral {:.1}",
            m.visual_enhancement, m.performance_gain, m.creative_evolution, m.behavioral_complexity
        );
        s
    }
}
