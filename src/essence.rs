//! Essence extraction: pattern heuristics over raw effect source text.
//!
//! The extractor never parses. Every detector is an independent keyword table and the whole
//! extraction is total: text that matches nothing yields the baseline essence.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use regex::Regex;

use crate::foundation::math::{clamp, clamp01, round4};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AnimationType {
    #[serde(rename = "particle_system")]
    ParticleSystem,
    #[serde(rename = "3d_transformation")]
    Transformation3d,
    #[serde(rename = "text_animation")]
    TextAnimation,
    #[serde(rename = "transition_effect")]
    TransitionEffect,
    #[serde(rename = "custom_animation")]
    CustomAnimation,
}

impl AnimationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParticleSystem => "particle_system",
            Self::Transformation3d => "3d_transformation",
            Self::TextAnimation => "text_animation",
            Self::TransitionEffect => "transition_effect",
            Self::CustomAnimation => "custom_animation",
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MovementPattern {
    Linear,
    Circular,
    Oscillating,
    Random,
    Easing,
    PhysicsBased,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AestheticSignature {
    Luminous,
    Organic,
    Chromatic,
    Geometric,
    Minimalist,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalImpact {
    Exhilarating,
    Engaging,
    Calming,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceTier {
    Low,
    Medium,
    High,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CompatTag {
    Canvas2d,
    Webgl,
    Css,
    Svg,
    Dom,
    WebAnimations,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EffectEssence {
    pub core_behavior: CoreBehavior,
    pub creative_dna: CreativeDna,
    pub technical_aspects: TechnicalAspects,
    pub fusion_compatibility: FusionCompatibility,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CoreBehavior {
    pub animation_type: AnimationType,
    pub movement_patterns: BTreeSet<MovementPattern>,
    pub visual_properties: BTreeMap<String, bool>,
    pub mathematical_foundation: BTreeMap<String, bool>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CreativeDna {
    pub energy_level: f64,      // 0..1
    pub complexity_factor: f64, // 0..1
    pub innovation_index: f64,  // 0..1
    pub aesthetic_signature: AestheticSignature,
    pub emotional_impact: EmotionalImpact,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TechnicalAspects {
    pub performance: PerformanceProfile,
    pub compatibility: BTreeSet<CompatTag>,
    pub optimization_potential: f64, // 0..1
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PerformanceProfile {
    pub estimated_fps: f64, // 30..120
    pub memory_tier: ResourceTier,
    pub cpu_tier: ResourceTier,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FusionCompatibility {
    pub adaptation_flexibility: f64,  // 0..1
    pub enhancement_receptivity: f64, // 0..1
}

pub const ENERGY_BASELINE: f64 = 0.5;
pub const COMPLEXITY_BASELINE: f64 = 0.0;
pub const INNOVATION_BASELINE: f64 = 0.3;
pub const OPTIMIZATION_BASELINE: f64 = 0.3;
pub const FPS_BASELINE: f64 = 60.0;
pub const FPS_MIN: f64 = 30.0;
pub const FPS_MAX: f64 = 120.0;

/// Sources longer than this count as structurally complex on size alone.
const LONG_SOURCE_BYTES: usize = 2000;

fn compile<T: Copy>(rules: &[(&str, T)]) -> Vec<(Regex, T)> {
    rules
        .iter()
        .map(|&(p, v)| (Regex::new(p).expect("static essence pattern"), v))
        .collect()
}

// First match wins; order is significant.
static ANIMATION_RULES: LazyLock<Vec<(Regex, AnimationType)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)particle|emitter|spawn", AnimationType::ParticleSystem),
        (
            r"(?i)three\.|webgl|perspective|rotate[xyz]\b|\b3d\b|translate3d|\bmesh\b|camera",
            AnimationType::Transformation3d,
        ),
        (
            r"(?i)filltext|\bfont\b|letter|typewriter|glyph|\btext\b",
            AnimationType::TextAnimation,
        ),
        (
            r"(?i)transition|fade|slide|morph",
            AnimationType::TransitionEffect,
        ),
    ])
});

static MOVEMENT_RULES: LazyLock<Vec<(Regex, MovementPattern)>> = LazyLock::new(|| {
    compile(&[
        (
            r"(?i)translate|linear|moveto|lineto|\b[xy]\s*\+=",
            MovementPattern::Linear,
        ),
        (
            r"(?i)rotat|orbit|\bangle\b|radius",
            MovementPattern::Circular,
        ),
        (
            r"(?i)math\.(sin|cos)\b|wave|oscillat|pulse",
            MovementPattern::Oscillating,
        ),
        (
            r"(?i)math\.random|noise|jitter|chaos",
            MovementPattern::Random,
        ),
        (
            r"(?i)\bease|cubic-bezier|tween|lerp",
            MovementPattern::Easing,
        ),
        (
            r"(?i)gravity|velocity|friction|acceleration|\bv[xy]\b",
            MovementPattern::PhysicsBased,
        ),
    ])
});

static VISUAL_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (
            r"(?i)color|fillstyle|strokestyle|rgba?\(|hsla?\(|#[0-9a-f]{3,8}\b",
            "color",
        ),
        (r"(?i)opacity|globalalpha|alpha", "opacity"),
        (r"(?i)scale", "scale"),
        (r"(?i)rotat", "rotation"),
        (r"(?i)blur|filter", "blur"),
        (r"(?i)glow|shadowblur|shadowcolor|bloom", "glow"),
        (r"(?i)gradient", "gradient"),
    ])
});

static MATH_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    compile(&[
        (r"Math\.(sin|cos|tan|atan2?)\b", "trigonometry"),
        (r"(?i)math\.random|noise", "randomness"),
        (r"(?i)lerp|\bmix\(|interpolat|smoothstep", "interpolation"),
        (r"(?i)velocity|gravity|acceleration|friction", "physics"),
        (
            r"(?i)matrix|\bmat[34]\b|\bvec[234]\b|\bdot\(|\bcross\(",
            "linear_algebra",
        ),
        (r"Math\.(exp|pow|sqrt|log)\b", "exponential"),
    ])
});

static ENERGY_DELTAS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)fast|rapid|explo|burst|intense", 0.2),
        (r"(?i)bounce|shake|pulse|flash", 0.1),
        (r"requestAnimationFrame", 0.1),
        (r"(?i)slow|gentle|calm|subtle|soft", -0.2),
    ])
});

static COMPLEXITY_DELTAS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    compile(&[
        (r"\b(for|while)\s*\(|\.forEach\(|\.map\(", 0.2),
        (r"Math\.\w+", 0.2),
        (r"\bclass\s+\w+|prototype", 0.2),
        (r"(?i)shader|glsl|webgl", 0.2),
        (r"(?i)recurs|fractal", 0.1),
    ])
});

static INNOVATION_DELTAS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)shader|glsl|webgl", 0.2),
        (r"(?i)noise|perlin|simplex|fractal", 0.2),
        (r"(?i)particle", 0.1),
        (r"(?i)gravity|velocity|physics", 0.1),
        (r"(?i)audio|fft|frequency", 0.1),
    ])
});

static OPTIMIZATION_DELTAS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    compile(&[
        (r"setInterval|setTimeout", 0.2),
        (r"getImageData|putImageData", 0.2),
        (r"shadowBlur", 0.1),
        (r"querySelector|getElementById", 0.1),
        (r"requestAnimationFrame", -0.1),
    ])
});

static FPS_DELTAS: LazyLock<Vec<(Regex, f64)>> = LazyLock::new(|| {
    compile(&[
        (r"(?i)shadowblur|filter\s*[:=]|blur\(", -15.0),
        (r"getImageData|putImageData", -10.0),
        (r"\bfor\s*\([^)]*\)\s*\{[^}]*\bfor\s*\(", -10.0),
        (r"setInterval|setTimeout", -5.0),
        (r"requestAnimationFrame", 10.0),
        (r"(?i)translate3d|will-change|transform\s*:", 10.0),
    ])
});

static AESTHETIC_RULES: LazyLock<Vec<(Regex, AestheticSignature)>> = LazyLock::new(|| {
    compile(&[
        (
            r"(?i)glow|neon|bloom|shadowblur",
            AestheticSignature::Luminous,
        ),
        (r"(?i)noise|wave|flow|organic", AestheticSignature::Organic),
        (
            r"(?i)gradient|\bhue\b|rainbow|hsl",
            AestheticSignature::Chromatic,
        ),
        (
            r"(?i)grid|polygon|rect|triangle|square",
            AestheticSignature::Geometric,
        ),
    ])
});

static COMPAT_RULES: LazyLock<Vec<(Regex, CompatTag)>> = LazyLock::new(|| {
    compile(&[
        (
            r#"getContext\(\s*['"]2d|CanvasRenderingContext2D|\bctx\."#,
            CompatTag::Canvas2d,
        ),
        (r"(?i)webgl|three\.", CompatTag::Webgl),
        (
            r"(?i)@keyframes|\.style\.|transition\s*:|animation\s*:",
            CompatTag::Css,
        ),
        (r"(?i)<svg|createElementNS|\bsvg\b", CompatTag::Svg),
        (r"document\.|querySelector|getElementById", CompatTag::Dom),
        (r"\.animate\(", CompatTag::WebAnimations),
    ])
});

static MEMORY_HIGH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Float32Array|Uint8ClampedArray|ImageData|createBuffer|new Array\(\s*\d{4,}")
        .expect("static essence pattern")
});

static MEMORY_MEDIUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.push\(|new Array|\[\s*\]").expect("static essence pattern")
});

fn first_match<T: Copy>(rules: &[(Regex, T)], text: &str) -> Option<T> {
    rules.iter().find(|(re, _)| re.is_match(text)).map(|&(_, v)| v)
}

fn all_matches<T: Copy>(rules: &[(Regex, T)], text: &str) -> Vec<T> {
    rules
        .iter()
        .filter(|(re, _)| re.is_match(text))
        .map(|&(_, v)| v)
        .collect()
}

fn flag_map(rules: &[(Regex, &'static str)], text: &str) -> BTreeMap<String, bool> {
    rules
        .iter()
        .map(|(re, name)| ((*name).to_owned(), re.is_match(text)))
        .collect()
}

fn accumulate(baseline: f64, deltas: &[(Regex, f64)], text: &str) -> f64 {
    all_matches(deltas, text)
        .into_iter()
        .fold(baseline, |acc, d| acc + d)
}

fn score(v: f64) -> f64 {
    round4(clamp01(v))
}

pub struct EssenceExtractor;

impl EssenceExtractor {
    /// Derive an essence record from raw source text. Never fails.
    #[tracing::instrument(skip(source), fields(len = source.len()))]
    pub fn extract(source: &str) -> EffectEssence {
        let core_behavior = CoreBehavior {
            animation_type: detect_animation_type(source),
            movement_patterns: all_matches(&MOVEMENT_RULES, source)
                .into_iter()
                .collect(),
            visual_properties: flag_map(&VISUAL_RULES, source),
            mathematical_foundation: flag_map(&MATH_RULES, source),
        };

        let energy_level = score(accumulate(ENERGY_BASELINE, &ENERGY_DELTAS, source));
        let mut complexity = accumulate(COMPLEXITY_BASELINE, &COMPLEXITY_DELTAS, source);
        if source.len() > LONG_SOURCE_BYTES {
            complexity += 0.1;
        }
        let complexity_factor = score(complexity);
        let innovation_index = score(accumulate(INNOVATION_BASELINE, &INNOVATION_DELTAS, source));

        let creative_dna = CreativeDna {
            energy_level,
            complexity_factor,
            innovation_index,
            aesthetic_signature: first_match(&AESTHETIC_RULES, source)
                .unwrap_or(AestheticSignature::Minimalist),
            emotional_impact: emotional_impact(energy_level),
        };

        let optimization_potential =
            score(accumulate(OPTIMIZATION_BASELINE, &OPTIMIZATION_DELTAS, source));
        let technical_aspects = TechnicalAspects {
            performance: PerformanceProfile {
                estimated_fps: clamp(
                    accumulate(FPS_BASELINE, &FPS_DELTAS, source),
                    FPS_MIN,
                    FPS_MAX,
                ),
                memory_tier: memory_tier(source),
                cpu_tier: cpu_tier(complexity_factor),
            },
            compatibility: all_matches(&COMPAT_RULES, source).into_iter().collect(),
            optimization_potential,
        };

        let pattern_count = core_behavior.movement_patterns.len() as f64;
        let fusion_compatibility = FusionCompatibility {
            adaptation_flexibility: score(
                0.4 + 0.08 * pattern_count + (1.0 - complexity_factor) * 0.3,
            ),
            enhancement_receptivity: score(
                0.3 + optimization_potential * 0.4 + innovation_index * 0.3,
            ),
        };

        let essence = EffectEssence {
            core_behavior,
            creative_dna,
            technical_aspects,
            fusion_compatibility,
        };
        tracing::debug!(
            animation_type = essence.core_behavior.animation_type.as_str(),
            energy = essence.creative_dna.energy_level,
            innovation = essence.creative_dna.innovation_index,
            "essence extracted"
        );
        essence
    }
}

pub fn detect_animation_type(source: &str) -> AnimationType {
    first_match(&ANIMATION_RULES, source).unwrap_or(AnimationType::CustomAnimation)
}

fn emotional_impact(energy: f64) -> EmotionalImpact {
    if energy > 0.7 {
        EmotionalImpact::Exhilarating
    } else if energy >= 0.5 {
        EmotionalImpact::Engaging
    } else {
        EmotionalImpact::Calming
    }
}

fn memory_tier(source: &str) -> ResourceTier {
    if MEMORY_HIGH.is_match(source) {
        ResourceTier::High
    } else if MEMORY_MEDIUM.is_match(source) {
        ResourceTier::Medium
    } else {
        ResourceTier::Low
    }
}

fn cpu_tier(complexity: f64) -> ResourceTier {
    if complexity >= 0.6 {
        ResourceTier::High
    } else if complexity >= 0.3 {
        ResourceTier::Medium
    } else {
        ResourceTier::Low
    }
}

impl EffectEssence {
    /// Every numeric field that must lie in `[0, 1]`, by name.
    pub fn unit_scores(&self) -> [(&'static str, f64); 6] {
        [
            ("energy_level", self.creative_dna.energy_level),
            ("complexity_factor", self.creative_dna.complexity_factor),
            ("innovation_index", self.creative_dna.innovation_index),
            (
                "optimization_potential",
                self.technical_aspects.optimization_potential,
            ),
            (
                "adaptation_flexibility",
                self.fusion_compatibility.adaptation_flexibility,
            ),
            (
                "enhancement_receptivity",
                self.fusion_compatibility.enhancement_receptivity,
            ),
        ]
    }

    pub fn active_visual_properties(&self) -> impl Iterator<Item = &str> {
        self.core_behavior
            .visual_properties
            .iter()
            .filter(|(_, on)| **on)
            .map(|(k, _)| k.as_str())
    }

    pub fn active_math_foundations(&self) -> impl Iterator<Item = &str> {
        self.core_behavior
            .mathematical_foundation
            .iter()
            .filter(|(_, on)| **on)
            .map(|(k, _)| k.as_str())
    }
}
