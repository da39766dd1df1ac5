use crate::{
    essence::AnimationType,
    foundation::error::{FuseError, FuseResult},
    registry::Specialization,
    synth::FusedEssence,
};

/// Indentation-aware line writer for the JavaScript template.
struct Emitter {
    out: String,
    depth: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            out: String::with_capacity(8 * 1024),
            depth: 0,
        }
    }

    fn line(&mut self, s: &str) {
        if s.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
    }

    fn lines(&mut self, block: &[&str]) {
        for l in block {
            self.line(l);
        }
    }

    fn open(&mut self, s: &str) {
        self.line(s);
        self.depth += 1;
    }

    fn close(&mut self, s: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(s);
    }

    fn finish(self) -> String {
        self.out
    }
}

fn to_json<T: serde::Serialize>(what: &str, v: &T) -> FuseResult<String> {
    serde_json::to_string(v)
        .map_err(|e| FuseError::reconstruction(format!("serialize {what}: {e}")))
}

/// Name of the first non-finite number in the fused essence, if any. JSON has no encoding for
/// NaN or infinities, so such input cannot be rendered faithfully.
fn first_non_finite(f: &FusedEssence) -> Option<String> {
    let essence = &f.original_essence;
    let mut scalars = essence
        .unit_scores()
        .iter()
        .map(|(k, v)| ((*k).to_owned(), *v))
        .collect::<Vec<_>>();
    scalars.push((
        "estimated_fps".to_owned(),
        essence.technical_aspects.performance.estimated_fps,
    ));
    scalars.push(("fusion_intensity".to_owned(), f.fusion_intensity));
    scalars.extend(f.evolution.fields().iter().map(|(k, v)| ((*k).to_owned(), *v)));
    for (id, p) in &f.enhanced_properties {
        scalars.push((format!("{id}.intensity"), p.intensity));
        scalars.push((format!("{id}.aesthetic"), p.aesthetic));
        scalars.push((format!("{id}.innovation"), p.innovation));
    }
    for (id, m) in &f.module_integrations {
        scalars.push((format!("{id}.weight"), m.weight));
        for (k, v) in m.behavioral.iter().chain(&m.technical) {
            scalars.push((format!("{id}.{k}"), *v));
        }
    }
    scalars
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(k, _)| k)
}

/// Render the fused essence as a self-contained JavaScript effect class.
pub fn generate(fused: &FusedEssence) -> FuseResult<String> {
    if let Some(field) = first_non_finite(fused) {
        return Err(FuseError::reconstruction(format!(
            "field '{field}' is not a finite number"
        )));
    }
    let essence_json = to_json("original essence", &fused.original_essence)?;
    let enhanced_json = to_json("enhanced properties", &fused.enhanced_properties)?;
    let integrations_json = to_json("module integrations", &fused.module_integrations)?;
    let evolution_json = to_json("evolution metrics", &fused.evolution)?;

    let animation = fused.original_essence.core_behavior.animation_type;
    let has_performance = fused
        .module_integrations
        .values()
        .any(|m| m.specialization == Specialization::Performance);

    let mut e = Emitter::new();
    e.line("/**");
    e.line(" * Fused visual effect.");
    e.line(&format!(
        " * Strategy: {}, reconstruction level {}, {} integrated module(s).",
        fused.strategy.as_str(),
        fused.reconstruction_level,
        fused.module_integrations.len()
    ));
    e.line(&format!(" * Source behaviour: {}.", animation.as_str()));
    e.line(" */");
    e.open("class FusedEffect {");

    e.open("constructor(canvas, options = {}) {");
    e.lines(&[
        "this.canvas = canvas;",
        "this.ctx = canvas.getContext('2d');",
        "this.options = options;",
    ]);
    e.line(&format!("this.originalEssence = {essence_json};"));
    e.line(&format!("this.enhancedProperties = {enhanced_json};"));
    e.line(&format!("this.moduleIntegrations = {integrations_json};"));
    e.line(&format!("this.evolution = {evolution_json};"));
    e.line(&format!("this.fusionIntensity = {};", fused.fusion_intensity));
    e.lines(&[
        "this.time = 0;",
        "this.isRunning = false;",
        "this.frameHandle = null;",
        "this.initialize();",
    ]);
    e.close("}");
    e.line("");

    e.open("initialize() {");
    e.lines(initialize_body(animation));
    e.close("}");
    e.line("");

    if animation == AnimationType::ParticleSystem {
        e.open("spawnParticle() {");
        e.lines(&[
            "return {",
            "  x: Math.random() * this.canvas.width,",
            "  y: Math.random() * this.canvas.height,",
            "  vx: (Math.random() - 0.5) * 2,",
            "  vy: (Math.random() - 0.5) * 2,",
            "  life: 1,",
            "};",
        ]);
        e.close("}");
        e.line("");
    }

    e.open("update(deltaTime) {");
    if has_performance {
        e.line("// Frame budget: never integrate more than 50ms at once.");
        e.line("deltaTime = Math.min(deltaTime, 0.05);");
    }
    e.line("this.time += deltaTime;");
    e.lines(update_body(animation));
    e.line("this.applyEnhancements(deltaTime);");
    e.close("}");
    e.line("");

    e.open("applyEnhancements(deltaTime) {");
    e.open("for (const id of Object.keys(this.enhancedProperties)) {");
    e.lines(&[
        "const property = this.enhancedProperties[id];",
        "// Each enhancement advances its own phase at its fused intensity.",
        "property.phase = (property.phase || 0) + deltaTime * property.intensity;",
    ]);
    e.close("}");
    e.close("}");
    e.line("");

    e.open("render() {");
    e.lines(&[
        "const ctx = this.ctx;",
        "ctx.clearRect(0, 0, this.canvas.width, this.canvas.height);",
    ]);
    e.lines(render_body(animation));
    e.close("}");
    e.line("");

    e.open("start() {");
    e.lines(&[
        "if (this.isRunning === true) {",
        "  return;",
        "}",
        "this.isRunning = true;",
        "const self = this;",
        "let last = 0;",
        "const loop = function (timestamp) {",
        "  if (self.isRunning === false) {",
        "    return;",
        "  }",
        "  const deltaTime = last === 0 ? 0 : (timestamp - last) / 1000;",
        "  last = timestamp;",
        "  self.update(deltaTime);",
        "  self.render();",
        "  self.frameHandle = requestAnimationFrame(loop);",
        "};",
        "this.frameHandle = requestAnimationFrame(loop);",
    ]);
    e.close("}");
    e.line("");

    e.open("stop() {");
    e.lines(&[
        "this.isRunning = false;",
        "if (this.frameHandle !== null) {",
        "  cancelAnimationFrame(this.frameHandle);",
        "  this.frameHandle = null;",
        "}",
    ]);
    e.close("}");
    e.close("}");
    e.line("");

    e.open("if (typeof module !== 'undefined') {");
    e.line("module.exports = FusedEffect;");
    e.close("}");

    Ok(e.finish())
}

fn initialize_body(animation: AnimationType) -> &'static [&'static str] {
    match animation {
        AnimationType::ParticleSystem => &[
            "// Particle pool sized by fusion intensity.",
            "this.particles = [];",
            "const count = Math.round(40 + 160 * this.fusionIntensity);",
            "for (let i = 0; i < count; i++) {",
            "  this.particles.push(this.spawnParticle());",
            "}",
        ],
        AnimationType::Transformation3d => &[
            "this.rotation = { x: 0, y: 0, z: 0 };",
            "this.perspective = 400;",
        ],
        AnimationType::TextAnimation => &[
            "this.text = this.options.text || 'fused';",
            "this.revealed = 0;",
        ],
        AnimationType::TransitionEffect => &[
            "this.progress = 0;",
            "this.duration = this.options.duration || 1.5;",
        ],
        AnimationType::CustomAnimation => &["this.phase = 0;"],
    }
}

fn update_body(animation: AnimationType) -> &'static [&'static str] {
    match animation {
        AnimationType::ParticleSystem => &[
            "for (const p of this.particles) {",
            "  p.x += p.vx * deltaTime * 60;",
            "  p.y += p.vy * deltaTime * 60;",
            "  p.life -= deltaTime * 0.2;",
            "  if (p.life <= 0) {",
            "    Object.assign(p, this.spawnParticle());",
            "  }",
            "}",
        ],
        AnimationType::Transformation3d => &[
            "this.rotation.x += deltaTime * 0.5 * (1 + this.fusionIntensity);",
            "this.rotation.y += deltaTime * 0.8;",
        ],
        AnimationType::TextAnimation => &[
            "const speed = 12 * (1 + this.fusionIntensity);",
            "this.revealed = Math.min(this.text.length, this.revealed + deltaTime * speed);",
        ],
        AnimationType::TransitionEffect => {
            &["this.progress = Math.min(1, this.progress + deltaTime / this.duration);"]
        }
        AnimationType::CustomAnimation => {
            &["this.phase += deltaTime * (1 + this.fusionIntensity);"]
        }
    }
}

fn render_body(animation: AnimationType) -> &'static [&'static str] {
    match animation {
        AnimationType::ParticleSystem => &[
            "for (const p of this.particles) {",
            "  ctx.globalAlpha = Math.max(0, p.life);",
            "  ctx.fillRect(p.x, p.y, 2, 2);",
            "}",
            "ctx.globalAlpha = 1;",
        ],
        AnimationType::Transformation3d => &[
            "const size = Math.min(this.canvas.width, this.canvas.height) / 4;",
            "const depth = this.perspective + Math.sin(this.rotation.x) * size;",
            "const scale = this.perspective / depth;",
            "ctx.save();",
            "ctx.translate(this.canvas.width / 2, this.canvas.height / 2);",
            "ctx.rotate(this.rotation.y);",
            "ctx.scale(scale, scale);",
            "ctx.strokeRect(-size / 2, -size / 2, size, size);",
            "ctx.restore();",
        ],
        AnimationType::TextAnimation => &[
            "const visible = this.text.slice(0, Math.floor(this.revealed));",
            "ctx.fillText(visible, 20, this.canvas.height / 2);",
        ],
        AnimationType::TransitionEffect => &[
            "ctx.globalAlpha = this.progress;",
            "ctx.fillRect(0, 0, this.canvas.width * this.progress, this.canvas.height);",
            "ctx.globalAlpha = 1;",
        ],
        AnimationType::CustomAnimation => &[
            "const radius = 20 + 10 * Math.sin(this.phase);",
            "ctx.beginPath();",
            "ctx.arc(this.canvas.width / 2, this.canvas.height / 2, radius, 0, Math.PI * 2);",
            "ctx.fill();",
        ],
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
        synth::FusionSynthesizer,
    };

    fn fused(src: &str, level: u8) -> FusedEssence {
        let reg = ModuleRegistry::builtin();
        let table = LevelPolicyTable::reference();
        let policy = table.get(level).unwrap();
        let essence = EssenceExtractor::extract(src);
        let profiles = CompatibilityAnalyzer::analyze(&essence, &reg.select_modules(level));
        let bp = BlueprintBuilder::build(essence, profiles, policy, &FusionOptions::default());
        FusionSynthesizer::synthesize(&bp)
    }

    #[test]
    fn branches_follow_animation_type() {
        let particle = generate(&fused("particle emitter", 1)).unwrap();
        assert!(particle.contains("spawnParticle() {"));
        assert!(particle.contains("this.particles = [];"));

        let cube = generate(&fused("three.js mesh", 1)).unwrap();
        assert!(cube.contains("this.rotation = { x: 0, y: 0, z: 0 };"));
        assert!(!cube.contains("spawnParticle"));

        let plain = generate(&fused("", 1)).unwrap();
        assert!(plain.contains("this.phase = 0;"));
    }

    #[test]
    fn braces_balance_and_payload_is_valid_json() {
        let code = generate(&fused("particle glow wave", 3)).unwrap();
        let opens = code.matches('{').count();
        let closes = code.matches('}').count();
        assert_eq!(opens, closes);

        let line = code
            .lines()
            .find(|l| l.trim_start().starts_with("this.evolution = "))
            .unwrap();
        let json = line
            .trim_start()
            .trim_start_matches("this.evolution = ")
            .trim_end_matches(';');
        let v: serde_json::Value = serde_json::from_str(json).unwrap();
        assert!(v.get("fusion_harmony").is_some());
    }

    #[test]
    fn performance_modules_add_frame_budget() {
        // Level 1 always includes the universal frame budget optimizer.
        let code = generate(&fused("", 1)).unwrap();
        assert!(code.contains("deltaTime = Math.min(deltaTime, 0.05);"));
    }

    #[test]
    fn non_finite_input_is_a_reconstruction_error() {
        let mut f = fused("", 2);
        f.fusion_intensity = f64::NAN;
        assert!(matches!(generate(&f), Err(FuseError::Reconstruction(_))));

        let mut f = fused("", 2);
        f.evolution.fusion_harmony = f64::INFINITY;
        let err = generate(&f).unwrap_err();
        assert!(err.to_string().contains("fusion_harmony"));
    }
}
