//! Code reconstruction: template codegen followed by compression.

pub mod codegen;
pub(crate) mod compress;
pub(crate) mod lexer;

use crate::{foundation::error::FuseResult, synth::FusedEssence};

pub use compress::{CompressionStats, PassStat};

/// Output of the reconstruction stage.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconstruction {
    /// Uncompressed template output.
    pub generated: String,
    /// Final compressed code.
    pub code: String,
    pub stats: CompressionStats,
}

pub struct CodeReconstructor;

impl CodeReconstructor {
    #[tracing::instrument(skip_all, fields(modules = fused.module_integrations.len()))]
    pub fn reconstruct(fused: &FusedEssence) -> FuseResult<Reconstruction> {
        let generated = codegen::generate(fused)?;
        let (code, stats) = compress::compress(&generated)?;
        tracing::debug!(
            generated = generated.len(),
            compressed = code.len(),
            ratio = stats.ratio(),
            "code reconstructed"
        );
        Ok(Reconstruction {
            generated,
            code,
            stats,
        })
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

    fn reconstruct(src: &str, level: u8) -> Reconstruction {
        let reg = ModuleRegistry::builtin();
        let table = LevelPolicyTable::reference();
        let policy = table.get(level).unwrap();
        let essence = EssenceExtractor::extract(src);
        let profiles = CompatibilityAnalyzer::analyze(&essence, &reg.select_modules(level));
        let bp = BlueprintBuilder::build(essence, profiles, policy, &FusionOptions::default());
        CodeReconstructor::reconstruct(&FusionSynthesizer::synthesize(&bp)).unwrap()
    }

    #[test]
    fn compression_shrinks_generated_code() {
        for (src, level) in [("particle", 1), ("three.js", 2), ("typewriter", 3), ("", 3)] {
            let r = reconstruct(src, level);
            assert!(r.code.len() < r.generated.len(), "{src}");
            assert_eq!(r.stats.input_bytes(), r.generated.len());
            assert_eq!(r.stats.output_bytes(), r.code.len());
        }
    }

    #[test]
    fn compressed_code_applies_safe_rewrites() {
        let r = reconstruct("particle", 2);
        assert!(!r.code.contains("//"));
        assert!(!r.code.contains("/**"));
        assert!(r.code.contains("const loop=(ts)=>{"));
        assert!(r.code.contains("if(this.iR)"));
        assert!(r.code.contains("if(!self.iR)"));
        assert!(r.code.contains("this.iR=!0;"));
        assert!(r.code.contains("this.oE={\"core_behavior\""));
        // Serialized keys survive renaming untouched.
        assert!(r.code.contains("\"aesthetic_evolution\""));
        assert!(!r.code.contains("isRunning"));
    }

    #[test]
    fn reconstruction_is_deterministic() {
        assert_eq!(reconstruct("particle glow", 3), reconstruct("particle glow", 3));
    }
}
