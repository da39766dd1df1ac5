use std::{cmp::Ordering, collections::BTreeSet};

use crate::foundation::error::{FuseError, FuseResult};

/// What an enhancement module is specialised in. Scoring bonuses key off this tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    Creativity,
    Performance,
    Visual,
    Motion,
    Interaction,
    Security,
    Visualization,
    Harmony,
}

impl Specialization {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Creativity => "creativity",
            Self::Performance => "performance",
            Self::Visual => "visual",
            Self::Motion => "motion",
            Self::Interaction => "interaction",
            Self::Security => "security",
            Self::Visualization => "visualization",
            Self::Harmony => "harmony",
        }
    }
}

/// Static metadata for one enhancement module. Never executed, only scored.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    pub level: u8,
    pub creative_weight: f64,  // 0..1
    pub technical_weight: f64, // 0..1
    pub specialization: Specialization,
    #[serde(default)]
    pub universal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
}

impl ModuleDescriptor {
    pub fn new(
        id: impl Into<String>,
        level: u8,
        creative_weight: f64,
        technical_weight: f64,
        specialization: Specialization,
    ) -> Self {
        Self {
            id: id.into(),
            level,
            creative_weight,
            technical_weight,
            specialization,
            universal: false,
            priority: None,
        }
    }

    pub fn universal(mut self) -> Self {
        self.universal = true;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn validate(&self) -> FuseResult<()> {
        if self.id.trim().is_empty() {
            return Err(FuseError::validation("module id must be non-empty"));
        }
        if self.level == 0 {
            return Err(FuseError::validation(format!(
                "module '{}' level must be >= 1",
                self.id
            )));
        }
        for (name, w) in [
            ("creative_weight", self.creative_weight),
            ("technical_weight", self.technical_weight),
        ] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(FuseError::validation(format!(
                    "module '{}' {name} must be finite and within [0, 1]",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Catalog of module descriptors in insertion order.
#[derive(Clone, Debug)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Validate every descriptor and reject duplicate ids.
    pub fn new(modules: Vec<ModuleDescriptor>) -> FuseResult<Self> {
        let mut seen = BTreeSet::new();
        for m in &modules {
            m.validate()?;
            if !seen.insert(m.id.as_str()) {
                return Err(FuseError::validation(format!(
                    "duplicate module id '{}'",
                    m.id
                )));
            }
        }
        Ok(Self { modules })
    }

    /// The reference catalog shipped with the crate.
    pub fn builtin() -> Self {
        use Specialization as S;
        Self {
            modules: vec![
                ModuleDescriptor::new("contextual_harmony", 2, 0.5, 0.5, S::Harmony)
                    .universal()
                    .with_priority(10),
                ModuleDescriptor::new("frame_budget_optimizer", 1, 0.2, 0.9, S::Performance)
                    .universal()
                    .with_priority(5),
                ModuleDescriptor::new("color_theory", 1, 0.7, 0.3, S::Visual),
                ModuleDescriptor::new("easing_choreographer", 1, 0.6, 0.4, S::Motion),
                ModuleDescriptor::new("particle_enhancer", 2, 0.8, 0.5, S::Creativity),
                ModuleDescriptor::new("shader_library", 2, 0.7, 0.85, S::Visual),
                ModuleDescriptor::new("interaction_telemetry", 2, 0.3, 0.7, S::Interaction),
                ModuleDescriptor::new("input_sanitizer", 2, 0.1, 0.8, S::Security),
                ModuleDescriptor::new("creative_intelligence", 3, 0.95, 0.6, S::Creativity)
                    .with_priority(3),
                ModuleDescriptor::new("quantum_renderer", 3, 0.9, 0.9, S::Visualization),
                ModuleDescriptor::new("adaptive_physics", 3, 0.6, 0.8, S::Motion),
            ],
        }
    }

    pub fn modules(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    pub fn get(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn max_level(&self) -> u8 {
        self.modules.iter().map(|m| m.level).max().unwrap_or(0)
    }

    /// Every module with `level <= level` or flagged universal, in selection order.
    ///
    /// Selection order is `universal` first, then `priority` (missing lowest), then `level`,
    /// then `technical_weight`, all descending. Equal keys keep registry order.
    pub fn select_modules(&self, level: u8) -> Vec<&ModuleDescriptor> {
        let mut out = self
            .modules
            .iter()
            .filter(|m| m.level <= level || m.universal)
            .collect::<Vec<_>>();
        out.sort_by(|a, b| selection_order(a, b));
        out
    }
}

fn selection_order(a: &ModuleDescriptor, b: &ModuleDescriptor) -> Ordering {
    b.universal
        .cmp(&a.universal)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| b.level.cmp(&a.level))
        .then_with(|| b.technical_weight.total_cmp(&a.technical_weight))
}
