use crate::foundation::error::{FuseError, FuseResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Conservative,
    Balanced,
    Aggressive,
    Revolutionary,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Balanced => "balanced",
            Self::Aggressive => "aggressive",
            Self::Revolutionary => "revolutionary",
        }
    }
}

/// Fusion settings for one enhancement level.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LevelPolicy {
    pub level: u8,
    pub strategy: Strategy,
    pub fusion_intensity: f64,
    pub creativity_factor: f64,
    pub technical_focus: f64,
}

impl LevelPolicy {
    pub fn validate(&self) -> FuseResult<()> {
        for (name, v) in [
            ("fusion_intensity", self.fusion_intensity),
            ("creativity_factor", self.creativity_factor),
            ("technical_focus", self.technical_focus),
        ] {
            if !v.is_finite() || !(0.0..=1.0).contains(&v) {
                return Err(FuseError::validation(format!(
                    "level {} {name} must be finite and within [0, 1]",
                    self.level
                )));
            }
        }
        Ok(())
    }
}

/// Closed set of configured levels. Unknown levels are an error, never defaulted.
#[derive(Clone, Debug)]
pub struct LevelPolicyTable {
    policies: Vec<LevelPolicy>, // sorted by level, unique
}

impl LevelPolicyTable {
    pub fn new(mut policies: Vec<LevelPolicy>) -> FuseResult<Self> {
        if policies.is_empty() {
            return Err(FuseError::validation(
                "level policy table must contain at least one level",
            ));
        }
        for p in &policies {
            p.validate()?;
        }
        policies.sort_by_key(|p| p.level);
        if let Some(w) = policies.windows(2).find(|w| w[0].level == w[1].level) {
            return Err(FuseError::validation(format!(
                "duplicate level policy for level {}",
                w[0].level
            )));
        }
        Ok(Self { policies })
    }

    pub fn reference() -> Self {
        Self {
            policies: vec![
                LevelPolicy {
                    level: 1,
                    strategy: Strategy::Conservative,
                    fusion_intensity: 0.3,
                    creativity_factor: 0.4,
                    technical_focus: 0.6,
                },
                LevelPolicy {
                    level: 2,
                    strategy: Strategy::Balanced,
                    fusion_intensity: 0.6,
                    creativity_factor: 0.6,
                    technical_focus: 0.5,
                },
                LevelPolicy {
                    level: 3,
                    strategy: Strategy::Revolutionary,
                    fusion_intensity: 0.9,
                    creativity_factor: 0.9,
                    technical_focus: 0.7,
                },
            ],
        }
    }

    pub fn get(&self, level: u8) -> FuseResult<&LevelPolicy> {
        self.policies
            .iter()
            .find(|p| p.level == level)
            .ok_or_else(|| FuseError::invalid_level(level, self.levels()))
    }

    pub fn levels(&self) -> impl Iterator<Item = u8> + '_ {
        self.policies.iter().map(|p| p.level)
    }

    pub fn policies(&self) -> &[LevelPolicy] {
        &self.policies
    }
}
