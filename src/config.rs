use std::path::Path;

use crate::{
    foundation::error::{FuseError, FuseResult},
    policy::{LevelPolicy, LevelPolicyTable},
    registry::{ModuleDescriptor, ModuleRegistry},
};

/// Module catalog plus level policy table, loaded once at startup.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct FusionConfig {
    pub modules: Vec<ModuleDescriptor>,
    pub levels: Vec<LevelPolicy>,
}

impl FusionConfig {
    pub fn builtin() -> Self {
        Self {
            modules: ModuleRegistry::builtin().modules().to_vec(),
            levels: LevelPolicyTable::reference().policies().to_vec(),
        }
    }

    pub fn from_json_str(s: &str) -> FuseResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| FuseError::serde(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> FuseResult<Self> {
        let s = std::fs::read_to_string(path).map_err(|e| {
            FuseError::Other(anyhow::Error::new(e).context(format!(
                "read fusion config '{}'",
                path.display()
            )))
        })?;
        Self::from_json_str(&s)
    }

    /// Check descriptors and policies, and that every module level is covered by a policy.
    pub fn validate(&self) -> FuseResult<()> {
        self.clone().into_parts().map(|_| ())
    }

    pub fn into_parts(self) -> FuseResult<(ModuleRegistry, LevelPolicyTable)> {
        let policies = LevelPolicyTable::new(self.levels)?;
        let max_level = policies.levels().max().unwrap_or(0);
        if let Some(m) = self.modules.iter().find(|m| m.level > max_level) {
            return Err(FuseError::validation(format!(
                "module '{}' has level {} but the highest configured level is {max_level}",
                m.id, m.level
            )));
        }
        let registry = ModuleRegistry::new(self.modules)?;
        Ok((registry, policies))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_round_trips_through_json() {
        let s = serde_json::to_string_pretty(&FusionConfig::builtin()).unwrap();
        let cfg = FusionConfig::from_json_str(&s).unwrap();
        let (reg, pol) = cfg.into_parts().unwrap();
        assert_eq!(reg.len(), ModuleRegistry::builtin().len());
        assert_eq!(pol.policies().len(), 3);
    }

    #[test]
    fn module_above_highest_level_is_rejected() {
        let mut cfg = FusionConfig::builtin();
        cfg.modules[0].level = 9;
        assert!(matches!(cfg.validate(), Err(FuseError::Validation(_))));
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        assert!(matches!(
            FusionConfig::from_json_str("{\"modules\": 3}"),
            Err(FuseError::Serde(_))
        ));
    }
}
