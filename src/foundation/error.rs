pub type FuseResult<T> = Result<T, FuseError>;

#[derive(thiserror::Error, Debug)]
pub enum FuseError {
    #[error("invalid level {level}: no level policy configured (known levels: {known:?})")]
    InvalidLevel { level: u8, known: Vec<u8> },

    #[error("extraction error: {0}")]
    Extraction(String),

    #[error("reconstruction error: {0}")]
    Reconstruction(String),

    #[error("moderation contract violation: {0}")]
    ModerationContractViolation(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate fusion id '{0}': already recorded in the history store")]
    DuplicateFusionId(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FuseError {
    pub fn invalid_level(level: u8, known: impl IntoIterator<Item = u8>) -> Self {
        Self::InvalidLevel {
            level,
            known: known.into_iter().collect(),
        }
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn reconstruction(msg: impl Into<String>) -> Self {
        Self::Reconstruction(msg.into())
    }

    pub fn moderation(msg: impl Into<String>) -> Self {
        Self::ModerationContractViolation(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateFusionId(id.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            FuseError::invalid_level(4, [1, 2, 3])
                .to_string()
                .contains("invalid level 4")
        );
        assert!(
            FuseError::extraction("x")
                .to_string()
                .contains("extraction error:")
        );
        assert!(
            FuseError::reconstruction("x")
                .to_string()
                .contains("reconstruction error:")
        );
        assert!(
            FuseError::moderation("x")
                .to_string()
                .contains("moderation contract violation:")
        );
        assert!(
            FuseError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            FuseError::duplicate_id("fusion-1")
                .to_string()
                .contains("duplicate fusion id 'fusion-1'")
        );
        assert!(
            FuseError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = FuseError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
