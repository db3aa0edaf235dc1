use crate::gpu::ShaderStage;

/// Failures that abort activation of an effect.
///
/// None of these are fatal to the host: an instance that hits one renders
/// nothing until it is reconfigured or disposed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("shader program failed to link:\n{log}")]
    Link { log: String },
    #[error("graphics backend unavailable: {0}")]
    UnsupportedBackend(String),
}

impl EffectError {
    /// Backend diagnostic text, if the failure carried any.
    pub fn diagnostic_log(&self) -> Option<&str> {
        match self {
            EffectError::Compile { log, .. } | EffectError::Link { log } => Some(log),
            EffectError::UnsupportedBackend(_) => None,
        }
    }
}
