use thiserror::Error;

/// Failure raised while building or loading a terrain selector.
#[derive(Debug, Error)]
pub enum TerrainError {
    /// The type tag names no selector kind.
    #[error("unknown terrain selector type '{0}'")]
    UnknownSelector(String),
    /// No named selector is registered under this name.
    #[error("unknown named terrain selector '{0}'")]
    UnknownNamedSelector(String),
    /// The config could not be interpreted for this selector kind.
    #[error("bad config for terrain selector '{kind}': {reason}")]
    BadSelectorConfig {
        /// Selector kind being built.
        kind: String,
        /// What was wrong with the config.
        reason: String,
    },
}

impl TerrainError {
    pub(crate) fn bad_config(kind: &str, reason: impl ToString) -> Self {
        Self::BadSelectorConfig {
            kind: kind.to_owned(),
            reason: reason.to_string(),
        }
    }
}
