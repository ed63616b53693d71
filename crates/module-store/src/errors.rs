//! Module store error types

use thiserror::Error;

/// Errors raised by [`crate::ModuleStore`] persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Module list could not be serialized.
    #[error("failed to serialize module list: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Persisted document could not be parsed back into a module list.
    #[error("failed to parse module list: {0}")]
    Deserialize(#[source] serde_json::Error),
}
