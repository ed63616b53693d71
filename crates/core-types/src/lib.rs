use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Fault surfaced by the page driver ports.
///
/// Everything the driver can fail with collapses into this enum; callers in
/// the execution engine convert it into a failed step outcome rather than
/// propagating it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("driver is not connected")]
    NotConnected,

    #[error("invalid locator expression: {0}")]
    BadLocator(String),

    #[error("driver operation timed out: {0}")]
    Timeout(String),

    #[error("driver protocol fault: {0}")]
    Protocol(String),
}

impl DriverError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Stable identity of a module within one store.
///
/// Ids come from the store's monotonic counter and are never reused after
/// removal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Correlation id for one engine run, carried on every lifecycle event.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
