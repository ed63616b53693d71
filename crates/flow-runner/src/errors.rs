//! Flow control error types

use recordflow_core_types::{DriverError, ModuleId};
use thiserror::Error;

/// Errors reported by [`crate::FlowController`] commands.
///
/// All of these are precondition or control errors; module failures during
/// a run are never surfaced here, they appear in record log events.
#[derive(Debug, Error)]
pub enum FlowError {
    /// `start()` while a run is active, or a control call in the wrong state.
    #[error("a run is already active")]
    AlreadyActive,

    /// `start()` without an active target connection.
    #[error("target driver is not connected")]
    NotConnected,

    /// `start()` with an empty record source.
    #[error("no records loaded")]
    NoRecords,

    /// `start()` with an empty module list.
    #[error("module list is empty")]
    NoModules,

    /// The run snapshot contains a loop-back reference that does not
    /// resolve to a strictly-earlier module.
    #[error("module '{name}' ({id}) loops back to a module that is not strictly earlier")]
    InvalidLoopRef { id: ModuleId, name: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Fault raised by a [`crate::RecordSource`] implementation.
#[derive(Debug, Error)]
#[error("record source error: {reason}")]
pub struct SourceError {
    pub reason: String,
}

impl SourceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
