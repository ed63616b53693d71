//! Action execution error types

use recordflow_core_types::DriverError;
use thiserror::Error;

/// Reasons a single action fails.
///
/// These never cross the executor boundary as `Err`; they become the
/// diagnostic detail of a failed [`crate::ActionOutcome`].
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("no visible option with text '{0}'")]
    OptionMissing(String),

    #[error("invalid table reference '{0}': expected '<matchText>,<columnIndex>'")]
    BadTableRef(String),

    #[error("no table row containing '{0}'")]
    RowMissing(String),

    #[error("column {index} out of bounds for row with {cells} cells")]
    ColumnOutOfBounds { index: usize, cells: usize },

    #[error(transparent)]
    Driver(#[from] DriverError),
}
