//! Record-by-record flow execution.
//!
//! [`LoopAwareRunner`] walks the module list once for a record, honoring
//! loop-back chains (retry a closed module range until its verification
//! step succeeds). [`FlowController`] owns the Idle/Running/Paused state
//! machine, pulls records from the [`RecordSource`] port on a background
//! worker task and publishes [`FlowEvent`]s to subscribers.

pub mod errors;
pub mod events;
pub mod flow;
pub mod ports;
pub mod runner;

pub use errors::{FlowError, SourceError};
pub use events::FlowEvent;
pub use flow::{FlowController, RunState};
pub use ports::{InMemoryRecords, Record, RecordSource};
pub use runner::{LoopAwareRunner, RecordOutcome, StepOutcome, MAX_CHAIN_RETRIES};
