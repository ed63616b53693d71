//! recordflow — record-driven web automation engine.
//!
//! Drives a sequence of element modules against an interactive page, once
//! per input record: each module locates an element by a path expression
//! and performs one action, with per-record variables flowing between
//! modules and a loop-back construct that retries a module range until its
//! verification step succeeds.
//!
//! The workspace splits along the engine's seams:
//! - [`modules`] — module data model, ordered store, variables.
//! - [`executor`] — single-action execution against the page driver ports.
//! - [`flow`] — the loop-aware record runner and the run/pause/stop
//!   controller with its background worker.
//! - [`core_types`] — shared ids and the driver error type.

pub use recordflow_action_executor as executor;
pub use recordflow_core_types as core_types;
pub use recordflow_flow_runner as flow;
pub use recordflow_module_store as modules;

pub use recordflow_action_executor::{ActionExecutor, ActionOutcome, Element, PageDriver};
pub use recordflow_core_types::{DriverError, ModuleId, RunId};
pub use recordflow_flow_runner::{
    FlowController, FlowError, FlowEvent, InMemoryRecords, LoopAwareRunner, Record, RecordSource,
    RunState,
};
pub use recordflow_module_store::{
    ActionSpec, ConditionConfig, ConditionOp, Module, ModuleStore, Operand, VariableStore,
};
