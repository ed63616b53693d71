//! Module list data model and per-record variable storage.
//!
//! A [`Module`] is one locate-and-act step against the target page. The
//! [`ModuleStore`] owns the ordered module list and its monotonic id
//! counter, and round-trips through JSON. [`VariableStore`] is the
//! per-record name/value map modules read operands from and write extracted
//! values into.

pub mod conditions;
pub mod errors;
pub mod model;
pub mod store;
pub mod vars;

pub use conditions::{ConditionConfig, ConditionOp};
pub use errors::StoreError;
pub use model::{ActionSpec, Module, Operand, MIN_WAIT_SECS};
pub use store::ModuleStore;
pub use vars::VariableStore;
