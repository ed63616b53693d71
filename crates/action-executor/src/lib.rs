//! Single-module action execution against the page driver.
//!
//! [`ActionExecutor`] performs exactly one module's action: wait, locate,
//! resolve the operand, dispatch by action kind. Every fault below this
//! layer (bad locator, missing option, driver protocol error) is converted
//! into a failed [`ActionOutcome`]; nothing propagates upward as an error.

pub mod errors;
pub mod executor;
pub mod model;
pub mod ports;

pub use errors::ExecError;
pub use executor::{ActionExecutor, ModuleExecutor};
pub use model::ActionOutcome;
pub use ports::{Element, PageDriver};
