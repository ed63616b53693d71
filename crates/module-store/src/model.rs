//! Core types for the module list

use std::time::Duration;

use recordflow_core_types::ModuleId;
use serde::{Deserialize, Serialize};

use crate::vars::VariableStore;

/// Floor for the pre-action delay, in seconds.
///
/// A module is never executed with a zero wait; acting immediately races
/// against page rendering.
pub const MIN_WAIT_SECS: f64 = 0.5;

/// Operand of a module action: a fixed string or a variable reference
/// resolved against the record's variable store at execution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Use the string as-is.
    Literal(String),

    /// Look the name up in the variable store. An unbound name resolves to
    /// the name itself, so an operand typed before its producing module
    /// exists still behaves as a literal.
    Variable(String),
}

impl Operand {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Resolve against a variable snapshot.
    pub fn resolve<'a>(&'a self, vars: &'a VariableStore) -> &'a str {
        match self {
            Operand::Literal(value) => value,
            Operand::Variable(name) => vars.get(name).unwrap_or(name),
        }
    }
}

/// What a module does once its element is located.
///
/// Closed set; execution dispatches by exhaustive match so adding a kind is
/// a compile-time-checked change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSpec {
    /// Replace the element's content with the operand.
    SetText { value: Operand },

    /// Programmatic click.
    Click,

    /// Open the control, then click the visible option whose text equals
    /// the operand.
    SelectOption { option: Operand },

    /// Send a file path to an upload input.
    UploadFile { path: Operand },

    /// Read and trim the element's text. With `expect` set the read text is
    /// compared against the resolved operand and a mismatch fails the step;
    /// without it the step always succeeds and yields the text.
    ReadText { expect: Option<Operand> },

    /// Clear the element's content.
    Clear,

    /// Read one cell out of a table under the element. The operand must
    /// resolve to `"<matchText>,<columnIndex>"`: the first row containing
    /// the match text supplies the cell at the given column.
    ReadTableField { reference: Operand },
}

impl ActionSpec {
    /// Short label used in logs and step outcomes.
    pub fn label(&self) -> &'static str {
        match self {
            ActionSpec::SetText { .. } => "set-text",
            ActionSpec::Click => "click",
            ActionSpec::SelectOption { .. } => "select-option",
            ActionSpec::UploadFile { .. } => "upload-file",
            ActionSpec::ReadText { .. } => "read-text",
            ActionSpec::Clear => "clear",
            ActionSpec::ReadTableField { .. } => "read-table-field",
        }
    }
}

/// One ordered step of the automation sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Store-assigned identity, stable across edits.
    pub id: ModuleId,

    /// Display label, not unique.
    pub name: String,

    /// Path expression locating the target element.
    pub locator: String,

    /// Action performed once the element is found.
    pub action: ActionSpec,

    /// Pre-action delay in seconds; clamped to [`MIN_WAIT_SECS`] at
    /// execution time.
    pub wait_secs: f64,

    /// If set, a successful action's extracted value is written into the
    /// variable store under this name.
    pub output_var: Option<String>,

    /// If set to a strictly-earlier module's id, the closed range from that
    /// module through this one becomes a retry-until-this-succeeds chain.
    pub loop_back_to: Option<ModuleId>,
}

impl Module {
    pub fn new(id: ModuleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            locator: String::new(),
            action: ActionSpec::Click,
            wait_secs: MIN_WAIT_SECS,
            output_var: None,
            loop_back_to: None,
        }
    }

    pub fn with_locator(mut self, locator: impl Into<String>) -> Self {
        self.locator = locator.into();
        self
    }

    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.action = action;
        self
    }

    pub fn with_wait_secs(mut self, wait_secs: f64) -> Self {
        self.wait_secs = wait_secs;
        self
    }

    pub fn with_output_var(mut self, name: impl Into<String>) -> Self {
        self.output_var = Some(name.into());
        self
    }

    pub fn with_loop_back_to(mut self, target: ModuleId) -> Self {
        self.loop_back_to = Some(target);
        self
    }

    /// Pre-action delay with the floor applied.
    pub fn effective_wait(&self) -> Duration {
        Duration::from_secs_f64(self.wait_secs.max(MIN_WAIT_SECS))
    }
}
