//! Branch-selection condition model.
//!
//! Conditions are part of the persisted data model but the execution engine
//! never consults them; the runner walks the module list linearly. They are
//! kept with full evaluation semantics so an editor can validate them and a
//! future branching step has defined behavior to build on.

use serde::{Deserialize, Serialize};

use crate::vars::VariableStore;

/// Comparison operator of a branch condition. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
}

impl ConditionOp {
    fn is_numeric(self) -> bool {
        matches!(
            self,
            ConditionOp::GreaterThan
                | ConditionOp::LessThan
                | ConditionOp::GreaterOrEqual
                | ConditionOp::LessOrEqual
        )
    }
}

/// A single two-way branch: compare one variable against a literal and pick
/// a branch label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// Variable name looked up in the record's store.
    pub field: String,

    pub op: ConditionOp,

    /// Right-hand comparison literal.
    pub value: String,

    /// Label yielded when the comparison holds.
    pub then_branch: String,

    /// Label yielded when the comparison fails, the field is unbound, or a
    /// numeric operand does not parse.
    pub else_branch: String,
}

impl ConditionConfig {
    /// Evaluate against a variable snapshot and yield the branch label.
    pub fn evaluate<'a>(&'a self, vars: &VariableStore) -> &'a str {
        let Some(actual) = vars.get(&self.field) else {
            return &self.else_branch;
        };

        let holds = if self.op.is_numeric() {
            match (actual.trim().parse::<f64>(), self.value.trim().parse::<f64>()) {
                (Ok(lhs), Ok(rhs)) => match self.op {
                    ConditionOp::GreaterThan => lhs > rhs,
                    ConditionOp::LessThan => lhs < rhs,
                    ConditionOp::GreaterOrEqual => lhs >= rhs,
                    ConditionOp::LessOrEqual => lhs <= rhs,
                    _ => unreachable!(),
                },
                _ => return &self.else_branch,
            }
        } else {
            match self.op {
                ConditionOp::Equals => actual == self.value,
                ConditionOp::NotEquals => actual != self.value,
                ConditionOp::Contains => actual.contains(&self.value),
                ConditionOp::NotContains => !actual.contains(&self.value),
                _ => unreachable!(),
            }
        };

        if holds {
            &self.then_branch
        } else {
            &self.else_branch
        }
    }
}
