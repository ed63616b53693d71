use std::sync::Arc;

use chrono::{DateTime, Utc};
use recordflow_action_executor::{ActionOutcome, ModuleExecutor};
use recordflow_core_types::ModuleId;
use recordflow_module_store::{Module, VariableStore};
use tracing::{debug, warn};

/// Retry budget of one loop chain after its probe has failed.
pub const MAX_CHAIN_RETRIES: u32 = 100;

/// Outcome of one module execution inside a record run.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub module_id: ModuleId,
    pub name: String,
    pub action: &'static str,
    pub ok: bool,
    pub extracted: Option<String>,
    pub detail: Option<String>,
}

/// Result of driving the full module list against one record.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub ok: bool,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Every module execution in order, chain retries included.
    pub steps: Vec<StepOutcome>,
}

impl RecordOutcome {
    fn new() -> Self {
        let now = Utc::now();
        Self {
            ok: false,
            error: None,
            started_at: now,
            finished_at: now,
            steps: Vec::new(),
        }
    }

    fn finish_ok(mut self) -> Self {
        self.ok = true;
        self.finished_at = Utc::now();
        self
    }

    fn finish_err(mut self, error: String) -> Self {
        self.ok = false;
        self.error = Some(error);
        self.finished_at = Utc::now();
        self
    }
}

/// Executes the module list once for one record, implementing the loop-back
/// chain construct.
///
/// A module whose `loop_back_to` resolves to a strictly-earlier module
/// closes a chain: the range from that module through itself is re-run as a
/// unit until the closing module succeeds (bounded by
/// [`MAX_CHAIN_RETRIES`]). An unresolvable reference is inert and the
/// module runs as a plain step.
pub struct LoopAwareRunner {
    executor: Arc<dyn ModuleExecutor>,
}

impl LoopAwareRunner {
    pub fn new(executor: Arc<dyn ModuleExecutor>) -> Self {
        Self { executor }
    }

    /// Drive all modules against one record's variable store.
    pub async fn run(&self, modules: &[Module], vars: &mut VariableStore) -> RecordOutcome {
        let mut result = RecordOutcome::new();
        let mut i = 0;

        while i < modules.len() {
            let module = &modules[i];
            match chain_start(modules, i) {
                None => {
                    let outcome = self.step(module, vars, &mut result).await;
                    if !outcome.ok {
                        return result.finish_err(step_failure(module, &outcome));
                    }
                }
                Some(start) => {
                    // Probe: if the closing module is already satisfied the
                    // chain body never runs.
                    let probe = self.step(module, vars, &mut result).await;
                    if !probe.ok {
                        debug!(module = %module.id, start, end = i, "probe failed, entering chain retries");
                        match self.retry_chain(modules, start, i, vars, &mut result).await {
                            ChainResult::Satisfied => {}
                            ChainResult::MidChainFailure(error) => {
                                return result.finish_err(error);
                            }
                            ChainResult::Exhausted => {
                                warn!(module = %module.id, "loop chain retries exhausted");
                                return result.finish_err(format!(
                                    "loop chain ending at module '{}' did not succeed within {} retries",
                                    module.name, MAX_CHAIN_RETRIES
                                ));
                            }
                        }
                    }
                }
            }
            i += 1;
        }

        result.finish_ok()
    }

    /// Re-run the closed range `[start, end]` until the module at `end`
    /// succeeds.
    async fn retry_chain(
        &self,
        modules: &[Module],
        start: usize,
        end: usize,
        vars: &mut VariableStore,
        result: &mut RecordOutcome,
    ) -> ChainResult {
        for attempt in 1..=MAX_CHAIN_RETRIES {
            debug!(attempt, start, end, "re-running chain");
            for (j, module) in modules.iter().enumerate().take(end + 1).skip(start) {
                let outcome = self.step(module, vars, result).await;
                if j < end {
                    // A failure strictly inside the chain is not retried.
                    if !outcome.ok {
                        return ChainResult::MidChainFailure(step_failure(module, &outcome));
                    }
                } else if outcome.ok {
                    return ChainResult::Satisfied;
                }
            }
        }
        ChainResult::Exhausted
    }

    /// Execute one module, bind its extracted value, and append its step
    /// outcome. A failed expectation still carries the read text, so the
    /// binding happens whenever a value was extracted; the failed record's
    /// store only survives for diagnostics.
    async fn step(
        &self,
        module: &Module,
        vars: &mut VariableStore,
        result: &mut RecordOutcome,
    ) -> ActionOutcome {
        let outcome = self.executor.execute(module, vars).await;
        if let (Some(name), Some(value)) = (&module.output_var, &outcome.extracted) {
            vars.set(name.clone(), value.clone());
        }
        result.steps.push(StepOutcome {
            module_id: module.id,
            name: module.name.clone(),
            action: module.action.label(),
            ok: outcome.ok,
            extracted: outcome.extracted.clone(),
            detail: outcome.detail.clone(),
        });
        outcome
    }
}

enum ChainResult {
    Satisfied,
    MidChainFailure(String),
    Exhausted,
}

/// Resolve a module's loop-back reference to a strictly-earlier index.
/// `None` means the reference is absent or inert.
fn chain_start(modules: &[Module], i: usize) -> Option<usize> {
    let target = modules[i].loop_back_to?;
    modules[..i].iter().position(|m| m.id == target)
}

fn step_failure(module: &Module, outcome: &ActionOutcome) -> String {
    match &outcome.detail {
        Some(detail) => format!("module '{}' failed: {detail}", module.name),
        None => format!("module '{}' failed", module.name),
    }
}
