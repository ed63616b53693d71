use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use recordflow_module_store::{ActionSpec, Module, VariableStore};
use tokio::time::{sleep, Instant};
use tracing::{debug, instrument, warn};

use crate::errors::ExecError;
use crate::model::ActionOutcome;
use crate::ports::{Element, PageDriver};

/// Settle delay between opening a select control and scanning its options.
const SELECT_SETTLE: Duration = Duration::from_millis(500);

/// Locators used for scoped lookups inside a located element.
const OPTION_LOCATOR: &str = "option";
const ROW_LOCATOR: &str = "tr";
const CELL_LOCATOR: &str = "td";
const HEADER_CELL_LOCATOR: &str = "th";

/// Executes one module against the page.
#[async_trait]
pub trait ModuleExecutor: Send + Sync {
    async fn execute(&self, module: &Module, vars: &VariableStore) -> ActionOutcome;
}

/// Default executor backed by a [`PageDriver`].
pub struct ActionExecutor {
    driver: Arc<dyn PageDriver>,
}

impl ActionExecutor {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self { driver }
    }

    async fn dispatch(
        &self,
        module: &Module,
        vars: &VariableStore,
        element: &dyn Element,
    ) -> Result<ActionOutcome, ExecError> {
        match &module.action {
            ActionSpec::SetText { value } => {
                element.set_text(value.resolve(vars)).await?;
                Ok(ActionOutcome::success(None))
            }

            ActionSpec::Click => {
                element.click().await?;
                Ok(ActionOutcome::success(None))
            }

            ActionSpec::UploadFile { path } => {
                element.set_text(path.resolve(vars)).await?;
                Ok(ActionOutcome::success(None))
            }

            ActionSpec::Clear => {
                element.clear().await?;
                Ok(ActionOutcome::success(None))
            }

            ActionSpec::SelectOption { option } => {
                let wanted = option.resolve(vars);
                self.select_option(element, wanted).await?;
                Ok(ActionOutcome::success(None))
            }

            ActionSpec::ReadText { expect } => {
                let text = element.read_text().await?.trim().to_string();
                match expect {
                    None => Ok(ActionOutcome::success(Some(text))),
                    Some(operand) => {
                        let expected = operand.resolve(vars);
                        if text == expected {
                            Ok(ActionOutcome::success(Some(text)))
                        } else {
                            // Keep the read text so callers can log it.
                            Ok(ActionOutcome::failure(format!(
                                "read text '{text}' did not match expected '{expected}'"
                            ))
                            .with_extracted(text))
                        }
                    }
                }
            }

            ActionSpec::ReadTableField { reference } => {
                let reference = reference.resolve(vars).to_string();
                let cell = self.read_table_field(element, &reference).await?;
                Ok(ActionOutcome::success(Some(cell)))
            }
        }
    }

    /// Open the control and click the first visible option whose trimmed
    /// text equals `wanted`.
    async fn select_option(&self, element: &dyn Element, wanted: &str) -> Result<(), ExecError> {
        element.click().await?;
        sleep(SELECT_SETTLE).await;

        for option in element.find_all(OPTION_LOCATOR).await? {
            if !option.is_displayed().await? {
                continue;
            }
            if option.read_text().await?.trim() == wanted {
                option.click().await?;
                return Ok(());
            }
        }
        Err(ExecError::OptionMissing(wanted.to_string()))
    }

    /// Resolve a `"<matchText>,<columnIndex>"` reference to a cell under
    /// the module's element.
    async fn read_table_field(
        &self,
        element: &dyn Element,
        reference: &str,
    ) -> Result<String, ExecError> {
        let (match_text, index) = parse_table_reference(reference)?;

        let mut matched = None;
        for row in element.find_all(ROW_LOCATOR).await? {
            if row.read_text().await?.contains(match_text) {
                matched = Some(row);
                break;
            }
        }
        let row = matched.ok_or_else(|| ExecError::RowMissing(match_text.to_string()))?;

        let mut cells = row.find_all(CELL_LOCATOR).await?;
        if cells.is_empty() {
            cells = row.find_all(HEADER_CELL_LOCATOR).await?;
        }
        let cell = cells.get(index).ok_or(ExecError::ColumnOutOfBounds {
            index,
            cells: cells.len(),
        })?;
        Ok(cell.read_text().await?.trim().to_string())
    }
}

fn parse_table_reference(reference: &str) -> Result<(&str, usize), ExecError> {
    let (match_text, index) = reference
        .rsplit_once(',')
        .ok_or_else(|| ExecError::BadTableRef(reference.to_string()))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|_| ExecError::BadTableRef(reference.to_string()))?;
    Ok((match_text, index))
}

#[async_trait]
impl ModuleExecutor for ActionExecutor {
    #[instrument(skip_all, fields(module = %module.id, action = module.action.label()))]
    async fn execute(&self, module: &Module, vars: &VariableStore) -> ActionOutcome {
        let started = Instant::now();
        sleep(module.effective_wait()).await;

        let element = match self.driver.find(&module.locator).await {
            Ok(Some(element)) => element,
            Ok(None) => {
                warn!(locator = %module.locator, "element not found");
                return ActionOutcome::failure(
                    ExecError::ElementNotFound(module.locator.clone()).to_string(),
                )
                .finish(started);
            }
            Err(err) => {
                warn!(locator = %module.locator, error = %err, "locate failed");
                return ActionOutcome::failure(err.to_string()).finish(started);
            }
        };

        match self.dispatch(module, vars, element.as_ref()).await {
            Ok(outcome) => {
                debug!(ok = outcome.ok, "action finished");
                outcome.finish(started)
            }
            Err(err) => {
                warn!(error = %err, "action failed");
                ActionOutcome::failure(err.to_string()).finish(started)
            }
        }
    }
}
