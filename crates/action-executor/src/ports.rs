use async_trait::async_trait;
use recordflow_core_types::DriverError;

/// Connection to the interactive target page.
///
/// The concrete implementation (CDP, WebDriver, ...) lives outside the
/// engine; tests drive the executor with in-memory fakes.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn connect(&self, port: u16) -> Result<(), DriverError>;

    async fn disconnect(&self);

    async fn is_connected(&self) -> bool;

    /// Locate a single element by path expression. `Ok(None)` means the
    /// expression was valid but matched nothing.
    async fn find(&self, locator: &str) -> Result<Option<Box<dyn Element>>, DriverError>;
}

/// Handle to one located element.
#[async_trait]
pub trait Element: Send + Sync {
    async fn set_text(&self, value: &str) -> Result<(), DriverError>;

    async fn click(&self) -> Result<(), DriverError>;

    async fn read_text(&self) -> Result<String, DriverError>;

    async fn clear(&self) -> Result<(), DriverError>;

    async fn is_displayed(&self) -> Result<bool, DriverError>;

    /// Locate descendant elements by a path expression scoped to this
    /// element.
    async fn find_all(&self, locator: &str) -> Result<Vec<Box<dyn Element>>, DriverError>;
}
