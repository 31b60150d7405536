//! Browser automation behind an owned, per-task session handle.
//!
//! A [`BrowserSession`] starts its driver on first use and tears it down on
//! [`BrowserSession::close`]. Each task dispatcher owns its own session, so
//! concurrent tasks never share driver state.

pub mod webdriver;

use crate::error::ToolError;
use async_trait::async_trait;
use std::sync::Arc;

pub use webdriver::{WebDriverLauncher, WebDriverSession};

/// A live browser the executor can drive.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ToolError>;

    /// Text content of the first element matching a CSS selector.
    async fn extract_text(&mut self, selector: &str) -> Result<String, ToolError>;

    async fn current_url(&mut self) -> Result<String, ToolError>;

    async fn close(self: Box<Self>) -> Result<(), ToolError>;
}

/// Starts browser drivers on demand.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, ToolError>;
}

pub struct BrowserSession {
    launcher: Arc<dyn BrowserLauncher>,
    driver: Option<Box<dyn BrowserDriver>>,
}

impl BrowserSession {
    pub fn new(launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            launcher,
            driver: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.driver.is_some()
    }

    /// The running driver, launching one if none exists yet.
    pub async fn driver(&mut self) -> Result<&mut Box<dyn BrowserDriver>, ToolError> {
        if self.driver.is_none() {
            tracing::info!("Starting browser session");
            let driver = self.launcher.launch().await?;
            self.driver = Some(driver);
        }
        self.driver
            .as_mut()
            .ok_or_else(|| ToolError::Browser("browser session unavailable".into()))
    }

    /// Tear down the driver if one was started. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<(), ToolError> {
        match self.driver.take() {
            Some(driver) => {
                tracing::info!("Closing browser session");
                driver.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        tracing::warn!("Browser session dropped without close, tearing down in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = driver.close().await {
                        tracing::warn!("Background browser teardown failed: {}", e);
                    }
                });
            }
            Err(_) => tracing::error!("No runtime available, browser session leaked"),
        }
    }
}
