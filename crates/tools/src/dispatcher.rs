//! Step dispatcher - routes each action to its handler.

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::cloud::CloudProvider;
use crate::error::ToolError;
use crate::execution_context::{default_applications, ExecutionContext};
use crate::handlers::{codegen, file_ops, shell};
use async_trait::async_trait;
use autopilot_core::{
    Action, BrowserOperation, CloudOperation, FileOperation, Observation, PipelineComponent,
    StepExecutor, SystemOperation,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Executes actions for a single task.
///
/// Owns its browser session; create one dispatcher per task through
/// [`DispatcherFactory`].
pub struct StepDispatcher {
    ctx: ExecutionContext,
    browser: BrowserSession,
    cloud: Arc<dyn CloudProvider>,
}

impl StepDispatcher {
    pub fn new(
        ctx: ExecutionContext,
        launcher: Arc<dyn BrowserLauncher>,
        cloud: Arc<dyn CloudProvider>,
    ) -> Self {
        Self {
            ctx,
            browser: BrowserSession::new(launcher),
            cloud,
        }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn browser_active(&self) -> bool {
        self.browser.is_active()
    }

    async fn dispatch(&mut self, action: &Action) -> Result<Observation, ToolError> {
        match action {
            Action::FileOperation { operation } => match operation {
                FileOperation::CreateFile { filename, content } => {
                    file_ops::create_file(&self.ctx, filename, content).await
                }
                FileOperation::ReadFile { filename } => file_ops::read_file(&self.ctx, filename).await,
            },
            Action::SystemOperation { operation } => match operation {
                SystemOperation::RunCommand { command } => shell::run_command(&self.ctx, command).await,
                SystemOperation::InstallPackage { package } => {
                    shell::install_package(&self.ctx, package).await
                }
                SystemOperation::CreateDirectory { directory } => {
                    shell::create_directory(&self.ctx, directory).await
                }
                SystemOperation::LaunchApplication { application } => {
                    shell::launch_application(&self.ctx, application).await
                }
            },
            Action::BrowserAutomation { operation } => self.browse(operation).await,
            Action::CloudOperation { operation } => self.cloud_operation(operation).await,
            Action::CodeGeneration {
                language,
                output_path,
            } => codegen::generate(&self.ctx, language, output_path).await,
            Action::Finish { .. } => Err(ToolError::Validation(
                "finish actions are handled by the task loop".into(),
            )),
        }
    }

    async fn browse(&mut self, operation: &BrowserOperation) -> Result<Observation, ToolError> {
        let driver = self.browser.driver().await?;
        match operation {
            BrowserOperation::Navigate { url } => {
                driver.navigate(url).await?;
                let current_url = driver.current_url().await?;
                Ok(Observation::success(
                    format!("Navigated to {}", url),
                    json!({ "url": url, "current_url": current_url }),
                ))
            }
            BrowserOperation::ExtractText { selector } => {
                let text = driver.extract_text(selector).await?;
                Ok(Observation::success(
                    format!("Extracted text from {}", selector),
                    json!({ "selector": selector, "text": text }),
                ))
            }
        }
    }

    async fn cloud_operation(&mut self, operation: &CloudOperation) -> Result<Observation, ToolError> {
        match operation {
            CloudOperation::CreateFunction {
                function_name,
                runtime,
            } => {
                let info = self.cloud.create_function(function_name, runtime).await?;
                Ok(Observation::success(
                    format!("Function {} created", function_name),
                    to_payload(&info)?,
                ))
            }
            CloudOperation::CreateBucket { bucket_name } => {
                let info = self.cloud.create_bucket(bucket_name).await?;
                Ok(Observation::success(
                    format!("Bucket {} created", bucket_name),
                    to_payload(&info)?,
                ))
            }
            CloudOperation::DeployPipeline { components } => {
                let mut deployed = Vec::with_capacity(components.len());
                for component in components {
                    let result = match component {
                        PipelineComponent::Function {
                            function_name,
                            runtime,
                        } => to_payload(&self.cloud.create_function(function_name, runtime).await?)?,
                        PipelineComponent::Bucket { bucket_name } => {
                            to_payload(&self.cloud.create_bucket(bucket_name).await?)?
                        }
                    };
                    deployed.push(result);
                }
                Ok(Observation::success(
                    format!("Pipeline deployed ({} components)", deployed.len()),
                    json!({ "components": deployed }),
                ))
            }
        }
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::Execution(e.to_string()))
}

#[async_trait]
impl StepExecutor for StepDispatcher {
    async fn execute(&mut self, action: &Action) -> Observation {
        match self.dispatch(action).await {
            Ok(observation) => observation,
            Err(e) => {
                tracing::warn!(
                    task_ref = %self.ctx.task_ref,
                    "Handler for {} failed: {}",
                    action.kind(),
                    e
                );
                Observation::error(e.to_string())
            }
        }
    }

    async fn release(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(task_ref = %self.ctx.task_ref, "Browser teardown failed: {}", e);
        }
    }
}

/// Settings applied to every dispatcher a factory creates.
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    pub workspace: PathBuf,
    pub shell: String,
    pub command_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub applications: BTreeMap<String, String>,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("."),
            shell: "sh".to_string(),
            command_timeout_ms: 30_000,
            navigation_timeout_ms: 15_000,
            applications: default_applications(),
        }
    }
}

/// Hands out one isolated [`StepDispatcher`] per task while sharing the
/// browser launcher and cloud client.
#[derive(Clone)]
pub struct DispatcherFactory {
    settings: DispatcherSettings,
    launcher: Arc<dyn BrowserLauncher>,
    cloud: Arc<dyn CloudProvider>,
}

impl DispatcherFactory {
    pub fn new(
        settings: DispatcherSettings,
        launcher: Arc<dyn BrowserLauncher>,
        cloud: Arc<dyn CloudProvider>,
    ) -> Self {
        Self {
            settings,
            launcher,
            cloud,
        }
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    pub fn create(&self) -> StepDispatcher {
        let ctx = ExecutionContext::new(self.settings.workspace.clone())
            .with_shell(self.settings.shell.clone())
            .with_command_timeout(self.settings.command_timeout_ms)
            .with_navigation_timeout(self.settings.navigation_timeout_ms)
            .with_applications(self.settings.applications.clone());
        tracing::debug!("Created dispatcher {}", ctx.task_ref);
        StepDispatcher::new(ctx, self.launcher.clone(), self.cloud.clone())
    }
}
