//! Application service wiring the task loop, registry, and memory vault.

use crate::config::Config;
use crate::resources::SystemResources;
use anyhow::{Context, Result};
use autopilot_core::intent::{extract_application, extract_run_command};
use autopilot_core::{
    classify, Action, Intent, IntentKind, Metrics, MetricsSnapshot, Observation, Planner,
    RulePlanner, StepExecutor, TaskError, TaskLoop, TaskOutcome,
};
use autopilot_memory::{Memory, MemoryError, MemoryRequest, MemoryVault, VaultStatus};
use autopilot_tasks::{RegistryError, TaskManager, TaskRecord};
use autopilot_tools::{
    BrowserLauncher, CloudProvider, DispatcherFactory, DispatcherSettings, HttpCloudProvider,
    WebDriverLauncher,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

const CAPABILITIES: &[&str] = &[
    "web_automation",
    "cloud_operations",
    "system_control",
    "code_generation",
    "file_operations",
];

/// A finished task run as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
    pub task_id: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse {
    pub command: String,
    pub intent: Intent,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessRates {
    pub tasks: f64,
    pub steps: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub status: &'static str,
    pub version: &'static str,
    pub started_at: DateTime<Utc>,
    pub modules: Value,
    pub metrics: MetricsSnapshot,
    pub success_rates: SuccessRates,
    pub memory: VaultStatus,
    pub resources: SystemResources,
}

pub struct AutopilotService {
    task_loop: TaskLoop,
    rule_names: Vec<&'static str>,
    dispatchers: DispatcherFactory,
    tasks: TaskManager,
    memories: MemoryVault,
    metrics: Arc<Metrics>,
    started_at: DateTime<Utc>,
}

impl AutopilotService {
    pub fn new(
        planner: Arc<dyn Planner>,
        max_steps: usize,
        dispatchers: DispatcherFactory,
        tasks: TaskManager,
        memories: MemoryVault,
    ) -> Self {
        let metrics = Metrics::new();
        Self {
            task_loop: TaskLoop::new(planner, max_steps).with_metrics(metrics.clone()),
            rule_names: Vec::new(),
            dispatchers,
            tasks,
            memories,
            metrics,
            started_at: Utc::now(),
        }
    }

    /// Build the production service: rule planner, WebDriver browser, HTTP
    /// cloud client, and on-disk storage under `storage.data_dir`.
    pub fn from_config(config: &Config) -> Self {
        let planner = RulePlanner::new();
        let rule_names = planner.rule_names();

        let launcher: Arc<dyn BrowserLauncher> = Arc::new(
            WebDriverLauncher::new(&config.browser.webdriver_url)
                .with_headless(config.browser.headless)
                .with_navigation_timeout(config.browser.navigation_timeout_ms),
        );
        let cloud: Arc<dyn CloudProvider> = Arc::new(
            HttpCloudProvider::new(&config.cloud.endpoint, &config.cloud.region)
                .with_token(config.cloud.token()),
        );
        let settings = DispatcherSettings {
            workspace: config.shell.workspace.clone(),
            shell: config.shell.program.clone(),
            command_timeout_ms: config.shell.timeout_ms,
            navigation_timeout_ms: config.browser.navigation_timeout_ms,
            applications: config.shell.applications.clone(),
        };

        let mut service = Self::new(
            Arc::new(planner),
            config.task.max_steps,
            DispatcherFactory::new(settings, launcher, cloud),
            TaskManager::with_state_file(config.storage.task_state_file()),
            MemoryVault::new(config.storage.memory_dir())
                .with_default_user(&config.storage.default_user),
        );
        service.rule_names = rule_names;
        service
    }

    /// Load persisted memories and task records.
    pub async fn initialize(&self) -> Result<()> {
        self.memories
            .initialize()
            .await
            .context("Failed to initialize memory vault")?;
        self.tasks
            .restore()
            .await
            .context("Failed to restore task registry")?;
        Ok(())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run a task through the planner/executor loop with its own dispatcher.
    pub async fn execute_complex_task(&self, description: &str) -> Result<TaskRun> {
        let task_id = self.tasks.begin(description).await?;
        let mut dispatcher = self.dispatchers.create();

        let outcome = self.task_loop.run(description, &mut dispatcher).await;
        self.tasks.finish(&task_id, &outcome).await?;

        Ok(TaskRun { task_id, outcome })
    }

    /// Execute one raw action outside of any task loop.
    pub async fn run_step(&self, raw: Value) -> Result<Observation, TaskError> {
        let action = Action::from_value(raw)?;
        if action.is_finish() {
            return Err(TaskError::InvalidAction(
                "finish is only meaningful inside a task".into(),
            ));
        }

        Ok(self.run_single(action).await)
    }

    /// Classify a free-text command and route it.
    pub async fn process_command(&self, text: &str) -> Result<CommandResponse> {
        let intent = classify(text);
        tracing::info!("Command classified as {:?} ({})", intent.kind, intent.category);

        let result = if intent.runs_task_loop() {
            let run = self.execute_complex_task(text).await?;
            serde_json::to_value(run)?
        } else {
            match intent.kind {
                IntentKind::SystemOperation => self.system_operation(text).await,
                IntentKind::InformationRequest => self.information_request(text).await,
                _ => general_response(text),
            }
        };

        Ok(CommandResponse {
            command: text.to_string(),
            intent,
            result,
        })
    }

    async fn system_operation(&self, text: &str) -> Value {
        if let Some(application) = extract_application(text) {
            let observation = self.run_single(Action::launch_application(application)).await;
            return json!({
                "status": observation_status(&observation),
                "message": format!("Application {} launched", application),
                "result": observation,
            });
        }

        let Some(command) = extract_run_command(text) else {
            return json!({
                "status": "error",
                "message": format!("Unknown system operation: {}", text),
            });
        };

        let observation = self.run_single(Action::run_command(command)).await;
        json!({
            "status": observation_status(&observation),
            "message": "System command executed",
            "result": observation,
        })
    }

    async fn run_single(&self, action: Action) -> Observation {
        let mut dispatcher = self.dispatchers.create();
        let observation = dispatcher.execute(&action).await;
        dispatcher.release().await;
        observation
    }

    async fn information_request(&self, text: &str) -> Value {
        let lower = text.to_lowercase();
        if lower.contains("system") && lower.contains("status") {
            json!({
                "status": "success",
                "message": "System status retrieved",
                "data": SystemResources::capture_async().await,
            })
        } else if lower.contains("capabilities") || lower.contains("what can you do") {
            json!({
                "status": "success",
                "message": "Capabilities",
                "data": { "capabilities": CAPABILITIES },
            })
        } else {
            json!({
                "status": "success",
                "message": "Information request processed",
                "data": {
                    "response": "I can run shell commands, drive a browser, manage files, generate code and provision cloud resources."
                },
            })
        }
    }

    pub async fn status(&self) -> StatusReport {
        let metrics = self.metrics.snapshot();
        StatusReport {
            status: "online",
            version: env!("CARGO_PKG_VERSION"),
            started_at: self.started_at,
            modules: json!({
                "planner": { "state": "active", "rules": self.rule_names },
                "executor": {
                    "state": "active",
                    "max_steps": self.task_loop.max_steps(),
                    "running_tasks": self.tasks.running_count().await,
                },
                "memory": { "state": "active" },
            }),
            success_rates: SuccessRates {
                tasks: metrics.task_success_rate(),
                steps: metrics.step_success_rate(),
            },
            metrics,
            memory: self.memories.status().await,
            resources: SystemResources::capture_async().await,
        }
    }

    pub async fn list_tasks(&self) -> Vec<TaskRecord> {
        self.tasks.list().await
    }

    pub async fn get_task(&self, id: &str) -> Result<TaskRecord, RegistryError> {
        self.tasks.get(id).await
    }

    pub async fn create_memory(&self, request: MemoryRequest) -> Result<Memory, MemoryError> {
        self.memories.create(request).await
    }

    pub async fn list_memories(&self, user: Option<&str>, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        self.memories.list(user, limit).await
    }

    pub async fn search_memories(&self, query: &str, user: Option<&str>) -> Vec<Memory> {
        self.memories.search(query, user).await
    }
}

fn observation_status(observation: &Observation) -> &'static str {
    if observation.is_success() {
        "success"
    } else {
        "error"
    }
}

fn general_response(text: &str) -> Value {
    json!({
        "status": "success",
        "message": "Command processed",
        "response": format!("Understood: {}", text),
        "suggestions": [
            "Be more specific about what you want created or automated",
            "Try 'Create a solar data pipeline on AWS'",
            "Use 'run <command>' to execute a shell command",
        ],
    })
}
