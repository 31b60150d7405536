use crate::error::TaskError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type tags accepted in the `type` field of an action.
pub const ACTION_TYPES: &[&str] = &[
    "file_operation",
    "system_operation",
    "browser_automation",
    "cloud_operation",
    "code_generation",
    "finish",
];

/// A single instruction produced by a planner for the executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    FileOperation {
        operation: FileOperation,
    },
    SystemOperation {
        operation: SystemOperation,
    },
    BrowserAutomation {
        operation: BrowserOperation,
    },
    CloudOperation {
        operation: CloudOperation,
    },
    CodeGeneration {
        language: String,
        output_path: String,
    },
    Finish {
        message: String,
        #[serde(default = "default_succeeded")]
        succeeded: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileOperation {
    CreateFile {
        filename: String,
        #[serde(default)]
        content: String,
    },
    ReadFile {
        filename: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SystemOperation {
    RunCommand { command: String },
    InstallPackage { package: String },
    CreateDirectory { directory: String },
    /// Start a known desktop application without waiting for it.
    LaunchApplication { application: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BrowserOperation {
    Navigate { url: String },
    ExtractText { selector: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CloudOperation {
    CreateFunction {
        function_name: String,
        #[serde(default = "default_runtime")]
        runtime: String,
    },
    CreateBucket {
        bucket_name: String,
    },
    DeployPipeline {
        components: Vec<PipelineComponent>,
    },
}

/// One resource provisioned as part of a pipeline deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineComponent {
    Function {
        function_name: String,
        #[serde(default = "default_runtime")]
        runtime: String,
    },
    Bucket {
        bucket_name: String,
    },
}

fn default_succeeded() -> bool {
    true
}

fn default_runtime() -> String {
    "python3.9".to_string()
}

impl Action {
    /// Parse an action from untyped JSON, separating unknown type tags
    /// from malformed payloads.
    pub fn from_value(value: Value) -> Result<Self, TaskError> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| TaskError::InvalidAction("missing 'type' field".to_string()))?;

        if !ACTION_TYPES.contains(&tag) {
            return Err(TaskError::UnknownActionType(tag.to_string()));
        }

        serde_json::from_value(value).map_err(|e| TaskError::InvalidAction(e.to_string()))
    }

    /// The action's `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::FileOperation { .. } => "file_operation",
            Action::SystemOperation { .. } => "system_operation",
            Action::BrowserAutomation { .. } => "browser_automation",
            Action::CloudOperation { .. } => "cloud_operation",
            Action::CodeGeneration { .. } => "code_generation",
            Action::Finish { .. } => "finish",
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Action::Finish { .. })
    }

    pub fn finish(message: impl Into<String>) -> Self {
        Action::Finish {
            message: message.into(),
            succeeded: true,
        }
    }

    pub fn give_up(message: impl Into<String>) -> Self {
        Action::Finish {
            message: message.into(),
            succeeded: false,
        }
    }

    pub fn read_file(filename: impl Into<String>) -> Self {
        Action::FileOperation {
            operation: FileOperation::ReadFile {
                filename: filename.into(),
            },
        }
    }

    pub fn create_file(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Action::FileOperation {
            operation: FileOperation::CreateFile {
                filename: filename.into(),
                content: content.into(),
            },
        }
    }

    pub fn run_command(command: impl Into<String>) -> Self {
        Action::SystemOperation {
            operation: SystemOperation::RunCommand {
                command: command.into(),
            },
        }
    }

    pub fn launch_application(application: impl Into<String>) -> Self {
        Action::SystemOperation {
            operation: SystemOperation::LaunchApplication {
                application: application.into(),
            },
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Action::BrowserAutomation {
            operation: BrowserOperation::Navigate { url: url.into() },
        }
    }

    pub fn extract_text(selector: impl Into<String>) -> Self {
        Action::BrowserAutomation {
            operation: BrowserOperation::ExtractText {
                selector: selector.into(),
            },
        }
    }

    /// Short human-readable label used in logs.
    pub fn describe(&self) -> String {
        match self {
            Action::FileOperation { operation } => match operation {
                FileOperation::CreateFile { filename, .. } => format!("create file {}", filename),
                FileOperation::ReadFile { filename } => format!("read file {}", filename),
            },
            Action::SystemOperation { operation } => match operation {
                SystemOperation::RunCommand { command } => format!("run `{}`", command),
                SystemOperation::InstallPackage { package } => format!("install {}", package),
                SystemOperation::CreateDirectory { directory } => {
                    format!("create directory {}", directory)
                }
                SystemOperation::LaunchApplication { application } => {
                    format!("launch {}", application)
                }
            },
            Action::BrowserAutomation { operation } => match operation {
                BrowserOperation::Navigate { url } => format!("navigate to {}", url),
                BrowserOperation::ExtractText { selector } => format!("extract text of {}", selector),
            },
            Action::CloudOperation { operation } => match operation {
                CloudOperation::CreateFunction { function_name, .. } => {
                    format!("create function {}", function_name)
                }
                CloudOperation::CreateBucket { bucket_name } => {
                    format!("create bucket {}", bucket_name)
                }
                CloudOperation::DeployPipeline { components } => {
                    format!("deploy pipeline ({} components)", components.len())
                }
            },
            Action::CodeGeneration {
                language,
                output_path,
            } => format!("generate {} code into {}", language, output_path),
            Action::Finish { message, .. } => format!("finish: {}", message),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObservationStatus {
    Success,
    Error,
}

/// Structured result of executing one action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub status: ObservationStatus,
    pub message: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Observation {
    /// Successful observation. Non-object payloads are stored under `value`.
    pub fn success(message: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            status: ObservationStatus::Success,
            message: message.into(),
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ObservationStatus::Error,
            message: message.into(),
            payload: Map::new(),
        }
    }

    /// Error observation that still carries handler output.
    pub fn error_with_payload(message: impl Into<String>, payload: Value) -> Self {
        let mut observation = Self::success(message, payload);
        observation.status = ObservationStatus::Error;
        observation
    }

    pub fn is_success(&self) -> bool {
        self.status == ObservationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == ObservationStatus::Error
    }

    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// What the planner proposes next, with its justification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedStep {
    pub thought: String,
    pub action: Action,
}

impl PlannedStep {
    pub fn new(thought: impl Into<String>, action: Action) -> Self {
        Self {
            thought: thought.into(),
            action,
        }
    }
}

/// One executed step of a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub step_index: usize,
    pub thought: String,
    pub action: Action,
    pub observation: Observation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Completed,
    Error,
}

/// Final result of one task invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub history: Vec<HistoryEntry>,
}

impl TaskOutcome {
    pub fn completed(message: impl Into<String>, history: Vec<HistoryEntry>) -> Self {
        Self {
            status: TaskStatus::Completed,
            final_message: Some(message.into()),
            error_message: None,
            history,
        }
    }

    pub fn failed(error: &TaskError, history: Vec<HistoryEntry>) -> Self {
        Self {
            status: TaskStatus::Error,
            final_message: None,
            error_message: Some(error.to_string()),
            history,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
