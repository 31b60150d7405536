use crate::service::AutopilotService;
use autopilot_core::TaskError;
use autopilot_memory::{MemoryError, MemoryRequest};
use autopilot_tasks::RegistryError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub type AppState = Arc<AutopilotService>;

const DEFAULT_MEMORY_LIMIT: usize = 50;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/status", get(status))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:id", get(get_task))
        .route("/api/steps", axum::routing::post(run_step))
        .route("/api/command", axum::routing::post(command))
        .route("/api/memories", get(list_memories).post(create_memory))
        .route("/api/memories/search", get(search_memories))
        .with_state(state)
}

/// JSON error body `{error, message}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: "NotFound",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: "InternalError",
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}: {}", self.error, self.message);
        }
        let body = Json(json!({ "error": self.error, "message": self.message }));
        (self.status, body).into_response()
    }
}

impl From<TaskError> for ApiError {
    fn from(e: TaskError) -> Self {
        match &e {
            TaskError::UnknownActionType(_) => Self::bad_request("UnknownActionType", e.to_string()),
            TaskError::InvalidAction(_) => Self::bad_request("InvalidAction", e.to_string()),
            TaskError::PlanningExhausted(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "PlanningExhausted",
                message: e.to_string(),
            },
            TaskError::HandlerError(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "HandlerError",
                message: e.to_string(),
            },
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => Self::not_found(format!("Task not found: {}", id)),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<MemoryError> for ApiError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::Invalid(_) => Self::bad_request("InvalidMemory", e.to_string()),
            _ => Self::internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            error: "InvalidRequest",
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: rejection.status(),
            error: "InvalidRequest",
            message: rejection.body_text(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::internal(format!("{:#}", e))
    }
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Autopilot backend online" }))
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.status().await)
}

#[derive(Debug, Deserialize)]
pub struct TaskRequest {
    pub description: String,
}

async fn create_task(
    State(state): State<AppState>,
    request: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = request?;
    let description = request.description.trim();
    if description.is_empty() {
        return Err(ApiError::bad_request("InvalidTask", "description cannot be empty"));
    }

    let run = state.execute_complex_task(description).await?;
    let code = if run.outcome.is_completed() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((code, Json(run)).into_response())
}

async fn list_tasks(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tasks": state.list_tasks().await }))
}

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<autopilot_tasks::TaskRecord>, ApiError> {
    Ok(Json(state.get_task(&id).await?))
}

async fn run_step(
    State(state): State<AppState>,
    raw: Result<Json<Value>, JsonRejection>,
) -> Result<Json<autopilot_core::Observation>, ApiError> {
    let Json(raw) = raw?;
    Ok(Json(state.run_step(raw).await?))
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub text: String,
}

async fn command(
    State(state): State<AppState>,
    request: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<crate::service::CommandResponse>, ApiError> {
    let Json(request) = request?;
    if request.text.trim().is_empty() {
        return Err(ApiError::bad_request("InvalidCommand", "text cannot be empty"));
    }
    Ok(Json(state.process_command(request.text.trim()).await?))
}

#[derive(Debug, Deserialize)]
pub struct MemoryListQuery {
    pub user: Option<String>,
    pub limit: Option<usize>,
}

async fn list_memories(
    State(state): State<AppState>,
    query: Result<Query<MemoryListQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_MEMORY_LIMIT);
    let memories = state.list_memories(query.user.as_deref(), limit).await?;
    Ok(Json(json!({ "memories": memories })))
}

async fn create_memory(
    State(state): State<AppState>,
    request: Result<Json<MemoryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = request?;
    let memory = state.create_memory(request).await?;
    Ok((StatusCode::CREATED, Json(memory)))
}

#[derive(Debug, Deserialize)]
pub struct MemorySearchQuery {
    pub q: String,
    pub user: Option<String>,
}

async fn search_memories(
    State(state): State<AppState>,
    query: Result<Query<MemorySearchQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query?;
    let memories = state.search_memories(&query.q, query.user.as_deref()).await;
    Ok(Json(json!({ "memories": memories })))
}
