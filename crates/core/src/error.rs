use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error("Planning exhausted: {0}")]
    PlanningExhausted(String),
    #[error("Handler error: {0}")]
    HandlerError(String),
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}
