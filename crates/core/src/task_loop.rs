//! Task loop - the plan/act state machine.

use crate::error::TaskError;
use crate::metrics::Metrics;
use crate::planner::Planner;
use crate::types::*;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_STEPS: usize = 10;

/// Performs the side effect behind an action.
///
/// Implementations never fail: handler errors are reported as
/// `Observation { status: Error, .. }`.
#[async_trait]
pub trait StepExecutor: Send {
    async fn execute(&mut self, action: &Action) -> Observation;

    /// Tear down anything acquired while executing steps.
    async fn release(&mut self) {}
}

#[derive(Debug)]
enum LoopState {
    Running,
    Finished(String),
    Errored(TaskError),
}

/// Drives planner and executor until the task finishes, fails, or runs out
/// of steps.
pub struct TaskLoop {
    planner: Arc<dyn Planner>,
    max_steps: usize,
    metrics: Option<Arc<Metrics>>,
}

impl TaskLoop {
    pub fn new(planner: Arc<dyn Planner>, max_steps: usize) -> Self {
        Self {
            planner,
            max_steps,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Execute a task to completion.
    ///
    /// The executor is released on every exit path before returning.
    pub async fn run<E>(&self, task: &str, executor: &mut E) -> TaskOutcome
    where
        E: StepExecutor + ?Sized,
    {
        info!("Starting task: {}", task);
        if let Some(metrics) = &self.metrics {
            metrics.inc_tasks_started();
        }

        let outcome = self.drive(task, executor).await;

        debug!("Releasing executor resources");
        executor.release().await;

        if let Some(metrics) = &self.metrics {
            if outcome.is_completed() {
                metrics.inc_tasks_completed();
            } else {
                metrics.inc_tasks_failed();
            }
        }

        outcome
    }

    async fn drive<E>(&self, task: &str, executor: &mut E) -> TaskOutcome
    where
        E: StepExecutor + ?Sized,
    {
        let mut history: Vec<HistoryEntry> = Vec::new();
        let mut state = LoopState::Running;

        for step_index in 0..self.max_steps {
            debug!("Task iteration {}/{}", step_index + 1, self.max_steps);

            let PlannedStep { thought, action } = self.planner.plan(task, &history).await;

            state = match action {
                Action::Finish {
                    message,
                    succeeded: true,
                } => LoopState::Finished(message),
                Action::Finish {
                    message,
                    succeeded: false,
                } => LoopState::Errored(TaskError::PlanningExhausted(message)),
                action => {
                    info!("Step {}: {}", step_index, action.describe());
                    let observation = executor.execute(&action).await;
                    if let Some(metrics) = &self.metrics {
                        metrics.inc_steps_executed();
                    }

                    let next = if observation.is_error() {
                        warn!("Step {} failed: {}", step_index, observation.message);
                        if let Some(metrics) = &self.metrics {
                            metrics.inc_step_failures();
                        }
                        LoopState::Errored(TaskError::HandlerError(observation.message.clone()))
                    } else {
                        LoopState::Running
                    };

                    history.push(HistoryEntry {
                        step_index,
                        thought,
                        action,
                        observation,
                    });
                    next
                }
            };

            if !matches!(state, LoopState::Running) {
                break;
            }
        }

        match state {
            LoopState::Finished(message) => {
                info!("Task finished after {} steps", history.len());
                TaskOutcome::completed(message, history)
            }
            LoopState::Errored(error) => {
                warn!("Task failed: {}", error);
                TaskOutcome::failed(&error, history)
            }
            LoopState::Running => {
                let error = TaskError::PlanningExhausted(format!(
                    "max steps reached ({})",
                    self.max_steps
                ));
                warn!("Task failed: {}", error);
                TaskOutcome::failed(&error, history)
            }
        }
    }
}
