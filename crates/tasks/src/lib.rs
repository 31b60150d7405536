use autopilot_core::TaskOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Task not found: {0}")]
    NotFound(String),
    #[error("Task already finished: {0}")]
    AlreadyFinished(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// Bookkeeping for one task run. Step history is not kept here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    pub id: String,
    pub description: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub final_message: Option<String>,
    pub error: Option<String>,
    pub steps: usize,
}

pub struct TaskManager {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    state_file: Option<PathBuf>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            state_file: None,
        }
    }

    pub fn with_state_file<P: AsRef<Path>>(state_file: P) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            state_file: Some(state_file.as_ref().to_path_buf()),
        }
    }

    /// Reload persisted runs. Runs still marked running did not survive the
    /// previous process and are marked failed.
    pub async fn restore(&self) -> Result<usize, RegistryError> {
        let Some(state_file) = &self.state_file else {
            return Ok(0);
        };

        if !state_file.exists() {
            return Ok(0);
        }

        let content = tokio::fs::read_to_string(state_file).await?;
        let mut records: Vec<TaskRecord> = serde_json::from_str(&content)?;
        let now = Utc::now();

        for record in &mut records {
            if record.status == RunStatus::Running {
                record.status = RunStatus::Failed;
                record.error = Some("interrupted by restart".to_string());
                record.updated_at = now;
            }
        }

        let restored = records.len();
        let mut tasks = self.tasks.write().await;
        tasks.clear();
        tasks.extend(records.into_iter().map(|r| (r.id.clone(), r)));
        drop(tasks);

        self.persist_state().await?;
        tracing::info!("Restored {} task records", restored);
        Ok(restored)
    }

    /// Register a new running task and return its id.
    pub async fn begin(&self, description: &str) -> Result<String, RegistryError> {
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();
        let record = TaskRecord {
            id: id.clone(),
            description: description.to_string(),
            status: RunStatus::Running,
            created_at: now,
            updated_at: now,
            final_message: None,
            error: None,
            steps: 0,
        };

        self.tasks.write().await.insert(id.clone(), record);
        self.persist_state().await?;

        tracing::info!("Task {} started", id);
        Ok(id)
    }

    /// Record the outcome of a running task.
    pub async fn finish(&self, id: &str, outcome: &TaskOutcome) -> Result<TaskRecord, RegistryError> {
        let mut tasks = self.tasks.write().await;
        let record = tasks
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if record.status != RunStatus::Running {
            return Err(RegistryError::AlreadyFinished(id.to_string()));
        }

        record.status = if outcome.is_completed() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        record.final_message = outcome.final_message.clone();
        record.error = outcome.error_message.clone();
        record.steps = outcome.history.len();
        record.updated_at = Utc::now();

        let updated = record.clone();
        drop(tasks);
        self.persist_state().await?;

        tracing::info!("Task {} finished: {:?}", id, updated.status);
        Ok(updated)
    }

    pub async fn get(&self, id: &str) -> Result<TaskRecord, RegistryError> {
        self.tasks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// All runs, newest first.
    pub async fn list(&self) -> Vec<TaskRecord> {
        let tasks = self.tasks.read().await;
        let mut records: Vec<TaskRecord> = tasks.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub async fn running_count(&self) -> usize {
        self.tasks
            .read()
            .await
            .values()
            .filter(|r| r.status == RunStatus::Running)
            .count()
    }

    async fn persist_state(&self) -> Result<(), RegistryError> {
        let Some(state_file) = &self.state_file else {
            return Ok(());
        };

        let snapshot = self.list().await;

        if let Some(parent) = state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_file = state_file.with_extension("tmp");
        let content = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(&tmp_file, content).await?;
        tokio::fs::rename(tmp_file, state_file).await?;

        Ok(())
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopilot_core::{TaskError, TaskOutcome};

    #[tokio::test]
    async fn test_begin_and_finish() {
        let manager = TaskManager::new();

        let id = manager.begin("Summarize the report").await.unwrap();
        assert_eq!(manager.get(&id).await.unwrap().status, RunStatus::Running);
        assert_eq!(manager.running_count().await, 1);

        let record = manager
            .finish(&id, &TaskOutcome::completed("done", vec![]))
            .await
            .unwrap();

        assert_eq!(record.status, RunStatus::Completed);
        assert_eq!(record.final_message.as_deref(), Some("done"));
        assert_eq!(manager.running_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_outcome() {
        let manager = TaskManager::new();
        let id = manager.begin("anything").await.unwrap();

        let error = TaskError::HandlerError("boom".into());
        let record = manager.finish(&id, &TaskOutcome::failed(&error, vec![])).await.unwrap();

        assert_eq!(record.status, RunStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("Handler error: boom"));
    }

    #[tokio::test]
    async fn test_finish_twice_rejected() {
        let manager = TaskManager::new();
        let id = manager.begin("anything").await.unwrap();
        let outcome = TaskOutcome::completed("ok", vec![]);

        manager.finish(&id, &outcome).await.unwrap();
        let result = manager.finish(&id, &outcome).await;
        assert!(matches!(result, Err(RegistryError::AlreadyFinished(_))));
    }

    #[tokio::test]
    async fn test_unknown_task() {
        let manager = TaskManager::new();
        assert!(matches!(
            manager.get("missing").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let manager = TaskManager::new();
        let first = manager.begin("first").await.unwrap();
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        let second = manager.begin("second").await.unwrap();

        let ids: Vec<String> = manager.list().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[tokio::test]
    async fn test_restore_marks_running_as_failed() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_file = temp_dir.path().join("state/tasks.json");

        let (running, done) = {
            let manager = TaskManager::with_state_file(&state_file);
            let running = manager.begin("left running").await.unwrap();
            let done = manager.begin("finished").await.unwrap();
            manager
                .finish(&done, &TaskOutcome::completed("ok", vec![]))
                .await
                .unwrap();
            (running, done)
        };

        let manager = TaskManager::with_state_file(&state_file);
        assert_eq!(manager.restore().await.unwrap(), 2);

        let interrupted = manager.get(&running).await.unwrap();
        assert_eq!(interrupted.status, RunStatus::Failed);
        assert_eq!(interrupted.error.as_deref(), Some("interrupted by restart"));
        assert_eq!(manager.get(&done).await.unwrap().status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_restore_without_state_file() {
        let manager = TaskManager::new();
        assert_eq!(manager.restore().await.unwrap(), 0);
    }
}
