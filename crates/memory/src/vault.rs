use crate::analysis::{analyze_emotion, calculate_importance, extract_tags};
use crate::types::*;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

pub const DEFAULT_USER: &str = "default";

const MEMORIES_FILE: &str = "memories.json";
const JOURNAL_FILE: &str = "emotional_journal.json";
const JOURNAL_LIMIT: usize = 1000;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid memory: {0}")]
    Invalid(String),
}

#[derive(Default)]
struct VaultState {
    // insertion order
    memories: Vec<Memory>,
    journal: Vec<JournalEntry>,
}

/// Tagged, emotion-annotated memory store persisted as JSON.
pub struct MemoryVault {
    base_path: PathBuf,
    default_user: String,
    state: RwLock<VaultState>,
}

impl MemoryVault {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            default_user: DEFAULT_USER.to_string(),
            state: RwLock::new(VaultState::default()),
        }
    }

    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = user.into();
        self
    }

    pub fn default_user(&self) -> &str {
        &self.default_user
    }

    /// Create the data directory and load whatever was stored before.
    pub async fn initialize(&self) -> Result<(), MemoryError> {
        fs::create_dir_all(&self.base_path).await?;

        let memories: Vec<Memory> = load_json(&self.base_path.join(MEMORIES_FILE)).await?;
        let journal: Vec<JournalEntry> = load_json(&self.base_path.join(JOURNAL_FILE)).await?;

        tracing::info!(
            "Memory vault initialized at {:?} ({} memories, {} journal entries)",
            self.base_path,
            memories.len(),
            journal.len()
        );

        let mut state = self.state.write().await;
        state.memories = memories;
        state.journal = journal;
        Ok(())
    }

    pub async fn create(&self, request: MemoryRequest) -> Result<Memory, MemoryError> {
        if request.content.trim().is_empty() {
            return Err(MemoryError::Invalid("content is empty".into()));
        }

        let content = request.content;
        let memory = Memory {
            id: uuid::Uuid::new_v4().to_string(),
            kind: request.kind,
            user: request.user.unwrap_or_else(|| self.default_user.clone()),
            timestamp: Utc::now(),
            emotion: analyze_emotion(&content),
            importance: calculate_importance(&content),
            tags: extract_tags(&content),
            access_count: 0,
            last_accessed: None,
            content,
        };

        let preview: String = memory.content.chars().take(100).collect();
        let entry_text = format!("New memory recorded: {}...", preview);
        let journal_entry = JournalEntry {
            id: uuid::Uuid::new_v4().to_string(),
            emotion: analyze_emotion(&entry_text),
            entry: entry_text,
            timestamp: memory.timestamp,
        };

        let mut state = self.state.write().await;
        state.memories.push(memory.clone());
        state.journal.push(journal_entry);
        if state.journal.len() > JOURNAL_LIMIT {
            let excess = state.journal.len() - JOURNAL_LIMIT;
            state.journal.drain(..excess);
        }

        self.save(&state).await?;
        tracing::info!("Memory created: {} ({})", memory.id, memory.emotion);
        Ok(memory)
    }

    /// The user's memories, newest first. Marks each returned memory as accessed.
    pub async fn list(&self, user: Option<&str>, limit: usize) -> Result<Vec<Memory>, MemoryError> {
        let user = user.unwrap_or(self.default_user.as_str());
        let now = Utc::now();

        let mut state = self.state.write().await;
        let mut indices: Vec<usize> = (0..state.memories.len())
            .rev()
            .filter(|&i| state.memories[i].user == user)
            .collect();
        // stable sort keeps later insertions first on equal timestamps
        indices.sort_by(|&a, &b| state.memories[b].timestamp.cmp(&state.memories[a].timestamp));
        indices.truncate(limit);

        let mut listed = Vec::with_capacity(indices.len());
        for i in indices {
            let memory = &mut state.memories[i];
            memory.access_count += 1;
            memory.last_accessed = Some(now);
            listed.push(memory.clone());
        }

        if !listed.is_empty() {
            self.save(&state).await?;
        }
        Ok(listed)
    }

    /// Case-insensitive match on content, tags, or exact emotion, ordered by
    /// importance then recency.
    pub async fn search(&self, query: &str, user: Option<&str>) -> Vec<Memory> {
        let user = user.unwrap_or(self.default_user.as_str());
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let state = self.state.read().await;
        let mut matches: Vec<Memory> = state
            .memories
            .iter()
            .rev()
            .filter(|m| m.user == user)
            .filter(|m| {
                m.content.to_lowercase().contains(&query)
                    || m.tags.iter().any(|t| t.to_lowercase().contains(&query))
                    || m.emotion.to_lowercase() == query
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        tracing::debug!("Memory search '{}' matched {}", query, matches.len());
        matches
    }

    pub async fn status(&self) -> VaultStatus {
        let state = self.state.read().await;

        let memory_types: BTreeSet<&str> = state.memories.iter().map(|m| m.kind.as_str()).collect();
        let emotions: BTreeSet<&str> = state.memories.iter().map(|m| m.emotion.as_str()).collect();
        let users: BTreeSet<&str> = state.memories.iter().map(|m| m.user.as_str()).collect();
        let bytes: usize = state
            .memories
            .iter()
            .map(|m| serde_json::to_string(m).map(|s| s.len()).unwrap_or(0))
            .sum();

        VaultStatus {
            total_memories: state.memories.len(),
            emotional_entries: state.journal.len(),
            memory_types: memory_types.into_iter().map(String::from).collect(),
            emotions_detected: emotions.into_iter().map(String::from).collect(),
            users_with_memories: users.len(),
            storage_size: format!("{:.2} KB", bytes as f64 / 1024.0),
        }
    }

    async fn save(&self, state: &VaultState) -> Result<(), MemoryError> {
        fs::create_dir_all(&self.base_path).await?;
        write_atomic(&self.base_path.join(MEMORIES_FILE), &state.memories).await?;
        write_atomic(&self.base_path.join(JOURNAL_FILE), &state.journal).await?;
        tracing::debug!("Memory vault saved");
        Ok(())
    }
}

async fn load_json<T>(path: &Path) -> Result<Vec<T>, MemoryError>
where
    T: serde::de::DeserializeOwned,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

// Write to a temp file, then rename.
async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), MemoryError> {
    let temp_path = path.with_extension("tmp");
    let content = serde_json::to_string_pretty(value)?;

    let mut file = fs::File::create(&temp_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&temp_path, path).await?;
    Ok(())
}
