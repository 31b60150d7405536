use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    #[default]
    Text,
    Voice,
    Image,
    Emotion,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Text => "text",
            MemoryKind::Voice => "voice",
            MemoryKind::Image => "image",
            MemoryKind::Emotion => "emotion",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Memory {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MemoryKind,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub emotion: String,
    pub importance: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

/// Input for [`crate::MemoryVault::create`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryRequest {
    pub content: String,
    #[serde(default, rename = "type")]
    pub kind: MemoryKind,
    #[serde(default)]
    pub user: Option<String>,
}

impl MemoryRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn for_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub id: String,
    pub entry: String,
    pub timestamp: DateTime<Utc>,
    pub emotion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VaultStatus {
    pub total_memories: usize,
    pub emotional_entries: usize,
    pub memory_types: Vec<String>,
    pub emotions_detected: Vec<String>,
    pub users_with_memories: usize,
    pub storage_size: String,
}
