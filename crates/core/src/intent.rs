//! Keyword intent classifier for free-text commands.

use serde::{Deserialize, Serialize};

const BUILD_KEYWORDS: &[&str] = &["create", "build", "deploy", "setup", "pipeline"];
const CLOUD_KEYWORDS: &[&str] = &["aws", "lambda", "s3", "ec2", "cloud"];
const APPLICATION_KEYWORDS: &[&str] = &["website", "app", "application"];
const SYSTEM_KEYWORDS: &[&str] = &["open", "launch", "start", "run", "execute"];
const QUESTION_KEYWORDS: &[&str] = &["what", "how", "why", "when", "where", "show", "tell"];
const AUTOMATION_KEYWORDS: &[&str] = &["automate", "control", "manage", "handle"];
const LAUNCH_KEYWORDS: &[&str] = &["open", "launch", "start"];

/// Applications a system operation may start by name.
pub const KNOWN_APPLICATIONS: &[&str] = &["chrome", "firefox", "vscode", "terminal", "calculator", "notepad"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ComplexTask,
    SystemOperation,
    InformationRequest,
    AutomationTask,
    GeneralCommand,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,
    pub category: String,
    pub complexity: Complexity,
    pub requires_automation: bool,
}

impl Intent {
    fn new(kind: IntentKind, category: &str, complexity: Complexity, requires_automation: bool) -> Self {
        Self {
            kind,
            category: category.to_string(),
            complexity,
            requires_automation,
        }
    }

    /// Whether this intent should be handed to the task loop.
    pub fn runs_task_loop(&self) -> bool {
        matches!(self.kind, IntentKind::ComplexTask | IntentKind::AutomationTask)
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

/// Classify a command. Rules are checked in a fixed order and the first
/// match wins.
pub fn classify(command: &str) -> Intent {
    let lower = command.to_lowercase();

    if contains_any(&lower, BUILD_KEYWORDS) {
        if contains_any(&lower, CLOUD_KEYWORDS) {
            return Intent::new(IntentKind::ComplexTask, "cloud_deployment", Complexity::High, true);
        }
        if contains_any(&lower, APPLICATION_KEYWORDS) {
            return Intent::new(
                IntentKind::ComplexTask,
                "application_development",
                Complexity::High,
                true,
            );
        }
    }

    if contains_any(&lower, SYSTEM_KEYWORDS) {
        return Intent::new(
            IntentKind::SystemOperation,
            "application_control",
            Complexity::Medium,
            true,
        );
    }

    if contains_any(&lower, QUESTION_KEYWORDS) {
        return Intent::new(IntentKind::InformationRequest, "query", Complexity::Low, false);
    }

    if contains_any(&lower, AUTOMATION_KEYWORDS) {
        return Intent::new(
            IntentKind::AutomationTask,
            "process_automation",
            Complexity::Medium,
            true,
        );
    }

    Intent::new(IntentKind::GeneralCommand, "general", Complexity::Low, false)
}

/// Text after the first standalone word `run`, in its original case.
pub fn extract_run_command(command: &str) -> Option<String> {
    let start = find_word(command, "run")? + "run".len();
    let rest = command[start..].trim();
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// The known application named in an open/launch/start command.
pub fn extract_application(command: &str) -> Option<&'static str> {
    let lower = command.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    if !words.iter().any(|w| LAUNCH_KEYWORDS.contains(w)) {
        return None;
    }
    KNOWN_APPLICATIONS
        .iter()
        .copied()
        .find(|app| words.contains(app))
}

/// Byte offset of `word` in `text` (ASCII case-insensitive) where it is not
/// part of a longer word.
fn find_word(text: &str, word: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    text.char_indices().map(|(i, _)| i).find(|&i| {
        let end = i + word.len();
        let matches = text
            .get(i..end)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(word));
        let before_ok = i == 0 || !is_word_byte(bytes[i - 1]);
        let after_ok = end >= bytes.len() || !is_word_byte(bytes[end]);
        matches && before_ok && after_ok
    })
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}
