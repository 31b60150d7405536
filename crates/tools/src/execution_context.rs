use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default shell command lines for the applications a dispatcher can launch.
pub fn default_applications() -> BTreeMap<String, String> {
    [
        ("chrome", "google-chrome"),
        ("firefox", "firefox"),
        ("vscode", "code"),
        ("terminal", "x-terminal-emulator"),
        ("calculator", "gnome-calculator"),
        ("notepad", "gedit"),
    ]
    .into_iter()
    .map(|(name, program)| (name.to_string(), program.to_string()))
    .collect()
}

/// Per-task settings shared by every handler of one dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub task_ref: String,
    pub workspace: PathBuf,
    pub shell: String,
    pub command_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    /// Application name to the shell command line that starts it.
    pub applications: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            task_ref: uuid::Uuid::new_v4().to_string(),
            workspace: workspace.into(),
            shell: "sh".to_string(),
            command_timeout_ms: 30_000,
            navigation_timeout_ms: 15_000,
            applications: default_applications(),
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout_ms: u64) -> Self {
        self.command_timeout_ms = timeout_ms;
        self
    }

    pub fn with_navigation_timeout(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    pub fn with_applications(mut self, applications: BTreeMap<String, String>) -> Self {
        self.applications = applications;
        self
    }

    /// Relative paths resolve against the workspace; absolute paths are kept.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let ctx = ExecutionContext::new("/srv/work");
        assert_eq!(ctx.resolve("notes.txt"), PathBuf::from("/srv/work/notes.txt"));
        assert_eq!(ctx.resolve("/etc/hostname"), PathBuf::from("/etc/hostname"));
    }

    #[test]
    fn test_each_context_gets_own_ref() {
        let a = ExecutionContext::new(".");
        let b = ExecutionContext::new(".");
        assert_ne!(a.task_ref, b.task_ref);
    }
}
