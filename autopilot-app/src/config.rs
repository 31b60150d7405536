use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "autopilot.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub task: TaskConfig,
    pub shell: ShellConfig,
    pub browser: BrowserConfig,
    pub cloud: CloudConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskConfig {
    pub max_steps: usize,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_steps: autopilot_core::DEFAULT_MAX_STEPS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub program: String,
    pub workspace: PathBuf,
    pub timeout_ms: u64,
    /// Command line started for each launchable application name.
    pub applications: BTreeMap<String, String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: "sh".to_string(),
            workspace: PathBuf::from("."),
            timeout_ms: 30_000,
            applications: autopilot_tools::default_applications(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub headless: bool,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            navigation_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CloudConfig {
    pub endpoint: String,
    pub region: String,
    /// Name of the environment variable holding the bearer token.
    pub token_env: String,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4566".to_string(),
            region: "us-east-1".to_string(),
            token_env: "AUTOPILOT_CLOUD_TOKEN".to_string(),
        }
    }
}

impl CloudConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub default_user: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            default_user: autopilot_memory::DEFAULT_USER.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn memory_dir(&self) -> PathBuf {
        self.data_dir.join("memory")
    }

    pub fn task_state_file(&self) -> PathBuf {
        self.data_dir.join("tasks.json")
    }
}

impl Config {
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// File (when present) plus environment overrides, validated.
    pub fn resolve(path: &Path) -> Result<Self> {
        let mut config = if Self::exists(path) {
            Self::load(path)?
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("AUTOPILOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("AUTOPILOT_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("AUTOPILOT_PORT is not a port: {}", port))?;
        }
        if let Some(steps) = lookup("AUTOPILOT_MAX_STEPS") {
            self.task.max_steps = steps
                .parse()
                .with_context(|| format!("AUTOPILOT_MAX_STEPS is not a number: {}", steps))?;
        }
        if let Some(url) = lookup("AUTOPILOT_WEBDRIVER_URL") {
            self.browser.webdriver_url = url;
        }
        if let Some(endpoint) = lookup("AUTOPILOT_CLOUD_ENDPOINT") {
            self.cloud.endpoint = endpoint;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            bail!("server.host cannot be empty");
        }
        if self.task.max_steps == 0 {
            bail!("task.max_steps must be at least 1");
        }
        if self.shell.program.trim().is_empty() {
            bail!("shell.program cannot be empty");
        }
        if self.shell.timeout_ms == 0 {
            bail!("shell.timeout_ms must be greater than zero");
        }
        if let Some((name, _)) = self.shell.applications.iter().find(|(_, cmd)| cmd.trim().is_empty()) {
            bail!("shell.applications.{} has an empty command", name);
        }
        if self.browser.navigation_timeout_ms == 0 {
            bail!("browser.navigation_timeout_ms must be greater than zero");
        }
        if self.browser.webdriver_url.trim().is_empty() {
            bail!("browser.webdriver_url cannot be empty");
        }
        if self.cloud.endpoint.trim().is_empty() {
            bail!("cloud.endpoint cannot be empty");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
