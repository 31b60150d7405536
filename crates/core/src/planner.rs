//! Planning interface and the rule-table planner.
//!
//! `RulePlanner` is a fixed lookup over substrings of the task text and the
//! most recent observation. It stands in for a real reasoning backend (for
//! example a language-model call); anything implementing [`Planner`] can
//! replace it without changes to the loop driver.

use crate::types::*;
use async_trait::async_trait;

pub const CONSOLE_URL: &str = "https://console.aws.amazon.com/";
pub const HEADLINE_URL: &str = "https://example.com";
pub const HEADLINE_SELECTOR: &str = "h1";
pub const REPORT_FILE: &str = "report.txt";
pub const SUMMARY_FILE: &str = "report_summary.txt";
pub const PIPELINE_FUNCTION: &str = "solar-ontario-pipeline";
pub const PIPELINE_BUCKET: &str = "solar-ontario-data";
pub const PIPELINE_CODE_FILE: &str = "solar_pipeline.py";

/// Proposes the next action for a task given what has happened so far.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, task: &str, history: &[HistoryEntry]) -> PlannedStep;
}

/// A single planning rule. Receives the lowercased task text.
pub type Rule = fn(&str, &[HistoryEntry]) -> Option<PlannedStep>;

/// Ordered rule table; the first rule returning a step wins.
pub struct RulePlanner {
    rules: Vec<(&'static str, Rule)>,
}

impl RulePlanner {
    pub fn new() -> Self {
        Self {
            rules: vec![
                ("failed_step", failed_step as Rule),
                ("solar_pipeline", solar_pipeline as Rule),
                ("report_summary", report_summary as Rule),
                ("disk_usage", disk_usage as Rule),
                ("headline", headline as Rule),
            ],
        }
    }

    pub fn with_rules(rules: Vec<(&'static str, Rule)>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|(name, _)| *name).collect()
    }

    fn select(&self, task: &str, history: &[HistoryEntry]) -> PlannedStep {
        let lowered = task.to_lowercase();
        for (name, rule) in &self.rules {
            if let Some(step) = rule(&lowered, history) {
                tracing::debug!("Planner rule '{}' matched", name);
                return step;
            }
        }

        tracing::debug!("No planner rule matched task");
        PlannedStep::new(
            "No known plan covers this task",
            Action::give_up(format!("No plan available for task: {}", task)),
        )
    }
}

impl Default for RulePlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Planner for RulePlanner {
    async fn plan(&self, task: &str, history: &[HistoryEntry]) -> PlannedStep {
        self.select(task, history)
    }
}

fn failed_step(_task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
    let last = history.last()?;
    if !last.observation.is_error() {
        return None;
    }
    Some(PlannedStep::new(
        "The previous step failed; stopping",
        Action::give_up(format!(
            "Step {} failed: {}",
            last.step_index, last.observation.message
        )),
    ))
}

fn solar_pipeline(task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
    if !(task.contains("solar") && task.contains("pipeline")) {
        return None;
    }

    let step = match history.len() {
        0 => PlannedStep::new("Open the cloud console", Action::navigate(CONSOLE_URL)),
        1 => PlannedStep::new(
            "Create the processing function",
            Action::CloudOperation {
                operation: CloudOperation::CreateFunction {
                    function_name: PIPELINE_FUNCTION.to_string(),
                    runtime: "python3.9".to_string(),
                },
            },
        ),
        2 => PlannedStep::new(
            "Create the storage bucket",
            Action::CloudOperation {
                operation: CloudOperation::CreateBucket {
                    bucket_name: PIPELINE_BUCKET.to_string(),
                },
            },
        ),
        3 => PlannedStep::new(
            "Generate the pipeline code",
            Action::CodeGeneration {
                language: "python".to_string(),
                output_path: PIPELINE_CODE_FILE.to_string(),
            },
        ),
        4 => PlannedStep::new(
            "Deploy the pipeline components",
            Action::CloudOperation {
                operation: CloudOperation::DeployPipeline {
                    components: vec![
                        PipelineComponent::Function {
                            function_name: PIPELINE_FUNCTION.to_string(),
                            runtime: "python3.9".to_string(),
                        },
                        PipelineComponent::Bucket {
                            bucket_name: PIPELINE_BUCKET.to_string(),
                        },
                    ],
                },
            },
        ),
        _ => PlannedStep::new(
            "All pipeline steps are done",
            Action::finish(format!(
                "Solar pipeline deployed ({} and {})",
                PIPELINE_FUNCTION, PIPELINE_BUCKET
            )),
        ),
    };
    Some(step)
}

fn report_summary(task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
    if !(task.contains("summarize") && task.contains("report")) {
        return None;
    }

    let Some(last) = history.last() else {
        return Some(PlannedStep::new(
            "Read the report first",
            Action::read_file(REPORT_FILE),
        ));
    };

    match &last.action {
        Action::FileOperation {
            operation: FileOperation::ReadFile { .. },
        } if last.observation.is_success() => {
            let content = last.observation.payload_str("content").unwrap_or_default();
            Some(PlannedStep::new(
                "Write a summary of the report",
                Action::create_file(SUMMARY_FILE, summarize(content)),
            ))
        }
        Action::FileOperation {
            operation: FileOperation::CreateFile { filename, .. },
        } if last.observation.is_success() && filename == SUMMARY_FILE => Some(PlannedStep::new(
            "The summary is written",
            Action::finish(format!("Summary written to {}", SUMMARY_FILE)),
        )),
        _ => None,
    }
}

fn disk_usage(task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
    if !task.contains("disk usage") {
        return None;
    }

    let Some(last) = history.last() else {
        return Some(PlannedStep::new(
            "Ask the system for disk usage",
            Action::run_command("df -h"),
        ));
    };

    match &last.action {
        Action::SystemOperation {
            operation: SystemOperation::RunCommand { .. },
        } if last.observation.is_success() => {
            let stdout = last.observation.payload_str("stdout").unwrap_or_default();
            Some(PlannedStep::new(
                "Report the command output",
                Action::finish(stdout.trim().to_string()),
            ))
        }
        _ => None,
    }
}

fn headline(task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
    if !task.contains("headline") {
        return None;
    }

    let Some(last) = history.last() else {
        return Some(PlannedStep::new(
            "Open the page",
            Action::navigate(HEADLINE_URL),
        ));
    };

    match &last.action {
        Action::BrowserAutomation {
            operation: BrowserOperation::Navigate { .. },
        } if last.observation.is_success() => Some(PlannedStep::new(
            "Read the headline element",
            Action::extract_text(HEADLINE_SELECTOR),
        )),
        Action::BrowserAutomation {
            operation: BrowserOperation::ExtractText { .. },
        } if last.observation.is_success() => {
            let text = last.observation.payload_str("text").unwrap_or_default();
            Some(PlannedStep::new(
                "Report the headline",
                Action::finish(text.to_string()),
            ))
        }
        _ => None,
    }
}

/// Line/word counts plus the first non-empty line.
pub fn summarize(content: &str) -> String {
    let lines = content.lines().count();
    let words = content.split_whitespace().count();
    let first_line = content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    format!(
        "Summary of {}: {} lines, {} words\nFirst line: {}\n",
        REPORT_FILE, lines, words, first_line
    )
}
