use async_trait::async_trait;
use autopilot_core::*;
use autopilot_tools::*;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Duration;

// Fake browser: each driver knows its own id and only answers for the page
// it navigated to itself.
#[derive(Default)]
struct BrowserLog {
    launched: AtomicUsize,
    closed: AtomicUsize,
    opened: Mutex<Vec<usize>>,
}

struct FakeDriver {
    id: usize,
    page: Option<String>,
    log: Arc<BrowserLog>,
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), ToolError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.page = Some(url.to_string());
        Ok(())
    }

    async fn extract_text(&mut self, selector: &str) -> Result<String, ToolError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        match (&self.page, selector) {
            (Some(page), "h1") => Ok(format!("driver {} on {}", self.id, page)),
            _ => Err(ToolError::ElementNotFound(selector.to_string())),
        }
    }

    async fn current_url(&mut self) -> Result<String, ToolError> {
        Ok(self.page.clone().unwrap_or_else(|| "about:blank".into()))
    }

    async fn close(self: Box<Self>) -> Result<(), ToolError> {
        self.log.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeLauncher {
    log: Arc<BrowserLog>,
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserDriver>, ToolError> {
        let id = self.log.launched.fetch_add(1, Ordering::SeqCst);
        self.log.opened.lock().unwrap().push(id);
        Ok(Box::new(FakeDriver {
            id,
            page: None,
            log: self.log.clone(),
        }))
    }
}

#[derive(Default)]
struct RecordingCloud {
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl CloudProvider for RecordingCloud {
    async fn create_function(&self, function_name: &str, runtime: &str) -> Result<FunctionInfo, ToolError> {
        self.calls.lock().unwrap().push(format!("function:{}", function_name));
        Ok(FunctionInfo {
            function_name: function_name.to_string(),
            function_arn: format!("arn:test:function:{}", function_name),
            runtime: runtime.to_string(),
        })
    }

    async fn create_bucket(&self, bucket_name: &str) -> Result<BucketInfo, ToolError> {
        if bucket_name == "taken" {
            return Err(ToolError::Cloud("bucket name already in use".into()));
        }
        self.calls.lock().unwrap().push(format!("bucket:{}", bucket_name));
        Ok(BucketInfo {
            bucket_name: bucket_name.to_string(),
            region: "test-1".to_string(),
        })
    }
}

struct Harness {
    factory: DispatcherFactory,
    browser: Arc<BrowserLog>,
    cloud: Arc<RecordingCloud>,
    _workspace: tempfile::TempDir,
}

fn harness() -> Harness {
    let workspace = tempfile::tempdir().unwrap();
    let browser = Arc::new(BrowserLog::default());
    let cloud = Arc::new(RecordingCloud::default());
    let settings = DispatcherSettings {
        workspace: workspace.path().to_path_buf(),
        command_timeout_ms: 5_000,
        ..DispatcherSettings::default()
    };
    let factory = DispatcherFactory::new(
        settings,
        Arc::new(FakeLauncher {
            log: browser.clone(),
        }),
        cloud.clone(),
    );
    Harness {
        factory,
        browser,
        cloud,
        _workspace: workspace,
    }
}

#[tokio::test]
async fn test_file_round_trip_is_byte_exact() {
    let h = harness();
    let mut dispatcher = h.factory.create();
    let content = "line one\n\ttabbed ünïcødé\r\nno trailing newline";

    let created = dispatcher
        .execute(&Action::create_file("notes/round_trip.txt", content))
        .await;
    assert!(created.is_success(), "{}", created.message);

    let read = dispatcher.execute(&Action::read_file("notes/round_trip.txt")).await;
    assert!(read.is_success());
    assert_eq!(read.payload_str("content"), Some(content));
}

#[tokio::test]
async fn test_handler_failure_becomes_error_observation() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    let observation = dispatcher.execute(&Action::read_file("does/not/exist.txt")).await;

    assert!(observation.is_error());
    assert!(observation.message.starts_with("IO error"));
}

#[tokio::test]
async fn test_finish_is_not_dispatched() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    let observation = dispatcher.execute(&Action::finish("done")).await;
    assert!(observation.is_error());
}

#[tokio::test]
async fn test_missing_selector_reports_element_not_found() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    dispatcher.execute(&Action::navigate("https://example.com")).await;
    let observation = dispatcher.execute(&Action::extract_text("#missing")).await;

    assert!(observation.is_error());
    assert_eq!(observation.message, "element not found: #missing");
}

#[tokio::test]
async fn test_browser_launched_lazily_and_released() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    dispatcher.execute(&Action::run_command("true")).await;
    assert!(!dispatcher.browser_active());
    assert_eq!(h.browser.launched.load(Ordering::SeqCst), 0);

    dispatcher.execute(&Action::navigate("https://example.com")).await;
    dispatcher.execute(&Action::navigate("https://example.org")).await;
    assert_eq!(h.browser.launched.load(Ordering::SeqCst), 1);

    dispatcher.release().await;
    assert!(!dispatcher.browser_active());
    assert_eq!(h.browser.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_deploy_pipeline_composes_cloud_calls() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    let action = Action::from_value(json!({
        "type": "cloud_operation",
        "operation": {
            "action": "deploy_pipeline",
            "components": [
                {"kind": "function", "function_name": "ingest"},
                {"kind": "bucket", "bucket_name": "raw-data"}
            ]
        }
    }))
    .unwrap();

    let observation = dispatcher.execute(&action).await;

    assert!(observation.is_success());
    assert_eq!(observation.payload["components"].as_array().unwrap().len(), 2);
    assert_eq!(
        observation.payload["components"][0]["function_arn"],
        "arn:test:function:ingest"
    );
    assert_eq!(
        *h.cloud.calls.lock().unwrap(),
        vec!["function:ingest".to_string(), "bucket:raw-data".to_string()]
    );
}

#[tokio::test]
async fn test_cloud_failure_is_reported() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    let observation = dispatcher
        .execute(&Action::CloudOperation {
            operation: CloudOperation::CreateBucket {
                bucket_name: "taken".into(),
            },
        })
        .await;

    assert!(observation.is_error());
    assert!(observation.message.contains("already in use"));
}

#[tokio::test]
async fn test_report_task_end_to_end() {
    let h = harness();
    std::fs::write(
        h.factory.settings().workspace.join("report.txt"),
        "Quarterly results\nRevenue grew.\n",
    )
    .unwrap();

    let task_loop = TaskLoop::new(Arc::new(RulePlanner::new()), DEFAULT_MAX_STEPS);
    let mut dispatcher = h.factory.create();
    let outcome = task_loop.run("Summarize the report", &mut dispatcher).await;

    assert!(outcome.is_completed(), "{:?}", outcome.error_message);
    let summary =
        std::fs::read_to_string(h.factory.settings().workspace.join("report_summary.txt")).unwrap();
    assert!(summary.contains("2 lines, 4 words"));
    assert!(summary.contains("First line: Quarterly results"));
}

#[tokio::test]
async fn test_shell_failure_ends_task() {
    let h = harness();
    fn always_fail(_task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
        if history.is_empty() {
            Some(PlannedStep::new("try", Action::run_command("exit 7")))
        } else {
            Some(PlannedStep::new("done", Action::finish("unreachable")))
        }
    }
    let planner = Arc::new(RulePlanner::with_rules(vec![(
        "always_fail",
        always_fail as autopilot_core::planner::Rule,
    )]));
    let task_loop = TaskLoop::new(planner, DEFAULT_MAX_STEPS);
    let mut dispatcher = h.factory.create();

    let outcome = task_loop.run("anything", &mut dispatcher).await;

    assert_eq!(outcome.status, TaskStatus::Error);
    assert!(outcome.error_message.unwrap().contains("status 7"));
    assert_eq!(outcome.history.len(), 1);
}

#[tokio::test]
async fn test_concurrent_browser_tasks_use_separate_sessions() {
    let h = harness();
    let task_loop = Arc::new(TaskLoop::new(Arc::new(RulePlanner::new()), DEFAULT_MAX_STEPS));

    let run = |task_loop: Arc<TaskLoop>, mut dispatcher: StepDispatcher| async move {
        task_loop.run("fetch the headline", &mut dispatcher).await
    };

    let (first, second) = tokio::join!(
        run(task_loop.clone(), h.factory.create()),
        run(task_loop.clone(), h.factory.create())
    );

    assert!(first.is_completed(), "{:?}", first.error_message);
    assert!(second.is_completed(), "{:?}", second.error_message);

    let first_text = first.final_message.unwrap();
    let second_text = second.final_message.unwrap();
    assert!(first_text.ends_with("on https://example.com"));
    assert!(second_text.ends_with("on https://example.com"));
    assert_ne!(first_text, second_text);

    assert_eq!(h.browser.launched.load(Ordering::SeqCst), 2);
    assert_eq!(h.browser.closed.load(Ordering::SeqCst), 2);
    assert_eq!(h.browser.opened.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_browser_released_when_task_fails() {
    let h = harness();
    fn bad_selector(_task: &str, history: &[HistoryEntry]) -> Option<PlannedStep> {
        match history.len() {
            0 => Some(PlannedStep::new("open", Action::navigate("https://example.com"))),
            _ => Some(PlannedStep::new("read", Action::extract_text(".nope"))),
        }
    }
    let planner = Arc::new(RulePlanner::with_rules(vec![(
        "bad_selector",
        bad_selector as autopilot_core::planner::Rule,
    )]));
    let task_loop = TaskLoop::new(planner, DEFAULT_MAX_STEPS);
    let mut dispatcher = h.factory.create();

    let outcome = task_loop.run("anything", &mut dispatcher).await;

    assert_eq!(outcome.status, TaskStatus::Error);
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("Handler error: element not found: .nope")
    );
    assert_eq!(h.browser.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dispatcher_runs_on_spawned_tasks() {
    let h = harness();
    let mut dispatcher = h.factory.create();

    let handle = tokio::spawn(async move {
        let navigated = dispatcher.execute(&Action::navigate("https://example.com")).await;
        let created = dispatcher
            .execute(&Action::CloudOperation {
                operation: CloudOperation::CreateBucket {
                    bucket_name: "spawned".to_string(),
                },
            })
            .await;
        dispatcher.release().await;
        (navigated, created)
    });

    let (navigated, created) = handle.await.unwrap();
    assert!(navigated.is_success());
    assert!(created.is_success());
    assert_eq!(created.payload["bucket_name"], "spawned");
    assert_eq!(h.browser.closed.load(Ordering::SeqCst), 1);
}
