use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use autopilot_core::Observation;
use serde_json::json;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

/// Run `command` through the configured shell inside the workspace.
///
/// A non-zero exit status is reported as an error observation that still
/// carries the captured output.
pub async fn run_command(ctx: &ExecutionContext, command: &str) -> Result<Observation, ToolError> {
    if command.trim().is_empty() {
        return Err(ToolError::Validation("Empty command".into()));
    }

    tracing::info!("Executing shell command: {}", command);

    let exec_future = async {
        Command::new(&ctx.shell)
            .arg("-c")
            .arg(command)
            .current_dir(&ctx.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
    };

    let output = timeout(Duration::from_millis(ctx.command_timeout_ms), exec_future)
        .await
        .map_err(|_| ToolError::Timeout(ctx.command_timeout_ms))?
        .map_err(|e| ToolError::Execution(e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();

    let payload = json!({
        "stdout": stdout,
        "stderr": stderr,
        "exit_code": exit_code
    });

    if output.status.success() {
        Ok(Observation::success("Command executed", payload))
    } else {
        let status = exit_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Ok(Observation::error_with_payload(
            format!("Command exited with status {}: {}", status, stderr.trim()),
            payload,
        ))
    }
}

fn validate_package(package: &str) -> Result<(), ToolError> {
    let valid = !package.is_empty()
        && package
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.=<>[],".contains(c));
    if !valid {
        return Err(ToolError::Validation(format!(
            "Invalid package name: {:?}",
            package
        )));
    }
    Ok(())
}

pub async fn install_package(ctx: &ExecutionContext, package: &str) -> Result<Observation, ToolError> {
    validate_package(package)?;
    let mut observation = run_command(ctx, &format!("pip install {}", package)).await?;
    if observation.is_success() {
        observation.message = format!("Package {} installed", package);
    }
    Ok(observation)
}

pub async fn create_directory(ctx: &ExecutionContext, directory: &str) -> Result<Observation, ToolError> {
    if directory.trim().is_empty() {
        return Err(ToolError::Validation("directory is empty".into()));
    }
    let path = ctx.resolve(directory);
    tokio::fs::create_dir_all(&path).await?;

    Ok(Observation::success(
        format!("Directory {} created", directory),
        json!({ "path": path.display().to_string() }),
    ))
}

/// Start a configured application in the background. The process is not
/// waited on; only a failure to spawn it is reported.
pub async fn launch_application(
    ctx: &ExecutionContext,
    application: &str,
) -> Result<Observation, ToolError> {
    let command_line = ctx
        .applications
        .get(&application.to_lowercase())
        .ok_or_else(|| ToolError::Validation(format!("Unknown application: {}", application)))?;

    tracing::info!("Launching {} with `{}`", application, command_line);

    let child = Command::new(&ctx.shell)
        .arg("-c")
        .arg(command_line)
        .current_dir(&ctx.workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ToolError::Execution(format!("Failed to launch {}: {}", application, e)))?;

    Ok(Observation::success(
        format!("Application {} launched", application),
        json!({
            "application": application,
            "command": command_line,
            "pid": child.id()
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_in(dir: &std::path::Path) -> ExecutionContext {
        ExecutionContext::new(dir).with_command_timeout(5_000)
    }

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let temp_dir = tempfile::tempdir().unwrap();
        let observation = run_command(&ctx_in(temp_dir.path()), "echo hello").await.unwrap();

        assert!(observation.is_success());
        assert_eq!(observation.payload_str("stdout"), Some("hello\n"));
        assert_eq!(observation.payload["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error_observation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let observation = run_command(&ctx_in(temp_dir.path()), "echo oops >&2; exit 3")
            .await
            .unwrap();

        assert!(observation.is_error());
        assert_eq!(observation.payload["exit_code"], 3);
        assert!(observation.message.contains("status 3"));
        assert!(observation.message.contains("oops"));
    }

    #[tokio::test]
    async fn test_runs_in_workspace() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("marker.txt"), "").unwrap();

        let observation = run_command(&ctx_in(temp_dir.path()), "ls").await.unwrap();
        assert!(observation.payload_str("stdout").unwrap().contains("marker.txt"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(temp_dir.path()).with_command_timeout(100);

        let result = run_command(&ctx, "sleep 5").await;
        assert!(matches!(result, Err(ToolError::Timeout(100))));
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let result = run_command(&ExecutionContext::new("."), "   ").await;
        assert!(matches!(result, Err(ToolError::Validation(_))));
    }

    #[tokio::test]
    async fn test_package_name_validation() {
        let result = install_package(&ExecutionContext::new("."), "requests; rm -rf /").await;
        assert!(matches!(result, Err(ToolError::Validation(_))));
    }

    #[tokio::test]
    async fn test_launch_configured_application() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut applications = std::collections::BTreeMap::new();
        applications.insert("notepad".to_string(), "touch launched.marker".to_string());
        let ctx = ctx_in(temp_dir.path()).with_applications(applications);

        let observation = launch_application(&ctx, "Notepad").await.unwrap();
        assert!(observation.is_success());
        assert_eq!(observation.payload_str("command"), Some("touch launched.marker"));

        let marker = temp_dir.path().join("launched.marker");
        for _ in 0..50 {
            if marker.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_launch_unknown_application() {
        let result = launch_application(&ExecutionContext::new("."), "photoshop").await;
        assert!(matches!(result, Err(ToolError::Validation(msg)) if msg.contains("photoshop")));
    }

    #[tokio::test]
    async fn test_create_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let observation = create_directory(&ctx_in(temp_dir.path()), "a/b/c").await.unwrap();

        assert!(observation.is_success());
        assert!(temp_dir.path().join("a/b/c").is_dir());
    }
}
