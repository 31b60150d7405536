use crate::error::ToolError;
use crate::execution_context::ExecutionContext;
use autopilot_core::Observation;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

fn validate_filename(filename: &str) -> Result<(), ToolError> {
    if filename.trim().is_empty() {
        return Err(ToolError::Validation("filename is empty".into()));
    }
    Ok(())
}

/// Sibling temp path, unique per write so concurrent writers of the same
/// file never share one.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
}

/// Write `content` to `filename`, creating parent directories. The write
/// goes through a temp file and a rename so readers never see a partial file.
pub async fn create_file(
    ctx: &ExecutionContext,
    filename: &str,
    content: &str,
) -> Result<Observation, ToolError> {
    validate_filename(filename)?;
    let path = ctx.resolve(filename);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(&path);
    if let Err(e) = write_and_rename(&temp_path, &path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    tracing::debug!("Wrote {} bytes to {}", content.len(), path.display());
    Ok(Observation::success(
        format!("File {} created", filename),
        json!({
            "path": path.display().to_string(),
            "bytes_written": content.len()
        }),
    ))
}

async fn write_and_rename(temp_path: &Path, path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(temp_path, path).await
}

pub async fn read_file(ctx: &ExecutionContext, filename: &str) -> Result<Observation, ToolError> {
    validate_filename(filename)?;
    let path = ctx.resolve(filename);
    let content = fs::read_to_string(&path).await?;

    Ok(Observation::success(
        format!("File {} read", filename),
        json!({
            "path": path.display().to_string(),
            "content": content
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_makes_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(temp_dir.path());

        let observation = create_file(&ctx, "nested/deeper/out.txt", "data").await.unwrap();

        assert!(observation.is_success());
        assert_eq!(observation.payload["bytes_written"], 4);
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path().join("nested/deeper"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("out.txt")]);
    }

    #[tokio::test]
    async fn test_create_overwrites_existing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(temp_dir.path());

        create_file(&ctx, "a.txt", "first").await.unwrap();
        create_file(&ctx, "a.txt", "second").await.unwrap();

        let read = read_file(&ctx, "a.txt").await.unwrap();
        assert_eq!(read.payload_str("content"), Some("second"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_of_same_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = std::sync::Arc::new(ExecutionContext::new(temp_dir.path()));

        for round in 0..20 {
            let writers: Vec<_> = (0..4)
                .map(|writer| {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        let content = format!("round {} writer {}", round, writer);
                        create_file(&ctx, "report_summary.txt", &content).await
                    })
                })
                .collect();

            for writer in writers {
                let observation = writer.await.unwrap().unwrap();
                assert!(observation.is_success());
            }
        }

        let read = read_file(&ctx, "report_summary.txt").await.unwrap();
        assert!(read.payload_str("content").unwrap().starts_with("round 19 writer "));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ctx = ExecutionContext::new(temp_dir.path());

        let result = read_file(&ctx, "missing.txt").await;
        assert!(matches!(result, Err(ToolError::Io(_))));
    }

    #[tokio::test]
    async fn test_empty_filename_rejected() {
        let ctx = ExecutionContext::new(".");
        let result = create_file(&ctx, "  ", "x").await;
        assert!(matches!(result, Err(ToolError::Validation(_))));
    }
}
