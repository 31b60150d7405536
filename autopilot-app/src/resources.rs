use serde::{Deserialize, Serialize};
use sysinfo::{Disks, System};

/// Point-in-time host resource usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemResources {
    pub cpu_percent: f32,
    pub cpu_count: usize,
    pub memory_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub disk_usage_percent: f32,
    pub running_processes: usize,
    pub uptime_seconds: u64,
}

impl SystemResources {
    /// Blocking; call through `spawn_blocking` from async code.
    pub fn capture() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        let memory_used_mb = sys.used_memory() / 1024 / 1024;
        let memory_total_mb = sys.total_memory() / 1024 / 1024;
        let memory_percent = percent(sys.used_memory(), sys.total_memory());

        let disks = Disks::new_with_refreshed_list();
        let disk_usage_percent = disks
            .iter()
            .next()
            .map(|disk| used_percent(disk.total_space(), disk.available_space()))
            .unwrap_or(0.0);

        Self {
            cpu_percent: sys.global_cpu_info().cpu_usage(),
            cpu_count: sys.cpus().len(),
            memory_percent,
            memory_used_mb,
            memory_total_mb,
            disk_usage_percent,
            running_processes: sys.processes().len(),
            uptime_seconds: System::uptime(),
        }
    }

    pub async fn capture_async() -> Self {
        match tokio::task::spawn_blocking(Self::capture).await {
            Ok(resources) => resources,
            Err(e) => {
                tracing::warn!("Resource capture failed: {}", e);
                Self::empty()
            }
        }
    }

    fn empty() -> Self {
        Self {
            cpu_percent: 0.0,
            cpu_count: 0,
            memory_percent: 0.0,
            memory_used_mb: 0,
            memory_total_mb: 0,
            disk_usage_percent: 0.0,
            running_processes: 0,
            uptime_seconds: 0,
        }
    }
}

fn used_percent(total: u64, available: u64) -> f32 {
    percent(total.saturating_sub(available), total)
}

/// `part` as a percentage of `total`, clamped to 0..=100.
fn percent(part: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    ((part.min(total) as f64 / total as f64) * 100.0) as f32
}
