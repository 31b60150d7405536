pub mod error;
pub mod intent;
pub mod metrics;
pub mod planner;
pub mod task_loop;
pub mod types;

pub use error::TaskError;
pub use intent::{classify, Intent, IntentKind};
pub use metrics::{Metrics, MetricsSnapshot};
pub use planner::{Planner, RulePlanner};
pub use task_loop::{StepExecutor, TaskLoop, DEFAULT_MAX_STEPS};
pub use types::*;
