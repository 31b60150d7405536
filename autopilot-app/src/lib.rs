pub mod config;
pub mod resources;
pub mod routes;
pub mod service;

pub use config::{Config, DEFAULT_CONFIG_PATH};
pub use resources::SystemResources;
pub use routes::{router, ApiError};
pub use service::{AutopilotService, CommandResponse, StatusReport, TaskRun};
