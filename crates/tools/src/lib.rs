pub mod browser;
pub mod cloud;
pub mod dispatcher;
pub mod error;
pub mod execution_context;
pub mod handlers;

pub use browser::{BrowserDriver, BrowserLauncher, BrowserSession, WebDriverLauncher};
pub use cloud::{BucketInfo, CloudProvider, FunctionInfo, HttpCloudProvider};
pub use dispatcher::{DispatcherFactory, DispatcherSettings, StepDispatcher};
pub use error::ToolError;
pub use execution_context::{default_applications, ExecutionContext};
