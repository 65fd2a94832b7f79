pub mod analyze;
pub mod config;
pub mod error;
pub mod execute;
pub mod external;
pub mod input;
pub mod models;
pub mod output;
pub mod report;
pub mod sandbox;

pub use config::SandboxConfig;
pub use error::ExecutionError;
pub use execute::{Executor, execute, execute_script};
pub use models::*;
