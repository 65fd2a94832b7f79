//! Black-box collaborators for languages the embedded engine does not run.

pub mod command;

pub use command::CommandInterpreter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ResultEnvelope;

/// What an external runtime hands back for one source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpreterOutput {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<InterpreterOutput> for ResultEnvelope {
    fn from(out: InterpreterOutput) -> Self {
        ResultEnvelope {
            success: out.success,
            output: out.output,
            logs: Vec::new(),
            error: out.error,
        }
    }
}

#[derive(Debug, Error)]
pub enum InterpreterError {
    #[error("Failed to start interpreter: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Execution timeout: Code took longer than {0}ms")]
    Timeout(u128),

    #[error("Invalid interpreter command: {0:?}")]
    InvalidCommand(String),
}

#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn run(&self, source: &str) -> Result<InterpreterOutput, InterpreterError>;
}
