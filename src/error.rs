use thiserror::Error;

/// Ways a script execution can fail. `Display` is the text placed in the
/// envelope's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Security Error: Blocked operation detected. Pattern: {rule}")]
    SecurityRejection { rule: String },

    #[error("Execution timeout: Code took longer than {budget_ms}ms")]
    Timeout { budget_ms: u128 },

    #[error("{0}")]
    RuntimeFault(String),

    #[error("No code provided")]
    EmptySource,

    #[error("Source exceeds the {max} byte limit ({actual} bytes)")]
    SourceTooLarge { max: usize, actual: usize },

    #[error("Source nesting exceeds the {max} level limit (depth {depth})")]
    SourceTooDeep { max: usize, depth: usize },

    #[error("Execution failed: {0}")]
    EngineUnavailable(String),
}
