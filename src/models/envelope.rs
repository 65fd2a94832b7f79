use serde::{Deserialize, Serialize};

/// Shown for Python when no interpreter is registered for it.
pub const PYTHON_PLACEHOLDER: &str =
    "⚠️ Python execution requires a Python runtime server.\n\nSimulated output for demo purposes.";

/// The single artifact handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResultEnvelope {
    pub success: bool,
    pub output: String,
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    pub fn succeeded(output: impl Into<String>, logs: Vec<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            logs,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, logs: Vec<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            logs,
            error: Some(error.into()),
        }
    }

    /// Fixed envelope for languages nothing here can run.
    pub fn unsupported(declared_language: &str) -> Self {
        Self::succeeded(
            format!("Language '{}' execution not supported on server.", declared_language),
            Vec::new(),
        )
    }

    /// Simulated success for Python without a runtime.
    pub fn python_unavailable() -> Self {
        Self::succeeded(PYTHON_PLACEHOLDER, Vec::new())
    }

    /// What a language with no runtime gets: the Python placeholder or the generic notice.
    pub fn without_runtime(language: &str, declared_language: &str) -> Self {
        match language {
            "python" => Self::python_unavailable(),
            _ => Self::unsupported(declared_language),
        }
    }
}
