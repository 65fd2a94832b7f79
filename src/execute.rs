//! The public entry points: one-shot [`execute`] and the configurable [`Executor`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::analyze::{nesting_depth, vet};
use crate::config::SandboxConfig;
use crate::error::ExecutionError;
use crate::external::Interpreter;
use crate::input::detect_language;
use crate::models::{ExecutionRequest, Language, ResultEnvelope};
use crate::report;
use crate::sandbox::run_on_engine_thread;

/// Run `source` declared as `declared_language` with default limits.
///
/// Script languages run in the embedded engine. Python gets a simulated
/// placeholder and everything else the fixed "not supported" envelope.
/// Never fails: every error becomes an envelope with `success == false`.
pub fn execute(source: &str, declared_language: &str) -> ResultEnvelope {
    match detect_language(declared_language) {
        Language::Script => execute_script(source, &SandboxConfig::default()),
        Language::Other(name) => ResultEnvelope::without_runtime(&name, declared_language),
        Language::Markup | Language::Stylesheet => ResultEnvelope::unsupported(declared_language),
    }
}

/// Validate, vet and run script source under `config`.
///
/// The engine runs on its own thread; this call blocks until it returns.
pub fn execute_script(source: &str, config: &SandboxConfig) -> ResultEnvelope {
    if let Err(err) = validate(source, config) {
        tracing::debug!(error = %err, "request rejected before vetting");
        return report::failed(&err);
    }
    if let Err(err) = check_nesting(source, config) {
        tracing::warn!(error = %err, "source rejected before parsing");
        return report::failed(&err);
    }

    let verdict = vet(source);
    if verdict.blocked {
        return report::rejected(&verdict);
    }

    match run_on_engine_thread(source.to_string(), config.timeout) {
        Ok(run) => report::assemble(source, run, config.timeout),
        Err(err) => report::failed(&err),
    }
}

fn validate(source: &str, config: &SandboxConfig) -> Result<(), ExecutionError> {
    if source.trim().is_empty() {
        return Err(ExecutionError::EmptySource);
    }
    if source.len() > config.max_source_bytes {
        return Err(ExecutionError::SourceTooLarge {
            max: config.max_source_bytes,
            actual: source.len(),
        });
    }
    Ok(())
}

/// The parser recurses once per nesting level, so hostile depth is refused up front.
fn check_nesting(source: &str, config: &SandboxConfig) -> Result<(), ExecutionError> {
    let depth = nesting_depth(source);
    if depth > config.max_nesting_depth {
        return Err(ExecutionError::SourceTooDeep {
            max: config.max_nesting_depth,
            depth,
        });
    }
    Ok(())
}

/// Runs requests with a fixed configuration and a registry of external interpreters.
#[derive(Clone, Default)]
pub struct Executor {
    config: SandboxConfig,
    interpreters: HashMap<String, Arc<dyn Interpreter>>,
}

impl Executor {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            interpreters: HashMap::new(),
        }
    }

    /// Delegate a declared language (matched case-insensitively) to `interpreter`.
    pub fn with_interpreter(
        mut self,
        language: &str,
        interpreter: impl Interpreter + 'static,
    ) -> Self {
        self.interpreters
            .insert(language.trim().to_lowercase(), Arc::new(interpreter));
        self
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub async fn execute(&self, request: ExecutionRequest) -> ResultEnvelope {
        let language = request.language();
        tracing::debug!(language = language.as_str(), "executing request");

        match language {
            Language::Script => self.execute_script(request.source).await,
            Language::Other(name) => match self.interpreters.get(&name) {
                Some(interpreter) => {
                    self.delegate(interpreter.as_ref(), &name, &request.source)
                        .await
                }
                None => ResultEnvelope::without_runtime(&name, &request.declared_language),
            },
            Language::Markup | Language::Stylesheet => {
                ResultEnvelope::unsupported(&request.declared_language)
            }
        }
    }

    /// The engine call blocks until the script returns, so it runs off the async workers.
    async fn execute_script(&self, source: String) -> ResultEnvelope {
        let config = self.config.clone();
        match tokio::task::spawn_blocking(move || execute_script(&source, &config)).await {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::error!(error = %err, "script execution task failed");
                ResultEnvelope::failed(format!("Execution failed: {}", err), Vec::new())
            }
        }
    }

    async fn delegate(
        &self,
        interpreter: &dyn Interpreter,
        language: &str,
        source: &str,
    ) -> ResultEnvelope {
        if let Err(err) = validate(source, &self.config) {
            return report::failed(&err);
        }

        match interpreter.run(source).await {
            Ok(output) => output.into(),
            Err(err) => {
                tracing::error!(language, error = %err, "external interpreter failed");
                ResultEnvelope::failed(err.to_string(), Vec::new())
            }
        }
    }
}
