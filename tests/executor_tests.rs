use std::time::Duration;

use async_trait::async_trait;
use sandpit::external::{Interpreter, InterpreterError, InterpreterOutput};
use sandpit::{ExecutionRequest, Executor, SandboxConfig};

struct EchoInterpreter;

#[async_trait]
impl Interpreter for EchoInterpreter {
    async fn run(&self, source: &str) -> Result<InterpreterOutput, InterpreterError> {
        Ok(InterpreterOutput {
            success: true,
            output: format!("echo: {}", source),
            error: None,
        })
    }
}

#[tokio::test]
async fn test_script_runs_in_engine() {
    let executor = Executor::new(SandboxConfig::default());
    let result = executor
        .execute(ExecutionRequest::new("console.log('hi'); return 6 * 7;", "javascript"))
        .await;
    assert!(result.success, "Error: {:?}", result.error);
    assert_eq!(result.output, "42");
    assert_eq!(result.logs, vec!["hi"]);
}

#[tokio::test]
async fn test_unregistered_language_is_unsupported() {
    let executor = Executor::new(SandboxConfig::default());
    let result = executor
        .execute(ExecutionRequest::new("puts 1", "ruby"))
        .await;
    assert!(result.success);
    assert_eq!(result.output, "Language 'ruby' execution not supported on server.");
    assert!(result.logs.is_empty());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_python_without_interpreter_is_simulated() {
    let executor = Executor::new(SandboxConfig::default());
    let result = executor
        .execute(ExecutionRequest::new("print(1)", "Python"))
        .await;
    assert!(result.success);
    assert_eq!(
        result.output,
        "⚠️ Python execution requires a Python runtime server.\n\nSimulated output for demo purposes."
    );
    assert!(result.logs.is_empty());
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_deeply_nested_script_is_refused() {
    let executor = Executor::new(SandboxConfig::default());
    let source = format!("{}1{}", "(".repeat(3000), ")".repeat(3000));
    let result = executor
        .execute(ExecutionRequest::new(source, "javascript"))
        .await;
    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Source nesting exceeds the 128 level limit (depth 3000)")
    );
}

#[tokio::test]
async fn test_stylesheet_is_unsupported_even_with_interpreter() {
    let executor = Executor::new(SandboxConfig::default()).with_interpreter("css", EchoInterpreter);
    let result = executor
        .execute(ExecutionRequest::new("p { color: red }", "css"))
        .await;
    assert_eq!(result.output, "Language 'css' execution not supported on server.");
}

#[tokio::test]
async fn test_registered_interpreter_receives_source() {
    let executor = Executor::new(SandboxConfig::default()).with_interpreter("Python", EchoInterpreter);
    let result = executor
        .execute(ExecutionRequest::new("print(1)", "PYTHON"))
        .await;
    assert!(result.success);
    assert_eq!(result.output, "echo: print(1)");
}

#[tokio::test]
async fn test_empty_source_is_rejected_for_delegated_language() {
    let executor = Executor::new(SandboxConfig::default()).with_interpreter("python", EchoInterpreter);
    let result = executor.execute(ExecutionRequest::new("", "python")).await;
    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("No code provided"));
}

#[tokio::test]
async fn test_concurrent_requests_do_not_share_logs() {
    let executor = Executor::new(SandboxConfig::default());
    let (a, b) = tokio::join!(
        executor.execute(ExecutionRequest::new("console.log('a');", "javascript")),
        executor.execute(ExecutionRequest::new("console.log('b');", "javascript")),
    );
    assert_eq!(a.logs, vec!["a"]);
    assert_eq!(b.logs, vec!["b"]);
}

#[cfg(unix)]
mod command {
    use super::*;
    use sandpit::external::CommandInterpreter;

    #[tokio::test]
    async fn test_cat_echoes_stdin() {
        let cat = CommandInterpreter::parse("cat", Duration::from_secs(5)).unwrap();
        let executor = Executor::new(SandboxConfig::default()).with_interpreter("text", cat);
        let result = executor
            .execute(ExecutionRequest::new("hello from stdin", "text"))
            .await;
        assert!(result.success, "Error: {:?}", result.error);
        assert_eq!(result.output, "hello from stdin");
    }

    #[tokio::test]
    async fn test_silent_success_has_placeholder_output() {
        let interpreter = CommandInterpreter::parse("true", Duration::from_secs(5)).unwrap();
        let output = interpreter.run("ignored").await.unwrap();
        assert!(output.success);
        assert_eq!(output.output, "Code executed successfully (no output)");
    }

    #[tokio::test]
    async fn test_failing_command_reports_error() {
        let interpreter = CommandInterpreter::parse("sh", Duration::from_secs(5)).unwrap();
        let output = interpreter.run("echo oops >&2; exit 3").await.unwrap();
        assert!(!output.success);
        assert_eq!(output.error.as_deref(), Some("oops\n"));
    }

    #[tokio::test]
    async fn test_slow_command_is_killed() {
        let interpreter = CommandInterpreter::parse("sh", Duration::from_millis(100)).unwrap();
        let err = interpreter.run("sleep 5").await.unwrap_err();
        assert!(matches!(err, InterpreterError::Timeout(100)));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let interpreter =
            CommandInterpreter::parse("definitely-not-a-real-binary-xyz", Duration::from_secs(1))
                .unwrap();
        let err = interpreter.run("").await.unwrap_err();
        assert!(matches!(err, InterpreterError::Spawn(_)));
    }
}
