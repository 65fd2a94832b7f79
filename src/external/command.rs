use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Interpreter, InterpreterError, InterpreterOutput};

const NO_OUTPUT: &str = "Code executed successfully (no output)";

/// Runs a local program with the source text on stdin.
///
/// Unlike the embedded engine, the child process is killed when the budget
/// runs out.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandInterpreter {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Split a whitespace-separated command line such as `python3 -`.
    pub fn parse(command_line: &str, timeout: Duration) -> Result<Self, InterpreterError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| InterpreterError::InvalidCommand(command_line.to_string()))?;
        Ok(Self::new(program, parts.collect(), timeout))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Interpreter for CommandInterpreter {
    async fn run(&self, source: &str) -> Result<InterpreterOutput, InterpreterError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take();
        let finished = async move {
            if let Some(mut stdin) = stdin {
                // Programs that never read stdin may already have exited.
                if let Err(err) = stdin.write_all(source.as_bytes()).await
                    && err.kind() != ErrorKind::BrokenPipe
                {
                    return Err(err);
                }
                // Dropping closes the pipe so the interpreter sees EOF.
            }
            child.wait_with_output().await
        };

        // On timeout the child is dropped, and `kill_on_drop` terminates it.
        let output = match tokio::time::timeout(self.timeout, finished).await {
            Ok(output) => output?,
            Err(_) => {
                tracing::warn!(
                    program = %self.program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "interpreter killed after timeout"
                );
                return Err(InterpreterError::Timeout(self.timeout.as_millis()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            let output = if stdout.trim().is_empty() {
                NO_OUTPUT.to_string()
            } else {
                stdout
            };
            Ok(InterpreterOutput {
                success: true,
                output,
                error: None,
            })
        } else {
            let error = if stderr.trim().is_empty() {
                format!("Process exited with {}", output.status)
            } else {
                stderr
            };
            Ok(InterpreterOutput {
                success: false,
                output: stdout,
                error: Some(error),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_arguments() {
        let interpreter =
            CommandInterpreter::parse("python3 -u -", Duration::from_secs(1)).unwrap();
        assert_eq!(interpreter.program(), "python3");
        assert_eq!(interpreter.args, vec!["-u", "-"]);
    }

    #[test]
    fn test_parse_rejects_empty_command() {
        let err = CommandInterpreter::parse("   ", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, InterpreterError::InvalidCommand(_)));
    }
}
