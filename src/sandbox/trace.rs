use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Severity of a captured console call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Debug,
    Info,
    Warn,
    Error,
}

impl ConsoleLevel {
    /// Prefix stored in front of the formatted arguments
    pub fn prefix(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "",
            ConsoleLevel::Debug => "[DEBUG] ",
            ConsoleLevel::Info => "[INFO] ",
            ConsoleLevel::Warn => "[WARN] ",
            ConsoleLevel::Error => "[ERROR] ",
        }
    }
}

/// Mutable audit trail for one execution. Append-only.
#[derive(Debug, Default)]
pub struct ShimState {
    logs: Vec<String>,
    dom_touched: bool,
    timers: HashMap<String, Instant>,
}

impl ShimState {
    pub fn push(&mut self, line: impl Into<String>) {
        self.logs.push(line.into());
    }

    pub fn console(&mut self, level: ConsoleLevel, message: &str) {
        self.logs.push(format!("{}{}", level.prefix(), message));
    }

    /// Record a document/window interaction
    pub fn dom(&mut self, line: impl Into<String>) {
        self.dom_touched = true;
        self.logs.push(line.into());
    }

    pub fn start_timer(&mut self, label: &str) {
        self.timers.insert(label.to_string(), Instant::now());
    }

    pub fn end_timer(&mut self, label: &str) -> Option<Duration> {
        self.timers.remove(label).map(|started| started.elapsed())
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn into_record(self) -> ShimRecord {
        ShimRecord {
            logs: self.logs,
            dom_touched: self.dom_touched,
        }
    }
}

/// What the shim observed, handed back once execution is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ShimRecord {
    /// Log lines in the order the shimmed calls happened
    pub logs: Vec<String>,
    /// Whether any document/window mock was called
    pub dom_touched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_prefixes() {
        let mut state = ShimState::default();
        state.console(ConsoleLevel::Log, "plain");
        state.console(ConsoleLevel::Warn, "careful");
        state.console(ConsoleLevel::Error, "bad");
        let record = state.into_record();
        assert_eq!(record.logs, vec!["plain", "[WARN] careful", "[ERROR] bad"]);
        assert!(!record.dom_touched);
    }

    #[test]
    fn test_dom_lines_mark_touched() {
        let mut state = ShimState::default();
        state.dom("[DOM] createElement(\"p\")");
        assert_eq!(state.len(), 1);
        assert!(state.into_record().dom_touched);
    }

    #[test]
    fn test_unknown_timer() {
        let mut state = ShimState::default();
        assert!(state.end_timer("missing").is_none());
        state.start_timer("t");
        assert!(state.end_timer("t").is_some());
        assert!(state.end_timer("t").is_none());
    }
}
