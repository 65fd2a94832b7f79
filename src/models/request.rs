use serde::{Deserialize, Serialize};

use crate::input::detect_language;

/// Broad family of a declared language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Language {
    /// The natively executed scripting language (JavaScript, TypeScript run as-is).
    Script,
    Markup,
    Stylesheet,
    /// Anything else, keyed by its lower-cased declared name.
    Other(String),
}

impl Language {
    pub fn as_str(&self) -> &str {
        match self {
            Language::Script => "script",
            Language::Markup => "markup",
            Language::Stylesheet => "stylesheet",
            Language::Other(name) => name,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Language::Script)
    }
}

/// One request to run source text.
///
/// `source` is attacker-controlled; nothing in it selects a code path
/// other than through the vetter and the bare-expression heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub source: String,
    /// The language name exactly as the caller declared it.
    pub declared_language: String,
}

impl ExecutionRequest {
    pub fn new(source: impl Into<String>, declared_language: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            declared_language: declared_language.into(),
        }
    }

    pub fn language(&self) -> Language {
        detect_language(&self.declared_language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_language() {
        let request = ExecutionRequest::new("1 + 1", "JavaScript");
        assert_eq!(request.language(), Language::Script);
        assert!(request.language().is_script());
    }

    #[test]
    fn test_other_language_keeps_name() {
        let request = ExecutionRequest::new("print(1)", "Python");
        assert_eq!(request.language().as_str(), "python");
    }
}
