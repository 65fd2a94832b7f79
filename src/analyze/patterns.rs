// Textual heuristics applied to raw source before anything runs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::RuleCategory;

/// A single deny pattern, matched case-sensitively against raw source.
pub struct DenyRule {
    pub pattern: Regex,
    pub category: RuleCategory,
}

impl DenyRule {
    /// Rule identifier as reported to callers, e.g. `/require\s*\(/`.
    pub fn id(&self) -> String {
        format!("/{}/", self.pattern.as_str())
    }
}

/// Checked in order; the first match wins.
const DENY_SOURCES: &[(&str, RuleCategory)] = &[
    (r"require\s*\(", RuleCategory::ModuleLoading),
    (r"import\s+", RuleCategory::ModuleLoading),
    (r"process\.", RuleCategory::ProcessAccess),
    (r"child_process", RuleCategory::Subprocess),
    (r"fs\.", RuleCategory::Filesystem),
    (r"exec\s*\(", RuleCategory::Subprocess),
    (r"spawn\s*\(", RuleCategory::Subprocess),
    (r"eval\s*\(", RuleCategory::DynamicCode),
    (r"Function\s*\(", RuleCategory::DynamicCode),
    (r"__dirname", RuleCategory::Filesystem),
    (r"__filename", RuleCategory::Filesystem),
    (r"global\.", RuleCategory::AmbientGlobal),
    (r"globalThis\.", RuleCategory::AmbientGlobal),
];

pub static DENY_RULES: Lazy<Vec<DenyRule>> = Lazy::new(|| {
    DENY_SOURCES
        .iter()
        .map(|(pattern, category)| DenyRule {
            pattern: Regex::new(pattern).unwrap(),
            category: *category,
        })
        .collect()
});

/// Vocabulary that suggests the learner expects a real page to exist.
pub static DOM_USAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(document|window|DOM|getElementById|querySelector|createElement|appendChild|innerHTML|innerText|textContent|body)\b",
    )
    .unwrap()
});

/// Leading keywords that mark source as a statement sequence rather than a bare expression.
pub const STATEMENT_PREFIXES: &[&str] = &[
    "const ", "let ", "var ", "function ", "class ", "if ", "for ", "while ", "do ", "switch ",
    "try ", "throw ", "return ",
];

/// Keywords that take an operand and nest the way unary operators do.
pub const PREFIX_KEYWORDS: &[&str] = &["typeof", "void", "delete", "await", "new", "yield"];

/// A logging call anywhere means the source is run for its side effects.
pub const LOGGING_MARKER: &str = "console.";
