/// What kind of host resource a deny rule guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    ModuleLoading,
    ProcessAccess,
    Filesystem,
    Subprocess,
    DynamicCode,
    AmbientGlobal,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::ModuleLoading => "Module Loading",
            RuleCategory::ProcessAccess => "Process Access",
            RuleCategory::Filesystem => "Filesystem",
            RuleCategory::Subprocess => "Subprocess",
            RuleCategory::DynamicCode => "Dynamic Code",
            RuleCategory::AmbientGlobal => "Ambient Global",
        }
    }
}

/// Outcome of vetting one source text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VettingVerdict {
    pub blocked: bool,
    /// Identifier of the first matching rule, written like a JS regex literal (`/require\s*\(/`).
    pub matched_rule: Option<String>,
    pub category: Option<RuleCategory>,
    /// 1-based line of the first match.
    pub line: Option<usize>,
}

impl VettingVerdict {
    pub fn allowed() -> Self {
        Self::default()
    }

    pub fn blocked(rule: impl Into<String>, category: RuleCategory, line: usize) -> Self {
        Self {
            blocked: true,
            matched_rule: Some(rule.into()),
            category: Some(category),
            line: Some(line),
        }
    }
}
