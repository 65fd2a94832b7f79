//! Static vetting of untrusted source text.
//!
//! This is a fail-closed *textual* heuristic: it matches regexes against raw
//! source and never parses it. It stops naive attempts to reach host
//! resources, but obfuscated code (`this["ev" + "al"]`, `.constructor(...)`)
//! walks straight past it, and benign text that merely mentions a blocked
//! word (a comment saying `import something`) is rejected. The shim is the
//! layer that keeps missed constructs inert; neither layer is an OS-level
//! sandbox.

pub mod patterns;

use crate::models::VettingVerdict;

use patterns::{
    DENY_RULES, DOM_USAGE_PATTERN, LOGGING_MARKER, PREFIX_KEYWORDS, STATEMENT_PREFIXES,
};

/// Scan source against the deny list and stop at the first match.
pub fn vet(source: &str) -> VettingVerdict {
    for rule in DENY_RULES.iter() {
        if let Some(found) = rule.pattern.find(source) {
            let verdict = VettingVerdict::blocked(
                rule.id(),
                rule.category,
                line_from_offset(source, found.start()),
            );
            tracing::warn!(
                rule = %rule.id(),
                category = rule.category.as_str(),
                line = verdict.line,
                "source rejected by static vetting"
            );
            return verdict;
        }
    }

    VettingVerdict::allowed()
}

/// Whether source looks like one evaluable expression whose value should be captured.
pub fn is_bare_expression(source: &str) -> bool {
    let trimmed = source.trim();

    !source.contains(';')
        && !source.contains(LOGGING_MARKER)
        && !STATEMENT_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
}

/// Whether source text mentions page/DOM vocabulary.
pub fn mentions_dom(source: &str) -> bool {
    DOM_USAGE_PATTERN.is_match(source)
}

/// Estimate how deeply the parser will recurse on `source`.
///
/// Counts open brackets plus chains of right-nested operators (unary `!`
/// `~` `-` `+`, assignment, `?`, `=>`, `**` and prefix keywords such as
/// `typeof`) at each bracket level. String and comment text is counted like
/// code, so the estimate errs high.
pub fn nesting_depth(source: &str) -> usize {
    let chars: Vec<char> = source.chars().collect();
    let mut nesting = Nesting::default();
    let mut prev: Option<char> = None;
    let mut word = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() || c == '_' || c == '$' {
            word.push(c);
            continue;
        }
        if !word.is_empty() {
            if PREFIX_KEYWORDS.contains(&word.as_str()) {
                nesting.chain();
                prev = Some('!');
            } else {
                prev = Some('a');
            }
            word.clear();
        }
        if c.is_whitespace() {
            continue;
        }

        let next = chars.get(i + 1).copied();
        match c {
            '(' | '[' | '{' => nesting.open(),
            ')' | ']' | '}' => nesting.close(),
            ';' | ',' => nesting.reset(),
            '!' | '~' if next != Some('=') => nesting.chain(),
            '?' if next != Some('.') && next != Some('?') && prev != Some('?') => nesting.chain(),
            '=' if next != Some('=') && !matches!(prev, Some('=' | '!' | '<' | '>')) => {
                nesting.chain()
            }
            '*' if next == Some('*') => nesting.chain(),
            '+' | '-' if prev.is_none_or(|p| "=(,[{!~?:+-*/%&|^<>;}".contains(p)) => {
                nesting.chain()
            }
            _ => {}
        }
        prev = Some(c);
    }

    nesting.deepest
}

/// Operator chain length per open bracket level
struct Nesting {
    chains: Vec<usize>,
    chained: usize,
    deepest: usize,
}

impl Default for Nesting {
    fn default() -> Self {
        Self {
            chains: vec![0],
            chained: 0,
            deepest: 0,
        }
    }
}

impl Nesting {
    fn current(&self) -> usize {
        self.chains.len() - 1 + self.chained
    }

    fn open(&mut self) {
        self.chains.push(0);
        self.deepest = self.deepest.max(self.current());
    }

    fn close(&mut self) {
        if self.chains.len() > 1
            && let Some(level) = self.chains.pop()
        {
            self.chained -= level;
        }
    }

    fn reset(&mut self) {
        if let Some(level) = self.chains.last_mut() {
            self.chained -= *level;
            *level = 0;
        }
    }

    fn chain(&mut self) {
        if let Some(level) = self.chains.last_mut() {
            *level += 1;
        }
        self.chained += 1;
        self.deepest = self.deepest.max(self.current());
    }
}

/// 1-based line number of a byte offset
fn line_from_offset(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}
