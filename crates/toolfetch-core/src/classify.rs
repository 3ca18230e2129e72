//! Output-line classification for external tool runs.
//!
//! Each line a tool emits is matched, in order, against a rule list; the
//! first matching rule decides the line's severity. Unmatched lines are
//! informational. Classification feeds logging only — retry decisions are
//! driven by exit status, never by line severity.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Severity assigned to a classified output line, and the level a workflow
/// failure is raised at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Fatal => write!(f, "fatal"),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Substring(String),
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, line: &str) -> bool {
        match self {
            Matcher::Substring(s) => line.contains(s.as_str()),
            Matcher::Pattern(re) => re.is_match(line),
        }
    }
}

/// A single pattern-to-severity classification rule.
#[derive(Debug, Clone)]
pub struct Rule {
    matcher: Matcher,
    severity: Severity,
}

impl Rule {
    /// Rule matching any line that contains `needle`.
    pub fn substring(needle: impl Into<String>, severity: Severity) -> Self {
        Self {
            matcher: Matcher::Substring(needle.into()),
            severity,
        }
    }

    /// Rule matching any line the regular expression matches.
    pub fn pattern(pattern: &str, severity: Severity) -> Result<Self, regex::Error> {
        Ok(Self {
            matcher: Matcher::Pattern(Regex::new(pattern)?),
            severity,
        })
    }
}

/// Ordered rule list; first match wins.
#[derive(Debug, Clone, Default)]
pub struct OutputClassifier {
    rules: Vec<Rule>,
}

impl OutputClassifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The default rule set for fetch-tool output.
    ///
    /// The fetch tool prefixes its own log lines with `LEVEL - `, and an
    /// interpreter crash surfaces as a traceback; both count against the run
    /// in the logs even though only the exit status drives retries.
    pub fn tool_errors() -> Self {
        Self::new(vec![
            Rule::substring("FATAL - ", Severity::Fatal),
            Rule::substring("CRITICAL - ", Severity::Fatal),
            Rule::substring("ERROR - ", Severity::Error),
            Rule::substring("Traceback (most recent call last)", Severity::Error),
            Rule::pattern(r"raise \w*(Exception|Error)", Severity::Fatal)
                .expect("hard-coded pattern compiles"),
            Rule::substring("WARNING - ", Severity::Warning),
            Rule::pattern(r"^Warning:", Severity::Warning).expect("hard-coded pattern compiles"),
        ])
    }

    /// Classify a single output line. Rules are tried in order; the first
    /// match decides. Unmatched lines are [`Severity::Info`].
    pub fn classify(&self, line: &str) -> Severity {
        for rule in &self.rules {
            if rule.matcher.matches(line) {
                return rule.severity;
            }
        }
        Severity::Info
    }
}
