//! External command execution.
//!
//! The executor is the only place a subprocess is spawned. It blocks for
//! the duration of the child, captures its output, and hands every line
//! through the caller's classifier, logging each at its classified level.

use std::path::Path;

use tracing::{error, info, warn};

use crate::classify::{OutputClassifier, Severity};
use crate::command::Command;
use crate::error::{FetchError, Result};

/// One output line with its classified severity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub severity: Severity,
    pub text: String,
}

/// Outcome of a single command attempt.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Exit status code; `-1` when the process was terminated by a signal.
    pub status: i32,
    /// Classified output lines, stdout before stderr.
    pub lines: Vec<ClassifiedLine>,
}

impl ExecutionResult {
    /// Whether the exit status counts as success.
    pub fn is_good(&self, good_statuses: &[i32]) -> bool {
        good_statuses.contains(&self.status)
    }

    /// The highest severity among the classified lines.
    pub fn worst_severity(&self) -> Severity {
        self.lines
            .iter()
            .map(|line| line.severity)
            .max()
            .unwrap_or(Severity::Info)
    }
}

/// Runs an external command and reports its classified outcome.
pub trait CommandExecutor {
    fn execute(
        &self,
        command: &Command,
        cwd: Option<&Path>,
        privileged: bool,
        classifier: &OutputClassifier,
    ) -> Result<ExecutionResult>;
}

/// Executor backed by `std::process::Command`.
///
/// Privileged commands are re-run through `sudo`; the command's own tokens
/// are never rewritten.
#[derive(Debug, Clone, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    fn execute(
        &self,
        command: &Command,
        cwd: Option<&Path>,
        privileged: bool,
        classifier: &OutputClassifier,
    ) -> Result<ExecutionResult> {
        let program = command.program().ok_or_else(|| FetchError::Spawn {
            command: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

        let mut child = if privileged {
            let mut child = std::process::Command::new("sudo");
            child.args(command.tokens());
            child
        } else {
            let mut child = std::process::Command::new(program);
            child.args(command.args());
            child
        };
        if let Some(dir) = cwd {
            child.current_dir(dir);
        }

        info!(event = "command.start", command = %command, cwd = ?cwd, privileged = privileged);
        let output = child.output().map_err(|source| FetchError::Spawn {
            command: command.to_string(),
            source,
        })?;
        let status = output.status.code().unwrap_or(-1);

        let mut lines = Vec::new();
        for stream in [&output.stdout, &output.stderr] {
            for text in String::from_utf8_lossy(stream).lines() {
                let severity = classifier.classify(text);
                match severity {
                    Severity::Info => info!(line = %text),
                    Severity::Warning => warn!(line = %text),
                    Severity::Error | Severity::Fatal => {
                        error!(severity = %severity, line = %text)
                    }
                }
                lines.push(ClassifiedLine {
                    severity,
                    text: text.to_string(),
                });
            }
        }

        info!(event = "command.finished", status = status);
        Ok(ExecutionResult { status, lines })
    }
}
