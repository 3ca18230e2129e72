//! Bounded retry around command execution.
//!
//! A step is attempted up to the policy's bound; the first attempt whose
//! exit status is good ends the step immediately. Exhausting the bound is
//! terminal for the whole workflow, not just the step. There is no backoff
//! delay between attempts.

use std::path::Path;

use tracing::{error, info, warn};

use crate::classify::{OutputClassifier, Severity};
use crate::command::Command;
use crate::error::{FetchError, Result};
use crate::exec::{CommandExecutor, ExecutionResult};

/// Default attempt bound.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Retry parameters for one workflow step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Exit statuses that count as success.
    pub good_statuses: Vec<i32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            good_statuses: vec![0],
        }
    }
}

impl RetryPolicy {
    /// Override the attempt bound.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        self.max_attempts = max_attempts;
        self
    }

    /// Override the good-status set.
    pub fn with_good_statuses(mut self, good_statuses: Vec<i32>) -> Self {
        self.good_statuses = good_statuses;
        self
    }
}

/// Successful outcome of a retried step.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    /// 1-based attempt number that succeeded.
    pub attempts: u32,
    /// The successful attempt's result.
    pub result: ExecutionResult,
}

/// Drives a command-executing collaborator under a [`RetryPolicy`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `command` until a good exit status or exhaustion.
    ///
    /// An executor-level launch failure consumes an attempt like a bad
    /// status. On exhaustion returns [`FetchError::WorkflowFailed`] carrying
    /// `failure_message` at `failure_severity`.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        executor: &dyn CommandExecutor,
        command: &Command,
        cwd: Option<&Path>,
        privileged: bool,
        classifier: &OutputClassifier,
        failure_message: &str,
        failure_severity: Severity,
    ) -> Result<RetryOutcome> {
        for attempt in 1..=self.policy.max_attempts {
            match executor.execute(command, cwd, privileged, classifier) {
                Ok(result) if result.is_good(&self.policy.good_statuses) => {
                    info!(event = "step.succeeded", attempt = attempt, status = result.status);
                    return Ok(RetryOutcome {
                        attempts: attempt,
                        result,
                    });
                }
                Ok(result) => {
                    warn!(
                        event = "step.attempt_failed",
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        status = result.status,
                    );
                }
                Err(err) => {
                    warn!(
                        event = "step.attempt_failed",
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                    );
                }
            }
        }

        error!(event = "step.exhausted", message = failure_message, severity = %failure_severity);
        Err(FetchError::WorkflowFailed {
            message: failure_message.to_string(),
            severity: failure_severity,
            attempts: self.policy.max_attempts,
        })
    }
}
