//! Toolfetch core library
//!
//! Orchestrates an external, manifest-driven artifact fetch tool:
//! materialise a manifest, resolve mirror/proxy candidate URLs, assemble
//! the fetch invocation, and drive it (plus an optional bootstrap command)
//! under a bounded retry policy. Integrity verification and per-URL
//! fallback belong to the fetch tool itself; this crate only builds and
//! supervises the invocation.

pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod exec;
pub mod manifest;
pub mod orchestrator;
pub mod proxy;
pub mod retry;
pub mod telemetry;
pub mod tool;

pub use classify::{OutputClassifier, Rule, Severity};
pub use command::{build_fetch_command, resolve_mode, Command, FetchMode};
pub use config::{FetchConfig, DEFAULT_TOOL_NAME};
pub use error::{FetchError, Result};
pub use exec::{ClassifiedLine, CommandExecutor, ExecutionResult, SystemExecutor};
pub use manifest::{ManifestWriter, DEFAULT_MANIFEST_NAME};
pub use orchestrator::{FetchOrchestrator, FetchRequest};
pub use proxy::{DirectResolver, ProxyChain, ProxyResolver};
pub use retry::{RetryExecutor, RetryOutcome, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
pub use telemetry::init_tracing;
pub use tool::{
    make_executable, retrieve_tool, CredentialsProvider, EnvCredentials, ExecutableLocator,
    FileDownloader, HttpDownloader, PathLocator,
};

/// Toolfetch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
