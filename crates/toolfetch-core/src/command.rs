//! Fetch command assembly.
//!
//! A [`Command`] is a flat, append-only token sequence handed to the
//! executor without shell interpretation. The builder resolves the fetch
//! tool (plain or authenticated), lays down one `--url` pair per candidate
//! server, then the fetch sub-arguments. URL fallback is the fetch tool's
//! contract: every candidate goes into a single invocation, in order, and
//! the tool falls through on failure.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::tool::{retrieve_tool, CredentialsProvider, ExecutableLocator, FileDownloader};

/// An external invocation: executable followed by its arguments.
///
/// Tokens are only ever appended — never reordered, removed, or
/// shell-expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    tokens: Vec<String>,
}

impl Command {
    /// Start a command with the given program token.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            tokens: vec![program.into()],
        }
    }

    /// Build a command from a prepared token sequence.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a single token.
    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    /// Append a sequence of tokens.
    pub fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tokens.extend(tokens.into_iter().map(Into::into));
    }

    /// The program token, if the command is non-empty.
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    /// Argument tokens after the program.
    pub fn args(&self) -> &[String] {
        self.tokens.get(1..).unwrap_or(&[])
    }

    /// The full token sequence.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// How the fetch tool is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    /// Invoke the tool directly.
    Plain(PathBuf),
    /// Invoke the tool with an authentication file (developer mode).
    Authenticated {
        tool: PathBuf,
        credentials: PathBuf,
    },
}

/// Resolve the invocation mode from configuration.
///
/// Plain mode references the tool by its located path, or by bare name so
/// the OS resolves it at spawn time. Developer mode requires the tool to
/// exist: when absent it is retrieved from `tooltool_py_url` into the
/// working directory first, and the run fails with
/// [`FetchError::MissingExecutable`] when no retrieval URL is configured.
pub fn resolve_mode(
    config: &FetchConfig,
    locator: &dyn ExecutableLocator,
    credentials: &dyn CredentialsProvider,
    downloader: &dyn FileDownloader,
) -> Result<FetchMode> {
    let located = locator.locate(&config.tool_name);

    if !config.developer_mode {
        let tool = located.unwrap_or_else(|| PathBuf::from(&config.tool_name));
        debug!(event = "mode.resolved", mode = "plain", tool = %tool.display());
        return Ok(FetchMode::Plain(tool));
    }

    let tool = match located {
        Some(path) => path,
        None => match config.tooltool_py_url.as_deref() {
            Some(url) => {
                info!(event = "tool.retrieving", url = %url);
                retrieve_tool(downloader, url, &config.work_dir, &config.tool_name)?
            }
            None => return Err(FetchError::MissingExecutable(config.tool_name.clone())),
        },
    };

    let credentials = credentials.credentials_path()?;
    debug!(event = "mode.resolved", mode = "authenticated", tool = %tool.display());
    Ok(FetchMode::Authenticated { tool, credentials })
}

/// Assemble the fetch invocation.
///
/// Token layout:
/// `<tool> [--authentication-file <creds>] (--url <candidate>)* fetch -m <manifest> -o [-c <cache>]`
///
/// The output directory is not a token; it becomes the executor's working
/// directory.
pub fn build_fetch_command(
    mode: &FetchMode,
    urls: &[String],
    manifest: &Path,
    cache_dir: Option<&Path>,
) -> Command {
    let mut cmd = match mode {
        FetchMode::Plain(tool) => Command::new(tool.display().to_string()),
        FetchMode::Authenticated { tool, credentials } => {
            let mut cmd = Command::new(tool.display().to_string());
            cmd.push("--authentication-file");
            cmd.push(credentials.display().to_string());
            cmd
        }
    };

    for url in urls {
        cmd.push("--url");
        cmd.push(url.clone());
    }

    cmd.extend(["fetch", "-m"]);
    cmd.push(manifest.display().to_string());
    cmd.push("-o");

    if let Some(cache) = cache_dir {
        cmd.push("-c");
        cmd.push(cache.display().to_string());
    }

    cmd
}
