//! Immutable workflow configuration.
//!
//! All knobs the orchestrator reads live here, passed in at construction.
//! There is no process-wide configuration state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// Default name of the external fetch tool executable.
pub const DEFAULT_TOOL_NAME: &str = "tooltool.py";

/// Configuration for the fetch workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FetchConfig {
    /// Base URLs of the artifact servers, in fallback-preference order.
    /// Must be non-empty.
    pub tooltool_servers: Vec<String>,

    /// Developer mode: run the tool with an authentication file, and
    /// self-retrieve the tool executable when it is absent locally.
    #[serde(default)]
    pub developer_mode: bool,

    /// URL the tool executable can be retrieved from when absent.
    #[serde(default)]
    pub tooltool_py_url: Option<String>,

    /// Name of the fetch tool executable to locate.
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Working directory: default manifest location and landing spot for a
    /// self-retrieved tool executable.
    pub work_dir: PathBuf,
}

fn default_tool_name() -> String {
    DEFAULT_TOOL_NAME.to_string()
}

impl FetchConfig {
    /// Create a configuration for the given servers and working directory.
    pub fn new(servers: Vec<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            tooltool_servers: servers,
            developer_mode: false,
            tooltool_py_url: None,
            tool_name: default_tool_name(),
            work_dir: work_dir.into(),
        }
    }

    /// Enable developer (authenticated) mode.
    pub fn with_developer_mode(mut self, enabled: bool) -> Self {
        self.developer_mode = enabled;
        self
    }

    /// Set the tool self-retrieval URL.
    pub fn with_tool_url(mut self, url: impl Into<String>) -> Self {
        self.tooltool_py_url = Some(url.into());
        self
    }

    /// Override the fetch tool executable name.
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    /// Validate the configuration. The server list must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.tooltool_servers.is_empty() {
            return Err(FetchError::NoServers);
        }
        Ok(())
    }
}
