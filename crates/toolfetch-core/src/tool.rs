//! Fetch-tool bootstrap collaborators.
//!
//! Locating the external fetch tool, retrieving it when absent (developer
//! mode), and resolving the authentication file live behind small traits so
//! the orchestrator and its tests can swap them out.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{FetchError, Result};

/// Environment variable naming the authentication file.
pub const CREDENTIALS_ENV: &str = "TOOLTOOL_AUTH_FILE";

/// Default authentication filename under the home directory.
pub const CREDENTIALS_FILE: &str = ".tooltool-token";

/// Resolves the fetch tool's location, if it exists.
pub trait ExecutableLocator {
    fn locate(&self, name: &str) -> Option<PathBuf>;
}

/// Looks for the tool in the working directory first, then on `PATH`.
#[derive(Debug, Clone)]
pub struct PathLocator {
    work_dir: PathBuf,
}

impl PathLocator {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }
}

impl ExecutableLocator for PathLocator {
    fn locate(&self, name: &str) -> Option<PathBuf> {
        let local = self.work_dir.join(name);
        if local.is_file() {
            return Some(local);
        }
        let path_var = std::env::var_os("PATH")?;
        std::env::split_paths(&path_var)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    }
}

/// Single-shot file download.
pub trait FileDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Blocking HTTP downloader.
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("toolfetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl FileDownloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let download_err = |reason: String| FetchError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| download_err(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }
        let body = response.bytes().map_err(|e| download_err(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(dest, &body)?;
        debug!(event = "download.complete", url = %url, dest = %dest.display(), bytes = body.len());
        Ok(())
    }
}

/// Resolves the path of the authentication token file.
pub trait CredentialsProvider {
    fn credentials_path(&self) -> Result<PathBuf>;
}

/// Resolves credentials from `TOOLTOOL_AUTH_FILE`, falling back to
/// `~/.tooltool-token`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl CredentialsProvider for EnvCredentials {
    fn credentials_path(&self) -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CREDENTIALS_ENV) {
            return Ok(PathBuf::from(path));
        }
        match std::env::var_os("HOME") {
            Some(home) => Ok(PathBuf::from(home).join(CREDENTIALS_FILE)),
            None => Err(FetchError::Credentials(format!(
                "neither {CREDENTIALS_ENV} nor HOME is set"
            ))),
        }
    }
}

/// Mark a file executable (0755). No-op on non-unix platforms.
pub fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Retrieve the fetch tool into the working directory and mark it
/// executable. Fails if the download completes but the file did not land.
pub fn retrieve_tool(
    downloader: &dyn FileDownloader,
    url: &str,
    work_dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    let dest = work_dir.join(name);
    downloader.download(url, &dest)?;
    if !dest.is_file() {
        return Err(FetchError::Download {
            url: url.to_string(),
            reason: format!("{} did not materialise", dest.display()),
        });
    }
    make_executable(&dest)?;
    info!(event = "tool.retrieved", path = %dest.display());
    Ok(dest)
}
