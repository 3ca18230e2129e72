//! Fetch-then-bootstrap orchestration.
//!
//! The orchestrator owns the validated configuration and the collaborator
//! seams, and drives one workflow per call: resolve the invocation mode,
//! resolve candidate URLs, build the fetch command, run it under retry,
//! then run the optional bootstrap command under its own retry. The two
//! retry invocations are independent — a bootstrap failure never re-runs
//! the fetch step.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::classify::{OutputClassifier, Severity};
use crate::command::{build_fetch_command, resolve_mode, Command};
use crate::config::FetchConfig;
use crate::error::Result;
use crate::exec::{CommandExecutor, SystemExecutor};
use crate::manifest::ManifestWriter;
use crate::proxy::{DirectResolver, ProxyResolver};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::tool::{
    CredentialsProvider, EnvCredentials, ExecutableLocator, FileDownloader, HttpDownloader,
    PathLocator,
};

/// One fetch workflow. Immutable for the duration of orchestration.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Path of the manifest the fetch tool interprets.
    pub manifest: PathBuf,
    /// Command to run after a successful fetch.
    pub bootstrap_cmd: Option<Command>,
    /// Working directory for the fetch (and bootstrap) processes.
    pub output_dir: Option<PathBuf>,
    /// Run both commands privileged.
    pub privileged: bool,
    /// Cache directory forwarded to the fetch tool.
    pub cache_dir: Option<PathBuf>,
}

impl FetchRequest {
    pub fn new(manifest: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            bootstrap_cmd: None,
            output_dir: None,
            privileged: false,
            cache_dir: None,
        }
    }

    pub fn with_bootstrap(mut self, command: Command) -> Self {
        self.bootstrap_cmd = Some(command);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }
}

/// Top-level coordinator for the fetch workflow.
pub struct FetchOrchestrator {
    config: FetchConfig,
    policy: RetryPolicy,
    classifier: OutputClassifier,
    executor: Box<dyn CommandExecutor>,
    proxies: Box<dyn ProxyResolver>,
    credentials: Box<dyn CredentialsProvider>,
    downloader: Box<dyn FileDownloader>,
    locator: Box<dyn ExecutableLocator>,
}

impl FetchOrchestrator {
    /// Build an orchestrator over the system collaborators.
    ///
    /// The configuration is validated here, before any attempt is made.
    pub fn new(config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let locator = PathLocator::new(&config.work_dir);
        Ok(Self {
            config,
            policy: RetryPolicy::default(),
            classifier: OutputClassifier::tool_errors(),
            executor: Box::new(SystemExecutor),
            proxies: Box::new(DirectResolver),
            credentials: Box::new(EnvCredentials),
            downloader: Box::new(HttpDownloader::new()),
            locator: Box::new(locator),
        })
    }

    pub fn with_executor(mut self, executor: Box<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_proxy_resolver(mut self, proxies: Box<dyn ProxyResolver>) -> Self {
        self.proxies = proxies;
        self
    }

    pub fn with_credentials(mut self, credentials: Box<dyn CredentialsProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_downloader(mut self, downloader: Box<dyn FileDownloader>) -> Self {
        self.downloader = downloader;
        self
    }

    pub fn with_locator(mut self, locator: Box<dyn ExecutableLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_classifier(mut self, classifier: OutputClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Manifest writer bound to this orchestrator's working directory.
    pub fn manifest_writer(&self) -> ManifestWriter {
        ManifestWriter::new(&self.config.work_dir)
    }

    /// Persist manifest content; defaults to `<work_dir>/tooltool.tt`.
    pub fn write_manifest(&self, content: &str, path: Option<&Path>) -> Result<PathBuf> {
        self.manifest_writer().write(content, path)
    }

    /// Run the fetch workflow for `request`.
    ///
    /// Success means the fetch command — and the bootstrap command, when
    /// requested — exited with a good status within the retry budget.
    /// There is no partial-success state.
    pub fn fetch(&self, request: &FetchRequest) -> Result<()> {
        let mode = resolve_mode(
            &self.config,
            self.locator.as_ref(),
            self.credentials.as_ref(),
            self.downloader.as_ref(),
        )?;

        let mut candidates = self.proxies.resolve(&self.config.tooltool_servers);
        if candidates.is_empty() {
            warn!(event = "proxy.empty_resolution");
            candidates = self.config.tooltool_servers.clone();
        }

        let command = build_fetch_command(
            &mode,
            &candidates,
            &request.manifest,
            request.cache_dir.as_deref(),
        );
        let retry = RetryExecutor::new(self.policy.clone());
        let cwd = request.output_dir.as_deref();

        info!(
            event = "fetch.start",
            manifest = %request.manifest.display(),
            candidates = candidates.len(),
        );
        retry.run(
            self.executor.as_ref(),
            &command,
            cwd,
            request.privileged,
            &self.classifier,
            &format!("Tooltool {} fetch failed!", request.manifest.display()),
            Severity::Fatal,
        )?;
        info!(event = "fetch.complete", manifest = %request.manifest.display());

        if let Some(bootstrap) = &request.bootstrap_cmd {
            info!(event = "bootstrap.start", command = %bootstrap);
            retry.run(
                self.executor.as_ref(),
                bootstrap,
                cwd,
                request.privileged,
                &self.classifier,
                &format!("Tooltool bootstrap {bootstrap} failed!"),
                Severity::Fatal,
            )?;
            info!(event = "bootstrap.complete", command = %bootstrap);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::FetchError;
    use crate::exec::tests::ScriptedExecutor;
    use crate::exec::ExecutionResult;
    use crate::tool::tests::{FailingDownloader, MockCredentials, MockLocator};

    /// Delegating wrapper so tests can keep inspecting the executor after
    /// handing it to the orchestrator.
    struct SharedExecutor(Arc<ScriptedExecutor>);

    impl CommandExecutor for SharedExecutor {
        fn execute(
            &self,
            command: &Command,
            cwd: Option<&Path>,
            privileged: bool,
            classifier: &OutputClassifier,
        ) -> Result<ExecutionResult> {
            self.0.execute(command, cwd, privileged, classifier)
        }
    }

    struct EmptyResolver;

    impl ProxyResolver for EmptyResolver {
        fn resolve(&self, _default_urls: &[String]) -> Vec<String> {
            Vec::new()
        }
    }

    fn orchestrator(
        servers: &[&str],
        executor: Arc<ScriptedExecutor>,
    ) -> FetchOrchestrator {
        let config = FetchConfig::new(servers.iter().map(|s| s.to_string()).collect(), "/work");
        FetchOrchestrator::new(config)
            .expect("valid config")
            .with_executor(Box::new(SharedExecutor(executor)))
            .with_locator(Box::new(MockLocator::absent()))
            .with_credentials(Box::new(MockCredentials::default()))
            .with_downloader(Box::new(FailingDownloader))
    }

    #[test]
    fn test_empty_server_list_rejected_at_construction() {
        let config = FetchConfig::new(vec![], "/work");
        assert!(matches!(
            FetchOrchestrator::new(config),
            Err(FetchError::NoServers)
        ));
    }

    #[test]
    fn test_single_server_fetch_succeeds_with_one_invocation() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let orch = orchestrator(&["https://a.example"], executor.clone());

        orch.fetch(&FetchRequest::new("m.tt")).expect("fetch");

        assert_eq!(executor.calls(), 1);
        let (command, cwd, privileged) = executor.invocations().remove(0);
        assert_eq!(
            command.tokens(),
            ["tooltool.py", "--url", "https://a.example", "fetch", "-m", "m.tt", "-o"]
        );
        assert_eq!(cwd, None);
        assert!(!privileged);
    }

    #[test]
    fn test_fetch_exhaustion_raises_workflow_failure() {
        let executor = Arc::new(ScriptedExecutor::always(1));
        let orch = orchestrator(&["https://a.example"], executor.clone())
            .with_retry_policy(RetryPolicy::default().with_max_attempts(2));

        let err = orch.fetch(&FetchRequest::new("m.tt")).unwrap_err();

        assert_eq!(executor.calls(), 2);
        match err {
            FetchError::WorkflowFailed { message, .. } => {
                assert_eq!(message, "Tooltool m.tt fetch failed!");
            }
            other => panic!("expected WorkflowFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_bootstrap_not_requested_means_single_invocation() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let orch = orchestrator(&["https://a.example"], executor.clone());

        orch.fetch(&FetchRequest::new("m.tt")).expect("fetch");

        assert_eq!(executor.calls(), 1);
    }

    #[test]
    fn test_bootstrap_runs_after_successful_fetch() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let orch = orchestrator(&["https://a.example"], executor.clone());
        let request = FetchRequest::new("m.tt")
            .with_bootstrap(Command::from_tokens(["sh", "install.sh"]));

        orch.fetch(&request).expect("fetch");

        let invocations = executor.invocations();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[1].0.tokens(), ["sh", "install.sh"]);
    }

    #[test]
    fn test_bootstrap_failure_names_bootstrap_and_does_not_refetch() {
        // Fetch succeeds on the first attempt, bootstrap fails every time.
        let executor = Arc::new(ScriptedExecutor::sequence(vec![0, 1, 1]));
        let orch = orchestrator(&["https://a.example"], executor.clone())
            .with_retry_policy(RetryPolicy::default().with_max_attempts(2));
        let request = FetchRequest::new("m.tt")
            .with_bootstrap(Command::from_tokens(["sh", "install.sh"]));

        let err = orch.fetch(&request).unwrap_err();

        // One fetch invocation, two bootstrap attempts.
        let invocations = executor.invocations();
        assert_eq!(invocations.len(), 3);
        assert_eq!(invocations[0].0.tokens()[0], "tooltool.py");
        assert_eq!(invocations[1].0.tokens(), ["sh", "install.sh"]);
        assert_eq!(invocations[2].0.tokens(), ["sh", "install.sh"]);
        match err {
            FetchError::WorkflowFailed { message, .. } => {
                assert_eq!(message, "Tooltool bootstrap sh install.sh failed!");
            }
            other => panic!("expected WorkflowFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_fetch_failure_skips_bootstrap() {
        let executor = Arc::new(ScriptedExecutor::always(1));
        let orch = orchestrator(&["https://a.example"], executor.clone())
            .with_retry_policy(RetryPolicy::default().with_max_attempts(2));
        let request = FetchRequest::new("m.tt")
            .with_bootstrap(Command::from_tokens(["sh", "install.sh"]));

        orch.fetch(&request).unwrap_err();

        // Both invocations are fetch attempts; bootstrap never ran.
        for (command, _, _) in executor.invocations() {
            assert_eq!(command.tokens()[0], "tooltool.py");
        }
    }

    #[test]
    fn test_all_candidates_in_one_invocation() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let orch = orchestrator(&["https://a.example", "https://b.example"], executor.clone());

        orch.fetch(&FetchRequest::new("m.tt")).expect("fetch");

        assert_eq!(executor.calls(), 1);
        let (command, _, _) = executor.invocations().remove(0);
        let url_count = command.tokens().iter().filter(|t| *t == "--url").count();
        assert_eq!(url_count, 2);
    }

    #[test]
    fn test_empty_resolution_falls_back_to_configured_servers() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let orch = orchestrator(&["https://a.example"], executor.clone())
            .with_proxy_resolver(Box::new(EmptyResolver));

        orch.fetch(&FetchRequest::new("m.tt")).expect("fetch");

        let (command, _, _) = executor.invocations().remove(0);
        assert!(command.tokens().contains(&"https://a.example".to_string()));
    }

    #[test]
    fn test_cache_and_output_dir_forwarding() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let orch = orchestrator(&["https://a.example"], executor.clone());
        let request = FetchRequest::new("m.tt")
            .with_output_dir("/out")
            .with_cache_dir("/cache")
            .privileged(true);

        orch.fetch(&request).expect("fetch");

        let (command, cwd, privileged) = executor.invocations().remove(0);
        let tokens = command.tokens();
        assert_eq!(&tokens[tokens.len() - 2..], ["-c", "/cache"]);
        assert_eq!(cwd, Some(PathBuf::from("/out")));
        assert!(privileged);
    }

    #[test]
    fn test_developer_mode_without_tool_fails_before_any_attempt() {
        let executor = Arc::new(ScriptedExecutor::always(0));
        let config = FetchConfig::new(vec!["https://a.example".to_string()], "/work")
            .with_developer_mode(true);
        let orch = FetchOrchestrator::new(config)
            .expect("valid config")
            .with_executor(Box::new(SharedExecutor(executor.clone())))
            .with_locator(Box::new(MockLocator::absent()))
            .with_credentials(Box::new(MockCredentials::default()))
            .with_downloader(Box::new(FailingDownloader));

        let err = orch.fetch(&FetchRequest::new("m.tt")).unwrap_err();

        assert!(matches!(err, FetchError::MissingExecutable(_)));
        assert_eq!(executor.calls(), 0);
    }

    #[test]
    fn test_write_manifest_defaults_into_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::always(0));
        let config = FetchConfig::new(vec!["https://a.example".to_string()], dir.path());
        let orch = FetchOrchestrator::new(config)
            .expect("valid config")
            .with_executor(Box::new(SharedExecutor(executor)));

        let path = orch.write_manifest("content", None).expect("write");

        assert_eq!(path, dir.path().join("tooltool.tt"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }
}
