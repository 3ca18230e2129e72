//! Toolfetch - manifest-driven artifact fetcher
//!
//! The `toolfetch` command wraps the fetch orchestration library:
//!
//! - `fetch`: fetch the artifacts a manifest describes, optionally running
//!   a bootstrap command afterward
//! - `write-manifest`: materialise manifest content on disk

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use toolfetch_core::{
    init_tracing, Command as ToolCommand, FetchConfig, FetchOrchestrator, FetchRequest,
    ManifestWriter, ProxyChain,
};

#[derive(Parser)]
#[command(name = "toolfetch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch manifest-described build artifacts from mirrored servers", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the artifacts a manifest describes
    Fetch {
        /// Path to the manifest
        #[arg(short, long)]
        manifest: PathBuf,

        /// Artifact server base URL, in fallback-preference order (repeatable)
        #[arg(short, long = "server", required_unless_present = "config")]
        servers: Vec<String>,

        /// Load configuration from a JSON file instead of flags
        #[arg(long, conflicts_with_all = ["servers", "developer_mode", "tool_url"])]
        config: Option<PathBuf>,

        /// Proxy domain to front the servers through (repeatable)
        #[arg(long = "proxy")]
        proxies: Vec<String>,

        /// Working directory (default: current directory)
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Directory the fetch command runs in
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Cache directory forwarded to the fetch tool
        #[arg(short, long)]
        cache: Option<PathBuf>,

        /// Command to run after a successful fetch
        #[arg(long)]
        bootstrap: Option<String>,

        /// Run the fetch and bootstrap commands privileged
        #[arg(long)]
        privileged: bool,

        /// Developer mode: authenticated fetch, self-retrieved tool
        #[arg(long)]
        developer_mode: bool,

        /// URL to retrieve the fetch tool from when it is absent
        #[arg(long)]
        tool_url: Option<String>,
    },

    /// Write a manifest file
    WriteManifest {
        /// Manifest content, inline
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Read manifest content from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Target path (default: `<work-dir>/tooltool.tt`)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Working directory (default: current directory)
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    match cli.command {
        Commands::Fetch {
            manifest,
            servers,
            config,
            proxies,
            work_dir,
            output_dir,
            cache,
            bootstrap,
            privileged,
            developer_mode,
            tool_url,
        } => run_fetch(FetchArgs {
            manifest,
            servers,
            config,
            proxies,
            work_dir,
            output_dir,
            cache,
            bootstrap,
            privileged,
            developer_mode,
            tool_url,
        }),
        Commands::WriteManifest {
            content,
            file,
            out,
            work_dir,
        } => run_write_manifest(content, file, out, work_dir),
    }
}

struct FetchArgs {
    manifest: PathBuf,
    servers: Vec<String>,
    config: Option<PathBuf>,
    proxies: Vec<String>,
    work_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    cache: Option<PathBuf>,
    bootstrap: Option<String>,
    privileged: bool,
    developer_mode: bool,
    tool_url: Option<String>,
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    let work_dir = resolve_work_dir(args.work_dir)?;

    let config = match args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            let config: FetchConfig = serde_json::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            config
        }
        None => {
            let mut config =
                FetchConfig::new(args.servers, work_dir).with_developer_mode(args.developer_mode);
            if let Some(url) = args.tool_url {
                config = config.with_tool_url(url);
            }
            config
        }
    };

    let mut orchestrator = FetchOrchestrator::new(config)?;
    if !args.proxies.is_empty() {
        debug!(proxies = args.proxies.len(), "fronting servers through proxies");
        orchestrator = orchestrator.with_proxy_resolver(Box::new(ProxyChain::new(args.proxies)));
    }

    let mut request = FetchRequest::new(args.manifest).privileged(args.privileged);
    if let Some(dir) = args.output_dir {
        request = request.with_output_dir(dir);
    }
    if let Some(dir) = args.cache {
        request = request.with_cache_dir(dir);
    }
    if let Some(bootstrap) = args.bootstrap {
        let tokens: Vec<&str> = bootstrap.split_whitespace().collect();
        if tokens.is_empty() {
            bail!("bootstrap command is empty");
        }
        request = request.with_bootstrap(ToolCommand::from_tokens(tokens));
    }

    orchestrator.fetch(&request)?;
    Ok(())
}

fn run_write_manifest(
    content: Option<String>,
    file: Option<PathBuf>,
    out: Option<PathBuf>,
    work_dir: Option<PathBuf>,
) -> Result<()> {
    let content = match (content, file) {
        (Some(content), None) => content,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("could not read {}", path.display()))?,
        (None, None) => bail!("one of --content or --file is required"),
        (Some(_), Some(_)) => unreachable!("clap rejects --content with --file"),
    };

    let work_dir = resolve_work_dir(work_dir)?;
    let writer = ManifestWriter::new(work_dir);
    let path = writer.write(&content, out.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

fn resolve_work_dir(work_dir: Option<PathBuf>) -> Result<PathBuf> {
    match work_dir {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().context("could not determine current directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_requires_servers_without_config() {
        let result = Cli::try_parse_from(["toolfetch", "fetch", "--manifest", "m.tt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_fetch_parses_repeated_servers() {
        let cli = Cli::try_parse_from([
            "toolfetch",
            "fetch",
            "--manifest",
            "m.tt",
            "--server",
            "https://a.example",
            "--server",
            "https://b.example",
        ])
        .expect("parse");
        match cli.command {
            Commands::Fetch { servers, .. } => {
                assert_eq!(servers, ["https://a.example", "https://b.example"]);
            }
            _ => panic!("expected fetch subcommand"),
        }
    }

    #[test]
    fn test_write_manifest_rejects_content_with_file() {
        let result = Cli::try_parse_from([
            "toolfetch",
            "write-manifest",
            "--content",
            "x",
            "--file",
            "m.tt",
        ]);
        assert!(result.is_err());
    }
}
