//! patchnotes command-line page.
//!
//! Loads the patch list through the worker, renders it to the terminal and
//! drives the worker's cache-clearing commands.

mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use patchnotes_client::fetch::{canonicalize_origin, resolve};
use patchnotes_client::{FetchClient, FetchConfig, LocalStore, Page, PageHost, PatchLoader, WorkerBridge};
use patchnotes_core::http::{Network, Request};
use patchnotes_core::page::{PageEvent, Phase};
use patchnotes_core::patch::{Manifest, generate_report, validate_current};
use patchnotes_core::{AppConfig, Error};

use crate::terminal::TerminalTarget;

#[derive(Debug, Parser)]
#[command(name = "patchnotes", version, about = "Browse patch notes through the caching worker")]
struct Cli {
    /// Worker address (defaults to the configured listen address).
    #[arg(long, env = "PATCHNOTES_WORKER_URL")]
    worker: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load and print the patch list.
    List {
        /// Case-insensitive match on patch number or date.
        #[arg(long)]
        search: Option<String>,
        /// Four-digit year.
        #[arg(long)]
        year: Option<String>,
        /// Print the list markup instead of plain text.
        #[arg(long)]
        html: bool,
    },
    /// Validate a manifest file or URL and print the report.
    Validate { source: String },
    /// Ask the worker to clear its caches.
    ClearCache {
        /// Only the CSS bucket.
        #[arg(long)]
        css: bool,
    },
    /// Show the worker's registration.
    Status,
}

/// Page host backed by the local state file.
///
/// The file is never parsed here; the reset must work on a corrupt one.
struct CliHost {
    state_path: PathBuf,
    reload_requested: bool,
}

impl CliHost {
    fn new(state_path: impl Into<PathBuf>) -> Self {
        Self { state_path: state_path.into(), reload_requested: false }
    }
}

impl PageHost for CliHost {
    fn clear_local_state(&mut self) -> Result<(), Error> {
        LocalStore::discard(&self.state_path)
    }

    fn reload(&mut self) {
        self.reload_requested = true;
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    let worker = match &cli.worker {
        Some(worker) => canonicalize_origin(worker),
        None => canonicalize_origin(&config.listen_addr),
    }
    .context("parsing worker address")?;

    match cli.command {
        Command::List { search, year, html } => list(&config, &worker, search, year, html).await,
        Command::Validate { source } => validate(&config, &source).await,
        Command::ClearCache { css } => clear_cache(&config, &worker, css).await,
        Command::Status => status(&config, &worker).await,
    }
}

async fn list(
    config: &AppConfig, worker: &Url, search: Option<String>, year: Option<String>, html: bool,
) -> Result<ExitCode> {
    let manifest_url = resolve(worker, &config.manifest_path)?;
    let network = Arc::new(FetchClient::new(FetchConfig::from(config))?);
    let loader = PatchLoader::new(network, manifest_url);

    let mut page = Page::new(loader, TerminalTarget::new(html), worker.as_str(), &config.user_agent);
    page.boot().await;

    if let Some(year) = year {
        page.dispatch(PageEvent::YearSelected(year)).await;
    }
    if let Some(term) = search {
        page.dispatch(PageEvent::SearchInput(term)).await;
    }

    let failed = matches!(page.state().phase, Phase::Failed { .. });
    print!("{}", page.into_target().output());
    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

async fn validate(config: &AppConfig, source: &str) -> Result<ExitCode> {
    let bytes = if source.starts_with("http://") || source.starts_with("https://") {
        let url = Url::parse(source).context("parsing manifest URL")?;
        let client = FetchClient::new(FetchConfig::from(config))?;
        let response = client.fetch(&Request::get(url)).await?;
        if !response.is_success() {
            anyhow::bail!("manifest request answered {}", response.status);
        }
        response.body.to_vec()
    } else {
        std::fs::read(source).with_context(|| format!("reading {source}"))?
    };

    let manifest = match Manifest::parse(&bytes) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    let report = validate_current(&manifest.balance);
    println!("{}", generate_report(&report));
    Ok(if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn clear_cache(config: &AppConfig, worker: &Url, css_only: bool) -> Result<ExitCode> {
    let bridge = WorkerBridge::new(worker.clone(), config.message_timeout())?;

    if css_only {
        let cleared = bridge.clear_css_cache().await?;
        println!("{}", if cleared { "CSS cache cleared" } else { "No active worker" });
        return Ok(ExitCode::SUCCESS);
    }

    let mut host = CliHost::new(&config.state_path);
    let cleared = bridge.clear_all_caches(&mut host).await?;
    println!("{}", if cleared { "All caches cleared" } else { "No active worker" });
    println!("Local storage cleared");
    if host.reload_requested {
        println!("Reload the page to see updated content");
    }
    Ok(ExitCode::SUCCESS)
}

async fn status(config: &AppConfig, worker: &Url) -> Result<ExitCode> {
    let bridge = WorkerBridge::new(worker.clone(), config.message_timeout())?;
    match bridge.registration().await? {
        Some(status) => {
            println!("state: {:?}", status.state);
            println!("generation: {}", status.generation);
            match status.serving {
                Some(serving) => println!("serving: {serving}"),
                None => println!("serving: none"),
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("No worker registered at {worker}");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchnotes_client::local_state::THEME_KEY;
    use std::time::Duration;

    #[test]
    fn test_parse_list_flags() {
        let cli = Cli::try_parse_from(["patchnotes", "list", "--search", "4758", "--year", "2025"]).unwrap();
        match cli.command {
            Command::List { search, year, html } => {
                assert_eq!(search.as_deref(), Some("4758"));
                assert_eq!(year.as_deref(), Some("2025"));
                assert!(!html);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_clear_css() {
        let cli = Cli::try_parse_from(["patchnotes", "--worker", "localhost:9000", "clear-cache", "--css"]).unwrap();
        assert_eq!(cli.worker.as_deref(), Some("localhost:9000"));
        assert!(matches!(cli.command, Command::ClearCache { css: true }));
    }

    #[test]
    fn test_cli_host_clears_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let mut store = LocalStore::open(&path).unwrap();
        store.set(THEME_KEY, "dark").unwrap();

        let mut host = CliHost::new(&path);
        host.clear_local_state().unwrap();
        host.reload();
        assert!(LocalStore::open(&path).unwrap().is_empty());
        assert!(host.reload_requested);
    }

    #[tokio::test]
    async fn test_reset_with_corrupt_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"not json").unwrap();

        let bridge = WorkerBridge::new(Url::parse("http://127.0.0.1:1/").unwrap(), Duration::from_millis(200)).unwrap();
        let mut host = CliHost::new(&path);
        let cleared = bridge.clear_all_caches(&mut host).await.unwrap();

        assert!(!cleared);
        assert!(!path.exists());
        assert!(host.reload_requested);
    }

    #[tokio::test]
    async fn test_clear_cache_command_with_corrupt_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{\"theme\":").unwrap();

        let config = AppConfig { state_path: path.clone(), ..AppConfig::default() };
        let worker = Url::parse("http://127.0.0.1:1/").unwrap();
        let code = clear_cache(&config, &worker, false).await.unwrap();

        assert_eq!(code, ExitCode::SUCCESS);
        assert!(!path.exists());
    }
}
