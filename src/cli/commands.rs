//! CLI command definitions for podcastify.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{AppConfig, Settings};
use crate::delivery::{Delivery, DeliveryPlanner, DEFAULT_DIRECT_LIMIT_BYTES};
use crate::download::{Downloader, DEFAULT_PROGRAM};
use crate::panic_bus::PanicBus;
use crate::process::{ProcessRunner, TokioProcessRunner};
use crate::scheduler::WorkerPool;
use crate::title::VideoTitleResolver;
use crate::upload::retry::DEFAULT_MAX_ATTEMPTS;
use crate::upload::UploaderPool;

/// Extract podcast audio from video links and deliver it.
#[derive(Parser)]
#[command(name = "podcastify")]
#[command(about = "Extract audio from video links and deliver it directly or via file hosts")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Settings shared by every subcommand.
#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Number of worker lanes for download jobs.
    #[arg(long, env = "WORKERS", global = true)]
    pub workers: Option<String>,

    /// Proxy used when a direct download fails.
    #[arg(long, env = "PROXY_URL", global = true)]
    pub proxy_url: Option<String>,

    /// Directory for downloaded audio.
    #[arg(long, env = "TMPDIR", global = true)]
    pub temp_dir: Option<PathBuf>,

    /// Files up to this size are delivered directly.
    #[arg(long, env = "DIRECT_LIMIT_BYTES", default_value_t = DEFAULT_DIRECT_LIMIT_BYTES, global = true)]
    pub direct_limit_bytes: u64,

    /// Attempts per upload backend, first try included.
    #[arg(long, env = "UPLOAD_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS, global = true)]
    pub upload_attempts: u32,

    /// Per-request upload timeout in seconds.
    #[arg(long, env = "UPLOAD_TIMEOUT_SECS", default_value_t = 300, global = true)]
    pub upload_timeout_secs: u64,

    /// Exclude an upload backend by name (repeatable).
    #[arg(long = "disable-backend", value_name = "NAME", global = true)]
    pub disabled_backends: Vec<String>,

    /// Downloader executable.
    #[arg(long, env = "DOWNLOADER_PROGRAM", default_value = DEFAULT_PROGRAM, global = true)]
    pub downloader_program: String,
}

impl ConfigArgs {
    pub fn settings(&self) -> Settings {
        Settings {
            workers: self.workers.clone(),
            proxy_url: self.proxy_url.clone(),
            temp_dir: self.temp_dir.clone(),
            direct_limit_bytes: self.direct_limit_bytes,
            upload_attempts: self.upload_attempts,
            upload_timeout_secs: self.upload_timeout_secs,
            disabled_backends: self.disabled_backends.clone(),
            program: self.downloader_program.clone(),
        }
    }
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Download audio for each URL and deliver it.
    Fetch(FetchArgs),

    /// Upload a local file through the backend fallback chain.
    Upload(UploadArgs),

    /// Print the file name derived from a video title.
    Title(TitleArgs),

    /// List enabled upload backends and their capacities.
    Backends,
}

#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Video URLs.
    #[arg(required = true)]
    pub urls: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// File to upload.
    pub file: PathBuf,
}

#[derive(Parser, Debug)]
pub struct TitleArgs {
    /// Video URL.
    pub url: String,
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI with the parsed arguments.
///
/// `panic_bus` is shared with every worker pool the command creates.
pub async fn run_with_cli(cli: Cli, panic_bus: PanicBus) -> anyhow::Result<()> {
    let config = AppConfig::from_settings(&cli.config.settings()).context("Invalid configuration")?;

    match cli.command {
        Commands::Fetch(args) => run_fetch_command(&config, panic_bus, args).await,
        Commands::Upload(args) => run_upload_command(&config, args).await,
        Commands::Title(args) => run_title_command(&config, panic_bus, args).await,
        Commands::Backends => run_backends_command(&config),
    }
}

/// Per-URL result of `fetch`.
#[derive(Debug, Serialize)]
struct FetchReport {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    delivery: Option<Delivery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl FetchReport {
    fn failed(url: &str, title: Option<String>, error: String) -> Self {
        Self {
            url: url.to_string(),
            title,
            size: None,
            delivery: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize)]
struct BackendInfo<'a> {
    name: &'a str,
    max_upload_size_in_bytes: u64,
}

fn process_runner() -> Arc<dyn ProcessRunner> {
    Arc::new(TokioProcessRunner)
}

fn uploader(config: &AppConfig) -> anyhow::Result<UploaderPool> {
    UploaderPool::from_config(&config.upload).context("Failed to build upload client")
}

async fn run_fetch_command(config: &AppConfig, panic_bus: PanicBus, args: FetchArgs) -> anyhow::Result<()> {
    let pool = WorkerPool::new(&config.worker, panic_bus);
    let runner = process_runner();
    let downloader = Downloader::new(pool.clone(), Arc::clone(&runner), &config.downloader);
    let resolver = VideoTitleResolver::new(pool, runner, &config.downloader);
    let planner = DeliveryPlanner::new(config.direct_limit_bytes, uploader(config)?);

    info!(count = args.urls.len(), workers = config.worker.num_workers, "Fetching");

    let reports = futures::future::join_all(
        args.urls
            .iter()
            .map(|url| fetch_one(&downloader, &resolver, &planner, url)),
    )
    .await;

    let json_output = serde_json::to_string_pretty(&reports).context("Failed to serialize fetch report")?;
    println!("{}", json_output);
    Ok(())
}

async fn fetch_one(
    downloader: &Downloader,
    resolver: &VideoTitleResolver,
    planner: &DeliveryPlanner,
    url: &str,
) -> FetchReport {
    let (title, downloaded) = tokio::join!(resolver.resolve(url), downloader.download(url));

    let file = match downloaded {
        Ok(file) => file,
        Err(e) => return FetchReport::failed(url, title, e.to_string()),
    };

    let size = match file.size().await {
        Ok(size) => size,
        Err(e) => {
            warn!(url, error = %e, "Downloaded file is unreadable");
            file.remove().await;
            return FetchReport::failed(url, title, format!("Downloaded file is unreadable: {e}"));
        }
    };

    let delivery = planner.deliver(file.path(), size).await;
    if !delivery.keeps_local_file() {
        file.remove().await;
    }

    FetchReport {
        url: url.to_string(),
        title,
        size: Some(size),
        delivery: Some(delivery),
        error: None,
    }
}

async fn run_upload_command(config: &AppConfig, args: UploadArgs) -> anyhow::Result<()> {
    let size = tokio::fs::metadata(&args.file)
        .await
        .with_context(|| format!("Cannot read {}", args.file.display()))?
        .len();

    let uploader = uploader(config)?;
    if size > uploader.max_upload_size_in_bytes() {
        anyhow::bail!(
            "{} is {} bytes; the largest enabled backend accepts {} bytes",
            args.file.display(),
            size,
            uploader.max_upload_size_in_bytes()
        );
    }

    match uploader.upload(&args.file, size).await {
        Some(url) => {
            println!("{}", url);
            Ok(())
        }
        None => anyhow::bail!("Every upload backend failed for {}", args.file.display()),
    }
}

async fn run_title_command(config: &AppConfig, panic_bus: PanicBus, args: TitleArgs) -> anyhow::Result<()> {
    let pool = WorkerPool::new(&config.worker, panic_bus);
    let resolver = VideoTitleResolver::new(pool, process_runner(), &config.downloader);

    match resolver.resolve(&args.url).await {
        Some(name) => {
            println!("{}", name);
            Ok(())
        }
        None => anyhow::bail!("Could not resolve a title for {}", args.url),
    }
}

fn run_backends_command(config: &AppConfig) -> anyhow::Result<()> {
    let uploader = uploader(config)?;
    let backends: Vec<BackendInfo<'_>> = uploader
        .backends()
        .iter()
        .map(|backend| BackendInfo {
            name: backend.name(),
            max_upload_size_in_bytes: backend.max_upload_size_in_bytes(),
        })
        .collect();

    let json_output = serde_json::to_string_pretty(&backends).context("Failed to serialize backend list")?;
    println!("{}", json_output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_takes_many_urls() {
        let cli = Cli::try_parse_from(["podcastify", "fetch", "https://a", "https://b"]).expect("should parse");
        match cli.command {
            Commands::Fetch(args) => assert_eq!(args.urls, vec!["https://a", "https://b"]),
            _ => panic!("Expected Fetch command"),
        }
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn test_fetch_requires_a_url() {
        assert!(Cli::try_parse_from(["podcastify", "fetch"]).is_err());
    }

    #[test]
    fn test_global_config_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "podcastify",
            "upload",
            "episode.mp3",
            "--upload-attempts",
            "5",
            "--disable-backend",
            "0x0",
            "--disable-backend",
            "reol",
            "--workers",
            "2",
        ])
        .expect("should parse");

        match &cli.command {
            Commands::Upload(args) => assert_eq!(args.file, PathBuf::from("episode.mp3")),
            _ => panic!("Expected Upload command"),
        }

        let settings = cli.config.settings();
        assert_eq!(settings.upload_attempts, 5);
        assert_eq!(settings.disabled_backends, vec!["0x0", "reol"]);
        assert_eq!(settings.workers.as_deref(), Some("2"));

        let config = AppConfig::from_settings(&settings).unwrap();
        assert_eq!(config.worker.num_workers, 2);
        assert_eq!(config.upload.disabled_backends.len(), 2);
    }

    #[test]
    fn test_fetch_report_omits_empty_fields() {
        let report = FetchReport::failed("https://a", None, "Download failed".to_string());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"url": "https://a", "error": "Download failed"}));
    }
}
