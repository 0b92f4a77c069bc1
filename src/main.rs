use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use shelf::app::App;
use shelf::catalog::{HttpCatalog, MockCatalog, ProductSource};
use shelf::config::Config;
use shelf::feed::{FeedEngine, FeedEvent};
use shelf::ui;

/// Environment variable holding the API bearer token.
const TOKEN_ENV: &str = "SHELF_API_TOKEN";

/// Get the config directory path (~/.config/shelf/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("shelf"))
}

#[derive(Parser, Debug)]
#[command(name = "shelf", about = "Terminal catalog browser with an infinite product feed")]
struct Args {
    /// Config file (default: ~/.config/shelf/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Product API base URL, e.g. http://localhost:3001/api
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Products per page
    #[arg(long, value_name = "N")]
    page_size: Option<u32>,

    /// Simulated latency of the built-in catalog in milliseconds
    #[arg(long, value_name = "MS")]
    latency_ms: Option<u64>,

    /// Write debug logs to ~/.config/shelf/shelf.log
    #[arg(long)]
    log: bool,
}

/// Install the tracing subscriber.
///
/// The terminal is in raw mode while the UI runs, so logs go to a file when
/// `--log` is given and to stderr only when `RUST_LOG` asks for them.
fn init_tracing(log: bool, config_dir: &Path) -> Result<()> {
    if log {
        let path = config_dir.join("shelf.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shelf=debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if config_dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(config_dir).context("Failed to create config directory")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        if let Err(e) = std::fs::set_permissions(config_dir, perms) {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }
    Ok(())
}

/// Apply command-line overrides on top of the file configuration.
fn apply_args(config: &mut Config, args: &Args) -> Result<()> {
    if let Some(url) = &args.api_url {
        config.source.api_base_url = Some(url.clone());
    }
    if let Some(page_size) = args.page_size {
        config.feed.page_size = page_size;
    }
    if let Some(latency) = args.latency_ms {
        config.source.mock_latency_ms = latency;
    }
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        config.source.api_token = Some(token);
    }
    config.validate().context("Invalid configuration")?;
    Ok(())
}

/// Build the product source the engine reads from.
fn build_source(config: &Config) -> Result<Arc<dyn ProductSource>> {
    let mock = Arc::new(MockCatalog::new().with_latency(config.source.mock_latency()));
    let Some(base_url) = &config.source.api_base_url else {
        tracing::info!("Using built-in catalog");
        return Ok(mock);
    };

    let mut http = HttpCatalog::new(base_url, config.source.timeout())
        .with_context(|| format!("Failed to set up product API at '{base_url}'"))?;
    if let Some(token) = &config.source.api_token {
        http = http.with_token(SecretString::from(token.clone()));
    }
    if config.source.fallback_to_mock {
        http = http.with_fallback(mock);
    }
    tracing::info!(
        url = %base_url,
        fallback = config.source.fallback_to_mock,
        "Using product API"
    );
    Ok(Arc::new(http))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    ensure_config_dir(&config_dir)?;
    init_tracing(args.log, &config_dir)?;

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;
    apply_args(&mut config, &args)?;
    tracing::debug!(?config, "Effective configuration");

    let source = build_source(&config)?;

    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(64);
    let engine =
        FeedEngine::new(source, &config, event_tx).context("Failed to create product feed")?;
    let mut app = App::new(engine);

    ui::run(&mut app, event_rx).await?;

    Ok(())
}
