use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imgcache::{
    cache,
    config::{CacheBackend, Config, defaults::DEFAULT_CONFIG_FILE},
    images::{FsImageSource, ImageDeliveryService},
    web::{AppState, WebServer},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "imgcache")]
#[command(version)]
#[command(about = "Serve images as JPEG through a Redis read-through cache")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Directory containing `<directory>/<filename>` source images
    #[arg(short = 'r', long, value_name = "DIR")]
    image_root: Option<PathBuf>,

    /// Cache store backend
    #[arg(long, value_enum)]
    cache_backend: Option<CacheBackend>,

    /// Redis host
    #[arg(long, value_name = "HOST")]
    cache_host: Option<String>,

    /// Redis port
    #[arg(long, value_name = "PORT")]
    cache_port: Option<u16>,

    /// Redis logical database index
    #[arg(long, value_name = "DB")]
    cache_db: Option<i64>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.web.host = host.clone();
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
        if let Some(image_root) = &self.image_root {
            config.storage.image_root = image_root.clone();
        }
        if let Some(backend) = self.cache_backend {
            config.cache.backend = backend;
        }
        if let Some(cache_host) = &self.cache_host {
            config.cache.host = cache_host.clone();
        }
        if let Some(cache_port) = self.cache_port {
            config.cache.port = cache_port;
        }
        if let Some(cache_db) = self.cache_db {
            config.cache.db = cache_db;
        }
    }
}

fn init_tracing(cli: &Cli) {
    let log_filter = format!("imgcache={}", cli.log_level);
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| log_filter.into()),
    );

    match cli.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    info!("Starting imgcache v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let source = FsImageSource::new(config.storage.image_root.clone());
    source.ensure_root().await.with_context(|| {
        format!(
            "Failed to create image root {}",
            config.storage.image_root.display()
        )
    })?;
    info!("Serving images from {}", config.storage.image_root.display());

    let image_cache = cache::connect(&config.cache)
        .await
        .context("Failed to initialize image cache")?;

    let image_service =
        ImageDeliveryService::new(image_cache, Arc::new(source), config.images.jpeg_quality);
    let state = AppState::new(config, image_service)?;
    let web_server = WebServer::new(state)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    let (server_ready_tx, server_ready_rx) = tokio::sync::oneshot::channel();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = web_server.serve_with_signal(server_ready_tx).await {
            tracing::error!("Web server failed: {}", e);
        }
    });

    match server_ready_rx.await {
        Ok(Ok(())) => info!("Web server is now listening"),
        Ok(Err(bind_error)) => {
            tracing::error!("Failed to bind web server: {}", bind_error);
            return Err(bind_error);
        }
        Err(_) => {
            tracing::error!("Web server task completed without signaling");
            return Err(anyhow::anyhow!("Web server failed to start"));
        }
    }

    server_handle.await?;

    info!("Shutdown complete");
    Ok(())
}
