use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lanshare::{AppState, Config, banner};

#[derive(Parser, Debug)]
#[command(name = "lanshare")]
#[command(about = "Share a directory over the local network")]
#[command(version)]
struct Cli {
    /// Address to bind to [default: 0.0.0.0]
    #[arg(long, env = "LANSHARE_HOST")]
    host: Option<String>,

    /// Port to listen on [default: 9527]
    #[arg(short, long, env = "LANSHARE_PORT")]
    port: Option<u16>,

    /// Directory to share [default: current directory]
    #[arg(short = 'd', long, env = "LANSHARE_ROOT")]
    shared_directory: Option<PathBuf>,

    /// Config file path (optional)
    #[arg(short, long, env = "LANSHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Print a QR code of the share URL
    #[arg(long)]
    qr: bool,

    /// Enable verbose logging
    #[arg(short, long, env = "LANSHARE_VERBOSE")]
    verbose: bool,
}

impl Cli {
    /// Command-line and environment values win over the config file.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.shared_directory {
            config.server.shared_directory = dir.clone();
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lanshare={level},tower_http={level}")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);

    let root_dir = config
        .server
        .shared_directory
        .canonicalize()
        .with_context(|| {
            format!(
                "shared directory does not exist: {}",
                config.server.shared_directory.display()
            )
        })?;
    if !root_dir.is_dir() {
        bail!("shared path is not a directory: {}", root_dir.display());
    }

    info!("Sharing files from: {}", root_dir.display());

    let host = config.server.host.clone();
    let port = config.server.port;
    let url = banner::share_url(&host, port, banner::local_ip());
    let state = AppState::with_config(root_dir, config);
    let app = lanshare::app(state);

    let listener = bind(&host, port).await?;
    let addr = listener.local_addr().context("reading bound address")?;

    info!("Listening on {}", addr);
    info!("Open {} on another device on this network", url);

    if cli.qr {
        match banner::terminal_qr(&url) {
            Ok(qr) => println!("{qr}"),
            Err(err) => warn!("Could not render QR code: {}", err),
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    Ok(())
}

/// Bind the listener. `host` may be an IP literal (IPv6 with or without
/// brackets) or a name such as `localhost`.
async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding to {}:{}", host, port))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
