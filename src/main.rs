use anyhow::Context;
use clap::Parser;
use std::{net::IpAddr, path::PathBuf};
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use veil::{config::Config, App};

/// Serve a directory over http, refusing every path that has a dot-prefixed segment.
#[derive(Debug, Parser)]
#[command(name = "veil", version)]
struct Cli {
    /// TCP port to listen on.
    #[arg(long, default_value_t = Config::DEFAULT_PORT, env = "VEIL_PORT")]
    port: u16,

    /// Address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "VEIL_BIND")]
    bind: IpAddr,

    /// Directory to serve.
    #[arg(long, visible_alias = "static", env = "VEIL_ROOT")]
    root: Option<PathBuf>,

    /// Path segments starting with this character are never served.
    #[arg(long, default_value_t = '.', env = "VEIL_HIDDEN_MARKER")]
    hidden_marker: char,

    /// Level each request is logged at.
    #[arg(long, default_value = "debug", env = "VEIL_REQUEST_LOG")]
    request_log: Level,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = Config::new(self.root)?;
        config.bind = self.bind;
        config.port = self.port;
        config.marker = self.hidden_marker.into();
        config.request_log = self.request_log;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config()?;
    let app = App::new(&config)?;

    let listener = TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;

    let addr = listener.local_addr().context("failed to read bound address")?;
    info!(%addr, root = %config.root.display(), "listening");

    tokio::select! {
        res = app.serve(listener) => res.context("failed to accept connection")?,
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl+c")?;
            info!("shutting down");
        }
    }

    Ok(())
}
