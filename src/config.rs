//! Server configuration.
use super::vfs::Marker;
use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};
use thiserror::Error;
use tracing::Level;

/// An error in the startup configuration. None of these are recoverable.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No served root was given.
    #[error("no served root directory configured (use --root <DIR> or VEIL_ROOT)")]
    MissingRoot,

    /// The served root can't be used.
    #[error("served root {} is unusable", .path.display())]
    InvalidRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything needed to start serving.
#[derive(Clone, Debug)]
pub struct Config {
    /// Address to listen on.
    pub bind: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// The directory to serve.
    pub root: PathBuf,

    /// Paths with a segment starting with this are never served.
    pub marker: Marker,

    /// The level each request is logged at.
    pub request_log: Level,
}

impl Config {
    pub const DEFAULT_PORT: u16 = 9200;

    /// A configuration serving `root` with defaults for everything else.
    ///
    /// A missing or empty `root` is an error.
    ///
    /// ```
    /// use veil::config::{Config, ConfigError};
    ///
    /// let config = Config::new(Some("/srv/www")).unwrap();
    /// assert_eq!("0.0.0.0:9200", config.addr().to_string());
    ///
    /// assert!(matches!(Config::new(None::<&str>), Err(ConfigError::MissingRoot)));
    /// assert!(matches!(Config::new(Some("")), Err(ConfigError::MissingRoot)));
    /// ```
    pub fn new<P: Into<PathBuf>>(root: Option<P>) -> Result<Self, ConfigError> {
        let root = (root.map(Into::into))
            .filter(|r: &PathBuf| !r.as_os_str().is_empty())
            .ok_or(ConfigError::MissingRoot)?;

        Ok(Self {
            bind: Ipv4Addr::UNSPECIFIED.into(),
            port: Self::DEFAULT_PORT,
            root,
            marker: Marker::default(),
            request_log: Level::DEBUG,
        })
    }

    /// The socket address to listen on.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
