//! A static file server that refuses to serve dotfiles.
//!
//! Any request whose path has a segment starting with the hidden marker (`.` unless configured
//! otherwise) gets `403 Forbidden`, whether or not such a file exists, and directory listings
//! never include hidden entries. Everything else is served the way [hyper_staticfile] serves
//! it.
//!
//! The pieces compose linearly:
//!
//! * [vfs::HiddenFilter] wraps a [vfs::FileStore] (normally a [vfs::DiskStore]) and enforces
//!   the visibility rule on every open and every directory read.
//! * [files::Files] is the [handler::Handler] serving files and listings out of the filter.
//! * [mw::Logged] records each request before delegating to it.
//! * [App] puts these together and runs the accept loop.
//!
//! ```no_run
//! use tokio::net::TcpListener;
//! use veil::{config::Config, App};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new(Some("./dist"))?;
//!     let app = App::new(&config)?;
//!
//!     app.serve(TcpListener::bind(config.addr()).await?).await?;
//!     Ok(())
//! }
//! ```
use bytes::Bytes;
use futures::future::BoxFuture;
use http_body_util::combinators::UnsyncBoxBody;
use hyper::{body::Incoming, server::conn::http1, service::service_fn, Request};
use hyper_staticfile::vfs::IntoFileAccess;
use hyper_util::rt::TokioIo;
use std::{convert::Infallible, io, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{debug, Level};

pub mod config;
pub mod files;
pub mod handler;
pub mod mw;
pub mod prelude;
pub mod reply;
pub mod test;
pub mod vfs;

use config::{Config, ConfigError};
use files::Files;
use handler::Handler;
use mw::Logged;
use vfs::{DiskStore, FileStore, Marker};

/// The body of every response.
pub type Body = UnsyncBoxBody<Bytes, io::Error>;

/// An http response.
pub type Response = hyper::Response<Body>;

/// The default handler stack: requests are logged, then served from a filtered store.
pub type Stack<S = DiskStore> = Logged<Files<S>>;

/// A file server, ready to be bound to a listener.
pub struct App<H = Stack> {
    handler: H,
}

impl App {
    /// Serve the directory named in `config`.
    ///
    /// Fails if the root doesn't exist or isn't a directory.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let store = DiskStore::new(&config.root).map_err(|source| ConfigError::InvalidRoot {
            path: config.root.clone(),
            source,
        })?;

        Ok(Self::with_store(store, config.marker, config.request_log))
    }
}

impl<S> App<Stack<S>>
where
    S: FileStore,
    S::File: IntoFileAccess,
{
    /// Serve an arbitrary store, hiding paths with `marker` and logging requests at `level`.
    pub fn with_store(store: S, marker: Marker, level: Level) -> Self {
        Self::with_handler(Logged::new(Files::new(store, marker), level))
    }
}

impl<H> App<H> {
    /// Serve requests with `handler`.
    pub fn with_handler(handler: H) -> Self {
        Self { handler }
    }

    /// Handle a single request, as if it came from `addr`.
    #[inline]
    pub fn dispatch<B>(&self, req: Request<B>, addr: SocketAddr) -> BoxFuture<'static, Response>
    where
        H: Handler<B>,
    {
        self.handler.handle(req, addr)
    }

    /// Returns a test client that dispatches requests in-process, without a listener.
    pub fn test_client(self) -> test::Client<H> {
        test::Client { app: self }
    }

    /// Accept and serve connections from `listener` forever.
    ///
    /// Each connection is served on its own task. This only returns if accepting a connection
    /// fails.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()>
    where
        H: Handler<Incoming> + 'static,
    {
        let app = Arc::new(self);

        loop {
            let (stream, addr) = listener.accept().await?;
            let app = Arc::clone(&app);

            tokio::spawn(async move {
                let svc = service_fn(move |req| {
                    let resp = app.dispatch(req, addr);
                    async move { Ok::<_, Infallible>(resp.await) }
                });

                let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), svc);

                if let Err(err) = conn.await {
                    debug!(%addr, %err, "connection error");
                }
            });
        }
    }
}
