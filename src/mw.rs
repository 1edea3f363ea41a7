//! Middleware.
use super::{handler::Handler, Response};
use futures::future::BoxFuture;
use hyper::{Method, Request, Uri};
use std::net::SocketAddr;
use tracing::Level;

/// Records the target of every request before handing it to the wrapped handler.
///
/// Exactly one event is emitted per request, at the level given on construction. The request
/// is passed along untouched and the inner response is returned as is.
///
/// # Examples
/// ```
/// use std::net::SocketAddr;
/// use tracing::Level;
/// use veil::{handler::HandlerFn, mw::Logged};
///
/// let _logged = Logged::new(
///     HandlerFn::new(|_: hyper::Request<()>, _: SocketAddr| async { "ok" }),
///     Level::DEBUG,
/// );
/// ```
#[derive(Clone, Debug)]
pub struct Logged<H> {
    inner: H,
    level: Level,
}

impl<H> Logged<H> {
    pub fn new(inner: H, level: Level) -> Self {
        Self { inner, level }
    }
}

impl<B, H: Handler<B>> Handler<B> for Logged<H> {
    #[inline]
    fn handle(&self, req: Request<B>, addr: SocketAddr) -> BoxFuture<'static, Response> {
        record(self.level, req.method(), req.uri(), addr);
        self.inner.handle(req, addr)
    }
}

macro_rules! at_level {
    ($level:expr, $($args:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($args)+),
            Level::WARN => tracing::warn!($($args)+),
            Level::INFO => tracing::info!($($args)+),
            Level::DEBUG => tracing::debug!($($args)+),
            _ => tracing::trace!($($args)+),
        }
    };
}

#[inline]
fn record(level: Level, method: &Method, uri: &Uri, addr: SocketAddr) {
    at_level!(level, %method, %uri, %addr, "request");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerFn;
    use futures::executor::block_on;
    use hyper::StatusCode;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink {
        fn lines(&self) -> Vec<String> {
            let raw = self.0.lock().unwrap();
            String::from_utf8_lossy(&raw).lines().map(str::to_owned).collect()
        }
    }

    fn capture<R>(max: Level, f: impl FnOnce() -> R) -> (R, Vec<String>) {
        let sink = Sink::default();
        let writer = sink.clone();

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(max)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let r = tracing::subscriber::with_default(subscriber, f);
        (r, sink.lines())
    }

    fn request(path: &str) -> Request<()> {
        Request::builder()
            .uri(format!("http://testclient{}", path))
            .body(())
            .unwrap()
    }

    const ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 4321);

    #[test]
    fn test_logs_once_and_delegates_unmodified() {
        let inner = HandlerFn::new(|req: Request<()>, addr: SocketAddr| async move {
            assert_eq!("/some/file.txt?x=1", req.uri().path_and_query().unwrap().as_str());
            assert_eq!(SocketAddr::from(ADDR), addr);
            "from inner"
        });
        let logged = Logged::new(inner, Level::DEBUG);

        let (fut, lines) = capture(Level::DEBUG, || {
            logged.handle(request("/some/file.txt?x=1"), ADDR.into())
        });
        let resp = block_on(fut);

        assert_eq!(StatusCode::OK, resp.status());
        assert_eq!(1, lines.len());
        assert!(lines[0].contains("DEBUG"), "{}", lines[0]);
        assert!(lines[0].contains("uri=http://testclient/some/file.txt?x=1"), "{}", lines[0]);
    }

    #[test]
    fn test_level_is_configurable() {
        let inner = || HandlerFn::new(|_: Request<()>, _: SocketAddr| async { "ok" });

        let quiet = Logged::new(inner(), Level::TRACE);
        let (_, lines) = capture(Level::DEBUG, || quiet.handle(request("/a"), ADDR.into()));
        assert!(lines.is_empty());

        let loud = Logged::new(inner(), Level::WARN);
        let (_, lines) = capture(Level::DEBUG, || loud.handle(request("/a"), ADDR.into()));
        assert_eq!(1, lines.len());
        assert!(lines[0].contains("WARN"), "{}", lines[0]);
    }

    #[test]
    fn test_inner_failures_pass_through() {
        let inner = HandlerFn::new(|_: Request<()>, _: SocketAddr| async {
            Err::<&'static str, _>(io::Error::from(io::ErrorKind::PermissionDenied))
        });
        let logged = Logged::new(inner, Level::DEBUG);

        let resp = block_on(logged.handle(request("/.git/HEAD"), ADDR.into()));
        assert_eq!(StatusCode::FORBIDDEN, resp.status());

        let resp = block_on(Logged::new(logged, Level::INFO).handle(request("/x"), ADDR.into()));
        assert_eq!(StatusCode::FORBIDDEN, resp.status());
    }
}
