//! Facilities for testing apps without binding a listener.
use super::{handler::Handler, App, Response};
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{
    header::{HeaderName, HeaderValue},
    Method, Request,
};

const LOCAL: ([u8; 4], u16) = ([127, 0, 0, 1], 4321);

#[inline]
fn request(m: Method, path: &str) -> Request<()> {
    assert!(path.starts_with('/'));

    Request::builder()
        .method(m)
        .uri(format!("http://testclient{}", path))
        .body(())
        .unwrap()
}

/// A test client.
pub struct Client<H> {
    pub(super) app: App<H>,
}

impl<H: Handler<()>> Client<H> {
    /// Prepare a call with the provided `method` and `path`.
    pub fn call<'a>(&'a self, method: Method, path: &str) -> Call<'a, H> {
        Call {
            app: &self.app,
            req: request(method, path),
        }
    }

    /// Prepare a GET call with the provided `path`.
    pub fn get<'a>(&'a self, path: &str) -> Call<'a, H> {
        self.call(Method::GET, path)
    }

    /// Prepare a HEAD call with the provided `path`.
    pub fn head<'a>(&'a self, path: &str) -> Call<'a, H> {
        self.call(Method::HEAD, path)
    }
}

/// A test call.
pub struct Call<'a, H> {
    app: &'a App<H>,
    req: Request<()>,
}

impl<'a, H: Handler<()>> Call<'a, H> {
    /// Set a request header for this call.
    pub fn header<V>(mut self, name: HeaderName, value: V) -> Self
    where
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let value = value.try_into().unwrap();
        self.req.headers_mut().insert(name, value);
        self
    }

    /// Dispatch the request defined by this call.
    pub async fn dispatch_body(self) -> Response {
        self.app.dispatch(self.req, LOCAL.into()).await
    }

    /// Dispatch the request defined by this call, retrieving the response body as [Bytes].
    pub async fn dispatch_bytes(self) -> hyper::Response<Bytes> {
        let (parts, body) = self.dispatch_body().await.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();

        hyper::Response::from_parts(parts, bytes)
    }

    /// Dispatch the request defined by this call, retrieving the response body as a [String].
    pub async fn dispatch(self) -> hyper::Response<String> {
        self.dispatch_bytes()
            .await
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }
}
