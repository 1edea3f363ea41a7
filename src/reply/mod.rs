//! Helpers for replying to requests.
use super::{Body, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{
    header::{HeaderValue, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS},
    StatusCode,
};
use std::{convert::Infallible, io};

pub mod listing;

/// A type that can be converted into an http [Response].
pub trait Reply: Sized + Send {
    /// Perform the conversion.
    fn into_response(self) -> Response;

    /// Change the status code to `code`.
    ///
    /// ```
    /// use hyper::StatusCode;
    /// use veil::{reply::Reply, Response};
    ///
    /// let _: Response = "some message" //
    ///     .with_status(StatusCode::OK);
    /// ```
    #[inline]
    fn with_status(self, code: StatusCode) -> Response {
        let mut resp = self.into_response();
        *resp.status_mut() = code;
        resp
    }
}

impl Reply for Response {
    #[inline]
    fn into_response(self) -> Response {
        self
    }

    #[inline]
    fn with_status(mut self, code: StatusCode) -> Response {
        *self.status_mut() = code;
        self
    }
}

impl<R: Reply, E: Reply> Reply for Result<R, E> {
    #[inline]
    fn into_response(self) -> Response {
        self.map_or_else(E::into_response, R::into_response)
    }
}

impl Reply for Infallible {
    #[inline]
    fn into_response(self) -> Response {
        match self {}
    }
}

macro_rules! content_type {
    ($mime:literal $( $re_type:ty ),+ $(,)?) => {
        $(impl Reply for $re_type {
            #[inline]
            fn into_response(self) -> Response {
                let mut resp = Response::new(full(self));
                let headers = resp.headers_mut();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static($mime));
                headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
                resp
            }
        })+
    };
}

content_type! { "text/plain; charset=utf-8"
    String,
    &'static str,
}

/// Errors from the filesystem reply with the status matching their kind: `404` for missing
/// files, `403` for hidden (or otherwise forbidden) ones, and `500` for anything else.
impl Reply for io::Error {
    #[inline]
    fn into_response(self) -> Response {
        status(match self.kind() {
            io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
            io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        })
    }
}

/// A plain text response with status `code`, and its canonical reason as the body.
///
/// ```
/// use hyper::StatusCode;
/// use veil::reply;
///
/// let resp = reply::status(StatusCode::FORBIDDEN);
/// assert_eq!(StatusCode::FORBIDDEN, resp.status());
/// ```
pub fn status(code: StatusCode) -> Response {
    let reason = code.canonical_reason().unwrap_or("");
    format!("{} {}", code.as_u16(), reason).with_status(code)
}

/// A [Body] holding `data` in full.
#[inline]
pub fn full<D: Into<Bytes>>(data: D) -> Body {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// An empty [Body].
#[inline]
pub fn empty() -> Body {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed_unsync()
}
