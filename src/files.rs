//! Serving a filtered tree over http.
use super::{
    handler::Handler,
    reply::{self, listing::Listing, Reply},
    vfs::{self, FileStore, Hidden, HiddenFilter, HiddenPath, Marker, ReadDir, VirtualPath},
    Response,
};
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use http_body_util::BodyExt;
use hyper::{body::Body as HttpBody, Method, Request, StatusCode};
use hyper_staticfile::{vfs::IntoFileAccess, ResolveResult, Resolver, ResponseBuilder};
use std::{io, net::SocketAddr, sync::Arc};
use tracing::{debug, error};

/// How many entries are read from a directory at once while building a listing.
pub const LISTING_BATCH: usize = 256;

/// The body type [hyper_staticfile] streams files of `S` with.
pub type FileBody<S> =
    hyper_staticfile::Body<<Hidden<<S as FileStore>::File> as IntoFileAccess>::Output>;

/// A [Handler] serving files and directory listings from a [FileStore], with everything hidden
/// by a [Marker] answered by `403 Forbidden`.
///
/// File responses come from [hyper_staticfile], and so support conditional and range requests,
/// guess content types from extensions, serve `index.html` for directories and redirect
/// directory paths that lack a trailing slash. Directories without an index get an html
/// listing of their visible entries.
pub struct Files<S> {
    resolver: Arc<Resolver<HiddenFilter<S>>>,
    fs: HiddenFilter<S>,
}

impl<S> Clone for Files<S> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            fs: self.fs.clone(),
        }
    }
}

impl<S> Files<S>
where
    S: FileStore,
    S::File: IntoFileAccess,
{
    /// Serve `store`, hiding every path segment that begins with `marker`.
    pub fn new(store: S, marker: Marker) -> Self {
        let fs = HiddenFilter::new(store, marker);
        let resolver = Arc::new(Resolver::with_opener(fs.clone()));

        Self { resolver, fs }
    }
}

impl<S, B> Handler<B> for Files<S>
where
    S: FileStore,
    S::File: IntoFileAccess + ReadDir,
    FileBody<S>: HttpBody<Data = Bytes, Error = io::Error> + Send + 'static,
    B: Send + 'static,
{
    fn handle(&self, req: Request<B>, _: SocketAddr) -> BoxFuture<'static, Response> {
        let resolver = Arc::clone(&self.resolver);
        let fs = self.fs.clone();

        // request bodies are never read
        let (parts, _) = req.into_parts();
        let req = Request::from_parts(parts, ());

        async move { serve(&resolver, &fs, &req).await }.boxed()
    }
}

async fn serve<S>(
    resolver: &Resolver<HiddenFilter<S>>,
    fs: &HiddenFilter<S>,
    req: &Request<()>,
) -> Response
where
    S: FileStore,
    S::File: IntoFileAccess + ReadDir,
    FileBody<S>: HttpBody<Data = Bytes, Error = io::Error> + Send + 'static,
{
    let result = match resolver.resolve_request(req).await {
        Ok(result) => result,
        Err(err) => return failure(req, err),
    };

    // a directory without a visible index resolves as not found or denied
    if let ResolveResult::NotFound | ResolveResult::PermissionDenied = result {
        let path = VirtualPath::from_uri_path(req.uri().path());
        let marker = fs.marker();

        if path.is_dir_request() && !path.segments().any(|s| marker.hides(s)) {
            match list(fs, &path, req.method() == Method::HEAD).await {
                Ok(Some(resp)) => return resp,
                Ok(None) => {}
                Err(err) => return failure(req, err),
            }
        }
    }

    match result {
        ResolveResult::NotFound => reply::status(StatusCode::NOT_FOUND),
        ResolveResult::PermissionDenied => {
            debug!(uri = %req.uri(), "denied");
            reply::status(StatusCode::FORBIDDEN)
        }
        result => match ResponseBuilder::new().request(req).build(result) {
            Ok(resp) => resp.map(|body| body.boxed_unsync()),
            Err(err) => {
                error!(uri = %req.uri(), %err, "failed to build response");
                reply::status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
    }
}

/// List the directory at `path`, if that is what it refers to.
async fn list<S>(
    fs: &HiddenFilter<S>,
    path: &VirtualPath,
    head: bool,
) -> io::Result<Option<Response>>
where
    S: FileStore,
    S::File: ReadDir,
{
    let opened = FileStore::open(fs, &path.to_path_buf()).await?;

    if !opened.is_dir {
        return Ok(None);
    }

    let mut dir = opened.handle;
    let mut entries = vfs::read_all(&mut dir, LISTING_BATCH).await?;
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(%path, entries = entries.len(), "listing");

    let listing = Listing::new(entries);
    let listing = if head { listing.head_only() } else { listing };

    Ok(Some(listing.into_response()))
}

fn failure(req: &Request<()>, err: io::Error) -> Response {
    match err.kind() {
        io::ErrorKind::NotFound => {}
        io::ErrorKind::PermissionDenied if HiddenPath::is(&err) => {
            debug!(uri = %req.uri(), %err, "denied");
        }
        _ => error!(uri = %req.uri(), %err, "failed to serve request"),
    }

    err.into_response()
}
