//! Hiding of marker-prefixed files and directories.
use super::{DirEntry, FileStore, Opened, ReadDir};
use futures::future::{ready, BoxFuture, FutureExt, TryFutureExt};
use hyper_staticfile::vfs::{FileOpener, FileWithMetadata, IntoFileAccess};
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::trace;

/// The leading character that makes a path segment (and everything below it) hidden.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Marker(char);

impl Default for Marker {
    #[inline]
    fn default() -> Self {
        Self('.')
    }
}

impl From<char> for Marker {
    #[inline]
    fn from(c: char) -> Self {
        Self(c)
    }
}

impl Marker {
    /// Create a marker from its character.
    pub const fn new(c: char) -> Self {
        Self(c)
    }

    /// The marker character.
    pub const fn as_char(self) -> char {
        self.0
    }

    /// Whether a single segment (a file or directory name) is hidden.
    #[inline]
    pub fn hides(self, name: &str) -> bool {
        name.starts_with(self.0)
    }

    /// Whether any segment of a slash-delimited path is hidden.
    ///
    /// ```
    /// use veil::vfs::Marker;
    ///
    /// let m = Marker::default();
    /// assert!(m.hides_path("/.git/config"));
    /// assert!(m.hides_path("/public/.env"));
    /// assert!(!m.hides_path("/public/index.html"));
    /// assert!(!m.hides_path("/"));
    /// ```
    pub fn hides_path(self, path: &str) -> bool {
        path.split('/').any(|seg| self.hides(seg))
    }

    /// Whether any component of a filesystem path is hidden.
    ///
    /// Non-normal components count too: with the default marker, `..` is hidden.
    pub fn hides_fs_path(self, path: &Path) -> bool {
        (path.components()).any(|c| self.hides(&c.as_os_str().to_string_lossy()))
    }
}

/// The error carried by [io::ErrorKind::PermissionDenied] errors caused by a hidden path.
#[derive(Clone, Debug, Error)]
#[error("path {:?} is hidden", .0)]
pub struct HiddenPath(pub PathBuf);

impl HiddenPath {
    /// Whether `err` was caused by a hidden path, as opposed to a genuine permission problem in
    /// the underlying store.
    pub fn is(err: &io::Error) -> bool {
        (err.get_ref()).map_or(false, |inner| inner.is::<HiddenPath>())
    }
}

#[inline]
fn denied(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        HiddenPath(path.to_path_buf()),
    )
}

/// A [FileStore] decorator that refuses to open or list anything hidden.
///
/// Opening a path with any hidden segment fails with [io::ErrorKind::PermissionDenied] before
/// the inner store is consulted, whether or not the path exists. Directory handles returned by
/// a successful open are wrapped in [Hidden], which filters hidden entries out of every batch
/// they enumerate.
///
/// If the inner store reports a resolved path (after following symlinks), it is checked again,
/// so a visible link can't be used to reach a hidden target.
#[derive(Debug)]
pub struct HiddenFilter<S> {
    inner: Arc<S>,
    marker: Marker,
}

impl<S> Clone for HiddenFilter<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            marker: self.marker,
        }
    }
}

impl<S: FileStore> HiddenFilter<S> {
    /// Wrap `inner`, hiding segments that start with `marker`.
    pub fn new(inner: S, marker: Marker) -> Self {
        let inner = Arc::new(inner);
        Self { inner, marker }
    }

    /// The marker in effect.
    pub fn marker(&self) -> Marker {
        self.marker
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: FileStore> FileStore for HiddenFilter<S> {
    type File = Hidden<S::File>;

    fn open(&self, path: &Path) -> BoxFuture<'static, io::Result<Opened<Self::File>>> {
        trace!(path = %path.display(), "open");

        let marker = self.marker;

        if marker.hides_fs_path(path) {
            return ready(Err(denied(path))).boxed();
        }

        let opening = self.inner.open(path);
        let path = path.to_path_buf();

        async move {
            let opened = opening.await?;

            if let Some(resolved) = &opened.resolved {
                if marker.hides_fs_path(resolved) {
                    let resolved = resolved.display();
                    trace!(path = %path.display(), %resolved, "resolved to a hidden path");
                    return Err(denied(&path));
                }
            }

            Ok(opened.map(|inner| Hidden { inner, marker }))
        }
        .boxed()
    }
}

impl<S> FileOpener for HiddenFilter<S>
where
    S: FileStore,
    S::File: IntoFileAccess,
{
    type File = Hidden<S::File>;

    type Future = BoxFuture<'static, io::Result<FileWithMetadata<Self::File>>>;

    fn open(&self, path: &Path) -> Self::Future {
        FileStore::open(self, path)
            .map_ok(|o| FileWithMetadata {
                handle: o.handle,
                size: o.size,
                modified: o.modified,
                is_dir: o.is_dir,
            })
            .boxed()
    }
}

/// A handle opened through a [HiddenFilter].
#[derive(Debug)]
pub struct Hidden<F> {
    inner: F,
    marker: Marker,
}

impl<F> Hidden<F> {
    /// Unwrap the handle, giving up filtering.
    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: ReadDir> ReadDir for Hidden<F> {
    fn read_dir(&mut self, n: usize) -> BoxFuture<'_, io::Result<Option<Vec<DirEntry>>>> {
        trace!(n, "read_dir");

        let marker = self.marker;

        (self.inner.read_dir(n))
            .map_ok(move |batch| {
                batch.map(|entries| {
                    (entries.into_iter())
                        .filter(|e| !marker.hides(&e.name))
                        .collect()
                })
            })
            .boxed()
    }
}

impl<F: IntoFileAccess> IntoFileAccess for Hidden<F> {
    type Output = F::Output;

    #[inline]
    fn into_file_access(self) -> Self::Output {
        self.inner.into_file_access()
    }
}
