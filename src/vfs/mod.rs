//! The filesystem capability set the file server is built on.
//!
//! A [FileStore] opens paths relative to some root, and the handles it returns may be enumerated
//! through [ReadDir] when they refer to directories. [DiskStore] is backed by a real directory,
//! while [HiddenFilter] decorates any other store so that paths with a hidden segment can never
//! be opened or enumerated.
use futures::future::BoxFuture;
use percent_encoding::percent_decode_str;
use std::{
    fmt, io,
    path::{Path, PathBuf},
    time::SystemTime,
};

mod disk;
mod hidden;

pub use disk::{DiskFile, DiskStore};
pub use hidden::{Hidden, HiddenFilter, HiddenPath, Marker};

/// A file or directory handle, along with the metadata read while opening it.
#[derive(Debug)]
pub struct Opened<F> {
    /// The handle itself.
    pub handle: F,

    /// Size in bytes.
    pub size: u64,

    /// Last modification time, if the store tracks one.
    pub modified: Option<SystemTime>,

    /// Whether the handle refers to a directory.
    pub is_dir: bool,

    /// The path the store actually reached after resolving links, if it differs from (or can't
    /// be known from) the requested one. Relative to the store root when it lies inside of it.
    pub resolved: Option<PathBuf>,
}

impl<F> Opened<F> {
    /// Swap out the handle, keeping all metadata.
    #[inline]
    pub fn map<G, M: FnOnce(F) -> G>(self, f: M) -> Opened<G> {
        Opened {
            handle: f(self.handle),
            size: self.size,
            modified: self.modified,
            is_dir: self.is_dir,
            resolved: self.resolved,
        }
    }
}

/// A single directory entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

/// A source of files and directories.
///
/// Paths handed to [open][FileStore::open] are relative to the root of the store and have
/// already been url-decoded and normalized by the caller.
pub trait FileStore: Send + Sync + 'static {
    /// The handle type returned for opened files and directories.
    type File: Send + Unpin + 'static;

    /// Open the file or directory at `path`.
    fn open(&self, path: &Path) -> BoxFuture<'static, io::Result<Opened<Self::File>>>;
}

/// Paginated directory enumeration.
pub trait ReadDir: Send {
    /// Read up to `n` further entries from this directory, or every remaining entry if `n` is
    /// zero.
    ///
    /// Returns `Ok(None)` once the directory is exhausted. A returned batch may hold fewer than
    /// `n` entries (even none at all) without that meaning the end has been reached.
    ///
    /// The sequence is not restartable: entries yielded by one call are never yielded again.
    fn read_dir(&mut self, n: usize) -> BoxFuture<'_, io::Result<Option<Vec<DirEntry>>>>;
}

/// Drain every remaining entry from `dir`, `batch` entries at a time.
pub async fn read_all<D: ReadDir>(dir: &mut D, batch: usize) -> io::Result<Vec<DirEntry>> {
    let mut out = Vec::new();

    while let Some(mut entries) = dir.read_dir(batch).await? {
        out.append(&mut entries);
    }

    Ok(out)
}

/// A client supplied path, as a sequence of named segments below the served root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VirtualPath {
    segs: Vec<String>,
    dir: bool,
}

impl VirtualPath {
    /// Interpret an already decoded, slash-delimited path.
    ///
    /// Empty and `.` segments are skipped, and `..` drops the preceding segment (it never climbs
    /// above the root).
    ///
    /// ```
    /// use veil::vfs::VirtualPath;
    ///
    /// let p = VirtualPath::parse("/public/./css/../.env");
    /// assert_eq!(vec!["public", ".env"], p.segments().collect::<Vec<_>>());
    /// assert!(!p.is_dir_request());
    /// assert!(VirtualPath::parse("/public/").is_dir_request());
    /// ```
    pub fn parse(path: &str) -> Self {
        let mut segs: Vec<String> = Vec::new();

        for seg in path.split(is_separator) {
            match seg {
                "" | "." => {}
                ".." => {
                    segs.pop();
                }
                seg => segs.push(seg.to_owned()),
            }
        }

        let dir = segs.is_empty() || path.ends_with('/');

        Self { segs, dir }
    }

    /// Interpret the (still percent-encoded) path component of a request uri.
    pub fn from_uri_path(path: &str) -> Self {
        Self::parse(&percent_decode_str(path).decode_utf8_lossy())
    }

    /// The named segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segs.iter().map(String::as_str)
    }

    /// Whether this path addresses a directory (it ended with a slash, or is the root).
    pub fn is_dir_request(&self) -> bool {
        self.dir
    }

    /// The relative filesystem path this virtual path maps onto.
    pub fn to_path_buf(&self) -> PathBuf {
        self.segs.iter().collect()
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segs.join("/"))?;

        if self.dir && !self.segs.is_empty() {
            write!(f, "/")?;
        }

        Ok(())
    }
}

#[inline]
fn is_separator(c: char) -> bool {
    c == '/' || (cfg!(windows) && c == '\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_segments() {
        let p = VirtualPath::parse("//a/./b/../c//");
        assert_eq!(vec!["a", "c"], p.segments().collect::<Vec<_>>());
        assert!(p.is_dir_request());
        assert_eq!("/a/c/", p.to_string());

        let p = VirtualPath::parse("/../../etc/passwd");
        assert_eq!(vec!["etc", "passwd"], p.segments().collect::<Vec<_>>());
        assert_eq!(PathBuf::from("etc").join("passwd"), p.to_path_buf());
    }

    #[test]
    fn test_root_is_a_directory() {
        for root in &["", "/", "/.", "/a/.."] {
            let p = VirtualPath::parse(root);
            assert_eq!(0, p.segments().count(), "{:?}", root);
            assert!(p.is_dir_request(), "{:?}", root);
            assert_eq!("/", p.to_string());
        }
    }

    #[test]
    fn test_uri_path_is_decoded() {
        let p = VirtualPath::from_uri_path("/public/%2Eenv");
        assert_eq!(vec!["public", ".env"], p.segments().collect::<Vec<_>>());

        let p = VirtualPath::from_uri_path("/with%20space/");
        assert_eq!(vec!["with space"], p.segments().collect::<Vec<_>>());
        assert!(p.is_dir_request());
    }
}
