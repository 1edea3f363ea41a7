//! A [FileStore] backed by a directory on the local filesystem.
use super::{DirEntry, FileStore, Opened, ReadDir};
use futures::future::{BoxFuture, FutureExt};
use hyper_staticfile::vfs::IntoFileAccess;
use std::{
    io,
    path::{Component, Path, PathBuf},
};
use tokio::fs::{self, File};

/// Serves files from below a single root directory.
#[derive(Clone, Debug)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `root`, which must be an existing directory.
    ///
    /// The root is canonicalized once, here.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;

        if !root.is_dir() {
            let msg = format!("{} is not a directory", root.display());
            return Err(io::Error::new(io::ErrorKind::InvalidInput, msg));
        }

        Ok(Self { root })
    }

    fn full_path(&self, path: &Path) -> io::Result<PathBuf> {
        let mut full = self.root.clone();

        for c in path.components() {
            match c {
                Component::Normal(seg) => full.push(seg),
                Component::CurDir => {}
                _ => {
                    let msg = format!("{:?} is not a normalized relative path", path);
                    return Err(io::Error::new(io::ErrorKind::InvalidInput, msg));
                }
            }
        }

        Ok(full)
    }
}

impl FileStore for DiskStore {
    type File = DiskFile;

    fn open(&self, path: &Path) -> BoxFuture<'static, io::Result<Opened<DiskFile>>> {
        let root = self.root.clone();
        let full = self.full_path(path);

        async move {
            let full = full?;
            let file = open_file(&full).await?;
            let meta = file.metadata().await?;

            let real = fs::canonicalize(&full).await?;
            let inside = real.strip_prefix(&root).ok().map(Path::to_path_buf);
            let resolved = inside.unwrap_or(real);

            Ok(Opened {
                handle: DiskFile {
                    file,
                    path: full,
                    entries: None,
                    done: false,
                },
                size: meta.len(),
                modified: meta.modified().ok(),
                is_dir: meta.is_dir(),
                resolved: Some(resolved),
            })
        }
        .boxed()
    }
}

#[cfg(not(windows))]
async fn open_file(path: &Path) -> io::Result<File> {
    File::open(path).await
}

#[cfg(windows)]
async fn open_file(path: &Path) -> io::Result<File> {
    // directories can only be opened with FILE_FLAG_BACKUP_SEMANTICS
    const FILE_FLAG_BACKUP_SEMANTICS: u32 = 0x0200_0000;

    (tokio::fs::OpenOptions::new())
        .read(true)
        .custom_flags(FILE_FLAG_BACKUP_SEMANTICS)
        .open(path)
        .await
}

/// A file or directory opened by a [DiskStore].
///
/// Directory entries are read lazily, on the first call to [read_dir][ReadDir::read_dir].
#[derive(Debug)]
pub struct DiskFile {
    file: File,
    path: PathBuf,
    entries: Option<fs::ReadDir>,
    done: bool,
}

impl ReadDir for DiskFile {
    fn read_dir(&mut self, n: usize) -> BoxFuture<'_, io::Result<Option<Vec<DirEntry>>>> {
        async move {
            if self.done {
                return Ok(None);
            }

            if self.entries.is_none() {
                self.entries = Some(fs::read_dir(&self.path).await?);
            }

            let entries = match self.entries.as_mut() {
                Some(entries) => entries,
                None => return Ok(None),
            };

            let mut batch = Vec::new();
            let mut exhausted = false;

            while n == 0 || batch.len() < n {
                match entries.next_entry().await? {
                    Some(entry) => batch.push(describe(entry).await?),
                    None => {
                        exhausted = true;
                        break;
                    }
                }
            }

            if exhausted {
                self.done = true;
                self.entries = None;

                if batch.is_empty() {
                    return Ok(None);
                }
            }

            Ok(Some(batch))
        }
        .boxed()
    }
}

async fn describe(entry: fs::DirEntry) -> io::Result<DirEntry> {
    let meta = entry.metadata().await?;

    Ok(DirEntry {
        name: entry.file_name().to_string_lossy().into_owned(),
        is_dir: meta.is_dir(),
        size: meta.len(),
        modified: meta.modified().ok(),
    })
}

impl IntoFileAccess for DiskFile {
    type Output = <File as IntoFileAccess>::Output;

    #[inline]
    fn into_file_access(self) -> Self::Output {
        self.file.into_file_access()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, write};

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        create_dir_all(root.join("public/css")).unwrap();
        write(root.join("index.html"), "<h1>index</h1>").unwrap();
        write(root.join("public/app.js"), "main()").unwrap();
        write(root.join("public/.env"), "SECRET=1").unwrap();

        dir
    }

    #[test]
    fn test_root_must_be_a_directory() {
        let dir = tree();

        assert!(DiskStore::new(dir.path()).is_ok());

        let err = DiskStore::new(dir.path().join("index.html")).unwrap_err();
        assert_eq!(io::ErrorKind::InvalidInput, err.kind());

        let err = DiskStore::new(dir.path().join("nope")).unwrap_err();
        assert_eq!(io::ErrorKind::NotFound, err.kind());
    }

    #[tokio::test]
    async fn test_open_file_and_directory() {
        let dir = tree();
        let store = DiskStore::new(dir.path()).unwrap();

        let f = store.open(Path::new("index.html")).await.unwrap();
        assert!(!f.is_dir);
        assert_eq!(14, f.size);
        assert_eq!(Some(PathBuf::from("index.html")), f.resolved);

        let d = store.open(Path::new("public")).await.unwrap();
        assert!(d.is_dir);

        let root = store.open(Path::new("")).await.unwrap();
        assert!(root.is_dir);

        let err = store.open(Path::new("missing.txt")).await.unwrap_err();
        assert_eq!(io::ErrorKind::NotFound, err.kind());
    }

    #[tokio::test]
    async fn test_paths_must_stay_below_the_root() {
        let dir = tree();
        let store = DiskStore::new(dir.path().join("public")).unwrap();

        for path in &["../index.html", "/etc/passwd"] {
            let err = store.open(Path::new(path)).await.unwrap_err();
            assert_eq!(io::ErrorKind::InvalidInput, err.kind(), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_read_dir_in_batches() {
        let dir = tree();
        let store = DiskStore::new(dir.path()).unwrap();

        let mut d = store.open(Path::new("public")).await.unwrap().handle;

        let mut names = Vec::new();
        while let Some(batch) = d.read_dir(1).await.unwrap() {
            assert_eq!(1, batch.len());
            names.extend(batch.into_iter().map(|e| (e.name, e.is_dir)));
        }
        names.sort();

        let expected = vec![
            (".env".to_owned(), false),
            ("app.js".to_owned(), false),
            ("css".to_owned(), true),
        ];
        assert_eq!(expected, names);

        // not restartable
        assert_eq!(None, d.read_dir(0).await.unwrap());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_report_their_target() {
        let dir = tree();
        let root = dir.path();
        std::os::unix::fs::symlink(root.join("public/.env"), root.join("env")).unwrap();

        let store = DiskStore::new(root).unwrap();
        let f = store.open(Path::new("env")).await.unwrap();

        assert_eq!(Some(Path::new("public").join(".env")), f.resolved);
    }
}
