//! File storage module
//!
//! A flat directory of files keyed by name. Uploads are streamed into a
//! hidden temporary file in the root and only become visible under their
//! name once complete:
//!
//! - save: linked into place without replacing (fails if the name exists)
//! - update: renamed over the existing file
//!
//! A failed or abandoned upload leaves nothing behind.

mod locks;
pub mod names;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{BoxError, StoreError};
pub use locks::NameLocks;

/// An opened stored file, ready to be streamed
#[derive(Debug)]
pub struct StoredFile {
    pub file: fs::File,
    pub len: u64,
}

/// File store rooted at one directory
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    locks: NameLocks,
}

impl FileStore {
    /// Open the store, creating the root directory (and parents) if absent.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        create_root(&root)?;
        info!(root = %root.display(), "File store opened");

        Ok(Self {
            root,
            locks: NameLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a new file. Fails without touching anything if `name` exists.
    ///
    /// Returns the number of bytes written.
    pub async fn save<S, E>(&self, name: &str, content: S) -> Result<u64, StoreError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let target = self.path_of(name)?;
        let _guard = self.locks.lock(name).await;

        // Fail fast before consuming the upload; the link below is authoritative
        if fs::try_exists(&target).await? {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let (temp, written) = self.write_temporary(content).await?;
        temp.persist_noclobber(&target).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::AlreadyExists(name.to_string())
            } else {
                StoreError::Io(e.error)
            }
        })?;

        debug!(name, bytes = written, "Saved file");
        Ok(written)
    }

    /// Replace the full contents of an existing file. Fails without creating
    /// anything if `name` is absent.
    pub async fn update<S, E>(&self, name: &str, content: S) -> Result<u64, StoreError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let target = self.path_of(name)?;
        let _guard = self.locks.lock(name).await;

        if !is_regular_file(&target).await? {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let (temp, written) = self.write_temporary(content).await?;
        temp.persist(&target).map_err(|e| StoreError::Io(e.error))?;

        debug!(name, bytes = written, "Updated file");
        Ok(written)
    }

    /// Open a stored file for streaming reads.
    pub async fn get(&self, name: &str) -> Result<StoredFile, StoreError> {
        let path = self.path_of(name)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(StoreError::NotFound(name.to_string()));
        }

        Ok(StoredFile {
            file,
            len: metadata.len(),
        })
    }

    /// Remove a stored file.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        let _guard = self.locks.lock(name).await;

        if !is_regular_file(&path).await? {
            return Err(StoreError::NotFound(name.to_string()));
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(name, "Deleted file");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of every non-directory entry in the root, ascending.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if names::is_temporary(&name) {
                continue;
            }
            files.push(name);
        }

        files.sort_unstable();
        Ok(files)
    }

    /// Listing rendered as text, each name followed by a newline.
    pub async fn list_as_text(&self) -> Result<String, StoreError> {
        let files = self.list().await?;
        Ok(files.iter().fold(String::new(), |mut out, name| {
            out.push_str(name);
            out.push('\n');
            out
        }))
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        names::validate(name)?;
        Ok(self.root.join(name))
    }

    /// Stream `content` into a fresh temporary file under the root.
    ///
    /// The returned path deletes itself when dropped unless persisted.
    async fn write_temporary<S, E>(&self, content: S) -> Result<(TempPath, u64), StoreError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<BoxError>,
    {
        let (std_file, temp) = tempfile::Builder::new()
            .prefix(names::TEMP_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.root)?
            .into_parts();
        let mut file = fs::File::from_std(std_file);

        let mut content = std::pin::pin!(content);
        let mut written: u64 = 0;
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(|e| StoreError::Source(e.into()))?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;

        Ok((temp, written))
    }
}

async fn is_regular_file(path: &Path) -> io::Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn create_root(root: &Path) -> io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    builder.create(root)
}
