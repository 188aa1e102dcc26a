//! The file manager: existence-checked operations over one remote connection.

mod stats;
mod walk;

use std::{ffi::OsString, io::ErrorKind, path::Path};
use tempfile::NamedTempFile;

pub use stats::DirectoryStats;
pub use walk::{EntryDescriptor, TreeWalk, WalkItem};

use crate::{
    error::{Error, Result},
    path::RemotePath,
    remote::{self, ClientConfig, RemoteFs},
};

/// Owns the connection to a remote filesystem and runs file operations
/// against it.
///
/// Operations run one at a time; each is awaited to completion before the
/// caller can issue the next. Every operation returns [`Result`]: failures are
/// logged here and handed back as typed errors.
///
/// The connection lives as long as the manager. [`FileManager::close`]
/// releases it through [`RemoteFs::close`] and may be called any number of
/// times. A manager dropped without being closed only drops its client:
/// `RemoteFs::close` is async and is not called from `Drop`, so clients must
/// also free their resources when dropped.
pub struct FileManager {
    remote: Option<Box<dyn RemoteFs>>,
}

impl FileManager {
    /// Wraps an already established client.
    #[must_use]
    pub fn new(remote: Box<dyn RemoteFs>) -> Self {
        Self {
            remote: Some(remote),
        }
    }

    /// Connects to the remote filesystem at `address`. Connection failures
    /// are returned as [`Error::Connection`].
    pub async fn connect(address: &str, config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(remote::connect(address, config).await?))
    }

    /// Address of the live connection, `None` once closed.
    #[must_use]
    pub fn base_address(&self) -> Option<&str> {
        self.remote.as_ref().map(|remote| remote.base_address())
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.remote.is_none()
    }

    fn remote(&self) -> Result<&dyn RemoteFs> {
        self.remote.as_deref().ok_or(Error::Closed)
    }

    /// Releases the connection. Does nothing if it is already closed.
    pub async fn close(&mut self) -> Result<()> {
        let Some(remote) = self.remote.take() else {
            return Ok(());
        };

        let address = remote.base_address().to_owned();
        match remote.close().await {
            Ok(()) => {
                info!("Connection to {address} closed");
                Ok(())
            }
            Err(error) => {
                error!("Closing connection to {address} failed: {error}");
                Err(error)
            }
        }
    }

    /// Uploads a local file to `remote_path`, creating missing parent
    /// directories. An existing destination is replaced only with `overwrite`.
    pub async fn upload<L, R>(&self, local_path: L, remote_path: R, overwrite: bool) -> Result<()>
    where
        L: AsRef<Path>,
        R: AsRef<str>,
    {
        let local = local_path.as_ref();
        let result = self.try_upload(local, remote_path.as_ref(), overwrite).await;
        report("upload", result.map(|dst| {
            info!("Uploaded {} -> {dst}", local.display());
        }))
    }

    async fn try_upload(&self, local: &Path, remote_path: &str, overwrite: bool) -> Result<RemotePath> {
        let remote = self.remote()?;
        let dst = RemotePath::parse(remote_path)?;

        match tokio::fs::metadata(local).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(Error::NotAFile(local.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::NotFound(local.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(existing) = remote.status(&dst).await? {
            if existing.is_dir() {
                return Err(Error::IsADirectory(dst.to_string()));
            }
            if !overwrite {
                return Err(Error::AlreadyExists(dst.to_string()));
            }
        }

        let parent = dst
            .parent()
            .ok_or_else(|| Error::IsADirectory(dst.to_string()))?;
        if !remote.exists(&parent).await? {
            if !remote.mkdirs(&parent).await? {
                return Err(Error::OperationFailed(format!("mkdirs {parent}")));
            }
            info!("Created directory {parent}");
        }

        remote.copy_from_local(overwrite, local, &dst).await?;
        Ok(dst)
    }

    /// Downloads the remote file at `remote_path` to `local_path`.
    ///
    /// The data lands in a uniquely named staging file in the destination
    /// directory and is renamed over the destination once complete. A failed
    /// download leaves the destination, and any other local file, as it was.
    pub async fn download<R, L>(&self, remote_path: R, local_path: L, overwrite: bool) -> Result<()>
    where
        R: AsRef<str>,
        L: AsRef<Path>,
    {
        let local = local_path.as_ref();
        let result = self.try_download(remote_path.as_ref(), local, overwrite).await;
        report("download", result.map(|src| {
            info!("Downloaded {src} -> {}", local.display());
        }))
    }

    async fn try_download(&self, remote_path: &str, local: &Path, overwrite: bool) -> Result<RemotePath> {
        let remote = self.remote()?;
        let src = RemotePath::parse(remote_path)?;

        match remote.status(&src).await? {
            None => return Err(Error::NotFound(src.to_string())),
            Some(status) if !status.is_file() => return Err(Error::NotAFile(src.to_string())),
            Some(_) => {}
        }

        match tokio::fs::metadata(local).await {
            Ok(metadata) if metadata.is_dir() => {
                return Err(Error::IsADirectory(local.display().to_string()))
            }
            Ok(_) if !overwrite => return Err(Error::AlreadyExists(local.display().to_string())),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let parent = match local.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        tokio::fs::create_dir_all(parent).await?;

        // Dropped on any early return, which removes the partial data.
        let staging = staging_file(local, parent)?;
        remote.copy_to_local(&src, staging.path()).await?;
        let _ = staging.persist(local).map_err(|e| Error::from(e.error))?;
        Ok(src)
    }

    /// Deletes a file, or a whole directory tree with `recursive`. A missing
    /// path is an error, as is a non-empty directory without `recursive`.
    pub async fn delete<P: AsRef<str>>(&self, path: P, recursive: bool) -> Result<()> {
        let result = self.try_delete(path.as_ref(), recursive).await;
        report("delete", result.map(|path| info!("Deleted {path}")))
    }

    async fn try_delete(&self, path: &str, recursive: bool) -> Result<RemotePath> {
        let remote = self.remote()?;
        let path = RemotePath::parse(path)?;

        if path.is_root() {
            return Err(Error::InvalidPath("refusing to delete /".to_owned()));
        }
        if !remote.exists(&path).await? {
            return Err(Error::NotFound(path.to_string()));
        }

        if remote.delete(&path, recursive).await? {
            Ok(path)
        } else {
            Err(Error::OperationFailed(format!("delete {path}")))
        }
    }

    /// Starts a lazy walk over the tree below `path`.
    pub async fn walk<P: AsRef<str>>(&self, path: P) -> Result<TreeWalk<'_>> {
        let result = self.try_walk(path.as_ref()).await;
        report("list", result)
    }

    async fn try_walk(&self, path: &str) -> Result<TreeWalk<'_>> {
        let remote = self.remote()?;
        let path = RemotePath::parse(path)?;

        let root = remote
            .status(&path)
            .await?
            .ok_or_else(|| Error::NotFound(path.to_string()))?;
        Ok(TreeWalk::new(remote, root))
    }

    /// Walks the tree below `path` and renders it line by line.
    ///
    /// Directories that cannot be listed, `path` included, are logged and left
    /// out. An error is returned only when the status of `path` cannot be read.
    pub async fn list_directory<P: AsRef<str>>(&self, path: P, long: bool) -> Result<Vec<String>> {
        let mut walk = self.walk(path).await?;
        let mut lines = Vec::new();
        while let Some(item) = walk.next_item().await {
            match item {
                Ok(item) => lines.push(item.render(long)),
                Err(error) => error!("list failed: {error}"),
            }
        }
        Ok(lines)
    }

    /// Returns recursive file, directory and byte totals for `path`.
    pub async fn directory_stats<P: AsRef<str>>(&self, path: P) -> Result<DirectoryStats> {
        let result = self.try_directory_stats(path.as_ref()).await;
        report("stats", result)
    }

    async fn try_directory_stats(&self, path: &str) -> Result<DirectoryStats> {
        let remote = self.remote()?;
        let path = RemotePath::parse(path)?;

        if !remote.exists(&path).await? {
            return Err(Error::NotFound(path.to_string()));
        }

        Ok(remote.content_summary(&path).await?.into())
    }
}

impl Drop for FileManager {
    fn drop(&mut self) {
        if let Some(remote) = self.remote.take() {
            debug!(
                "Connection to {} dropped without calling close",
                remote.base_address()
            );
        }
    }
}

fn report<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(error) = &result {
        error!("{operation} failed: {error}");
    }
    result
}

/// Creates a uniquely named `.<name>.<random>.part` file next to `local`.
/// It is removed again if dropped before being persisted.
fn staging_file(local: &Path, dir: &Path) -> Result<NamedTempFile> {
    let name = local
        .file_name()
        .ok_or_else(|| Error::InvalidPath(local.display().to_string()))?;

    let mut prefix = OsString::from(".");
    prefix.push(name);
    prefix.push(".");
    Ok(tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".part")
        .tempfile_in(dir)?)
}
