//! Remote filesystem clients.
//!
//! [`RemoteFs`] is the seam between the file manager and the filesystem it
//! drives. Backends are picked from the scheme of the base address by
//! [`connect`].

mod memory;
mod webhdfs;

use chrono::{DateTime, Utc};
use std::{path::Path, time::Duration};

pub use memory::MemoryFs;
pub use webhdfs::WebHdfs;

use crate::{
    error::{Error, Result},
    path::RemotePath,
};

/// Address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "webhdfs://localhost:9870";

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client settings shared by all backends.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// User to act as. `None` lets the remote side decide.
    pub user: Option<String>,
    /// Maximum time for a single request.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// Status of a single remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: RemotePath,
    pub file_type: FileType,
    /// Length in bytes, `0` for directories
    pub length: u64,
    pub modification_time: Option<DateTime<Utc>>,
    pub owner: String,
}

impl FileStatus {
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns the last path segment, `/` for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or("/")
    }
}

/// Aggregate computed by the remote side over a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentSummary {
    pub file_count: u64,
    /// Includes the summarized directory itself
    pub directory_count: u64,
    pub length: u64,
}

/// Operations the file manager needs from a remote filesystem client.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Address the client is bound to.
    fn base_address(&self) -> &str;

    /// Queries the status of a path. Returns `Ok(None)` if it does not exist.
    async fn status(&self, path: &RemotePath) -> Result<Option<FileStatus>>;

    /// Checks a file or folder exists at the specified path
    async fn exists(&self, path: &RemotePath) -> Result<bool> {
        Ok(self.status(path).await?.is_some())
    }

    /// Creates a directory together with all missing ancestors.
    async fn mkdirs(&self, path: &RemotePath) -> Result<bool>;

    /// Copies a local file to `dst`. With `overwrite` unset an existing
    /// destination is refused.
    async fn copy_from_local(&self, overwrite: bool, src: &Path, dst: &RemotePath) -> Result<()>;

    /// Copies the remote file `src` to the local path `dst`, replacing it.
    async fn copy_to_local(&self, src: &RemotePath, dst: &Path) -> Result<()>;

    /// Deletes a file, or a directory tree when `recursive` is set.
    /// Returns `false` when nothing was deleted.
    async fn delete(&self, path: &RemotePath, recursive: bool) -> Result<bool>;

    /// Lists the immediate children of a directory in the order the remote
    /// side returns them. Listing a file yields the file itself.
    async fn list_status(&self, path: &RemotePath) -> Result<Vec<FileStatus>>;

    async fn content_summary(&self, path: &RemotePath) -> Result<ContentSummary>;

    /// Releases the connection.
    async fn close(&self) -> Result<()>;
}

/// Builds the client matching the scheme of `address` and checks that the
/// remote root is reachable.
pub async fn connect(address: &str, config: &ClientConfig) -> Result<Box<dyn RemoteFs>> {
    let scheme = address
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .ok_or_else(|| Error::UnsupportedScheme(address.to_owned()))?;

    let remote: Box<dyn RemoteFs> = match scheme.as_str() {
        "mem" => Box::new(MemoryFs::new(address)),
        "webhdfs" | "swebhdfs" | "http" | "https" => Box::new(WebHdfs::new(address, config)?),
        "hdfs" => {
            return Err(Error::UnsupportedScheme(format!(
                "{address} (native RPC is not supported, use webhdfs://<namenode>:9870)"
            )))
        }
        _ => return Err(Error::UnsupportedScheme(address.to_owned())),
    };

    match remote.status(&RemotePath::root()).await {
        Ok(Some(_)) => {
            info!("Connected to {address}");
            Ok(remote)
        }
        Ok(None) => Err(Error::Connection {
            address: address.to_owned(),
            reason: "root directory is missing".to_owned(),
        }),
        Err(error) => {
            error!("Connection to {address} failed: {error}");
            Err(Error::Connection {
                address: address.to_owned(),
                reason: error.to_string(),
            })
        }
    }
}
