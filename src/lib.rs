//! # hdfs-file-manager
//!
//! Basic file operations against a remote HDFS cluster: upload, download,
//! delete, recursive listing and directory statistics.
//!
//! A [`FileManager`] owns one connection for its whole lifetime. The
//! connection is a [`RemoteFs`] client chosen from the scheme of the base
//! address:
//!
//! - `webhdfs://host:port`, `swebhdfs://host:port`, `http(s)://host:port` use
//!   the WebHDFS REST API of the namenode;
//! - `mem://name` is an in-process namespace, handy for tests and dry runs.
//!
//! ```no_run
//! use hdfs_file_manager::{ClientConfig, FileManager};
//!
//! # async fn example() -> hdfs_file_manager::Result<()> {
//! let mut manager = FileManager::connect("webhdfs://localhost:9870", &ClientConfig::default()).await?;
//!
//! manager.upload("report.csv", "/user/student/input/report.csv", true).await?;
//! for line in manager.list_directory("/user/student", false).await? {
//!     println!("{line}");
//! }
//! println!("{}", manager.directory_stats("/user/student").await?);
//!
//! manager.close().await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate log;
#[macro_use]
extern crate async_trait;

mod error;
pub mod format;
pub mod manager;
pub mod path;
pub mod remote;

pub use error::{Error, Result};
pub use manager::{DirectoryStats, EntryDescriptor, FileManager, TreeWalk, WalkItem};
pub use path::RemotePath;
pub use remote::{
    connect, ClientConfig, ContentSummary, FileStatus, FileType, MemoryFs, RemoteFs, WebHdfs,
    DEFAULT_ADDRESS, DEFAULT_TIMEOUT,
};
