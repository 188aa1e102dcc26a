//! JSON bodies of the WebHDFS REST API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    path::RemotePath,
    remote::{ContentSummary, FileStatus, FileType},
};

#[derive(Debug, Deserialize)]
pub(super) struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    pub file_status: RawFileStatus,
}

#[derive(Debug, Deserialize)]
pub(super) struct ListStatusResponse {
    #[serde(rename = "FileStatuses")]
    pub file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileStatuses {
    #[serde(rename = "FileStatus", default)]
    pub file_status: Vec<RawFileStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawFileStatus {
    #[serde(default)]
    pub path_suffix: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub modification_time: i64,
    #[serde(default)]
    pub owner: String,
}

impl RawFileStatus {
    /// Resolves the entry against the path that was queried. `GETFILESTATUS`
    /// and listings of a file carry an empty suffix.
    pub fn into_status(self, queried: &RemotePath) -> Result<FileStatus> {
        let path = if self.path_suffix.is_empty() {
            queried.clone()
        } else {
            queried.join(&self.path_suffix)?
        };

        let file_type = match self.kind.as_str() {
            "FILE" => FileType::File,
            "DIRECTORY" => FileType::Directory,
            "SYMLINK" => FileType::Symlink,
            other => return Err(Error::Protocol(format!("Unknown file type {other}"))),
        };

        Ok(FileStatus {
            path,
            file_type,
            length: self.length,
            modification_time: DateTime::<Utc>::from_timestamp_millis(self.modification_time),
            owner: self.owner,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ContentSummaryResponse {
    #[serde(rename = "ContentSummary")]
    pub content_summary: RawContentSummary,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawContentSummary {
    pub directory_count: u64,
    pub file_count: u64,
    pub length: u64,
}

impl From<RawContentSummary> for ContentSummary {
    fn from(raw: RawContentSummary) -> Self {
        Self {
            file_count: raw.file_count,
            directory_count: raw.directory_count,
            length: raw.length,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BooleanResponse {
    pub boolean: bool,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    #[serde(default)]
    message: String,
}

/// Maps an error response to a typed error. Bodies that are not a
/// `RemoteException` fall back to the HTTP status.
pub(super) fn remote_error(status: u16, body: &[u8]) -> Error {
    let Ok(response) = serde_json::from_slice::<RemoteExceptionResponse>(body) else {
        return Error::Http(status);
    };

    let RemoteException { exception, message } = response.remote_exception;
    match exception.as_str() {
        "FileNotFoundException" => Error::NotFound(message),
        "FileAlreadyExistsException" => Error::AlreadyExists(message),
        "PathIsNotEmptyDirectoryException" => Error::DirectoryNotEmpty(message),
        "AccessControlException" | "SecurityException" => Error::PermissionDenied(message),
        _ => Error::Remote { exception, message },
    }
}
