use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    collections::BTreeMap,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::sync::Mutex;

use super::{ContentSummary, FileStatus, FileType, RemoteFs};
use crate::{
    error::{Error, Result},
    path::RemotePath,
};

const OWNER: &str = "memory";

#[derive(Debug, Clone)]
enum Node {
    Directory { modified: DateTime<Utc> },
    File { data: Bytes, modified: DateTime<Utc> },
}

impl Node {
    fn status(&self, path: &RemotePath) -> FileStatus {
        let (file_type, length, modified) = match self {
            Self::Directory { modified } => (FileType::Directory, 0, *modified),
            Self::File { data, modified } => (FileType::File, data.len() as u64, *modified),
        };

        FileStatus {
            path: path.clone(),
            file_type,
            length,
            modification_time: Some(modified),
            owner: OWNER.to_owned(),
        }
    }
}

/// In-process namespace with HDFS semantics, addressed as `mem://<name>`.
///
/// Every instance starts with an empty root. Clones share the namespace,
/// which lets tests inspect what a [`FileManager`](crate::FileManager) did.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    address: String,
    nodes: Arc<Mutex<BTreeMap<RemotePath, Node>>>,
    list_calls: Arc<AtomicUsize>,
}

impl MemoryFs {
    #[must_use]
    pub fn new<T: Into<String>>(address: T) -> Self {
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(
            RemotePath::root(),
            Node::Directory {
                modified: Utc::now(),
            },
        );

        Self {
            address: address.into(),
            nodes: Arc::new(Mutex::new(nodes)),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `list_status` calls served so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn children<'a>(
        nodes: &'a BTreeMap<RemotePath, Node>,
        parent: &'a RemotePath,
    ) -> impl Iterator<Item = (&'a RemotePath, &'a Node)> + 'a {
        nodes
            .iter()
            .filter(move |(path, _)| path.parent().as_ref() == Some(parent))
    }
}

#[async_trait]
impl RemoteFs for MemoryFs {
    fn base_address(&self) -> &str {
        &self.address
    }

    async fn status(&self, path: &RemotePath) -> Result<Option<FileStatus>> {
        Ok(self.nodes.lock().await.get(path).map(|node| node.status(path)))
    }

    async fn mkdirs(&self, path: &RemotePath) -> Result<bool> {
        let mut nodes = self.nodes.lock().await;

        let mut current = RemotePath::root();
        for segment in path.segments() {
            current = current.join(segment)?;
            match nodes.get(&current) {
                Some(Node::Directory { .. }) => {}
                Some(Node::File { .. }) => return Err(Error::AlreadyExists(current.to_string())),
                None => {
                    let _ = nodes.insert(
                        current.clone(),
                        Node::Directory {
                            modified: Utc::now(),
                        },
                    );
                }
            }
        }

        Ok(true)
    }

    async fn copy_from_local(&self, overwrite: bool, src: &Path, dst: &RemotePath) -> Result<()> {
        let data = Bytes::from(tokio::fs::read(src).await?);
        let mut nodes = self.nodes.lock().await;

        let parent = dst
            .parent()
            .ok_or_else(|| Error::IsADirectory(dst.to_string()))?;
        match nodes.get(&parent) {
            Some(Node::Directory { .. }) => {}
            _ => return Err(Error::NotFound(parent.to_string())),
        }

        match nodes.get(dst) {
            Some(Node::Directory { .. }) => return Err(Error::IsADirectory(dst.to_string())),
            Some(Node::File { .. }) if !overwrite => {
                return Err(Error::AlreadyExists(dst.to_string()))
            }
            _ => {}
        }

        let _ = nodes.insert(
            dst.clone(),
            Node::File {
                data,
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn copy_to_local(&self, src: &RemotePath, dst: &Path) -> Result<()> {
        let data = match self.nodes.lock().await.get(src) {
            Some(Node::File { data, .. }) => data.clone(),
            Some(Node::Directory { .. }) => return Err(Error::NotAFile(src.to_string())),
            None => return Err(Error::NotFound(src.to_string())),
        };

        tokio::fs::write(dst, &data).await?;
        Ok(())
    }

    async fn delete(&self, path: &RemotePath, recursive: bool) -> Result<bool> {
        if path.is_root() {
            return Err(Error::PermissionDenied("cannot delete the root".to_owned()));
        }

        let mut nodes = self.nodes.lock().await;
        match nodes.get(path) {
            None => return Ok(false),
            Some(Node::File { .. }) => {}
            Some(Node::Directory { .. }) => {
                let has_children = Self::children(&nodes, path).next().is_some();
                if has_children && !recursive {
                    return Err(Error::DirectoryNotEmpty(path.to_string()));
                }
            }
        }

        nodes.retain(|candidate, _| candidate != path && !candidate.is_descendant_of(path));
        Ok(true)
    }

    async fn list_status(&self, path: &RemotePath) -> Result<Vec<FileStatus>> {
        let _ = self.list_calls.fetch_add(1, Ordering::Relaxed);

        let nodes = self.nodes.lock().await;
        match nodes.get(path) {
            None => Err(Error::NotFound(path.to_string())),
            Some(node @ Node::File { .. }) => Ok(vec![node.status(path)]),
            Some(Node::Directory { .. }) => Ok(Self::children(&nodes, path)
                .map(|(child, node)| node.status(child))
                .collect()),
        }
    }

    async fn content_summary(&self, path: &RemotePath) -> Result<ContentSummary> {
        let nodes = self.nodes.lock().await;
        if !nodes.contains_key(path) {
            return Err(Error::NotFound(path.to_string()));
        }

        let mut summary = ContentSummary::default();
        let subtree = nodes
            .iter()
            .filter(|(candidate, _)| *candidate == path || candidate.is_descendant_of(path));
        for (_, node) in subtree {
            match node {
                Node::Directory { .. } => summary.directory_count += 1,
                Node::File { data, .. } => {
                    summary.file_count += 1;
                    summary.length += data.len() as u64;
                }
            }
        }

        Ok(summary)
    }

    async fn close(&self) -> Result<()> {
        debug!("memory namespace {} released", self.address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> RemotePath {
        RemotePath::parse(s).unwrap()
    }

    #[tokio::test]
    async fn mkdirs_creates_ancestors() {
        let fs = MemoryFs::new("mem://test");
        assert!(fs.mkdirs(&path("/a/b/c")).await.unwrap());

        for dir in ["/a", "/a/b", "/a/b/c"] {
            let status = fs.status(&path(dir)).await.unwrap().unwrap();
            assert!(status.is_dir(), "{dir} should be a directory");
        }
    }

    #[tokio::test]
    async fn mkdirs_through_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("f");
        std::fs::write(&local, b"x").unwrap();

        let fs = MemoryFs::new("mem://test");
        fs.copy_from_local(false, &local, &path("/f")).await.unwrap();
        assert!(matches!(
            fs.mkdirs(&path("/f/sub")).await,
            Err(Error::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn create_requires_parent_and_respects_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("data.bin");
        std::fs::write(&local, b"12345").unwrap();

        let fs = MemoryFs::new("mem://test");
        assert!(matches!(
            fs.copy_from_local(true, &local, &path("/missing/data.bin")).await,
            Err(Error::NotFound(_))
        ));

        fs.copy_from_local(false, &local, &path("/data.bin")).await.unwrap();
        assert!(matches!(
            fs.copy_from_local(false, &local, &path("/data.bin")).await,
            Err(Error::AlreadyExists(_))
        ));
        fs.copy_from_local(true, &local, &path("/data.bin")).await.unwrap();

        let status = fs.status(&path("/data.bin")).await.unwrap().unwrap();
        assert_eq!(status.length, 5);
        assert_eq!(status.name(), "data.bin");
    }

    #[tokio::test]
    async fn delete_honours_recursive_flag() {
        let fs = MemoryFs::new("mem://test");
        assert!(fs.mkdirs(&path("/tree/leaf")).await.unwrap());

        assert!(matches!(
            fs.delete(&path("/tree"), false).await,
            Err(Error::DirectoryNotEmpty(_))
        ));
        assert!(fs.delete(&path("/tree"), true).await.unwrap());
        assert!(!fs.exists(&path("/tree/leaf")).await.unwrap());
        assert!(!fs.delete(&path("/tree"), true).await.unwrap());
    }

    #[tokio::test]
    async fn list_status_returns_direct_children_only() {
        let fs = MemoryFs::new("mem://test");
        assert!(fs.mkdirs(&path("/p/a/deep")).await.unwrap());
        assert!(fs.mkdirs(&path("/p/b")).await.unwrap());
        assert!(fs.mkdirs(&path("/pq")).await.unwrap());

        let names: Vec<String> = fs
            .list_status(&path("/p"))
            .await
            .unwrap()
            .iter()
            .map(|status| status.name().to_owned())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(fs.list_calls(), 1);
    }

    #[tokio::test]
    async fn content_summary_counts_the_directory_itself() {
        let fs = MemoryFs::new("mem://test");
        assert!(fs.mkdirs(&path("/s/x")).await.unwrap());

        let summary = fs.content_summary(&path("/s")).await.unwrap();
        assert_eq!(summary.directory_count, 2);
        assert_eq!(summary.file_count, 0);
        assert!(fs.content_summary(&path("/nope")).await.is_err());
    }
}
