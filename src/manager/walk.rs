use chrono::{DateTime, Utc};
use std::fmt;

use crate::{
    error::Result,
    format::{human_size, indent},
    path::RemotePath,
    remote::{FileStatus, RemoteFs},
};

/// Entry produced by a [`TreeWalk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub name: String,
    pub path: RemotePath,
    /// Nesting below the walked path, `0` for its direct children
    pub depth: usize,
    pub is_directory: bool,
    /// Length in bytes, `0` for directories
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl EntryDescriptor {
    fn new(status: FileStatus, depth: usize) -> Self {
        Self {
            name: status.name().to_owned(),
            is_directory: status.is_dir(),
            size: status.length,
            modified: status.modification_time,
            path: status.path,
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkItem {
    Entry(EntryDescriptor),
    /// A directory without children, reported at the depth its children
    /// would have had
    Empty { depth: usize },
}

impl WalkItem {
    #[must_use]
    pub const fn depth(&self) -> usize {
        match self {
            Self::Entry(entry) => entry.depth,
            Self::Empty { depth } => *depth,
        }
    }

    /// Renders one tree line. `long` appends the modification time of files.
    #[must_use]
    pub fn render(&self, long: bool) -> String {
        let prefix = indent(self.depth());
        match self {
            Self::Empty { .. } => format!("{prefix}[empty]"),
            Self::Entry(entry) if entry.is_directory => format!("{prefix}[DIR]  {}", entry.name),
            Self::Entry(entry) => {
                let size = human_size(entry.size);
                match entry.modified.filter(|_| long) {
                    Some(modified) => format!(
                        "{prefix}[FILE] {} ({size}, {})",
                        entry.name,
                        modified.format("%Y-%m-%d %H:%M")
                    ),
                    None => format!("{prefix}[FILE] {} ({size})", entry.name),
                }
            }
        }
    }
}

impl fmt::Display for WalkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}

enum Pending {
    Visit(FileStatus, usize),
    Expand(RemotePath, usize),
    Empty(usize),
}

/// Lazy depth-first, pre-order walk over a remote tree.
///
/// Children keep the order the remote side lists them in. A directory is
/// listed only when the walk reaches it, so dropping the walk early saves the
/// remaining requests.
///
/// A directory that cannot be listed yields one `Err` in place of its
/// children; the walk then carries on with its siblings.
pub struct TreeWalk<'a> {
    remote: &'a dyn RemoteFs,
    pending: Vec<Pending>,
}

impl<'a> TreeWalk<'a> {
    pub(crate) fn new(remote: &'a dyn RemoteFs, root: FileStatus) -> Self {
        let start = if root.is_dir() {
            Pending::Expand(root.path, 0)
        } else {
            Pending::Visit(root, 0)
        };

        Self {
            remote,
            pending: vec![start],
        }
    }

    /// Advances the walk. Returns `None` once the tree is exhausted.
    pub async fn next_item(&mut self) -> Option<Result<WalkItem>> {
        loop {
            match self.pending.pop()? {
                Pending::Empty(depth) => return Some(Ok(WalkItem::Empty { depth })),
                Pending::Visit(status, depth) => {
                    if status.is_dir() {
                        self.pending
                            .push(Pending::Expand(status.path.clone(), depth + 1));
                    }
                    return Some(Ok(WalkItem::Entry(EntryDescriptor::new(status, depth))));
                }
                Pending::Expand(path, depth) => {
                    let children = match self.remote.list_status(&path).await {
                        Ok(children) => children,
                        Err(error) => {
                            warn!("Skipping {path}: {error}");
                            return Some(Err(error));
                        }
                    };

                    if children.is_empty() {
                        self.pending.push(Pending::Empty(depth));
                    } else {
                        self.pending.extend(
                            children
                                .into_iter()
                                .rev()
                                .map(|child| Pending::Visit(child, depth)),
                        );
                    }
                }
            }
        }
    }

    /// Drains the walk, stopping at the first error.
    pub async fn into_items(mut self) -> Result<Vec<WalkItem>> {
        let mut items = Vec::new();
        while let Some(item) = self.next_item().await {
            items.push(item?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, depth: usize, is_directory: bool, size: u64) -> WalkItem {
        WalkItem::Entry(EntryDescriptor {
            name: name.to_owned(),
            path: RemotePath::root().join(name).unwrap(),
            depth,
            is_directory,
            size,
            modified: DateTime::<Utc>::from_timestamp(0, 0),
        })
    }

    #[test]
    fn renders_tree_lines() {
        assert_eq!(entry("logs", 0, true, 0).to_string(), "[DIR]  logs");
        assert_eq!(entry("a.txt", 1, false, 11).to_string(), "  [FILE] a.txt (11 B)");
        assert_eq!(WalkItem::Empty { depth: 2 }.to_string(), "    [empty]");
    }

    #[test]
    fn long_lines_carry_modification_time() {
        assert_eq!(
            entry("a.txt", 0, false, 2048).render(true),
            "[FILE] a.txt (2.00 KB, 1970-01-01 00:00)"
        );
        assert_eq!(entry("d", 0, true, 0).render(true), "[DIR]  d");
    }
}
