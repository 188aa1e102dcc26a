use std::fmt;

use crate::{format::human_size, remote::ContentSummary};

/// Recursive totals for a subtree, taken from the remote content summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryStats {
    file_count: u64,
    directory_count: u64,
    total_size: u64,
}

impl DirectoryStats {
    #[must_use]
    pub const fn new(file_count: u64, directory_count: u64, total_size: u64) -> Self {
        Self {
            file_count,
            directory_count,
            total_size,
        }
    }

    #[must_use]
    pub const fn file_count(&self) -> u64 {
        self.file_count
    }

    /// Includes the directory the stats were taken for.
    #[must_use]
    pub const fn directory_count(&self) -> u64 {
        self.directory_count
    }

    /// Bytes stored under the path, before replication.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }
}

impl From<ContentSummary> for DirectoryStats {
    fn from(summary: ContentSummary) -> Self {
        Self::new(summary.file_count, summary.directory_count, summary.length)
    }
}

impl fmt::Display for DirectoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directory statistics:")?;
        writeln!(f, "  files: {}", self.file_count)?;
        writeln!(f, "  directories: {}", self.directory_count)?;
        write!(f, "  total size: {}", human_size(self.total_size))
    }
}
