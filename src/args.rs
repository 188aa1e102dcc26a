//! Command-line argument parsing

use clap::{Parser, Subcommand};
use hdfs_file_manager::DEFAULT_ADDRESS;
use std::path::PathBuf;

/// Default directory used by `selftest`
pub const DEFAULT_SELFTEST_DIR: &str = "/user/student/project";

/// Upload, download, delete, list and summarize files on HDFS
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Base address of the filesystem (webhdfs://, swebhdfs://, http(s):// or mem://)
    #[arg(short, long, env = "FILE_MANAGER_URI", default_value = DEFAULT_ADDRESS)]
    pub uri: String,

    /// User to act as on the cluster
    #[arg(long, env = "HADOOP_USER_NAME")]
    pub user: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(long, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a local file, creating missing remote directories
    Upload {
        local: PathBuf,
        remote: String,
        /// Replace the remote file if it exists
        #[arg(long)]
        overwrite: bool,
    },
    /// Download a remote file
    Download {
        remote: String,
        local: PathBuf,
        /// Replace the local file if it exists
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a file or directory
    Rm {
        path: String,
        /// Delete directories and their contents
        #[arg(short, long)]
        recursive: bool,
    },
    /// Print the directory tree below a path
    Ls {
        path: String,
        /// Show modification times of files
        #[arg(short, long)]
        long: bool,
    },
    /// Print recursive file, directory and size totals
    Stats { path: String },
    /// Upload, list, summarize, download and delete a generated test file
    Selftest {
        /// Remote directory under which the test directory is created
        #[arg(long, default_value = DEFAULT_SELFTEST_DIR)]
        dir: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_upload_with_overwrite() {
        let args = Args::parse_from([
            "hdfs-file-manager",
            "--uri",
            "mem://cli",
            "upload",
            "a.txt",
            "/x/a.txt",
            "--overwrite",
        ]);

        assert_eq!(args.uri, "mem://cli");
        match args.command {
            Command::Upload {
                local,
                remote,
                overwrite,
            } => {
                assert_eq!(local, PathBuf::from("a.txt"));
                assert_eq!(remote, "/x/a.txt");
                assert!(overwrite);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rm_defaults_to_non_recursive() {
        let args = Args::parse_from(["hdfs-file-manager", "rm", "/tmp/x"]);
        assert!(matches!(args.command, Command::Rm { recursive: false, .. }));
    }
}
