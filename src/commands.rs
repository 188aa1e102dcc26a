//! Subcommand handlers. Each prints a short report of what it did.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use hdfs_file_manager::{format::human_size, FileManager};
use std::path::Path;

use crate::args::Command;

const RULE: &str = "==============================";
const STEP_RULE: &str = "------------------------------------------------------------";
const SELFTEST_LINES: usize = 100;

pub async fn run(manager: &FileManager, command: Command) -> Result<()> {
    match command {
        Command::Upload {
            local,
            remote,
            overwrite,
        } => upload(manager, &local, &remote, overwrite).await,
        Command::Download {
            remote,
            local,
            overwrite,
        } => download(manager, &remote, &local, overwrite).await,
        Command::Rm { path, recursive } => delete(manager, &path, recursive).await,
        Command::Ls { path, long } => list(manager, &path, long).await,
        Command::Stats { path } => stats(manager, &path).await,
        Command::Selftest { dir } => selftest(manager, &dir).await,
    }
}

async fn local_size(path: &Path) -> Option<String> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    Some(human_size(metadata.len()))
}

async fn upload(manager: &FileManager, local: &Path, remote: &str, overwrite: bool) -> Result<()> {
    println!("Local file:  {}", local.display());
    if let Some(size) = local_size(local).await {
        println!("Size:        {size}");
    }
    println!("Remote path: {remote}");
    println!("Overwrite:   {}", yes_no(overwrite));

    manager
        .upload(local, remote, overwrite)
        .await
        .with_context(|| format!("upload of {} failed", local.display()))?;

    println!("Upload succeeded");
    Ok(())
}

async fn download(manager: &FileManager, remote: &str, local: &Path, overwrite: bool) -> Result<()> {
    println!("Remote path: {remote}");
    println!("Local file:  {}", local.display());
    println!("Overwrite:   {}", yes_no(overwrite));

    manager
        .download(remote, local, overwrite)
        .await
        .with_context(|| format!("download of {remote} failed"))?;

    println!("Download succeeded");
    if let Some(size) = local_size(local).await {
        println!("Size:        {size}");
    }
    Ok(())
}

async fn delete(manager: &FileManager, path: &str, recursive: bool) -> Result<()> {
    println!("Remote path: {path}");
    println!("Recursive:   {}", yes_no(recursive));

    manager
        .delete(path, recursive)
        .await
        .with_context(|| format!("delete of {path} failed"))?;

    println!("Delete succeeded");
    Ok(())
}

async fn list(manager: &FileManager, path: &str, long: bool) -> Result<()> {
    println!("Directory: {path}");
    println!("{RULE}");

    let mut walk = manager
        .walk(path)
        .await
        .with_context(|| format!("cannot list {path}"))?;
    let mut unreadable = 0usize;
    while let Some(item) = walk.next_item().await {
        match item {
            Ok(item) => println!("{}", item.render(long)),
            Err(error) => {
                eprintln!("cannot list: {error}");
                unreadable += 1;
            }
        }
    }

    println!("{RULE}");
    if unreadable > 0 {
        bail!("{unreadable} unreadable directories below {path}");
    }
    Ok(())
}

async fn stats(manager: &FileManager, path: &str) -> Result<()> {
    println!("Directory: {path}");

    match manager.directory_stats(path).await {
        Ok(stats) => {
            println!("{stats}");
            Ok(())
        }
        Err(error) if error.is_not_found() => bail!("{path} does not exist"),
        Err(error) => Err(error).with_context(|| format!("cannot summarize {path}")),
    }
}

/// Round-trips a generated file through the cluster and cleans up after
/// itself, locally and remotely, whatever the outcome.
async fn selftest(manager: &FileManager, base: &str) -> Result<()> {
    let stamp = Utc::now().timestamp_millis();
    let test_dir = format!("{}/test_{stamp}", base.trim_end_matches('/'));
    let upload_file = std::env::temp_dir().join(format!("test_upload_{stamp}.txt"));
    let download_file = std::env::temp_dir().join(format!("test_download_{stamp}.txt"));

    println!("Test directory: {test_dir}");
    let outcome = selftest_steps(manager, &test_dir, &upload_file, &download_file).await;

    if outcome.is_err() && manager.delete(&test_dir, true).await.is_ok() {
        println!("Removed {test_dir}");
    }
    for file in [&upload_file, &download_file] {
        if tokio::fs::remove_file(file).await.is_ok() {
            println!("Removed {}", file.display());
        }
    }

    match &outcome {
        Ok(()) => println!("\nSelf-test passed"),
        Err(_) => println!("\nSelf-test failed"),
    }
    outcome
}

async fn selftest_steps(
    manager: &FileManager,
    test_dir: &str,
    upload_file: &Path,
    download_file: &Path,
) -> Result<()> {
    let remote_file = format!("{test_dir}/test_upload.txt");

    step(1, "create local test file");
    let content: String = (1..=SELFTEST_LINES)
        .map(|line| format!("self-test line {line}: generated content\n"))
        .collect();
    tokio::fs::write(upload_file, &content)
        .await
        .with_context(|| format!("cannot write {}", upload_file.display()))?;
    println!("{} ({})", upload_file.display(), human_size(content.len() as u64));

    step(2, "upload");
    manager.upload(upload_file, &remote_file, true).await?;
    println!("{} -> {remote_file}", upload_file.display());

    step(3, "list directory");
    for line in manager.list_directory(test_dir, false).await? {
        println!("{line}");
    }

    step(4, "directory statistics");
    let stats = manager.directory_stats(test_dir).await?;
    println!("{stats}");
    if stats.file_count() != 1 || stats.total_size() != content.len() as u64 {
        bail!("unexpected statistics for {test_dir}");
    }

    step(5, "download");
    manager.download(&remote_file, download_file, true).await?;
    let downloaded = tokio::fs::read(download_file)
        .await
        .with_context(|| format!("cannot read {}", download_file.display()))?;
    if downloaded != content.as_bytes() {
        bail!("downloaded content differs from the uploaded file");
    }
    println!("{remote_file} -> {} (content verified)", download_file.display());

    step(6, "delete");
    manager.delete(test_dir, true).await?;
    println!("{test_dir} removed");

    Ok(())
}

fn step(number: usize, title: &str) {
    println!("\n{STEP_RULE}\n[step {number}/6] {title}\n{STEP_RULE}");
}

const fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
