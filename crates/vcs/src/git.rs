//! Thin async wrappers over the `git` binary.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, VcsError};

pub(crate) async fn run_git(args: &[&str], cwd: &Path) -> Result<String> {
    debug!("Running git {:?} in {:?}", args, cwd);

    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VcsError::CommandFailed(format!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Shallow clone of a single branch into `dest`.
pub async fn clone_shallow(url: &str, branch: &str, dest: &Path) -> Result<()> {
    let dest_str = dest
        .to_str()
        .ok_or_else(|| VcsError::InvalidPath(dest.display().to_string()))?;
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));

    run_git(
        &[
            "clone",
            "--depth",
            "1",
            "--single-branch",
            "--branch",
            branch,
            url,
            dest_str,
        ],
        parent,
    )
    .await?;
    Ok(())
}

pub async fn fetch_origin(repo: &Path) -> Result<()> {
    run_git(&["fetch", "origin"], repo).await?;
    Ok(())
}

/// Create and switch to a branch; switching to one that already exists
/// is not an error.
pub async fn checkout_branch(repo: &Path, branch: &str) -> Result<()> {
    match run_git(&["checkout", "-b", branch], repo).await {
        Ok(_) => Ok(()),
        Err(VcsError::CommandFailed(msg)) if msg.contains("already exists") => {
            run_git(&["checkout", branch], repo).await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

pub async fn stage_all(repo: &Path) -> Result<()> {
    run_git(&["add", "-A"], repo).await?;
    Ok(())
}

pub async fn commit(repo: &Path, message: &str) -> Result<()> {
    run_git(&["commit", "-m", message], repo).await?;
    Ok(())
}

pub async fn head_commit(repo: &Path) -> Result<String> {
    let out = run_git(&["rev-parse", "HEAD"], repo).await?;
    Ok(out.trim().to_string())
}

pub async fn push(repo: &Path, branch: &str) -> Result<()> {
    run_git(&["push", "origin", branch], repo).await?;
    Ok(())
}

pub async fn is_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}
