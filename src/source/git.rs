//! Git subprocess client - shallow clones the channel repository

use crate::source::SourceError;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Client for running git as a subprocess
#[derive(Debug, Clone)]
pub struct GitCloner {
    /// Path to git executable
    git_path: String,

    /// Timeout for the clone in seconds
    timeout_secs: u64,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self::new("git".to_string(), 300)
    }
}

impl GitCloner {
    pub fn new(git_path: String, timeout_secs: u64) -> Self {
        Self {
            git_path,
            timeout_secs,
        }
    }

    #[cfg(test)]
    pub fn git_path(&self) -> &str {
        &self.git_path
    }

    /// Replace `target` with a fresh single-branch, depth-1 clone of `url`
    ///
    /// # Errors
    /// Returns `SourceError::Clone` if the previous checkout cannot be removed,
    /// git cannot be spawned, exits non-zero, or runs past the timeout.
    pub async fn clone_fresh(&self, url: &str, target: &Path) -> Result<(), SourceError> {
        match tokio::fs::remove_dir_all(target).await {
            Ok(()) => debug!("Removed previous checkout at {}", target.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SourceError::Clone(format!(
                    "failed to remove {}: {}",
                    target.display(),
                    e
                )))
            }
        }

        debug!("Cloning {} into {}", url, target.display());

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new(&self.git_path)
                .args(["clone", "--depth", "1", "--single-branch"])
                .arg(url)
                .arg(target)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            SourceError::Clone(format!("git clone timed out after {} seconds", self.timeout_secs))
        })?;

        let output = result
            .map_err(|e| SourceError::Clone(format!("failed to run {}: {}", self.git_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            warn!("git exited with code {}: {}", exit_code, stderr.trim());
            return Err(SourceError::Clone(format!(
                "git exited with code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
