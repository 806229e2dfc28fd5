use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use codeforge_core::{FileChange, FileStatus};

use crate::error::{Result, SandboxError};
use crate::runtime::{ContainerRuntime, ContainerSpec, ExitInfo, Mount, NetworkMode};

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub image: String,
    /// Fixed memory ceiling per container.
    pub memory_bytes: u64,
    /// CPU quota in microseconds per 100ms period; 50_000 is half a core.
    pub cpu_quota_usec: i64,
    /// Mount point of the task workspace inside the container.
    pub workspace_mount: String,
    /// Grace period for a graceful stop before removal.
    pub stop_grace: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: "codeforge-agent:latest".to_string(),
            memory_bytes: 512 * 1024 * 1024,
            cpu_quota_usec: 50_000,
            workspace_mount: "/workspace".to_string(),
            stop_grace: Duration::from_secs(5),
        }
    }
}

struct EnvironmentRecord {
    container_id: String,
    created_at: DateTime<Utc>,
}

/// Owns every interaction with the container runtime.
///
/// At most one live environment exists per task id; creation under an
/// existing record is an error. The per-task lock serializes a task's
/// own create/cleanup (a racing retry), while distinct tasks never
/// contend with each other.
pub struct SandboxManager {
    runtime: Arc<dyn ContainerRuntime>,
    config: SandboxConfig,
    active: StdMutex<HashMap<String, EnvironmentRecord>>,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SandboxManager {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: SandboxConfig) -> Self {
        Self {
            runtime,
            config,
            active: StdMutex::new(HashMap::new()),
            locks: StdMutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    fn task_lock(&self, task_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().expect("lock table poisoned");
        locks
            .entry(task_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Create and start a detached container for the task.
    ///
    /// The workspace, when present, is mounted read-write at the
    /// configured mount point.
    pub async fn create(
        &self,
        task_id: &str,
        workspace: Option<&Path>,
        command: Vec<String>,
        env: Vec<(String, String)>,
        network: NetworkMode,
    ) -> Result<String> {
        let lock = self.task_lock(task_id);
        let _guard = lock.lock().await;

        {
            let active = self.active.lock().expect("environment table poisoned");
            if active.contains_key(task_id) {
                return Err(SandboxError::EnvironmentExists(task_id.to_string()));
            }
        }

        let short_id: String = task_id.chars().take(12).collect();
        let mut env = env;
        env.push(("SANDBOXED".to_string(), "true".to_string()));
        env.push(("TASK_ID".to_string(), task_id.to_string()));

        let mut mounts = Vec::new();
        if let Some(workspace) = workspace {
            mounts.push(Mount {
                host_path: workspace.to_path_buf(),
                container_path: self.config.workspace_mount.clone(),
                read_only: false,
            });
        }

        let spec = ContainerSpec {
            image: self.config.image.clone(),
            name: format!("codeforge-{}", short_id),
            command,
            env,
            mounts,
            memory_bytes: self.config.memory_bytes,
            cpu_quota_usec: self.config.cpu_quota_usec,
            network,
        };

        let container_id = self.runtime.create(&spec).await?;

        {
            let mut active = self.active.lock().expect("environment table poisoned");
            active.insert(
                task_id.to_string(),
                EnvironmentRecord {
                    container_id: container_id.clone(),
                    created_at: Utc::now(),
                },
            );
        }

        info!(
            task_id = %task_id,
            container_id = %container_id,
            "Created sandbox container"
        );

        Ok(container_id)
    }

    /// Wait for a container to exit, bounded by `timeout_seconds`.
    ///
    /// Does not hold the per-task lock; a timeout surfaces as
    /// [`SandboxError::Timeout`] and the caller is responsible for
    /// forced cleanup.
    pub async fn wait_for_completion(
        &self,
        container_id: &str,
        timeout_seconds: u64,
    ) -> Result<ExitInfo> {
        self.runtime
            .wait(container_id, Duration::from_secs(timeout_seconds))
            .await
    }

    pub async fn logs(&self, container_id: &str) -> Result<String> {
        self.runtime.logs(container_id).await
    }

    /// List files changed inside the container's workspace.
    ///
    /// A failing diff command yields an empty list, not an error:
    /// "no changes" is a valid, if unhelpful, outcome.
    pub async fn file_changes(&self, container_id: &str) -> Vec<FileChange> {
        let command: Vec<String> = [
            "git",
            "-C",
            self.config.workspace_mount.as_str(),
            "diff",
            "--name-status",
            "HEAD",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        match self.runtime.exec(container_id, &command).await {
            Ok(output) if output.exit_code == 0 => parse_name_status(&output.output),
            Ok(output) => {
                debug!(
                    container_id = %container_id,
                    exit_code = output.exit_code,
                    "Diff command failed, reporting no changes"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(container_id = %container_id, error = %e, "Failed to diff container");
                Vec::new()
            }
        }
    }

    /// Clean up the task's environment.
    ///
    /// Graceful stop-then-remove by default; `force` skips the stop and
    /// removes immediately. Idempotent: cleaning up a task with no live
    /// environment, or an already-removed container, is not an error.
    /// Returns whether an environment record was actually released.
    pub async fn cleanup(&self, task_id: &str, force: bool) -> Result<bool> {
        let lock = {
            let locks = self.locks.lock().expect("lock table poisoned");
            locks.get(task_id).cloned()
        };
        let Some(lock) = lock else {
            debug!(task_id = %task_id, "No environment tracked for task");
            return Ok(false);
        };
        let _guard = lock.lock().await;

        let record = {
            let mut active = self.active.lock().expect("environment table poisoned");
            active.remove(task_id)
        };
        let Some(record) = record else {
            return Ok(false);
        };

        let outcome = if force {
            self.runtime.remove(&record.container_id, true).await
        } else {
            match self.runtime.stop(&record.container_id, self.config.stop_grace).await {
                Ok(()) | Err(SandboxError::ContainerNotFound(_)) => {
                    self.runtime.remove(&record.container_id, false).await
                }
                Err(e) => Err(e),
            }
        };

        drop(_guard);
        {
            let mut locks = self.locks.lock().expect("lock table poisoned");
            locks.remove(task_id);
        }

        match outcome {
            Ok(()) | Err(SandboxError::ContainerNotFound(_)) => {
                info!(
                    task_id = %task_id,
                    container_id = %record.container_id,
                    forced = force,
                    "Cleaned up sandbox container"
                );
                Ok(true)
            }
            Err(e) => {
                warn!(
                    task_id = %task_id,
                    container_id = %record.container_id,
                    error = %e,
                    "Failed to clean up container"
                );
                Ok(false)
            }
        }
    }

    /// Force-remove every tracked environment older than the threshold.
    /// Backstop against leaks from crashed workflow instances.
    pub async fn cleanup_stale(&self, older_than: chrono::Duration) -> usize {
        let cutoff = Utc::now() - older_than;
        let expired: Vec<String> = {
            let active = self.active.lock().expect("environment table poisoned");
            active
                .iter()
                .filter(|(_, record)| record.created_at < cutoff)
                .map(|(task_id, _)| task_id.clone())
                .collect()
        };

        let mut cleaned = 0;
        for task_id in expired {
            match self.cleanup(&task_id, true).await {
                Ok(true) => cleaned += 1,
                Ok(false) => {}
                Err(e) => warn!(task_id = %task_id, error = %e, "Stale cleanup failed"),
            }
        }

        if cleaned > 0 {
            info!(cleaned = cleaned, "Swept stale sandbox containers");
        }
        cleaned
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().expect("environment table poisoned").len()
    }
}

/// Parse `git diff --name-status` output into file changes.
fn parse_name_status(output: &str) -> Vec<FileChange> {
    let mut changes = Vec::new();
    for line in output.lines() {
        let mut parts = line.split('\t');
        let Some(code) = parts.next() else { continue };
        let Some(status) = code.chars().next().and_then(FileStatus::from_diff_code) else {
            continue;
        };
        // Renames carry both paths; the new path is last.
        let Some(path) = parts.last().filter(|p| !p.is_empty()) else {
            continue;
        };
        changes.push(FileChange::new(path, status));
    }
    changes
}
