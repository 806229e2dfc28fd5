use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use codeforge_core::CodingTask;
use sandbox::{NetworkMode, SandboxConfig};

/// Engine-wide configuration.
///
/// Read from a JSON file when one exists; any read or parse failure
/// falls back to defaults so the engine always starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Image the change-generation step runs in.
    pub sandbox_image: String,
    /// Root directory for task workspaces and persistent clones.
    pub workspace_root: PathBuf,
    /// Fixed per-container memory ceiling.
    pub memory_bytes: u64,
    /// CPU quota in microseconds per 100ms period.
    pub cpu_quota_usec: i64,
    /// Grace period for graceful container stops.
    pub stop_grace_seconds: u64,
    /// Environments older than this are swept by `cleanup_stale`.
    pub stale_after_minutes: i64,
    /// Prefix for synthesized task branches.
    pub branch_prefix: String,
    /// Run containers with no network instead of host networking.
    pub network_isolated: bool,
    /// Model passed to the in-container agent.
    pub model_id: String,
    /// Overrides the built-in safety denylist when set.
    pub denylist: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sandbox_image: "codeforge-agent:latest".to_string(),
            workspace_root: PathBuf::from(".codeforge/workspaces"),
            memory_bytes: 512 * 1024 * 1024,
            cpu_quota_usec: 50_000,
            stop_grace_seconds: 5,
            stale_after_minutes: 60,
            branch_prefix: "codeforge".to_string(),
            network_isolated: false,
            model_id: "claude-sonnet-4-20250514".to_string(),
            denylist: None,
        }
    }
}

impl EngineConfig {
    /// Read config from a JSON file, falling back to defaults.
    pub async fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file does not exist, using defaults");
            return Self::default();
        }

        match tokio::fs::read_to_string(path).await {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    /// Branch the task's changes land on: the explicit branch name when
    /// the caller set one, otherwise synthesized from the task id.
    pub fn branch_for(&self, task: &CodingTask) -> String {
        task.branch_name
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.branch_prefix, task.short_id()))
    }

    pub fn sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            image: self.sandbox_image.clone(),
            memory_bytes: self.memory_bytes,
            cpu_quota_usec: self.cpu_quota_usec,
            workspace_mount: "/workspace".to_string(),
            stop_grace: Duration::from_secs(self.stop_grace_seconds),
        }
    }

    /// Agents need outbound API access unless the engine is configured
    /// for network isolation.
    pub fn network_mode(&self) -> NetworkMode {
        if self.network_isolated {
            NetworkMode::None
        } else {
            NetworkMode::Host
        }
    }
}
