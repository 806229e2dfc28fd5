use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Network attachment for a sandbox container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Fully network-isolated.
    None,
    Bridge,
    /// Host networking, for agents that need outbound API access.
    Host,
}

impl NetworkMode {
    pub fn as_flag(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bridge => "bridge",
            Self::Host => "host",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mount {
    pub host_path: PathBuf,
    pub container_path: String,
    pub read_only: bool,
}

/// Everything needed to create and start one detached container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub name: String,
    pub command: Vec<String>,
    pub env: Vec<(String, String)>,
    pub mounts: Vec<Mount>,
    pub memory_bytes: u64,
    pub cpu_quota_usec: i64,
    pub network: NetworkMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub exit_code: i64,
}

#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: String,
}

/// Low-level container runtime operations.
///
/// [`crate::DockerCli`] implements this against the `docker` binary;
/// [`crate::testing::StubRuntime`] is the in-memory test double.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Verify the runtime is reachable.
    async fn ping(&self) -> Result<()>;

    /// Create and start a detached container, returning its id.
    async fn create(&self, spec: &ContainerSpec) -> Result<String>;

    /// Block until the container exits or `timeout` elapses. Timeouts
    /// surface as [`crate::SandboxError::Timeout`], distinct from
    /// infrastructure failures.
    async fn wait(&self, container_id: &str, timeout: Duration) -> Result<ExitInfo>;

    async fn logs(&self, container_id: &str) -> Result<String>;

    /// Run a command inside a running (or stopped-but-present) container.
    async fn exec(&self, container_id: &str, command: &[String]) -> Result<ExecOutput>;

    async fn stop(&self, container_id: &str, grace: Duration) -> Result<()>;

    async fn remove(&self, container_id: &str, force: bool) -> Result<()>;
}
