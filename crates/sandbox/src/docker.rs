//! Container runtime backed by the `docker` CLI.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SandboxError};
use crate::runtime::{ContainerRuntime, ContainerSpec, ExecOutput, ExitInfo};

pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        debug!("Running {} {:?}", self.binary, args);

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| SandboxError::RuntimeUnavailable(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such container") {
                return Err(SandboxError::ContainerNotFound(stderr.trim().to_string()));
            }
            return Err(SandboxError::CommandFailed(format!(
                "{} {} failed: {}",
                self.binary,
                args.first().map(String::as_str).unwrap_or(""),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn ping(&self) -> Result<()> {
        self.run(&["version".to_string(), "--format".to_string(), "{{.Server.Version}}".to_string()])
            .await?;
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            spec.name.clone(),
            "--memory".to_string(),
            format!("{}b", spec.memory_bytes),
            "--cpu-quota".to_string(),
            spec.cpu_quota_usec.to_string(),
            "--network".to_string(),
            spec.network.as_flag().to_string(),
        ];

        for (key, value) in &spec.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        for mount in &spec.mounts {
            args.push("-v".to_string());
            let mode = if mount.read_only { ":ro" } else { "" };
            args.push(format!(
                "{}:{}{}",
                mount.host_path.display(),
                mount.container_path,
                mode
            ));
        }

        args.push(spec.image.clone());
        args.extend(spec.command.iter().cloned());

        let stdout = self.run(&args).await?;
        Ok(stdout.trim().to_string())
    }

    async fn wait(&self, container_id: &str, timeout: Duration) -> Result<ExitInfo> {
        let wait_args = ["wait".to_string(), container_id.to_string()];
        let wait = self.run(&wait_args);

        let stdout = tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| SandboxError::Timeout {
                seconds: timeout.as_secs(),
            })??;

        let exit_code = stdout.trim().parse::<i64>().map_err(|_| {
            SandboxError::CommandFailed(format!("unparseable wait output: {}", stdout.trim()))
        })?;

        Ok(ExitInfo { exit_code })
    }

    async fn logs(&self, container_id: &str) -> Result<String> {
        // `docker logs` interleaves stdout and stderr; grab both.
        let output = Command::new(&self.binary)
            .args(["logs", container_id])
            .output()
            .await
            .map_err(|e| SandboxError::RuntimeUnavailable(e.to_string()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    async fn exec(&self, container_id: &str, command: &[String]) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), container_id.to_string()];
        args.extend(command.iter().cloned());

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| SandboxError::RuntimeUnavailable(e.to_string()))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1) as i64,
            output: text,
        })
    }

    async fn stop(&self, container_id: &str, grace: Duration) -> Result<()> {
        self.run(&[
            "stop".to_string(),
            "-t".to_string(),
            grace.as_secs().to_string(),
            container_id.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn remove(&self, container_id: &str, force: bool) -> Result<()> {
        let mut args = vec!["rm".to_string()];
        if force {
            args.push("-f".to_string());
        }
        args.push(container_id.to_string());

        match self.run(&args).await {
            Ok(_) => Ok(()),
            // Already gone counts as removed.
            Err(SandboxError::ContainerNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
