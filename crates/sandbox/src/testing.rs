//! In-memory container runtime for tests.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, SandboxError};
use crate::runtime::{ContainerRuntime, ContainerSpec, ExecOutput, ExitInfo};

/// Scriptable [`ContainerRuntime`] double.
///
/// Records call counts so tests can assert the engine's resource
/// invariants (no container for unsafe tasks, cleanup exactly once,
/// forced removal on timeout).
pub struct StubRuntime {
    create_error: Option<String>,
    wait_times_out: bool,
    wait_exit_code: i64,
    exec_exit_code: AtomicI64,
    diff_output: String,
    logs_output: String,

    next_id: AtomicUsize,
    created: AtomicUsize,
    stopped: AtomicUsize,
    removed: AtomicUsize,
    force_removed: AtomicUsize,
    execs: AtomicUsize,
    specs: Mutex<Vec<ContainerSpec>>,
}

impl StubRuntime {
    pub fn new() -> Self {
        Self {
            create_error: None,
            wait_times_out: false,
            wait_exit_code: 0,
            exec_exit_code: AtomicI64::new(0),
            diff_output: String::new(),
            logs_output: String::new(),
            next_id: AtomicUsize::new(1),
            created: AtomicUsize::new(0),
            stopped: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
            force_removed: AtomicUsize::new(0),
            execs: AtomicUsize::new(0),
            specs: Mutex::new(Vec::new()),
        }
    }

    /// Fail every `create` call with an infrastructure error.
    pub fn with_create_error(mut self, message: impl Into<String>) -> Self {
        self.create_error = Some(message.into());
        self
    }

    /// Make every `wait` call time out.
    pub fn with_timeout(mut self) -> Self {
        self.wait_times_out = true;
        self
    }

    pub fn with_wait_exit_code(mut self, exit_code: i64) -> Self {
        self.wait_exit_code = exit_code;
        self
    }

    /// Output returned by the in-container diff command.
    pub fn with_diff(mut self, output: impl Into<String>) -> Self {
        self.diff_output = output.into();
        self
    }

    pub fn with_exec_exit_code(self, exit_code: i64) -> Self {
        self.exec_exit_code.store(exit_code, Ordering::SeqCst);
        self
    }

    pub fn with_logs(mut self, output: impl Into<String>) -> Self {
        self.logs_output = output.into();
        self
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn stopped_count(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn removed_count(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn force_removed_count(&self) -> usize {
        self.force_removed.load(Ordering::SeqCst)
    }

    pub fn exec_count(&self) -> usize {
        self.execs.load(Ordering::SeqCst)
    }

    /// Specs of every container created so far, in order.
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.specs.lock().expect("spec log poisoned").clone()
    }
}

impl Default for StubRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for StubRuntime {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String> {
        if let Some(message) = &self.create_error {
            return Err(SandboxError::RuntimeUnavailable(message.clone()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        self.specs
            .lock()
            .expect("spec log poisoned")
            .push(spec.clone());
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("stub-{}-{}", spec.name, n))
    }

    async fn wait(&self, _container_id: &str, timeout: Duration) -> Result<ExitInfo> {
        if self.wait_times_out {
            return Err(SandboxError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
        Ok(ExitInfo {
            exit_code: self.wait_exit_code,
        })
    }

    async fn logs(&self, _container_id: &str) -> Result<String> {
        Ok(self.logs_output.clone())
    }

    async fn exec(&self, _container_id: &str, _command: &[String]) -> Result<ExecOutput> {
        self.execs.fetch_add(1, Ordering::SeqCst);
        Ok(ExecOutput {
            exit_code: self.exec_exit_code.load(Ordering::SeqCst),
            output: self.diff_output.clone(),
        })
    }

    async fn stop(&self, _container_id: &str, _grace: Duration) -> Result<()> {
        self.stopped.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, _container_id: &str, force: bool) -> Result<()> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        if force {
            self.force_removed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
