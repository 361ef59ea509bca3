//! Process spawning facility used by the supervisors.
//!
//! [`ProcessBackend`] is the seam that lets supervisors run against a fake
//! backend in tests; [`SystemProcessBackend`] is the `std::process` one.

use crate::error::{BridgeError, BridgeStage, Result};
use parking_lot::Mutex;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Exit code reported for a process killed by a signal.
pub const SIGNALED_EXIT_CODE: i32 = -1;

const TRY_WAIT_INTERVAL: Duration = Duration::from_millis(5);

pub trait ProcessBackend: Send + Sync {
    fn spawn(
        &self,
        binary: &Path,
        args: &[String],
        capture_output: bool,
    ) -> Result<Box<dyn BridgeProcessHandle>>;
}

/// One spawned bridge process.
pub trait BridgeProcessHandle: Send {
    fn id(&self) -> Option<u32>;

    /// Wait until the OS confirms the process started. False means it failed.
    fn wait_for_start(&mut self, timeout: Duration) -> bool;

    /// Exit code once the process has exited, `None` while it is still
    /// running after `timeout`. `None` timeout waits indefinitely.
    fn wait_for_exit(&mut self, timeout: Option<Duration>) -> Option<i32>;

    /// Everything the process wrote to stdout so far, when captured.
    fn read_captured_output(&mut self) -> Vec<u8>;

    /// Kill the process if it is still running and reap it.
    fn kill(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessBackend;

impl ProcessBackend for SystemProcessBackend {
    fn spawn(
        &self,
        binary: &Path,
        args: &[String],
        capture_output: bool,
    ) -> Result<Box<dyn BridgeProcessHandle>> {
        let mut command = Command::new(binary);
        command.args(args).stdin(Stdio::null());
        if capture_output {
            command.stdout(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|e| BridgeError::SpawnFailed {
            binary: binary.to_path_buf(),
            stage: BridgeStage::Spawning,
            reason: e.to_string(),
        })?;

        let output = Arc::new(Mutex::new(Vec::new()));
        let reader = match child.stdout.take() {
            Some(stdout) => Some(Self::spawn_reader(stdout, Arc::clone(&output))?),
            None => None,
        };

        tracing::debug!("Spawned {:?} (pid {})", binary, child.id());

        Ok(Box::new(SystemProcess {
            binary: binary.to_path_buf(),
            child,
            exit_code: None,
            output,
            reader,
        }))
    }
}

impl SystemProcessBackend {
    fn spawn_reader(
        mut stdout: std::process::ChildStdout,
        output: Arc<Mutex<Vec<u8>>>,
    ) -> Result<thread::JoinHandle<()>> {
        Ok(thread::Builder::new()
            .name("bridge-stdout".to_string())
            .spawn(move || {
                let mut buf = [0u8; 4096];
                loop {
                    match stdout.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => output.lock().extend_from_slice(&buf[..n]),
                    }
                }
            })?)
    }
}

struct SystemProcess {
    binary: PathBuf,
    child: Child,
    exit_code: Option<i32>,
    output: Arc<Mutex<Vec<u8>>>,
    reader: Option<thread::JoinHandle<()>>,
}

impl SystemProcess {
    fn try_wait(&mut self) -> Option<i32> {
        if self.exit_code.is_some() {
            return self.exit_code;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                self.exit_code = Some(status.code().unwrap_or(SIGNALED_EXIT_CODE));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to poll {:?}: {}", self.binary, e);
                self.exit_code = Some(SIGNALED_EXIT_CODE);
            }
        }
        self.exit_code
    }
}

impl BridgeProcessHandle for SystemProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn wait_for_start(&mut self, _timeout: Duration) -> bool {
        // `Command::spawn` only returns once exec has succeeded
        true
    }

    fn wait_for_exit(&mut self, timeout: Option<Duration>) -> Option<i32> {
        let Some(timeout) = timeout else {
            if self.exit_code.is_none() {
                self.exit_code = Some(match self.child.wait() {
                    Ok(status) => status.code().unwrap_or(SIGNALED_EXIT_CODE),
                    Err(e) => {
                        tracing::warn!("Failed to wait for {:?}: {}", self.binary, e);
                        SIGNALED_EXIT_CODE
                    }
                });
            }
            return self.exit_code;
        };

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(code) = self.try_wait() {
                return Some(code);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            thread::sleep(TRY_WAIT_INTERVAL.min(deadline - now));
        }
    }

    fn read_captured_output(&mut self) -> Vec<u8> {
        // Once the process is gone the pipe closes, so the reader finishes
        if self.try_wait().is_some() {
            if let Some(reader) = self.reader.take() {
                let _ = reader.join();
            }
        }
        self.output.lock().clone()
    }

    fn kill(&mut self) {
        if self.try_wait().is_some() {
            return;
        }
        tracing::debug!("Killing {:?} (pid {})", self.binary, self.child.id());
        let _ = self.child.kill();
        if let Ok(status) = self.child.wait() {
            self.exit_code = Some(status.code().unwrap_or(SIGNALED_EXIT_CODE));
        }
    }
}

impl Drop for SystemProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
