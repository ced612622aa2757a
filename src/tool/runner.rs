//! Launching tools and capturing their output
//!
//! Each invocation runs as a child process with stdout and stderr both
//! redirected into the invocation's log file. The caller blocks until the
//! child exits, or until an optional timeout kills it.

use std::fs::File;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::{Error, Result};

use super::ToolInvocation;

/// Outcome of one completed tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Wall-clock time from just before launch until exit
    pub elapsed: Duration,
    /// Exit code, if the process exited normally
    pub exit_code: Option<i32>,
}

/// Runs a prepared invocation to completion
pub trait ToolRunner {
    /// Run the invocation, writing its combined output to `invocation.log`
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be created, the process cannot be
    /// launched, or it exceeds the runner's timeout.
    fn run(&self, invocation: &ToolInvocation) -> Result<RunOutcome>;
}

/// Subprocess runner
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    /// Runner that waits for tools indefinitely
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Kill tools that run longer than `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured timeout
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Poll until the child exits or `limit` passes; `None` on timeout
    fn wait_with_timeout(&self, child: &mut Child, limit: Duration) -> std::io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
        }
    }
}

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<RunOutcome> {
        let launch_error = |e: std::io::Error| Error::Launch {
            tool: invocation.tool.clone(),
            message: format!("{}: {e}", invocation.program),
        };

        let stdout = File::create(&invocation.log)?;
        let stderr = stdout.try_clone()?;

        let start = Instant::now();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(launch_error)?;

        let status = match self.timeout {
            None => child.wait().map_err(launch_error)?,
            Some(limit) => match self.wait_with_timeout(&mut child, limit).map_err(launch_error)? {
                Some(status) => status,
                None => {
                    // Reap so no zombie outlives the sweep
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(Error::Timeout {
                        tool: invocation.tool.clone(),
                        test: invocation.test.clone(),
                        secs: limit.as_secs(),
                    });
                }
            },
        };

        Ok(RunOutcome {
            elapsed: start.elapsed(),
            exit_code: status.code(),
        })
    }
}
