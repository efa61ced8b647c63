use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{MocoError, Result};

/// An external program plus its argument list. Never passes through a shell.
#[derive(Clone, Debug)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `flag value` pair, e.g. `-out <dir>`.
    pub fn opt(self, flag: &str, value: impl Into<OsString>) -> Self {
        self.arg(flag).arg(value)
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Run to completion, killing the process once `timeout` elapses.
    ///
    /// `work_dir` only labels errors; the child inherits the current directory.
    pub fn run(&self, timeout: Duration, poll: Duration, verbose: bool, work_dir: &Path) -> Result<()> {
        let name = self.program_name();
        debug!(command = %self, "Invoking engine");

        let (stdout, stderr) = if verbose {
            (Stdio::inherit(), Stdio::inherit())
        } else {
            (Stdio::null(), Stdio::null())
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()?;

        let deadline = deadline_after(timeout);
        let status: ExitStatus = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(program = %name, ?timeout, "Engine deadline exceeded, killing process");
                let _ = child.kill();
                let _ = child.wait();
                return Err(MocoError::EngineTimeout {
                    program: name,
                    waited_for: work_dir.to_path_buf(),
                    timeout,
                });
            }
            thread::sleep(sleep_slice(poll, deadline));
        };

        if !status.success() {
            return Err(MocoError::EngineExecution {
                program: name,
                exit_code: status.code().unwrap_or(-1),
                work_dir: work_dir.to_path_buf(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Block until `path` exists, polling every `poll`, for at most `timeout`.
///
/// Some schedulers detach the engine from its parent, so a clean exit does
/// not guarantee the output is visible yet.
pub fn wait_for_path(path: &Path, program: &str, timeout: Duration, poll: Duration) -> Result<()> {
    let deadline = deadline_after(timeout);
    loop {
        if path.exists() {
            return Ok(());
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(MocoError::EngineTimeout {
                program: program.to_string(),
                waited_for: path.to_path_buf(),
                timeout,
            });
        }
        thread::sleep(sleep_slice(poll, deadline));
    }
}

/// `None` when `timeout` is too large to represent; the wait is then unbounded.
fn deadline_after(timeout: Duration) -> Option<Instant> {
    Instant::now().checked_add(timeout)
}

fn sleep_slice(poll: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(d) => poll.min(d.saturating_duration_since(Instant::now())),
        None => poll,
    }
}
