//! Synchronous driver for one `mg5_aMC` process.
//!
//! The script goes to the child's stdin, stdout is read line by line and each
//! line is both kept and forwarded to an [`OutputSink`]. The child's exit
//! status is recorded but never interpreted: MG5 reports success even when a
//! command failed, so callers must judge the outcome from side effects or the
//! parsed result.

mod sinks;

pub use sinks::{CapturingSink, StdoutSink, TracingSink};

use crate::domain::{Mg5Error, Mg5Result};
use crate::modules::traits::{OutputSink, ScriptRunner};
use std::cell::RefCell;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(1);
pub const SCRIPT_TERMINATOR: &str = "exit";

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Everything observed from one process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub lines: Vec<String>,
    pub status: Option<ExitStatus>,
    pub wait_timed_out: bool,
}

impl Invocation {
    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|status| status.code())
    }
}

pub struct ProcessInvoker {
    work_dir: PathBuf,
    wait_timeout: Duration,
    sink: RefCell<Box<dyn OutputSink>>,
}

impl ProcessInvoker {
    pub fn new(sink: Box<dyn OutputSink>) -> Self {
        Self {
            work_dir: PathBuf::from("."),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            sink: RefCell::new(sink),
        }
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Runs `executable`, feeds it `script` and returns every stdout line.
    ///
    /// Lines are returned even when the child exits with a failure code or
    /// does not terminate within the wait timeout after closing stdout.
    pub fn run(&self, executable: &Path, script: &str) -> Mg5Result<Invocation> {
        // the child runs in `work_dir`, so a relative path must be pinned first
        let executable = std::path::absolute(executable).map_err(|source| {
            Mg5Error::io_system(
                "IO.MG5_PATH",
                format!(
                    "failed to resolve MG5 executable '{}': {}",
                    executable.display(),
                    source
                ),
            )
        })?;
        ensure_executable(&executable)?;

        info!(
            executable = %executable.display(),
            work_dir = %self.work_dir.display(),
            "EXEC: {} <<script",
            executable.display()
        );
        debug!(script = %script, "command script");

        let mut child = Command::new(&executable)
            .current_dir(&self.work_dir)
            .env("LANG", "C")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| {
                Mg5Error::io_system(
                    "IO.MG5_SPAWN",
                    format!(
                        "failed to start MG5 executable '{}': {}",
                        executable.display(),
                        source
                    ),
                )
                .with_command(script)
            })?;

        let fed = match child.stdin.take() {
            Some(stdin) => write_script(stdin, script),
            None => Err(Mg5Error::internal(
                "SYS.MG5_STDIN",
                "child stdin pipe was not captured",
            )),
        };
        if let Err(error) = fed {
            reap(&mut child);
            return Err(error.with_command(script));
        }

        let Some(stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(
                Mg5Error::internal("SYS.MG5_STDOUT", "child stdout pipe was not captured")
                    .with_command(script),
            );
        };
        let lines = {
            let mut sink = self.sink.borrow_mut();
            relay_lines(BufReader::new(stdout), sink.as_mut())
        };

        let status = match wait_bounded(&mut child, self.wait_timeout) {
            Ok(status) => status,
            Err(error) => {
                reap(&mut child);
                return Err(error.with_command(script));
            }
        };
        let wait_timed_out = status.is_none();
        match status {
            Some(status) => debug!(%status, lines = lines.len(), "MG5 process exited"),
            None => warn!(
                timeout_ms = self.wait_timeout.as_millis() as u64,
                "MG5 process did not exit after closing its output; keeping captured lines"
            ),
        }

        Ok(Invocation {
            lines,
            status,
            wait_timed_out,
        })
    }
}

impl ScriptRunner for ProcessInvoker {
    fn run_script(&self, executable: &Path, script: &str) -> Mg5Result<Invocation> {
        self.run(executable, script)
    }
}

pub fn ensure_executable(executable: &Path) -> Mg5Result<()> {
    if crate::modules::locate::is_executable_file(executable) {
        return Ok(());
    }
    Err(Mg5Error::input_validation(
        "INPUT.MG5_BIN_NOT_FOUND",
        format!(
            "MG5 executable '{}' is not found or not executable",
            executable.display()
        ),
    ))
}

/// Writes `script`, a newline and the terminator line, then closes `stdin`.
///
/// A child that stops reading early is not an error: whatever it printed is
/// still collected.
fn write_script<W: Write>(mut stdin: W, script: &str) -> Mg5Result<()> {
    let mut payload = String::with_capacity(script.len() + SCRIPT_TERMINATOR.len() + 2);
    payload.push_str(script);
    if !script.ends_with('\n') {
        payload.push('\n');
    }
    payload.push_str(SCRIPT_TERMINATOR);
    payload.push('\n');

    match stdin.write_all(payload.as_bytes()).and_then(|()| stdin.flush()) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == ErrorKind::BrokenPipe => {
            warn!("MG5 process closed its input before the whole script was written");
            Ok(())
        }
        Err(source) => Err(Mg5Error::io_system(
            "IO.MG5_STDIN",
            format!("failed to write command script to MG5: {}", source),
        )),
    }
}

/// Reads lines until EOF. A read error ends the relay but keeps every line
/// received before it.
fn relay_lines<R: BufRead>(mut reader: R, sink: &mut dyn OutputSink) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        match reader.read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) => {}
            Err(source) if source.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                warn!(
                    error = %source,
                    lines = lines.len(),
                    "failed to read MG5 output; keeping lines read so far"
                );
                break;
            }
        }

        let text = String::from_utf8_lossy(&buffer);
        let line = text.trim_end_matches(['\n', '\r']).to_string();
        sink.accept_line(&line);
        lines.push(line);
    }

    lines
}

/// Kills and waits for a child abandoned on an error path.
fn reap(child: &mut Child) {
    if let Err(error) = child.kill() {
        debug!(%error, "MG5 process could not be killed");
    }
    if let Err(error) = child.wait() {
        debug!(%error, "MG5 process could not be waited for");
    }
}

fn wait_bounded(child: &mut Child, timeout: Duration) -> Mg5Result<Option<ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        let polled = child.try_wait().map_err(|source| {
            Mg5Error::io_system(
                "IO.MG5_WAIT",
                format!("failed to wait for MG5 process: {}", source),
            )
        })?;
        if let Some(status) = polled {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}
