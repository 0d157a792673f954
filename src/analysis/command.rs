//! Subprocess execution with a defensive timeout.
//!
//! External tools run outside any store lock and must not be able to stall
//! the pipeline on a corrupt input file. The runner polls the child and
//! kills it when the deadline passes; stdout/stderr are drained on
//! dedicated threads so a chatty child cannot deadlock on a full pipe.

use std::io::Read;
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The tool could not be launched at all.
    #[error("failed to launch {tool}: {source}")]
    Launch {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The tool exceeded its deadline and was killed.
    #[error("{tool} timed out after {timeout:?}")]
    Timeout { tool: &'static str, timeout: Duration },

    /// I/O failure while waiting on or reading from the tool.
    #[error("i/o error while running {tool}: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },
}

fn drain(stream: Option<impl Read + Send + 'static>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

/// Run a prepared command, capturing output and enforcing `timeout`.
/// `tool` is the display name used in errors.
pub fn run_with_timeout(
    tool: &'static str,
    mut cmd: Command,
    timeout: Duration,
) -> Result<Output, CommandError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child: Child = cmd
        .spawn()
        .map_err(|source| CommandError::Launch { tool, source })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return Ok(Output {
                    status,
                    stdout: collect(stdout),
                    stderr: collect(stderr),
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = collect(stdout);
                    let _ = collect(stderr);
                    return Err(CommandError::Timeout { tool, timeout });
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CommandError::Io { tool, source });
            }
        }
    }
}

/// Check that a tool answers a trivial invocation (used for the startup
/// dependency check).
pub fn tool_responds(tool: &'static str, version_arg: &str) -> bool {
    let mut cmd = Command::new(tool);
    cmd.arg(version_arg);
    match run_with_timeout(tool, cmd, Duration::from_secs(10)) {
        Ok(output) => output.status.success(),
        Err(e) => {
            log::debug!("Dependency check for {tool} failed: {e}");
            false
        }
    }
}
