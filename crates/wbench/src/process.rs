//! Bounded subprocess execution.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

/// Return code recorded when a process exceeds its timeout.
pub const TIMEOUT_RC: i32 = 124;

/// Return code recorded when a process could not be started.
pub const SPAWN_FAILURE_RC: i32 = 127;

/// Characters kept from each captured stream in a result record.
pub const TAIL_CHARS: usize = 800;

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long to wait for output readers once the child is gone.
///
/// Grandchildren may keep the pipes open after the child exits.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Outcome of one subprocess execution.
#[derive(Debug, Clone, PartialEq)]
pub struct CmdOut {
    /// Exit code, [`TIMEOUT_RC`] on timeout, `-signal` if killed by a signal.
    pub rc: i32,
    pub wall_ms: f64,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOut {
    #[must_use]
    pub const fn ok(&self) -> bool {
        self.rc == 0
    }

    #[must_use]
    pub const fn timed_out(&self) -> bool {
        self.rc == TIMEOUT_RC
    }

    /// Combined text scanned for self-reported metrics.
    #[must_use]
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Captured stream, filled incrementally by a reader thread.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(source: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let handle = source.map(|mut source| {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match source.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.lock().extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buf, handle }
    }

    /// Wait briefly for the reader to hit EOF, then take what was read.
    fn finish(mut self, deadline: Instant) -> String {
        if let Some(handle) = self.handle.take() {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(POLL_INTERVAL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
        let bytes = std::mem::take(&mut *self.buf.lock());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

/// Run `argv` in `cwd`, killing it after `timeout`.
///
/// Timeouts are not errors: the outcome carries [`TIMEOUT_RC`] and whatever
/// output was produced before the kill.
///
/// # Errors
/// Returns an error if `argv` is empty or the process cannot be spawned
/// or polled.
pub fn run_with_timeout(argv: &[OsString], cwd: &Path, timeout: Duration) -> io::Result<CmdOut> {
    let Some((program, args)) = argv.split_first() else {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty command"));
    };

    let start = Instant::now();
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = Capture::spawn(child.stdout.take());
    let stderr = Capture::spawn(child.stderr.take());

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };
    let wall_ms = start.elapsed().as_secs_f64() * 1000.0;

    let deadline = Instant::now() + DRAIN_GRACE;
    let stdout = stdout.finish(deadline);
    let stderr = stderr.finish(deadline);
    let rc = status.map_or(TIMEOUT_RC, exit_code);
    debug!(
        program = %Path::new(program).display(),
        rc,
        wall_ms,
        "process finished"
    );

    Ok(CmdOut {
        rc,
        wall_ms,
        stdout,
        stderr,
    })
}

/// Last `max_chars` characters of `text`, without surrounding newlines.
#[must_use]
pub fn tail(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim_matches('\n');
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        assert_eq!(tail("\n\nabc\n", 10), "abc");
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("", 3), "");
        assert_eq!(tail("ééé", 2), "éé");
    }

    #[test]
    fn test_empty_argv_is_error() {
        let err = run_with_timeout(&[], Path::new("."), Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_missing_program_is_error() {
        let argv = [OsString::from("/nonexistent/wbench-engine")];
        assert!(run_with_timeout(&argv, Path::new("."), Duration::from_secs(1)).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_output_and_rc() {
        let argv: Vec<OsString> = ["sh", "-c", "echo out; echo err >&2; exit 3"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let out = run_with_timeout(&argv, Path::new("."), Duration::from_secs(10)).unwrap();
        assert_eq!(out.rc, 3);
        assert!(!out.ok());
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
        assert!(out.wall_ms >= 0.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_invalid_utf8_is_replaced() {
        let argv: Vec<OsString> = ["sh", "-c", "printf 'a\\377b'"]
            .into_iter()
            .map(OsString::from)
            .collect();
        let out = run_with_timeout(&argv, Path::new("."), Duration::from_secs(10)).unwrap();
        assert!(out.ok());
        assert_eq!(out.stdout, "a\u{fffd}b");
    }
}
